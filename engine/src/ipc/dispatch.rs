//! IPC message dispatch: parse s-expressions and route to handlers.

use lexpr::Value;
use tracing::{debug, warn};

use crate::gesture::actions::ActionSink;
use crate::gesture::controller::{GestureController, TrackingMode};
use crate::tracking::hand::Hand;

/// Parse an s-expression message and dispatch to the appropriate handler.
/// Returns an optional response string (s-expression).
pub fn handle_message<S: ActionSink>(
    controller: &mut GestureController<S>,
    raw: &str,
) -> Option<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed s-expression: {}", e);
            return Some(error_response(0, &format!("malformed s-expression: {e}")));
        }
    };

    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);
    debug!("ipc message {:?} id={}", msg_type, msg_id);

    match msg_type.as_deref() {
        Some("gesture-status") => handle_gesture_status(controller, msg_id),
        Some("gesture-config") => handle_gesture_config(controller, msg_id, &value),
        Some("gesture-reset") => handle_gesture_reset(controller, msg_id),
        Some("hand-status") => handle_hand_status(controller, msg_id, &value),
        Some("tracking-mode") => handle_tracking_mode(controller, msg_id, &value),
        Some("calibration-status") => handle_calibration_status(controller, msg_id),
        Some("calibration-reset") => handle_calibration_reset(controller, msg_id),
        Some("snapshot") => handle_snapshot(controller, msg_id),
        Some(other) => {
            warn!("unknown message type: {}", other);
            Some(error_response(msg_id, &format!("unknown message type: {other}")))
        }
        None => Some(error_response(msg_id, "missing :type")),
    }
}

// ── Gesture ────────────────────────────────────────────────

fn handle_gesture_status<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
) -> Option<String> {
    let status = controller.status_sexp();
    Some(format!(
        "(:type :response :id {} :status :ok :gesture {})",
        msg_id, status
    ))
}

fn handle_gesture_config<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
    value: &Value,
) -> Option<String> {
    let pinch = get_float(value, "pinch-threshold");
    let grab = get_float(value, "grab-threshold");
    for (name, strength) in [("pinch-threshold", pinch), ("grab-threshold", grab)] {
        if let Some(s) = strength {
            if !(0.0..=1.0).contains(&s) {
                return Some(error_response(msg_id, &format!(":{name} must be in [0, 1]")));
            }
        }
    }
    let hold = get_float(value, "hold-threshold");
    let swipe = get_float(value, "swipe-threshold");
    let matching = get_float(value, "match-threshold");
    for (name, v) in [
        ("hold-threshold", hold),
        ("swipe-threshold", swipe),
        ("match-threshold", matching),
    ] {
        if let Some(v) = v {
            if !v.is_finite() || v < 0.0 {
                return Some(error_response(
                    msg_id,
                    &format!(":{name} must be a finite, non-negative number"),
                ));
            }
        }
    }

    let config = controller.config_mut();
    if let Some(pinch) = pinch {
        config.pinch_threshold = pinch as f32;
    }
    if let Some(grab) = grab {
        config.grab_threshold = grab as f32;
    }
    if let Some(hold) = hold {
        config.hold_threshold = hold;
    }
    if let Some(swipe) = swipe {
        config.swipe_threshold = swipe as f32;
    }
    if let Some(matching) = matching {
        config.match_threshold = matching as f32;
    }
    if let Some(curled) = get_bool(value, "pinch-requires-index-curled") {
        config.pinch_requires_index_curled = curled;
    }

    Some(format!(
        "(:type :response :id {} :status :ok :config {})",
        msg_id,
        config.config_sexp()
    ))
}

fn handle_gesture_reset<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
) -> Option<String> {
    controller.reset();
    Some(ok_response(msg_id))
}

fn handle_hand_status<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
    value: &Value,
) -> Option<String> {
    let hand = match get_string(value, "hand") {
        Some(h) => h,
        None => return Some(error_response(msg_id, "missing :hand (left or right)")),
    };
    let hand = match Hand::from_str(&hand) {
        Some(h) => h,
        None => return Some(error_response(msg_id, &format!("unknown hand: {hand}"))),
    };
    Some(format!(
        "(:type :response :id {} :status :ok :hand-state {})",
        msg_id,
        controller.hand(hand).status_sexp()
    ))
}

// ── Tracking mode & calibration ────────────────────────────

fn handle_tracking_mode<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
    value: &Value,
) -> Option<String> {
    let mode = match get_keyword(value, "mode") {
        Some(m) => m,
        None => {
            return Some(format!(
                "(:type :response :id {} :status :ok :mode :{})",
                msg_id,
                controller.mode().as_str()
            ))
        }
    };
    match TrackingMode::from_str(&mode) {
        Some(mode) => {
            controller.set_mode(mode);
            Some(format!(
                "(:type :response :id {} :status :ok :mode :{})",
                msg_id,
                mode.as_str()
            ))
        }
        None => Some(error_response(
            msg_id,
            &format!("unknown mode: {mode} (sleep, active, setup)"),
        )),
    }
}

fn handle_calibration_status<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :calibration {})",
        msg_id,
        controller.calibration().status_sexp()
    ))
}

fn handle_calibration_reset<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
) -> Option<String> {
    controller.reset_calibration();
    Some(ok_response(msg_id))
}

// ── Snapshot ───────────────────────────────────────────────

fn handle_snapshot<S: ActionSink>(
    controller: &mut GestureController<S>,
    msg_id: i64,
) -> Option<String> {
    match controller.latest_snapshot().to_json() {
        Ok(json) => Some(format!(
            "(:type :response :id {} :status :ok :snapshot \"{}\")",
            msg_id,
            escape_string(&json)
        )),
        Err(e) => Some(error_response(msg_id, &format!("snapshot encoding failed: {e}"))),
    }
}

// ── Helpers ────────────────────────────────────────────────

fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extract a keyword value from an s-expression plist.
/// Walks cons pairs directly to find `:key` followed by its value.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let car = pair.car();
        let is_key = match car {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            let Value::Cons(next) = pair.cdr() else {
                return None;
            };
            let val = next.car();
            return match val {
                Value::Keyword(v) => Some(v.to_string()),
                Value::Symbol(v) => {
                    let s = v.to_string();
                    Some(s.strip_prefix(':').unwrap_or(&s).to_string())
                }
                Value::String(v) => Some(v.to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
                Value::Null => Some("nil".to_string()),
                _ => Some(val.to_string()),
            };
        }
        current = pair.cdr();
    }
    None
}

/// Extract an integer value from an s-expression plist.
fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a string value from an s-expression plist.
fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Extract a boolean value from an s-expression plist.
/// Treats "t" as true, "nil" as false.
fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

/// Extract a floating-point value from an s-expression plist.
fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}
