//! Outward side effects and the sink that receives them.
//!
//! The recognizer never touches the OS.  Cursor moves, clicks and scrolls
//! are handed to an `ActionSink`, which must return quickly; anything that
//! blocks belongs behind a queue on the sink's side.

use tracing::debug;

use crate::tracking::Hand;

/// Side effect requested by gesture recognition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Move the pointer to screen pixels.
    CursorMove { x: f32, y: f32 },
    /// Press the primary button and keep it down.
    MouseDown,
    /// Release the primary button.
    MouseUp,
    /// Press and release the primary button.
    Click,
    /// Wheel scroll in 1/120-notch units; positive scrolls up.
    Scroll { delta: i32 },
}

impl Action {
    /// String representation for IPC and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CursorMove { .. } => "cursor-move",
            Self::MouseDown => "mouse-down",
            Self::MouseUp => "mouse-up",
            Self::Click => "click",
            Self::Scroll { .. } => "scroll",
        }
    }

    /// Format the action as an IPC event s-expression.
    pub fn to_sexp(&self, hand: Hand) -> String {
        match self {
            Self::CursorMove { x, y } => format!(
                "(:type :event :event :{} :hand :{} :x {:.0} :y {:.0})",
                self.as_str(),
                hand.as_str(),
                x,
                y,
            ),
            Self::Scroll { delta } => format!(
                "(:type :event :event :{} :hand :{} :delta {})",
                self.as_str(),
                hand.as_str(),
                delta,
            ),
            _ => format!(
                "(:type :event :event :{} :hand :{})",
                self.as_str(),
                hand.as_str(),
            ),
        }
    }
}

/// Receiver for recognized actions.  Called synchronously on the frame
/// thread; implementations must not block.
pub trait ActionSink {
    fn emit(&mut self, hand: Hand, action: Action);
}

/// Discards every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ActionSink for NullSink {
    fn emit(&mut self, _hand: Hand, _action: Action) {}
}

/// Keeps every action in order, for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub actions: Vec<(Hand, Action)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&mut self) -> Vec<(Hand, Action)> {
        std::mem::take(&mut self.actions)
    }

    /// Recorded actions other than cursor moves.
    pub fn discrete(&self) -> Vec<(Hand, Action)> {
        self.actions
            .iter()
            .copied()
            .filter(|(_, a)| !matches!(a, Action::CursorMove { .. }))
            .collect()
    }
}

impl ActionSink for RecordingSink {
    fn emit(&mut self, hand: Hand, action: Action) {
        self.actions.push((hand, action));
    }
}

/// Writes each discrete action to the log; cursor moves go to `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ActionSink for LogSink {
    fn emit(&mut self, hand: Hand, action: Action) {
        match action {
            Action::CursorMove { .. } => tracing::trace!("{}", action.to_sexp(hand)),
            _ => debug!("{}", action.to_sexp(hand)),
        }
    }
}

impl<S: ActionSink + ?Sized> ActionSink for &mut S {
    fn emit(&mut self, hand: Hand, action: Action) {
        (**self).emit(hand, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(Action::Click.as_str(), "click");
        assert_eq!(Action::MouseDown.as_str(), "mouse-down");
        assert_eq!(Action::MouseUp.as_str(), "mouse-up");
        assert_eq!(Action::Scroll { delta: 3 }.as_str(), "scroll");
        assert_eq!(Action::CursorMove { x: 0.0, y: 0.0 }.as_str(), "cursor-move");
    }

    #[test]
    fn test_action_to_sexp() {
        let s = Action::CursorMove { x: 960.4, y: 10.0 }.to_sexp(Hand::Right);
        assert_eq!(s, "(:type :event :event :cursor-move :hand :right :x 960 :y 10)");

        let s = Action::Scroll { delta: -96 }.to_sexp(Hand::Left);
        assert!(s.contains(":delta -96"));

        let s = Action::Click.to_sexp(Hand::Left);
        assert_eq!(s, "(:type :event :event :click :hand :left)");
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.emit(Hand::Right, Action::CursorMove { x: 1.0, y: 2.0 });
        sink.emit(Hand::Right, Action::Click);
        assert_eq!(sink.actions.len(), 2);
        assert_eq!(sink.discrete(), vec![(Hand::Right, Action::Click)]);

        let taken = sink.take();
        assert_eq!(taken.len(), 2);
        assert!(sink.actions.is_empty());
    }

    #[test]
    fn test_mut_ref_sink() {
        fn drive<S: ActionSink>(mut sink: S) {
            sink.emit(Hand::Left, Action::MouseDown);
        }

        let mut sink = RecordingSink::new();
        drive(&mut sink);
        assert_eq!(sink.actions, vec![(Hand::Left, Action::MouseDown)]);
    }

    #[test]
    fn test_null_sink() {
        let mut sink = NullSink;
        sink.emit(Hand::Left, Action::Click);
    }
}
