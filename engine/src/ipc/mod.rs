//! S-expression command interface.
//!
//! Messages are plists such as `(:type :gesture-status :id 1)`; responses
//! are `(:type :response :id N :status :ok ...)`.  Transport is left to the
//! embedding application.

pub mod dispatch;

pub use dispatch::handle_message;
