//! Dialogue session state machine and controller.

pub mod controller;
pub mod session;

pub use controller::DialogueController;
pub use session::{FocusState, Mode, Session};
