mod controller;
mod snapshot;
mod timer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{GameSession, SessionOptions};
pub use snapshot::{Outcome, SessionSnapshot, SessionStatus};
