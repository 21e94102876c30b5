//! The two kinds of per-request work the router spawns.
//!
//! Each task is a failure boundary: whatever goes wrong inside is turned into
//! a user-facing reply and an operator log line, never an error returned to
//! the router.

pub mod completion;
pub mod timer;

pub use completion::{CompletionRequest, CompletionTask};
pub use timer::{TimerRequest, TimerTask};
