//! Core of the Telegram relay bot.
//!
//! Per-user admission control, timer and completion task lifecycles, and the
//! message router live here. Telegram, OpenAI and the SQLite message log are
//! reached through ports (traits) implemented in adapter crates or in
//! `message_log`.

pub mod admission;
pub mod completion;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod message_log;
pub mod messaging;
pub mod replies;
pub mod router;
pub mod spawner;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
