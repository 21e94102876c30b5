//! Chat transport abstractions (Telegram today).

pub mod chunks;
pub mod port;
pub mod types;
