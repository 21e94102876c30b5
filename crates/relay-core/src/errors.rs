/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the router and
/// the spawned tasks can decide locally what the user gets to see.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// The chat transport could not deliver a message or action.
    #[error("transport error: {0}")]
    Transport(String),

    /// The completion service failed (network, status, malformed or empty reply).
    #[error("completion error: {0}")]
    Completion(String),

    /// The message log store rejected an append.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
