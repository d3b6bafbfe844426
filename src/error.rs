use thiserror::Error;

/// Errors that can occur during RPC operations
#[derive(Error, Debug)]
pub enum RpcError {
    /// Call timed out waiting for a correlated response
    #[error("call timed out waiting for response")]
    Timeout,

    /// Transport failed to accept or deliver a frame
    #[error("transport error: {0}")]
    Transport(String),

    /// Transport is closed
    #[error("transport closed")]
    Closed,

    /// Inbound frame could not be decoded into a request or response
    #[error("undecodable frame: {0}")]
    Decode(String),

    /// Method handler failed; recorded locally, never sent to the caller
    #[error("handler failed: {0}")]
    Handler(String),

    /// JSON serialization failed while encoding a frame
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;
