//! Public, transport-agnostic RPC configuration.
//!
//! This type intentionally contains no transport-specific concepts
//! (socket options, reconnect policy, etc.). The transport collaborator
//! is responsible for its own connection settings.

use std::time::Duration;

/// Per-client RPC configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// How long a correlated call waits for its response before failing
    /// with [`RpcError::Timeout`](crate::RpcError::Timeout).
    ///
    /// Applies to every `call_and_wait` issued by the client; individual
    /// calls may override it via
    /// [`call_and_wait_with_timeout`](crate::RpcClient::call_and_wait_with_timeout).
    ///
    /// Default: 100 milliseconds
    pub call_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        // ---
        Self {
            call_timeout: Duration::from_millis(100),
        }
    }
}

impl RpcConfig {
    /// Create a config with the default call timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response timeout for correlated calls.
    ///
    /// # Example
    ///
    /// ```
    /// use frame_rpc::RpcConfig;
    /// use std::time::Duration;
    ///
    /// let config = RpcConfig::new().with_call_timeout(Duration::from_millis(50));
    /// ```
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
