//! RPC request/response correlation over a bidirectional frame transport
//!
//! This library layers call semantics on top of a persistent, duplex
//! connection exchanging discrete text frames. A client invokes a named
//! remote operation and either fires-and-forgets or awaits a correlated
//! result within a bounded time; a server exposes named operations that are
//! dispatched on inbound frames. The library handles request-id generation,
//! request/response matching, timeout handling, and concurrent in-flight
//! calls.
//!
//! Establishing the underlying connection is an external concern: both
//! roles consume an already-wired [`FrameTransport`]. The in-memory pair
//! from [`create_memory_transport_pair`] is the reference implementation.

// Import all sub modules once...
mod client;
mod domain;
mod server;
mod transport;

mod rpc_config;

mod error;
mod macros;
mod protocol;

// Re-export main types
pub use client::RpcClient;
pub use server::RpcServer;

pub use rpc_config::RpcConfig;

pub use error::{Result, RpcError};

pub use transport::create_memory_transport_pair;

// --- public re-exports
pub use domain::{
    //
    EventStream,
    FrameTransport,
    TransportEvent,
    TransportPtr,
};

pub use protocol::{
    //
    decode,
    encode_request,
    encode_response,
    Frame,
    Request,
    RequestId,
    Response,
};

pub(crate) use macros::{log_debug, log_error, log_warn};

use std::sync::{Mutex, MutexGuard};

/// Acquire a mutex guard, intentionally ignoring poisoning.
///
/// Mutex poisoning indicates that another task panicked while holding the
/// lock. The state protected here is always a single best-effort map (the
/// pending-call table, the handler registry, the id counter).
///
/// Ignoring poisoning is acceptable because:
/// - There are no invariants spanning multiple fields.
/// - The worst outcome is a dropped or unmatched response.
/// - Connection-level failures are handled by the receive loops.
///
/// This avoids propagating non-`Send` poison errors across async boundaries.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
