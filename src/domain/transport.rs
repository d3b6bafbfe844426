// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the domain-level transport interface the client and
//! server layers use to exchange frames. It intentionally avoids any
//! reference to concrete socket libraries or connection management.
//!
//! A transport models one end of an established, bidirectional connection
//! that exchanges discrete text frames. The transport layer is responsible
//! only for frame hand-off and for reporting connection lifecycle changes.
//! Higher-level semantics such as correlation or timeouts are handled
//! elsewhere.
//!
//! Connection establishment, handshake, and reconnection are out of scope:
//! a `FrameTransport` is handed to this crate already wired to its peer.
//!
//! Concrete implementations live under `src/transport/`.

use crate::Result;

use tokio::sync::mpsc;
use std::sync::Arc;

/// A notification from one end of a transport connection.
///
/// Events arrive one at a time, in arbitrary order relative to sends on the
/// same transport. `Opened` is delivered once the connection is usable;
/// consumers treat it as the gate before issuing any call.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The connection is established and frames may be sent.
    Opened,

    /// One inbound text frame, delivered as received.
    Frame(String),

    /// The connection reported an error. The connection may or may not
    /// still be usable; a subsequent `Closed` settles that.
    Errored(String),

    /// The connection is closed. No further frames will arrive.
    Closed,
}

/// Handle for consuming a transport's inbound events.
///
/// A transport produces exactly one event stream; see
/// [`FrameTransport::events`].
///
/// # Example
///
/// ```no_run
/// # use frame_rpc::{create_memory_transport_pair, FrameTransport, TransportEvent};
/// # async fn example() -> frame_rpc::Result<()> {
/// let (transport, _peer) = create_memory_transport_pair();
/// let mut stream = transport.events().await?;
///
/// while let Some(event) = stream.inbox.recv().await {
///     if let TransportEvent::Frame(text) = event {
///         println!("received: {text}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EventStream {
    // ---
    /// Receiver channel for this end's inbound events.
    pub inbox: mpsc::Receiver<TransportEvent>,
}

/// Frame transport abstraction.
///
/// A `FrameTransport` is one end of a persistent duplex connection carrying
/// discrete text frames. It defines the minimal contract required by the
/// client and server layers without committing to any specific socket
/// implementation.
///
/// Implementations must ensure that:
/// - `send()` resolves once the frame has been handed off to the transport,
///   not once any reply arrives.
/// - `Opened` is delivered on the event stream before any `Frame` event.
/// - No assumptions are made about frame ordering relative to sends.
///
/// The in-memory transport serves as the reference implementation of these
/// semantics.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show
/// explicit lifetimes and a boxed `Future`. This is an implementation
/// detail — consumers should treat methods as normal `async fn`s.
#[async_trait::async_trait]
pub trait FrameTransport: Send + Sync {
    // ---
    /// Send one text frame to the peer.
    ///
    /// Resolves when the transport has accepted the frame for delivery.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Closed` if this end has been closed, or
    /// `RpcError::Transport` if the frame could not be handed off.
    async fn send(&self, frame: String) -> Result<()>;

    /// Take this end's inbound event stream.
    ///
    /// The stream is single-consumer: the first call returns it, every
    /// later call fails.
    async fn events(&self) -> Result<EventStream>;

    /// Close this end of the connection and notify the peer.
    async fn close(&self) -> Result<()>;
}

/// Shared transport pointer.
///
/// This is an `Arc<dyn FrameTransport>`, which means:
/// - `.clone()` is cheap (only increments a reference count)
/// - Multiple clones share the same underlying connection end
/// - Used to erase concrete transport types behind a stable domain interface.
pub type TransportPtr = Arc<dyn FrameTransport>;
