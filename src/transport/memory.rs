//! In-memory transport implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `FrameTransport` trait. It is intended primarily for testing, local
//! execution, and as a reference for transport semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory pair defines the **reference behavior** for the transport
//! layer. Implementations over real sockets are expected to approximate this
//! behavior as closely as their underlying systems allow and to document any
//! unavoidable deviations.
//!
//! In particular, the in-memory pair establishes the following expectations:
//!
//! - `Opened` is delivered on each end's event stream before any frame.
//! - A frame accepted by `send()` on one end is deliverable, in send order,
//!   to the peer's event stream.
//! - `close()` makes subsequent local sends fail and notifies the peer with
//!   a `Closed` event.
//!
//! ## Non-Goals
//!
//! This transport does not attempt to emulate the failure modes, latency,
//! or partial-delivery behavior of any real socket. It exists to provide a
//! clear, deterministic baseline against which the correlation layer can be
//! validated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::domain::{EventStream, FrameTransport, TransportEvent, TransportPtr};
use crate::{lock_ignore_poison, log_debug, Result, RpcError};

/// One end of a linked in-memory connection.
///
/// Frames sent here surface as `Frame` events on the peer's stream, exactly
/// as two processes joined by a socket would see them.
struct MemoryTransport {
    // ---
    label: &'static str,
    /// Sender feeding the peer's event stream.
    peer: mpsc::Sender<TransportEvent>,
    /// This end's event stream, handed out once by `events()`.
    events: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl FrameTransport for MemoryTransport {
    // ---

    /// Hand one frame to the peer's event stream.
    ///
    /// Resolves once the frame is queued on the peer's inbox, which is this
    /// transport's notion of hand-off acknowledgment.
    async fn send(&self, frame: String) -> Result<()> {
        // ---
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        log_debug!("{}: send frame: {frame}", self.label);

        self.peer
            .send(TransportEvent::Frame(frame))
            .await
            .map_err(|_| RpcError::Transport("peer endpoint dropped".into()))
    }

    /// Take this end's event stream.
    ///
    /// The stream starts with the `Opened` event queued at pair creation.
    async fn events(&self) -> Result<EventStream> {
        // ---
        let inbox = {
            let mut events = lock_ignore_poison(&self.events);
            events.take()
        };

        match inbox {
            Some(inbox) => Ok(EventStream { inbox }),
            None => Err(RpcError::Transport(
                "event stream already consumed".into(),
            )),
        }
    }

    /// Close this end.
    ///
    /// Subsequent local sends fail with `RpcError::Closed`; the peer is
    /// notified with a `Closed` event.
    async fn close(&self) -> Result<()> {
        // ---
        log_debug!("{}: closing transport", self.label);

        self.closed.store(true, Ordering::SeqCst);

        // Peer may already be gone; closing twice is also fine.
        let _ = self.peer.send(TransportEvent::Closed).await;
        Ok(())
    }
}

/// Create a linked pair of in-memory transports.
///
/// The two endpoints model the two ends of an already-established socket:
/// a frame sent on one arrives on the other, and both report `Opened`
/// immediately. Hand one end to an [`RpcClient`](crate::RpcClient) and the
/// other to an [`RpcServer`](crate::RpcServer).
///
/// # Example
///
/// ```no_run
/// use frame_rpc::{create_memory_transport_pair, RpcClient, RpcConfig, RpcServer};
/// use serde_json::json;
///
/// # async fn example() -> frame_rpc::Result<()> {
/// let (client_end, server_end) = create_memory_transport_pair();
///
/// let server = RpcServer::with_transport(server_end).await?;
/// server.expose("hello", |_args| async move { Ok(json!("world")) });
///
/// let client = RpcClient::with_transport(client_end, RpcConfig::new()).await?;
/// let greeting = client.call_and_wait("hello", vec![]).await?;
/// assert_eq!(greeting, json!("world"));
/// # Ok(())
/// # }
/// ```
pub fn create_memory_transport_pair() -> (TransportPtr, TransportPtr) {
    // ---
    let (left_tx, left_rx) = mpsc::channel(16);
    let (right_tx, right_rx) = mpsc::channel(16);

    // Both ends of an in-process pair are open from the start. The channels
    // are freshly created, so queuing the event cannot fail.
    let _ = left_tx.try_send(TransportEvent::Opened);
    let _ = right_tx.try_send(TransportEvent::Opened);

    let left = MemoryTransport {
        label: "left",
        peer: right_tx,
        events: Mutex::new(Some(left_rx)),
        closed: AtomicBool::new(false),
    };

    let right = MemoryTransport {
        label: "right",
        peer: left_tx,
        events: Mutex::new(Some(right_rx)),
        closed: AtomicBool::new(false),
    };

    (Arc::new(left), Arc::new(right))
}
