// src/client/rpc_client.rs

//! RPC client implementation.
//!
//! This module contains the core [`RpcClient`] type which sends calls over
//! a frame transport and matches inbound response frames back to the calls
//! that issued them.
//!
//! # Architecture
//!
//! The client consumes the transport's event stream and runs a background
//! receive loop. Each correlated call draws a fresh request id from the
//! client's wrapping counter and registers a oneshot channel in the
//! pending-call table; when a response frame with that id arrives, the loop
//! delivers its result to the suspended caller.
//!
//! # Concurrency
//!
//! Multiple calls can be in flight simultaneously; responses are matched
//! solely by id, so out-of-order arrival is fine. The pending table and
//! the id counter are protected by mutexes held only for map operations,
//! never across an await.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::{EventStream, FrameTransport, TransportEvent, TransportPtr};
use crate::protocol::{self, Frame, RequestId, RequestIdGenerator};
use crate::{lock_ignore_poison, log_debug, log_warn, Result, RpcConfig, RpcError};

use super::pending::PendingCalls;

/// Running RPC client instance.
///
/// Cheap to clone (internally `Arc`-backed).
///
/// # Example
///
/// ```no_run
/// use frame_rpc::{create_memory_transport_pair, RpcClient, RpcConfig};
/// use serde_json::json;
///
/// # async fn example() -> frame_rpc::Result<()> {
/// let (transport, _peer) = create_memory_transport_pair();
/// let client = RpcClient::with_transport(transport, RpcConfig::new()).await?;
///
/// let sum = client.call_and_wait("add", vec![json!(2), json!(3)]).await?;
/// assert_eq!(sum, json!(5));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    transport: TransportPtr,
    ids: Mutex<RequestIdGenerator>,
    pending: Arc<Mutex<PendingCalls>>,
    config: RpcConfig,

    /// Best-effort receive loop handle.
    ///
    /// We keep it so the task isn't immediately dropped, and so it can be
    /// extended later (shutdown, join-on-close, etc.).
    _rx_task: JoinHandle<()>,
}

impl RpcClient {
    // ---
    /// Create a client over an established transport.
    ///
    /// Consumes the transport's event stream and does not return until the
    /// transport reports itself open — no call can be issued before the
    /// connection is usable.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the event stream cannot be taken or
    /// the connection errors while opening, and `RpcError::Closed` if the
    /// connection closes before it opens.
    pub async fn with_transport(transport: TransportPtr, config: RpcConfig) -> Result<Self> {
        // ---
        let mut events = transport.events().await?;

        Self::wait_for_open(&mut events).await?;

        let pending = Arc::new(Mutex::new(PendingCalls::new()));
        let rx_task = Self::start_rx_task(events, pending.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                ids: Mutex::new(RequestIdGenerator::new()),
                pending,
                config,
                _rx_task: rx_task,
            }),
        })
    }

    // Block construction until the transport reports Opened.
    async fn wait_for_open(events: &mut EventStream) -> Result<()> {
        // ---
        loop {
            match events.inbox.recv().await {
                Some(TransportEvent::Opened) => return Ok(()),
                Some(TransportEvent::Errored(reason)) => {
                    return Err(RpcError::Transport(reason));
                }
                Some(TransportEvent::Closed) | None => return Err(RpcError::Closed),
                Some(TransportEvent::Frame(_frame)) => {
                    log_debug!("dropping frame received before open");
                }
            }
        }
    }

    // Start background task that routes response frames to pending calls.
    fn start_rx_task(
        mut events: EventStream,
        pending: Arc<Mutex<PendingCalls>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // ---
            while let Some(event) = events.inbox.recv().await {
                let text = match event {
                    TransportEvent::Frame(text) => text,
                    TransportEvent::Closed => break,
                    TransportEvent::Errored(_reason) => {
                        log_warn!("transport error: {_reason}");
                        continue;
                    }
                    TransportEvent::Opened => continue,
                };

                let frame = match protocol::decode(&text) {
                    Ok(frame) => frame,
                    Err(_err) => {
                        log_debug!("dropping undecodable frame: {_err}");
                        continue;
                    }
                };

                match frame {
                    Frame::Response(resp) => {
                        let settled = {
                            let mut pending = lock_ignore_poison(&pending);
                            pending.complete(resp.id, resp.result)
                        };

                        if !settled {
                            // Already timed out, or never existed. Drop it.
                            log_debug!("no pending call for response id {}", resp.id);
                        }
                    }
                    Frame::Request(_req) => {
                        log_debug!("ignoring request frame for {} on client end", _req.method);
                    }
                }
            }

            log_debug!("client receive loop stopped");
        })
    }

    /// Invoke a remote operation without awaiting a result.
    ///
    /// Returns once the transport has accepted the frame. No correlation is
    /// established: the caller has no way to observe whether the remote
    /// ever executed the operation.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Serialization` if the frame cannot be encoded, or
    /// the transport's error if the send is not accepted.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<()> {
        // ---
        let id = self.next_id();
        let frame = protocol::encode_request(id, method, args)?;

        log_debug!("call {method} (id {id}), fire-and-forget");

        self.inner.transport.send(frame).await
    }

    /// Invoke a remote operation and await its correlated result.
    ///
    /// Uses the client's configured
    /// [`call_timeout`](crate::RpcConfig::call_timeout).
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] if no matching response arrives within
    /// the configured duration. A timeout carries no cause: network loss, a
    /// slow handler, and an unregistered method are indistinguishable from
    /// this side.
    pub async fn call_and_wait(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        // ---
        self.call_and_wait_with_timeout(method, args, self.inner.config.call_timeout)
            .await
    }

    /// Invoke a remote operation with a per-call timeout override.
    ///
    /// # Errors
    ///
    /// As [`call_and_wait`](Self::call_and_wait), against `timeout` instead
    /// of the configured default.
    pub async fn call_and_wait_with_timeout(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        // ---
        let id = self.next_id();
        let frame = protocol::encode_request(id, method, args)?;

        // Register before sending so a response cannot arrive ahead of its
        // table slot.
        let rx = {
            let mut pending = lock_ignore_poison(&self.inner.pending);
            pending.register(id)
        };

        log_debug!("call {method} (id {id}), awaiting response");

        if let Err(err) = self.inner.transport.send(frame).await {
            // Send failures propagate before any correlation is attempted.
            lock_ignore_poison(&self.inner.pending).remove(id);
            return Err(err);
        }

        // Two events race: the matching response settles the receiver, or
        // the timer fires first. The receiver is polled before the deadline
        // is checked, so an answered call is never reported as timed out.
        match time::timeout(timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_recv_err)) => {
                lock_ignore_poison(&self.inner.pending).remove(id);
                Err(RpcError::Transport(
                    "pending call dropped before settlement".into(),
                ))
            }
            Err(_elapsed) => {
                // The entry comes out of the table immediately, so a late
                // response cannot resurrect this call.
                lock_ignore_poison(&self.inner.pending).remove(id);
                log_debug!("call {method} (id {id}) timed out");
                Err(RpcError::Timeout)
            }
        }
    }

    /// Close the underlying transport.
    ///
    /// Calls issued after close fail at the send step.
    pub async fn close(&self) -> Result<()> {
        // ---
        self.inner.transport.close().await
    }

    fn next_id(&self) -> RequestId {
        // ---
        lock_ignore_poison(&self.inner.ids).next()
    }
}
