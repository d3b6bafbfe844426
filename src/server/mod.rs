/// RPC server for dispatching inbound requests to exposed method handlers
mod handler;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::domain::{EventStream, FrameTransport, TransportEvent, TransportPtr};
use crate::protocol::{self, Frame};
use crate::{lock_ignore_poison, log_debug, log_error, log_warn, Result, RpcError};

use handler::{wrap, BoxedHandler, HandlerFn};

/// Registry of exposed method handlers.
///
/// Key: method name, Value: type-erased handler function.
type HandlerMap = HashMap<String, BoxedHandler>;

/// RPC server dispatching inbound request frames to exposed handlers.
///
/// Handlers are looked up by exact method name when a request frame is
/// decoded, so exposing and revoking take effect immediately. Each request
/// runs on its own spawned task; a slow handler never blocks the receive
/// loop or other requests.
///
/// Cheap to clone (internally `Arc`-backed).
///
/// # Example
///
/// ```no_run
/// use frame_rpc::{create_memory_transport_pair, RpcServer};
/// use serde_json::json;
///
/// # async fn example() -> frame_rpc::Result<()> {
/// let (transport, _peer) = create_memory_transport_pair();
/// let server = RpcServer::with_transport(transport).await?;
///
/// server.expose("hello", |_args| async move { Ok(json!("world")) });
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RpcServer {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    transport: TransportPtr,
    handlers: Arc<Mutex<HandlerMap>>,

    /// Best-effort receive loop handle, kept so the task isn't dropped.
    _rx_task: JoinHandle<()>,
}

impl RpcServer {
    // ---
    /// Create a server over an established transport.
    ///
    /// Consumes the transport's event stream, waits for the connection to
    /// report itself open, then starts dispatching inbound requests.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the event stream cannot be taken or
    /// the connection errors while opening, and `RpcError::Closed` if the
    /// connection closes before it opens.
    pub async fn with_transport(transport: TransportPtr) -> Result<Self> {
        // ---
        let mut events = transport.events().await?;

        loop {
            match events.inbox.recv().await {
                Some(TransportEvent::Opened) => break,
                Some(TransportEvent::Errored(reason)) => {
                    return Err(RpcError::Transport(reason));
                }
                Some(TransportEvent::Closed) | None => return Err(RpcError::Closed),
                Some(TransportEvent::Frame(_frame)) => {
                    log_debug!("dropping frame received before open");
                }
            }
        }

        let handlers: Arc<Mutex<HandlerMap>> = Arc::new(Mutex::new(HashMap::new()));
        let rx_task = Self::start_rx_task(transport.clone(), events, handlers.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                handlers,
                _rx_task: rx_task,
            }),
        })
    }

    // Start background task that decodes requests and runs their handlers.
    fn start_rx_task(
        transport: TransportPtr,
        mut events: EventStream,
        handlers: Arc<Mutex<HandlerMap>>,
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

                // Malformed envelope or missing id: there is no correlation
                // id to answer to, so the frame is dropped without a reply.
                let frame = match protocol::decode(&text) {
                    Ok(frame) => frame,
                    Err(_err) => {
                        log_debug!("dropping undecodable frame: {_err}");
                        continue;
                    }
                };

                let request = match frame {
                    Frame::Request(request) => request,
                    Frame::Response(_resp) => {
                        log_debug!("ignoring response frame id {} on server end", _resp.id);
                        continue;
                    }
                };

                // Lookup at receipt time, not registration time: handlers
                // exposed or revoked since the request was sent are honored.
                let handler = {
                    let handlers = lock_ignore_poison(&handlers);
                    handlers.get(&request.method).cloned()
                };

                let handler = match handler {
                    Some(handler) => handler,
                    None => {
                        // No reply for unknown methods; the remote caller
                        // observes a timeout.
                        log_warn!("no handler exposed for method: {}", request.method);
                        continue;
                    }
                };

                // Run the handler and frame its result back.
                let transport = transport.clone();
                tokio::spawn(async move {
                    let result = match handler.call(request.args).await {
                        Ok(result) => result,
                        Err(_err) => {
                            // Handler failures stay local; no response frame
                            // is sent and the caller times out.
                            log_error!("handler for {} failed: {_err}", request.method);
                            return;
                        }
                    };

                    let frame = match protocol::encode_response(request.id, result) {
                        Ok(frame) => frame,
                        Err(_err) => {
                            log_error!("failed to encode response: {_err}");
                            return;
                        }
                    };

                    if let Err(_err) = transport.send(frame).await {
                        log_error!("failed to send response: {_err}");
                    }
                });
            }

            log_debug!("server receive loop stopped");
        })
    }

    /// Expose a method under `name`.
    ///
    /// Replaces any handler previously exposed under the same name. The
    /// handler receives the request's positional arguments and its result
    /// is framed back to the caller; if it fails, no response is sent.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use frame_rpc::RpcServer;
    /// # use serde_json::{json, Value};
    /// # fn example(server: &RpcServer) {
    /// server.expose("add", |args: Vec<Value>| async move {
    ///     let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
    ///     Ok(json!(sum))
    /// });
    /// # }
    /// ```
    pub fn expose<F, Fut>(&self, name: &str, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        // ---
        let wrapped = wrap(handler);

        let mut handlers = lock_ignore_poison(&self.inner.handlers);
        handlers.insert(name.to_string(), wrapped);
    }

    /// Revoke the handler exposed under `name`.
    ///
    /// Requests for a revoked method get no reply; callers observe a
    /// timeout. Returns whether a handler was present.
    pub fn revoke(&self, name: &str) -> bool {
        // ---
        let mut handlers = lock_ignore_poison(&self.inner.handlers);
        handlers.remove(name).is_some()
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        // ---
        self.inner.transport.close().await
    }
}
