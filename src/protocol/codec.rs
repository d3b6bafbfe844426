//! Wire envelope codec.
//!
//! One JSON object per text frame. Requests carry `{id, method, args}`,
//! responses carry `{id, result}`. The operation field is always `method`;
//! responses never echo it, so a `method` key is what classifies a frame
//! as a request.
//!
//! Decoding is schema-light: the only hard requirement is a parseable JSON
//! object with an `id` key. All checks are for key *presence* — `0`,
//! `false` and `""` are legitimate ids and results and must never be
//! mistaken for missing fields.

use crate::protocol::RequestId;
use crate::{Result, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound request frame: invoke `method` with positional `args`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    /// Positional, order-significant arguments. A request frame without an
    /// `args` key decodes as an empty list.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// An inbound response frame: the result correlated to `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,
    /// The remote result. A response frame without a `result` key decodes
    /// as `null`; that is a valid settlement for void operations.
    #[serde(default)]
    pub result: Value,
}

/// A decoded wire frame.
#[derive(Debug, Clone)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

/// Encode a request frame.
pub fn encode_request(id: RequestId, method: &str, args: Vec<Value>) -> Result<String> {
    // ---
    let frame = Request {
        id,
        method: method.to_string(),
        args,
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Encode a response frame.
pub fn encode_response(id: RequestId, result: Value) -> Result<String> {
    // ---
    let frame = Response { id, result };
    Ok(serde_json::to_string(&frame)?)
}

/// Decode one text frame into a [`Frame`].
///
/// # Errors
///
/// Returns `RpcError::Decode` if the frame is not a JSON object, has no
/// `id` key, or has fields of the wrong type. Callers drop such frames at
/// the point of receipt; there is no correlation id to answer to.
pub fn decode(text: &str) -> Result<Frame> {
    // ---
    let raw: Value = serde_json::from_str(text).map_err(|err| RpcError::Decode(err.to_string()))?;

    let envelope = raw
        .as_object()
        .ok_or_else(|| RpcError::Decode("frame is not a JSON object".into()))?;

    if !envelope.contains_key("id") {
        return Err(RpcError::Decode("frame has no id".into()));
    }

    if envelope.contains_key("method") {
        let request: Request =
            serde_json::from_value(raw).map_err(|err| RpcError::Decode(err.to_string()))?;
        Ok(Frame::Request(request))
    } else {
        let response: Response =
            serde_json::from_value(raw).map_err(|err| RpcError::Decode(err.to_string()))?;
        Ok(Frame::Response(response))
    }
}
