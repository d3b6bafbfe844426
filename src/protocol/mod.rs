/// Protocol types for the wire envelope and request-id generation
///
/// This module defines the JSON wire format for request/response frames
/// and the per-connection request identifier counter.
mod codec;
mod request_id;

pub use codec::{decode, encode_request, encode_response, Frame, Request, Response};
pub use request_id::RequestId;

pub(crate) use request_id::RequestIdGenerator;
