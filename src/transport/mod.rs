//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `FrameTransport` trait, exposed only through constructor functions.
//!
//! Domain code must not depend on transport-specific types. Connection
//! establishment for real sockets is an external concern; the in-memory
//! pair below is the reference implementation and the test collaborator.

mod memory;

pub use memory::create_memory_transport_pair;
