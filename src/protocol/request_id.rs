use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest id issued before the counter wraps back to 1.
///
/// 2^53 − 1: the largest integer guaranteed to survive a round-trip through
/// JSON peers that store numbers as doubles.
const REQUEST_ID_CEILING: u64 = (1 << 53) - 1;

/// Correlation identifier for matching a response frame to its request.
///
/// Ids are plain integers on the wire, chosen by the calling side. They are
/// unique only among calls currently in flight on one connection; once a
/// call settles, its id may be reused after the counter wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// The raw integer value carried on the wire.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        // ---
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapping request-id counter, owned by one client instance.
///
/// Starts at 0 and pre-increments, so the first id issued is 1. When the
/// counter has reached [`REQUEST_ID_CEILING`] it resets and the next id is
/// 1 again.
#[derive(Debug, Default)]
pub(crate) struct RequestIdGenerator {
    // ---
    counter: u64,
}

impl RequestIdGenerator {
    // ---

    /// Create a generator whose first id will be 1.
    pub fn new() -> Self {
        // ---
        Self { counter: 0 }
    }

    /// Issue the next id, wrapping at the ceiling.
    ///
    /// Must be called exactly once per outbound call.
    pub fn next(&mut self) -> RequestId {
        // ---
        if self.counter >= REQUEST_ID_CEILING {
            self.counter = 0;
        }
        self.counter += 1;
        RequestId(self.counter)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_starts_at_one_and_increments() {
        // ---
        let mut ids = RequestIdGenerator::new();
        assert_eq!(ids.next(), RequestId(1));
        assert_eq!(ids.next(), RequestId(2));
        assert_eq!(ids.next(), RequestId(3));
    }

    #[test]
    fn test_wraps_to_one_at_ceiling() {
        // ---
        let mut ids = RequestIdGenerator {
            counter: REQUEST_ID_CEILING - 1,
        };

        assert_eq!(ids.next(), RequestId(REQUEST_ID_CEILING));
        assert_eq!(ids.next(), RequestId(1));
        assert_eq!(ids.next(), RequestId(2));
    }

    #[test]
    fn test_wire_format_is_a_bare_integer() {
        // ---
        let id = RequestId::from(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let back: RequestId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }
}
