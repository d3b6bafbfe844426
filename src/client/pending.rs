use crate::protocol::RequestId;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Tracks in-flight calls waiting for responses
///
/// Maps request ids to oneshot channels. When a matching response frame
/// arrives, the channel delivers its result to the suspended caller.
///
/// An entry settles at most once: `complete` and `remove` both take the
/// entry out of the table, so whichever of "response arrived" and "timer
/// fired" happens first wins and the loser finds nothing to act on.
pub(super) struct PendingCalls {
    // ---
    calls: HashMap<RequestId, oneshot::Sender<Value>>,
}

impl PendingCalls {
    // ---

    /// Create a new empty pending-call table
    pub fn new() -> Self {
        // ---
        Self {
            calls: HashMap::new(),
        }
    }

    /// Register a new in-flight call
    ///
    /// Returns a receiver that settles when the response arrives.
    pub fn register(&mut self, id: RequestId) -> oneshot::Receiver<Value> {
        // ---
        let (tx, rx) = oneshot::channel();
        self.calls.insert(id, tx);
        rx
    }

    /// Settle an in-flight call with the remote result
    ///
    /// Returns true if the id was found and the result was delivered.
    pub fn complete(&mut self, id: RequestId, result: Value) -> bool {
        // ---
        if let Some(tx) = self.calls.remove(&id) {
            // Send result (ignore if receiver dropped due to timeout)
            let _ = tx.send(result);
            true
        } else {
            false
        }
    }

    /// Remove an in-flight call without delivering a result
    ///
    /// Used for timeout and send-failure cleanup.
    pub fn remove(&mut self, id: RequestId) -> bool {
        // ---
        self.calls.remove(&id).is_some()
    }

    /// Get the number of in-flight calls
    pub fn len(&self) -> usize {
        // ---
        self.calls.len()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_complete() {
        // ---
        let mut pending = PendingCalls::new();
        let id = RequestId::from(1);

        let rx = pending.register(id);
        assert_eq!(pending.len(), 1);

        assert!(pending.complete(id, json!("done")));

        // Should be removed after settlement
        assert_eq!(pending.len(), 0);

        // Receiver should get the result
        let received = rx.blocking_recv().unwrap();
        assert_eq!(received, json!("done"));
    }

    #[test]
    fn test_remove() {
        // ---
        let mut pending = PendingCalls::new();
        let id = RequestId::from(2);

        let _rx = pending.register(id);
        assert_eq!(pending.len(), 1);

        assert!(pending.remove(id));
        assert_eq!(pending.len(), 0);

        // Second remove should return false
        assert!(!pending.remove(id));
    }

    #[test]
    fn test_complete_unknown_id() {
        // ---
        let mut pending = PendingCalls::new();

        assert!(!pending.complete(RequestId::from(9), json!(null)));
    }

    #[test]
    fn test_settlement_is_exclusive() {
        // ---
        let mut pending = PendingCalls::new();
        let id = RequestId::from(3);

        let _rx = pending.register(id);

        // Timer fired first; a late response must find nothing.
        assert!(pending.remove(id));
        assert!(!pending.complete(id, json!("late")));
    }
}
