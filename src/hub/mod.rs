//! Subscriber broadcast hub.
//!
//! Registry of live outbound connections. Membership changes and the
//! snapshot for a broadcast happen under one mutex; actual delivery happens
//! outside it, so a slow or dead subscriber can never serialize joins,
//! leaves, or deliveries to everyone else.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

/// Opaque handle identifying one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Thread-safe fan-out registry.
///
/// Each subscriber is an unbounded sender feeding that connection's writer
/// task, so `broadcast` never blocks and is callable from decode worker
/// threads as well as async tasks.
#[derive(Debug)]
pub struct BroadcastHub<M> {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<M>>>,
    next_id: AtomicU64,
}

impl<M: Clone> BroadcastHub<M> {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscriber and returns its handle.
    pub fn join(&self, sender: mpsc::UnboundedSender<M>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, sender);
        id
    }

    /// Removes a subscriber. Safe to call twice for the same handle.
    pub fn leave(&self, id: SubscriberId) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Whether at least one subscriber is registered.
    pub fn is_any_connected(&self) -> bool {
        !self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Delivers a message to every currently registered subscriber.
    ///
    /// Takes a snapshot of the subscriber set under the lock, then delivers
    /// outside it. A failed delivery (subscriber gone mid-broadcast) is
    /// logged and skipped; it neither aborts delivery to the rest nor
    /// removes the subscriber — removal only happens via the connection
    /// handler's own `leave` on disconnect.
    ///
    /// Returns the number of successful deliveries.
    pub fn broadcast(&self, message: M) -> usize {
        let snapshot: Vec<(SubscriberId, mpsc::UnboundedSender<M>)> = {
            let guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            guard.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut delivered = 0;
        for (id, tx) in snapshot {
            match tx.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!(subscriber = id.0, "dropping broadcast to dead subscriber"),
            }
        }
        delivered
    }
}

impl<M: Clone> Default for BroadcastHub<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_leave_track_membership() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        assert!(!hub.is_any_connected());

        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.join(tx);
        assert!(hub.is_any_connected());
        assert_eq!(hub.subscriber_count(), 1);

        hub.leave(id);
        assert!(!hub.is_any_connected());

        // Double-leave is a no-op
        hub.leave(id);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_broadcast_reaches_all_subscribers() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = mpsc::unbounded_channel();
            hub.join(tx);
            receivers.push(rx);
        }

        let delivered = hub.broadcast("update".to_string());
        assert_eq!(delivered, 5);

        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), "update");
        }
    }

    #[test]
    fn test_broadcast_with_no_subscribers() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        assert_eq!(hub.broadcast("lost".to_string()), 0);
    }

    #[test]
    fn test_dead_subscriber_does_not_block_the_rest() {
        let hub: BroadcastHub<String> = BroadcastHub::new();

        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let dead_id = hub.join(tx_dead);
        drop(rx_dead); // subscriber disconnects mid-broadcast

        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        hub.join(tx_live);

        let delivered = hub.broadcast("still here".to_string());
        assert_eq!(delivered, 1);
        assert_eq!(rx_live.try_recv().unwrap(), "still here");

        // Failed delivery must not evict the subscriber from the live set
        assert_eq!(hub.subscriber_count(), 2);
        hub.leave(dead_id);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_broadcast_from_worker_thread() {
        use std::sync::Arc;
        use std::thread;

        let hub: Arc<BroadcastHub<u32>> = Arc::new(BroadcastHub::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.join(tx);

        let handle = {
            let hub = Arc::clone(&hub);
            thread::spawn(move || hub.broadcast(7))
        };
        assert_eq!(handle.join().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_ids_are_unique() {
        let hub: BroadcastHub<()> = BroadcastHub::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        assert_ne!(hub.join(tx1), hub.join(tx2));
    }
}
