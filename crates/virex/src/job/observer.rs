//! Job transition observers.
//!
//! The runner calls [`JobObserver::on_transition`] synchronously on every
//! transition. Hosts adapt it to their own execution context, typically by
//! forwarding into a channel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use super::model::JobSnapshot;

pub trait JobObserver: Send + Sync {
    fn on_transition(&self, snapshot: &JobSnapshot);
}

impl<T: JobObserver + ?Sized> JobObserver for Arc<T> {
    fn on_transition(&self, snapshot: &JobSnapshot) {
        (**self).on_transition(snapshot);
    }
}

/// Discards every notification.
pub struct NoopObserver;

impl JobObserver for NoopObserver {
    fn on_transition(&self, _snapshot: &JobSnapshot) {}
}

/// Fans snapshots out to any number of subscribers.
#[derive(Clone)]
pub struct BroadcastObserver {
    sender: Arc<broadcast::Sender<JobSnapshot>>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobSnapshot> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(100)
    }
}

impl JobObserver for BroadcastObserver {
    fn on_transition(&self, snapshot: &JobSnapshot) {
        // No active receivers is fine.
        let _ = self.sender.send(snapshot.clone());
    }
}

/// Forwards snapshots to a single consumer without dropping any.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<JobSnapshot>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobSnapshot>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl JobObserver for ChannelObserver {
    fn on_transition(&self, snapshot: &JobSnapshot) {
        let _ = self.sender.send(snapshot.clone());
    }
}
