use tokio::sync::broadcast;
use tracing::trace;

use serialscope_types::{ConnectionStatus, LineEvent};

/// Default per-subscriber queue depth
pub const DEFAULT_FANOUT_CAPACITY: usize = 1024;

/// Status notification tagged with the connection it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEvent {
    pub connection_id: u64,
    pub address: String,
    pub status: ConnectionStatus,
}

/// Outcome of waiting on a subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery<T> {
    Item(T),
    /// The subscriber fell behind and this many events were dropped for it
    Lagged(u64),
    Closed,
}

/// Publish/subscribe hub for viewers
///
/// Every subscriber gets its own bounded queue. Publishing never waits: a
/// subscriber that falls behind loses its oldest events and is told how many
/// through [`Delivery::Lagged`].
#[derive(Clone)]
pub struct FanoutHub {
    lines: broadcast::Sender<LineEvent>,
    status: broadcast::Sender<StatusEvent>,
}

impl FanoutHub {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (lines, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self { lines, status }
    }

    /// Push a line to every current subscriber
    pub fn publish(&self, event: LineEvent) {
        // No subscribers is not an error
        if let Ok(receivers) = self.lines.send(event) {
            trace!(receivers, "line published");
        }
    }

    pub fn publish_status(&self, event: StatusEvent) {
        let _ = self.status.send(event);
    }

    pub fn subscribe_lines(&self) -> Subscription<LineEvent> {
        Subscription {
            receiver: self.lines.subscribe(),
        }
    }

    pub fn subscribe_status(&self) -> Subscription<StatusEvent> {
        Subscription {
            receiver: self.status.subscribe(),
        }
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(DEFAULT_FANOUT_CAPACITY)
    }
}

/// One viewer's receiving end
pub struct Subscription<T> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Delivery<T> {
        match self.receiver.recv().await {
            Ok(item) => Delivery::Item(item),
            Err(broadcast::error::RecvError::Lagged(n)) => Delivery::Lagged(n),
            Err(broadcast::error::RecvError::Closed) => Delivery::Closed,
        }
    }

    /// Take the next event if one is queued
    pub fn try_recv(&mut self) -> Option<Delivery<T>> {
        match self.receiver.try_recv() {
            Ok(item) => Some(Delivery::Item(item)),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(Delivery::Lagged(n)),
            Err(broadcast::error::TryRecvError::Closed) => Some(Delivery::Closed),
            Err(broadcast::error::TryRecvError::Empty) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(sequence: u64) -> LineEvent {
        LineEvent {
            sequence,
            timestamp: Utc::now(),
            text: format!("line {}", sequence),
        }
    }

    #[tokio::test]
    async fn test_all_subscribers_see_same_order() {
        let hub = FanoutHub::new(16);
        let mut a = hub.subscribe_lines();
        let mut b = hub.subscribe_lines();

        for seq in 0..5 {
            hub.publish(event(seq));
        }

        for sub in [&mut a, &mut b] {
            for seq in 0..5 {
                match sub.recv().await {
                    Delivery::Item(e) => assert_eq!(e.sequence, seq),
                    other => panic!("unexpected {:?}", other),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_told_it_lagged() {
        let hub = FanoutHub::new(4);
        let mut slow = hub.subscribe_lines();
        let mut fast = hub.subscribe_lines();

        for seq in 0..10 {
            hub.publish(event(seq));
            if let Some(Delivery::Item(e)) = fast.try_recv() {
                assert_eq!(e.sequence, seq);
            }
        }

        assert_eq!(slow.recv().await, Delivery::Lagged(6));
        match slow.recv().await {
            Delivery::Item(e) => assert_eq!(e.sequence, 6),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = FanoutHub::default();
        hub.publish(event(0));

        // Late subscribers only see what follows
        let mut late = hub.subscribe_lines();
        assert!(late.try_recv().is_none());
        hub.publish(event(1));
        match late.try_recv() {
            Some(Delivery::Item(e)) => assert_eq!(e.sequence, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_when_hub_dropped() {
        let hub = FanoutHub::new(2);
        let mut sub = hub.subscribe_status();
        drop(hub);
        assert_eq!(sub.recv().await, Delivery::Closed);
    }
}
