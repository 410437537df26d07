//! Outbound order event queue.
//!
//! The order service enqueues one [`OrderEvent`] after each committed
//! transition. Enqueueing never blocks and never fails the request: a full or
//! closed queue is logged and the event dropped. The dispatcher drains the
//! queue on a background task; delivery backends (email, webhooks) plug in
//! there.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use procura_core::{OrderEvent, OrderEventRedacted};

/// Sending half of the order event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<OrderEvent>,
}

/// Receiving half of the order event queue.
#[derive(Debug)]
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<OrderEvent>,
}

impl NotificationQueue {
    /// Create a bounded queue and its dispatcher.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, NotificationDispatcher) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, NotificationDispatcher { rx })
    }

    /// Enqueue an event without waiting. Returns whether it was accepted.
    pub fn enqueue(&self, event: OrderEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    order_id = %event.order_id,
                    transition = %event.transition,
                    "Notification queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    order_id = %event.order_id,
                    transition = %event.transition,
                    "Notification queue closed, dropping event"
                );
                false
            }
        }
    }
}

impl NotificationDispatcher {
    /// Receive the next event, or `None` once every queue handle is dropped.
    pub async fn recv(&mut self) -> Option<OrderEvent> {
        self.rx.recv().await
    }

    /// Drain the queue until all senders are gone.
    pub async fn run(mut self) {
        tracing::info!("Notification dispatcher started");
        while let Some(event) = self.recv().await {
            dispatch(&event);
        }
        tracing::info!("Notification dispatcher stopped");
    }
}

fn dispatch(event: &OrderEvent) {
    tracing::info!(
        order_id = %event.order_id,
        user_id = %event.user_id,
        from = %event.transition.from(),
        to = %event.state,
        transition = %event.transition,
        "Order event"
    );
    tracing::debug!(event = ?OrderEventRedacted(event), "Order event payload");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use procura_core::{OrderId, OrderState, Transition, UserId};

    use super::*;

    fn event(order_id: i32) -> OrderEvent {
        OrderEvent::new(OrderId::new(order_id), UserId::new(1), Transition::Checkout)
    }

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let (queue, mut dispatcher) = NotificationQueue::channel(4);
        assert!(queue.enqueue(event(1)));
        assert!(queue.enqueue(event(2)));

        assert_eq!(dispatcher.recv().await.unwrap().order_id, OrderId::new(1));
        let second = dispatcher.recv().await.unwrap();
        assert_eq!(second.order_id, OrderId::new(2));
        assert_eq!(second.state, OrderState::New);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (queue, mut dispatcher) = NotificationQueue::channel(1);
        assert!(queue.enqueue(event(1)));
        assert!(!queue.enqueue(event(2)));

        assert_eq!(dispatcher.recv().await.unwrap().order_id, OrderId::new(1));
        assert!(queue.enqueue(event(3)));
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let (queue, dispatcher) = NotificationQueue::channel(1);
        drop(dispatcher);
        assert!(!queue.enqueue(event(1)));
    }

    #[tokio::test]
    async fn test_dispatcher_exits_when_senders_dropped() {
        let (queue, dispatcher) = NotificationQueue::channel(2);
        let handle = tokio::spawn(dispatcher.run());
        assert!(queue.enqueue(event(1)));
        drop(queue);
        handle.await.unwrap();
    }
}
