//! Outbound order events.
//!
//! The state machine emits one [`OrderEvent`] per committed transition. Events
//! are plain records: whatever consumes them (email, webhooks) lives outside
//! this workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, UserId};
use super::state::{OrderState, Transition};

/// A committed order state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Order that changed.
    pub order_id: OrderId,
    /// Owner of the order (the recipient of any notification).
    pub user_id: UserId,
    /// Edge that was taken.
    pub transition: Transition,
    /// State after the change.
    pub state: OrderState,
    /// Token the buyer needs to confirm the order (checkout events only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
    /// Commit time.
    pub at: DateTime<Utc>,
}

impl OrderEvent {
    /// Build an event for a committed transition.
    #[must_use]
    pub fn new(order_id: OrderId, user_id: UserId, transition: Transition) -> Self {
        Self {
            order_id,
            user_id,
            transition,
            state: transition.to(),
            confirmation_token: None,
            at: Utc::now(),
        }
    }

    /// Attach the confirmation token delivered with a checkout event.
    #[must_use]
    pub fn with_confirmation_token(mut self, token: String) -> Self {
        self.confirmation_token = Some(token);
        self
    }
}

impl std::fmt::Debug for OrderEventRedacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEvent")
            .field("order_id", &self.0.order_id)
            .field("user_id", &self.0.user_id)
            .field("transition", &self.0.transition)
            .field("state", &self.0.state)
            .field(
                "confirmation_token",
                &self.0.confirmation_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("at", &self.0.at)
            .finish()
    }
}

/// Debug view of an [`OrderEvent`] that hides the confirmation token.
pub struct OrderEventRedacted<'a>(pub &'a OrderEvent);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_follows_transition() {
        let event = OrderEvent::new(OrderId::new(1), UserId::new(2), Transition::Ship);
        assert_eq!(event.state, OrderState::Sent);
        assert!(event.confirmation_token.is_none());
    }

    #[test]
    fn test_redacted_debug_hides_token() {
        let event = OrderEvent::new(OrderId::new(1), UserId::new(2), Transition::Checkout)
            .with_confirmation_token("deadbeef".to_owned());
        let out = format!("{:?}", OrderEventRedacted(&event));
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("deadbeef"));
    }
}
