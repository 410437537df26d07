//! Order states, the transition table, and account types.
//!
//! ```text
//! basket ──checkout──▶ new ──confirm──▶ confirmed ──assemble──▶ assembled
//!                       │                                          │
//!                     cancel                                      ship
//!                       ▼                                          ▼
//!                   canceled                 delivered ◀──deliver── sent
//! ```
//!
//! The table is the single source of truth for which `(from, to)` pairs are
//! legal. Storage enforces the *current* state with a compare-and-swap; this
//! module only answers whether an edge exists.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_state", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    /// Mutable pre-checkout state; at most one per user.
    Basket,
    /// Checked out, awaiting the buyer's confirmation.
    New,
    /// Confirmed by the buyer.
    Confirmed,
    /// Picked and packed.
    Assembled,
    /// Handed to the carrier.
    Sent,
    /// Terminal: received by the buyer.
    Delivered,
    /// Terminal: canceled before confirmation.
    Canceled,
}

impl OrderState {
    /// All states in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Basket,
        Self::New,
        Self::Confirmed,
        Self::Assembled,
        Self::Sent,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Lowercase wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basket => "basket",
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::Assembled => "assembled",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    /// Whether no transition leaves this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }

    /// Look up the transition that moves an order from `self` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the table has no such edge.
    pub fn transition_to(self, to: Self) -> Result<Transition, TransitionError> {
        Transition::ALL
            .into_iter()
            .find(|t| t.from() == self && t.to() == to)
            .ok_or(TransitionError { from: self, to })
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("invalid order state: {s}"))
    }
}

/// A named edge of the order state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// `basket -> new`; binds a contact and freezes the item set.
    Checkout,
    /// `new -> confirmed`; requires the emailed confirmation token.
    Confirm,
    /// `confirmed -> assembled`.
    Assemble,
    /// `assembled -> sent`.
    Ship,
    /// `sent -> delivered`.
    Deliver,
    /// `new -> canceled`.
    Cancel,
}

impl Transition {
    /// Every edge of the state machine.
    pub const ALL: [Self; 6] = [
        Self::Checkout,
        Self::Confirm,
        Self::Assemble,
        Self::Ship,
        Self::Deliver,
        Self::Cancel,
    ];

    /// State the order must be in for this transition to apply.
    #[must_use]
    pub const fn from(self) -> OrderState {
        match self {
            Self::Checkout => OrderState::Basket,
            Self::Confirm | Self::Cancel => OrderState::New,
            Self::Assemble => OrderState::Confirmed,
            Self::Ship => OrderState::Assembled,
            Self::Deliver => OrderState::Sent,
        }
    }

    /// State the order ends up in.
    #[must_use]
    pub const fn to(self) -> OrderState {
        match self {
            Self::Checkout => OrderState::New,
            Self::Confirm => OrderState::Confirmed,
            Self::Assemble => OrderState::Assembled,
            Self::Ship => OrderState::Sent,
            Self::Deliver => OrderState::Delivered,
            Self::Cancel => OrderState::Canceled,
        }
    }

    /// Verb used in API paths and log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Confirm => "confirm",
            Self::Assemble => "assemble",
            Self::Ship => "send",
            Self::Deliver => "deliver",
            Self::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(from, to)` pair that is not an edge of the state machine.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no transition from {from} to {to}")]
pub struct TransitionError {
    /// Requested source state.
    pub from: OrderState,
    /// Requested target state.
    pub to: OrderState,
}

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Places orders.
    #[default]
    Buyer,
    /// Owns a shop and sees orders for its product infos.
    Shop,
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Shop => write!(f, "shop"),
        }
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "shop" => Ok(Self::Shop),
            _ => Err(format!("invalid user type: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_edges() {
        use OrderState::{Assembled, Basket, Canceled, Confirmed, Delivered, New, Sent};

        assert_eq!(Basket.transition_to(New), Ok(Transition::Checkout));
        assert_eq!(New.transition_to(Confirmed), Ok(Transition::Confirm));
        assert_eq!(Confirmed.transition_to(Assembled), Ok(Transition::Assemble));
        assert_eq!(Assembled.transition_to(Sent), Ok(Transition::Ship));
        assert_eq!(Sent.transition_to(Delivered), Ok(Transition::Deliver));
        assert_eq!(New.transition_to(Canceled), Ok(Transition::Cancel));
    }

    #[test]
    fn test_exactly_six_edges_exist() {
        let mut count = 0;
        for from in OrderState::ALL {
            for to in OrderState::ALL {
                if from.transition_to(to).is_ok() {
                    count += 1;
                }
            }
        }
        assert_eq!(count, Transition::ALL.len());
    }

    #[test]
    fn test_no_backwards_or_skipping_edges() {
        assert!(OrderState::Sent.transition_to(OrderState::Assembled).is_err());
        assert!(OrderState::New.transition_to(OrderState::Sent).is_err());
        assert!(OrderState::Confirmed.transition_to(OrderState::Canceled).is_err());
        assert!(OrderState::Basket.transition_to(OrderState::Canceled).is_err());
        assert!(OrderState::New.transition_to(OrderState::New).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for terminal in OrderState::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderState::ALL {
                assert!(terminal.transition_to(to).is_err());
            }
        }
    }

    #[test]
    fn test_state_string_roundtrip() {
        for state in OrderState::ALL {
            assert_eq!(state.as_str().parse::<OrderState>().unwrap(), state);
            assert_eq!(
                serde_json::to_string(&state).unwrap(),
                format!("\"{}\"", state.as_str())
            );
        }
        assert!("shipped".parse::<OrderState>().is_err());
    }

    #[test]
    fn test_transition_error_message() {
        let err = OrderState::Sent
            .transition_to(OrderState::Assembled)
            .unwrap_err();
        assert_eq!(err.to_string(), "no transition from sent to assembled");
    }

    #[test]
    fn test_user_type_parse() {
        assert_eq!("shop".parse::<UserType>().unwrap(), UserType::Shop);
        assert_eq!(UserType::default(), UserType::Buyer);
        assert!("admin".parse::<UserType>().is_err());
    }
}
