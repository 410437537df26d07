//! Core types for Procura.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod event;
pub mod id;
pub mod money;
pub mod phone;
pub mod quantity;
pub mod state;

pub use email::{Email, EmailError};
pub use event::{OrderEvent, OrderEventRedacted};
pub use id::*;
pub use money::{line_total, total_sum};
pub use phone::{Phone, PhoneError};
pub use quantity::{Quantity, QuantityError};
pub use state::*;
