//! Domain models for the procurement API.
//!
//! Row types derive `sqlx::FromRow` and are also the JSON shapes returned by
//! the routes; request payloads and their validation live next to the routes
//! and services that accept them.

pub mod catalog;
pub mod contact;
pub mod order;
pub mod user;

pub use catalog::{Category, ProductInfoFilter, ProductInfoView, ProductParameterView, Shop};
pub use contact::{Contact, ContactInput, NewContact};
pub use order::{Order, OrderItemView, OrderSummary};
pub use user::{NewUser, ProfileUpdate, User};
