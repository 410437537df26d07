//! Procura Core - Shared domain types.
//!
//! This crate provides the types used across all Procura components:
//! - `server` - JSON API for baskets, orders, catalog and contacts
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. The order state machine lives here as a transition table
//! so that every consumer agrees on which edges exist.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, validated values, order states, money and events

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
