//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, outermost)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (read or generate `x-request-id`)
//!
//! Authentication is an extractor rather than a layer: handlers that take
//! [`RequireUser`] reject requests without a valid `Authorization: Token`.

pub mod auth;
pub mod request_id;

pub use auth::RequireUser;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
