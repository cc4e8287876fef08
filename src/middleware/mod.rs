//! Middleware for the rental marketplace API
//!
//! Request tracing and authentication extractors.

pub mod auth;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, PartnerUser};
pub use tracing::{request_tracing, REQUEST_ID_HEADER};
