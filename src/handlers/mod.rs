//! HTTP handlers for the rental marketplace API

pub mod auth;
pub mod booking;
pub mod catalog;
pub mod health;
pub mod moderation;
pub mod payment;
pub mod user;

// Re-export extractors for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, PartnerUser};
