//! Authentication and authorization
//!
//! - Email/password accounts hashed with bcrypt
//! - JWT access token generation and validation
//! - The role-based policy gate consulted by every mutating service call

mod jwt;
mod password;
pub mod policy;
mod service;

pub use jwt::{generate_access_token, verify_token, Claims, JwtError};
pub use password::{hash_password, verify_password};
pub use policy::{authorize, can, ensure_owner, Action, Actor, Resource};
pub use service::AuthService;
