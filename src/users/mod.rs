//! Profiles and user administration.

mod service;

pub use service::UserService;
