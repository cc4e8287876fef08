//! Game Rental Backend Library
//!
//! Core modules for the game rental marketplace server: catalog and stock,
//! bookings, payments, moderation and the HTTP surface over them.

pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod inventory;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod notify;
pub mod payment;
pub mod routes;
pub mod state;
pub mod store;
pub mod users;
