//! Souq REST backend
//!
//! The service binary wires the shared document store, the auth/session
//! lifecycle, the generic resource CRUD façade and the order/checkout
//! workflow into one axum application.

pub mod auth;
pub mod config;
pub mod crud;
pub mod email;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod orders;
pub mod payment;
pub mod repositories;
pub mod routes;
pub mod security;
pub mod state;
pub mod validation;

pub use state::AppState;
