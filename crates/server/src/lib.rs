//! Booster Server - checkout, payment verification and the tiered LMS.
//!
//! The binary in `main.rs` wires configuration, Postgres and SMTP into the
//! router built by [`app::router`]. The library is public so the integration
//! tests can run the same router against the in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
