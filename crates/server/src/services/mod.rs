//! Business logic between the routes and the store.
//!
//! Services borrow what they need from [`crate::state::AppState`] for the
//! duration of one request; none of them hold state of their own except the
//! LMS content cache.

pub mod auth;
pub mod builder;
pub mod email;
pub mod lms;
pub mod orders;
pub mod prompt;
