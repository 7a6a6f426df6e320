//! Booster Core - Domain types and rules.
//!
//! This crate provides the types and pure decision logic shared by all Booster
//! components:
//! - `server` - HTTP API for checkout, admin verification and the LMS
//! - `cli` - Command-line tools for migrations, admin accounts and seed content
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The order state machine and the content access
//! evaluator live here so every storage backend applies the same rules.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, package tiers, roles and statuses
//! - [`content`] - The module/chapter/lesson tree and learner progress
//! - [`workflow`] - Order transition table
//! - [`access`] - Lesson visibility and chapter status evaluation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod content;
pub mod types;
pub mod workflow;

pub use access::{ChapterStatus, Viewer, chapter_progress, chapter_status, has_access};
pub use content::{Chapter, Lesson, Module, UserProgress, assemble_tree};
pub use types::*;
pub use workflow::{OrderEvent, Transition, TransitionError};
