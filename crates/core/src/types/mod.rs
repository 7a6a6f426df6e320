//! Core types for Booster.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod role;
pub mod status;
pub mod tier;

pub use email::{Email, EmailError};
pub use id::*;
pub use role::{AccountStatus, Role};
pub use status::{BuildJobStatus, OrderStatus, StatusParseError};
pub use tier::{PackageTier, RequiredPackages, TierError};
