//! Status enums for orders and prompt-builder jobs.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct StatusParseError(pub String);

/// Order lifecycle status.
///
/// `pending → paid → completed`, with `failed` as a terminal branch from
/// `pending`. Older records may carry the literal `verified`, which is read as
/// [`OrderStatus::Paid`] and never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    #[serde(alias = "verified")]
    Paid,
    Completed,
    Failed,
}

impl OrderStatus {
    /// Payment has been confirmed (the "verified orders" view).
    #[must_use]
    pub const fn is_payment_confirmed(self) -> bool {
        matches!(self, Self::Paid | Self::Completed)
    }

    /// Position along the forward path; `Failed` sits beside `Paid`.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Paid | Self::Failed => 1,
            Self::Completed => 2,
        }
    }

    /// Wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" | "verified" => Ok(Self::Paid),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(StatusParseError(s.to_owned())),
        }
    }
}

/// Status of an AI prompt-builder job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "build_job_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum BuildJobStatus {
    /// Prompt generated, site build handed to the operator.
    #[default]
    Processing,
    /// Operator delivered the generated site.
    Ready,
    /// Operator gave up on the build.
    Failed,
}

impl BuildJobStatus {
    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}
