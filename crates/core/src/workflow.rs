//! Order verification and fulfillment transitions.
//!
//! | from \ event | `VerifyPayment` | `Complete` | `Fail` |
//! |---|---|---|---|
//! | pending | paid | error | failed |
//! | paid | unchanged | completed | error |
//! | completed | unchanged | completed (path overwritten) | error |
//! | failed | error | error | unchanged |
//!
//! Storage backends call [`OrderStatus::apply`] under their row lock and
//! persist the result; the table is the single source of truth for which
//! moves are legal.

use crate::types::OrderStatus;

/// An administrator action against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// Payment was confirmed.
    VerifyPayment,
    /// The purchased template was delivered.
    Complete,
    /// The order was rejected before payment.
    Fail,
}

impl OrderEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VerifyPayment => "verify payment",
            Self::Complete => "complete",
            Self::Fail => "fail",
        }
    }
}

/// Outcome of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status moves to a new value that must be written.
    Applied(OrderStatus),
    /// The event was already applied; nothing changes.
    Unchanged,
}

impl Transition {
    /// Status after the transition, given the status before it.
    #[must_use]
    pub const fn resulting(self, from: OrderStatus) -> OrderStatus {
        match self {
            Self::Applied(to) => to,
            Self::Unchanged => from,
        }
    }
}

/// The event is not legal from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} an order that is {from}", .event.as_str())]
pub struct TransitionError {
    pub from: OrderStatus,
    pub event: OrderEvent,
}

impl OrderStatus {
    /// Apply `event` to this status.
    ///
    /// Completing an already-completed order is reported as `Applied` so the
    /// caller rewrites the template path.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the table has no edge for the pair.
    pub const fn apply(self, event: OrderEvent) -> Result<Transition, TransitionError> {
        use OrderEvent::{Complete, Fail, VerifyPayment};
        use OrderStatus::{Completed, Failed, Paid, Pending};

        match (self, event) {
            (Pending, VerifyPayment) => Ok(Transition::Applied(Paid)),
            (Pending, Fail) => Ok(Transition::Applied(Failed)),
            (Paid | Completed, VerifyPayment) | (Failed, Fail) => Ok(Transition::Unchanged),
            (Paid | Completed, Complete) => Ok(Transition::Applied(Completed)),
            (Pending, Complete) | (Paid | Completed, Fail) | (Failed, VerifyPayment | Complete) => {
                Err(TransitionError { from: self, event })
            }
        }
    }
}
