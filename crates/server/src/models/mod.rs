//! Domain models for the server.
//!
//! These are the records the store hands out. Row types that only exist to
//! decode Postgres results live next to the queries in `db::postgres`.

pub mod account;
pub mod build_job;
pub mod lms;
pub mod order;
pub mod session;

pub use account::{Account, AccountSummary, NewAccount};
pub use build_job::{BuildJob, BuildJobResolution};
pub use lms::{LessonPatch, NewChapter, NewLesson, NewModule};
pub use order::{Checkout, Order, OrderQueue, OrderWithAccount, PaymentVerified};
pub use session::CurrentAccount;
