//! Persistence for accounts, orders, LMS content and prompt-builder jobs.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL`, the production backend
//! - [`MemoryStore`] - in-process tables behind one mutex, used by tests
//!
//! Both implement [`Store`]. Every multi-row write (`checkout`,
//! `verify_payment`) is a single method so the backend can make it atomic:
//! `PgStore` runs it in one transaction with the order row locked, and
//! `MemoryStore` holds its table lock for the whole call. Order transitions
//! are decided by [`booster_core::OrderStatus::apply`] in both.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p booster-cli -- migrate
//! ```

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use booster_core::{
    AccountId, BuildJobId, ChapterId, Email, Lesson, LessonId, Module, ModuleId, OrderId,
    TransitionError, UserProgress,
};

use crate::models::build_job::JobAlreadyResolved;
use crate::models::{
    Account, BuildJob, BuildJobResolution, Checkout, LessonPatch, NewAccount, NewChapter,
    NewLesson, NewModule, Order, OrderQueue, OrderWithAccount, PaymentVerified,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be turned back into domain types.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The order cannot take this transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The request references records that do not fit together.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<JobAlreadyResolved> for StoreError {
    fn from(err: JobAlreadyResolved) -> Self {
        Self::Conflict(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable state of the application.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    /// Insert an account. `Conflict` if the email is taken.
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Account plus its credential hash, for sign-in.
    async fn get_credentials(&self, email: &Email) -> StoreResult<Option<(Account, String)>>;

    // ---------------------------------------------------------------------
    // Orders
    // ---------------------------------------------------------------------

    /// Upsert the buyer by email and insert a pending order, atomically.
    ///
    /// An existing account keeps its id, role and flags; its name, phone and
    /// credential are overwritten. Its tier is overwritten only while it has
    /// not paid, so a paid account keeps its access until the new order is
    /// verified.
    async fn checkout(&self, checkout: Checkout) -> StoreResult<Order>;

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Orders of one account, newest first.
    async fn list_orders_by_account(&self, account_id: AccountId) -> StoreResult<Vec<Order>>;

    /// Admin queue joined with the owning account, newest first.
    async fn list_order_queue(&self, queue: OrderQueue) -> StoreResult<Vec<OrderWithAccount>>;

    /// Mark the account paid and verified, grant the order's package tier
    /// and move the order to `paid`.
    ///
    /// `NotFound` if either record is missing, `InvalidInput` if the order
    /// belongs to another account.
    async fn verify_payment(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> StoreResult<PaymentVerified>;

    /// Move a paid order to `completed` and record the delivered template.
    async fn complete_order(&self, order_id: OrderId, template_path: &str) -> StoreResult<Order>;

    /// Reject an unpaid order.
    async fn fail_order(&self, order_id: OrderId) -> StoreResult<Order>;

    // ---------------------------------------------------------------------
    // LMS content
    // ---------------------------------------------------------------------

    /// All modules with their chapters and lessons, ordered by `order_index`.
    async fn content_tree(&self) -> StoreResult<Vec<Module>>;

    async fn create_module(&self, module: NewModule) -> StoreResult<ModuleId>;

    /// `NotFound` if the module does not exist.
    async fn create_chapter(&self, chapter: NewChapter) -> StoreResult<ChapterId>;

    /// `NotFound` if the chapter does not exist.
    async fn create_lesson(&self, lesson: NewLesson) -> StoreResult<LessonId>;

    async fn get_lesson(&self, id: LessonId) -> StoreResult<Option<Lesson>>;

    /// `NotFound` if the lesson does not exist.
    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> StoreResult<Lesson>;

    // ---------------------------------------------------------------------
    // Progress
    // ---------------------------------------------------------------------

    async fn list_progress(&self, account_id: AccountId) -> StoreResult<Vec<UserProgress>>;

    /// Create or update the (account, lesson) progress record.
    async fn record_progress(
        &self,
        account_id: AccountId,
        lesson_id: LessonId,
        completed: bool,
    ) -> StoreResult<UserProgress>;

    // ---------------------------------------------------------------------
    // Prompt-builder jobs
    // ---------------------------------------------------------------------

    async fn insert_build_job(&self, job: &BuildJob) -> StoreResult<()>;

    async fn get_build_job(&self, id: BuildJobId) -> StoreResult<Option<BuildJob>>;

    /// Apply an operator outcome to a job. `NotFound` if absent.
    async fn resolve_build_job(
        &self,
        id: BuildJobId,
        resolution: BuildJobResolution,
    ) -> StoreResult<BuildJob>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(format!("{what} already exists"));
    }
    StoreError::Database(err)
}
