//! `PostgreSQL` store.
//!
//! Queries use the runtime API (`sqlx::query_as` + `FromRow`) so the crate
//! builds without a live database. Multi-row writes take a transaction from
//! `pool.begin()` and lock the rows they read with `FOR UPDATE`; any early
//! return drops the transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use booster_core::{
    AccountId, BuildJobId, Chapter, ChapterId, Email, Lesson, LessonId, Module, ModuleId,
    OrderEvent, OrderId, PackageTier, RequiredPackages, Transition, UserProgress,
    assemble_tree,
};

use super::{StoreError, StoreResult, conflict_on_unique};
use crate::models::{
    Account, AccountSummary, BuildJob, BuildJobResolution, Checkout, LessonPatch, NewAccount,
    NewChapter, NewLesson, NewModule, Order, OrderQueue, OrderWithAccount, PaymentVerified,
};

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, is_verified, has_paid, access_tier, \
                               role, status, created_at";

const ORDER_COLUMNS: &str = "id, account_id, package_id, package_name, template_name, price, \
                             status, template_path, created_at";

const LESSON_COLUMNS: &str = "id, chapter_id, title, description, difficulty, content, \
                              duration_minutes, is_published, order_index, required_packages, \
                              video_url, materials_url";

const BUILD_JOB_COLUMNS: &str = "id, account_id, raw_prompt, professional_prompt, status, \
                                 result_url, failure_reason, estimated_duration_minutes, created_at";

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    account: Account,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    #[sqlx(flatten)]
    order: Order,
    owner_name: String,
    owner_email: Email,
    owner_phone: Option<String>,
    owner_is_verified: bool,
    owner_has_paid: bool,
}

impl From<QueueRow> for OrderWithAccount {
    fn from(row: QueueRow) -> Self {
        let user = AccountSummary {
            id: row.order.account_id,
            name: row.owner_name,
            email: row.owner_email,
            phone: row.owner_phone,
            is_verified: row.owner_is_verified,
            has_paid: row.owner_has_paid,
        };
        Self {
            order: row.order,
            user,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ModuleRow {
    id: ModuleId,
    title: String,
    description: Option<String>,
    is_published: bool,
    order_index: i32,
}

impl From<ModuleRow> for Module {
    fn from(row: ModuleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            is_published: row.is_published,
            order_index: row.order_index,
            chapters: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ChapterRow {
    id: ChapterId,
    module_id: ModuleId,
    title: String,
    description: Option<String>,
    is_published: bool,
    order_index: i32,
}

impl From<ChapterRow> for Chapter {
    fn from(row: ChapterRow) -> Self {
        Self {
            id: row.id,
            module_id: row.module_id,
            title: row.title,
            description: row.description,
            is_published: row.is_published,
            order_index: row.order_index,
            lessons: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct LessonRow {
    id: LessonId,
    chapter_id: ChapterId,
    title: String,
    description: Option<String>,
    difficulty: Option<String>,
    content: Option<String>,
    duration_minutes: Option<i32>,
    is_published: bool,
    order_index: i32,
    required_packages: Vec<PackageTier>,
    video_url: Option<String>,
    materials_url: Option<String>,
}

impl TryFrom<LessonRow> for Lesson {
    type Error = StoreError;

    fn try_from(row: LessonRow) -> Result<Self, Self::Error> {
        let required_packages = RequiredPackages::new(row.required_packages).map_err(|e| {
            StoreError::DataCorruption(format!("lesson {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            chapter_id: row.chapter_id,
            title: row.title,
            description: row.description,
            difficulty: row.difficulty,
            content: row.content,
            duration_minutes: row.duration_minutes,
            is_published: row.is_published,
            order_index: row.order_index,
            required_packages,
            video_url: row.video_url,
            materials_url: row.materials_url,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    account_id: AccountId,
    lesson_id: LessonId,
    completed: bool,
    updated_at: DateTime<Utc>,
}

impl From<ProgressRow> for UserProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            account_id: row.account_id,
            lesson_id: row.lesson_id,
            completed: row.completed,
            updated_at: row.updated_at,
        }
    }
}

fn missing_parent(err: sqlx::Error, what: String) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_foreign_key_violation()
    {
        return StoreError::NotFound(what);
    }
    StoreError::Database(err)
}

// =============================================================================
// Store
// =============================================================================

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn apply_order_event(
        &self,
        order_id: OrderId,
        event: OrderEvent,
        template_path: Option<&str>,
    ) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order: Order = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;

        let order = match order.status.apply(event)? {
            Transition::Unchanged => order,
            Transition::Applied(status) => {
                sqlx::query_as(&format!(
                    "UPDATE orders SET status = $2, template_path = COALESCE($3, template_path), \
                     updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
                ))
                .bind(order_id)
                .bind(status)
                .bind(template_path)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(order)
    }
}

#[async_trait]
impl super::Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        sqlx::query_as(&format!(
            "INSERT INTO accounts (id, name, email, phone, password_hash, access_tier, role, \
             status, is_verified, has_paid) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(AccountId::generate())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.access_tier)
        .bind(account.role)
        .bind(account.status)
        .bind(account.is_verified)
        .bind(account.has_paid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn get_credentials(&self, email: &Email) -> StoreResult<Option<(Account, String)>> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| (r.account, r.password_hash)))
    }

    #[instrument(skip(self, checkout), fields(email = %checkout.email, package = %checkout.package))]
    async fn checkout(&self, checkout: Checkout) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await?;

        let (account_id,): (AccountId,) = sqlx::query_as(
            "INSERT INTO accounts (id, name, email, phone, password_hash, access_tier) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (email) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 phone = EXCLUDED.phone, \
                 password_hash = EXCLUDED.password_hash, \
                 access_tier = CASE WHEN accounts.has_paid \
                     THEN accounts.access_tier ELSE EXCLUDED.access_tier END, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(AccountId::generate())
        .bind(&checkout.name)
        .bind(&checkout.email)
        .bind(&checkout.phone)
        .bind(&checkout.password_hash)
        .bind(checkout.package)
        .fetch_one(&mut *tx)
        .await?;

        let order: Order = sqlx::query_as(&format!(
            "INSERT INTO orders (id, account_id, package_id, package_name, template_name, price) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(OrderId::generate())
        .bind(account_id)
        .bind(checkout.package)
        .bind(&checkout.package_name)
        .bind(&checkout.template_name)
        .bind(&checkout.price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let order = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn list_orders_by_account(&self, account_id: AccountId) -> StoreResult<Vec<Order>> {
        let orders = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn list_order_queue(&self, queue: OrderQueue) -> StoreResult<Vec<OrderWithAccount>> {
        let rows: Vec<QueueRow> = sqlx::query_as(
            "SELECT o.id, o.account_id, o.package_id, o.package_name, o.template_name, o.price, \
                    o.status, o.template_path, o.created_at, \
                    a.name AS owner_name, a.email AS owner_email, a.phone AS owner_phone, \
                    a.is_verified AS owner_is_verified, a.has_paid AS owner_has_paid \
             FROM orders o \
             JOIN accounts a ON a.id = o.account_id \
             WHERE o.status = $1 \
             ORDER BY o.created_at DESC",
        )
        .bind(queue.status())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(account_id = %account_id, order_id = %order_id))]
    async fn verify_payment(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> StoreResult<PaymentVerified> {
        let mut tx = self.pool.begin().await?;

        let order: Order = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;

        let exists: Option<(AccountId,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("account {account_id}")));
        }

        if order.account_id != account_id {
            return Err(StoreError::InvalidInput(format!(
                "order {order_id} does not belong to account {account_id}"
            )));
        }

        let transition = order.status.apply(OrderEvent::VerifyPayment)?;

        let account: Account = sqlx::query_as(&format!(
            "UPDATE accounts SET is_verified = TRUE, has_paid = TRUE, status = 'active', \
             access_tier = $2, updated_at = NOW() WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(order.package_id)
        .fetch_one(&mut *tx)
        .await?;

        let (order, changed) = match transition {
            Transition::Unchanged => (order, false),
            Transition::Applied(status) => {
                let order = sqlx::query_as(&format!(
                    "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 \
                     RETURNING {ORDER_COLUMNS}"
                ))
                .bind(order_id)
                .bind(status)
                .fetch_one(&mut *tx)
                .await?;
                (order, true)
            }
        };

        tx.commit().await?;
        Ok(PaymentVerified {
            account,
            order,
            changed,
        })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn complete_order(&self, order_id: OrderId, template_path: &str) -> StoreResult<Order> {
        self.apply_order_event(order_id, OrderEvent::Complete, Some(template_path))
            .await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn fail_order(&self, order_id: OrderId) -> StoreResult<Order> {
        self.apply_order_event(order_id, OrderEvent::Fail, None).await
    }

    async fn content_tree(&self) -> StoreResult<Vec<Module>> {
        let modules: Vec<ModuleRow> = sqlx::query_as(
            "SELECT id, title, description, is_published, order_index FROM modules \
             ORDER BY order_index, created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        let chapters: Vec<ChapterRow> = sqlx::query_as(
            "SELECT id, module_id, title, description, is_published, order_index FROM chapters \
             ORDER BY order_index, created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        let lessons: Vec<LessonRow> = sqlx::query_as(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons ORDER BY order_index, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        let lessons = lessons
            .into_iter()
            .map(Lesson::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(assemble_tree(
            modules.into_iter().map(Into::into).collect(),
            chapters.into_iter().map(Into::into).collect(),
            lessons,
        ))
    }

    async fn create_module(&self, module: NewModule) -> StoreResult<ModuleId> {
        let id = ModuleId::generate();
        sqlx::query(
            "INSERT INTO modules (id, title, description, is_published, order_index) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.is_published)
        .bind(module.order_index)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_chapter(&self, chapter: NewChapter) -> StoreResult<ChapterId> {
        let id = ChapterId::generate();
        sqlx::query(
            "INSERT INTO chapters (id, module_id, title, description, is_published, order_index) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(chapter.module_id)
        .bind(&chapter.title)
        .bind(&chapter.description)
        .bind(chapter.is_published)
        .bind(chapter.order_index)
        .execute(&self.pool)
        .await
        .map_err(|e| missing_parent(e, format!("module {}", chapter.module_id)))?;
        Ok(id)
    }

    async fn create_lesson(&self, lesson: NewLesson) -> StoreResult<LessonId> {
        let id = LessonId::generate();
        sqlx::query(
            "INSERT INTO lessons (id, chapter_id, title, description, difficulty, content, \
             duration_minutes, is_published, order_index, required_packages, video_url, \
             materials_url) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(id)
        .bind(lesson.chapter_id)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.difficulty)
        .bind(&lesson.content)
        .bind(lesson.duration_minutes)
        .bind(lesson.is_published)
        .bind(lesson.order_index)
        .bind(lesson.required_packages.to_vec())
        .bind(&lesson.video_url)
        .bind(&lesson.materials_url)
        .execute(&self.pool)
        .await
        .map_err(|e| missing_parent(e, format!("chapter {}", lesson.chapter_id)))?;
        Ok(id)
    }

    async fn get_lesson(&self, id: LessonId) -> StoreResult<Option<Lesson>> {
        let row: Option<LessonRow> = sqlx::query_as(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Lesson::try_from).transpose()
    }

    #[instrument(skip(self, patch), fields(lesson_id = %id))]
    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> StoreResult<Lesson> {
        let mut tx = self.pool.begin().await?;

        let row: LessonRow = sqlx::query_as(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("lesson {id}")))?;

        let mut lesson = Lesson::try_from(row)?;
        patch.apply(&mut lesson);

        sqlx::query(
            "UPDATE lessons SET title = $2, description = $3, difficulty = $4, content = $5, \
             duration_minutes = $6, is_published = $7, order_index = $8, \
             required_packages = $9, video_url = $10, materials_url = $11, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.difficulty)
        .bind(&lesson.content)
        .bind(lesson.duration_minutes)
        .bind(lesson.is_published)
        .bind(lesson.order_index)
        .bind(lesson.required_packages.to_vec())
        .bind(&lesson.video_url)
        .bind(&lesson.materials_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(lesson)
    }

    async fn list_progress(&self, account_id: AccountId) -> StoreResult<Vec<UserProgress>> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            "SELECT account_id, lesson_id, completed, updated_at FROM user_progress \
             WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record_progress(
        &self,
        account_id: AccountId,
        lesson_id: LessonId,
        completed: bool,
    ) -> StoreResult<UserProgress> {
        let row: ProgressRow = sqlx::query_as(
            "INSERT INTO user_progress (account_id, lesson_id, completed) VALUES ($1, $2, $3) \
             ON CONFLICT (account_id, lesson_id) DO UPDATE SET \
                 completed = EXCLUDED.completed, updated_at = NOW() \
             RETURNING account_id, lesson_id, completed, updated_at",
        )
        .bind(account_id)
        .bind(lesson_id)
        .bind(completed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_parent(e, format!("lesson {lesson_id}")))?;
        Ok(row.into())
    }

    async fn insert_build_job(&self, job: &BuildJob) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO build_jobs (id, account_id, raw_prompt, professional_prompt, status, \
             result_url, failure_reason, estimated_duration_minutes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(job.id)
        .bind(job.account_id)
        .bind(&job.raw_prompt)
        .bind(&job.professional_prompt)
        .bind(job.status)
        .bind(&job.result_url)
        .bind(&job.failure_reason)
        .bind(job.estimated_duration_minutes)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_build_job(&self, id: BuildJobId) -> StoreResult<Option<BuildJob>> {
        let job = sqlx::query_as(&format!(
            "SELECT {BUILD_JOB_COLUMNS} FROM build_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    #[instrument(skip(self, resolution), fields(job_id = %id))]
    async fn resolve_build_job(
        &self,
        id: BuildJobId,
        resolution: BuildJobResolution,
    ) -> StoreResult<BuildJob> {
        let mut tx = self.pool.begin().await?;

        let job: BuildJob = sqlx::query_as(&format!(
            "SELECT {BUILD_JOB_COLUMNS} FROM build_jobs WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("build job {id}")))?;

        let Some(resolved) = job.resolve(&resolution)? else {
            return Ok(job);
        };

        sqlx::query(
            "UPDATE build_jobs SET status = $2, result_url = $3, failure_reason = $4, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(resolved.status)
        .bind(&resolved.result_url)
        .bind(&resolved.failure_reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(resolved)
    }
}
