//! In-memory store.
//!
//! All tables sit behind one `tokio::sync::Mutex`, so each trait method sees
//! and leaves a consistent snapshot. Used by the integration tests and for
//! running the API without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use booster_core::{
    AccountId, AccountStatus, BuildJobId, Chapter, ChapterId, Email, Lesson, LessonId, Module,
    ModuleId, OrderEvent, OrderId, OrderStatus, Role, Transition, UserProgress, assemble_tree,
};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Account, AccountSummary, BuildJob, BuildJobResolution, Checkout, LessonPatch, NewAccount,
    NewChapter, NewLesson, NewModule, Order, OrderQueue, OrderWithAccount, PaymentVerified,
};

struct StoredAccount {
    account: Account,
    password_hash: String,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<StoredAccount>,
    orders: Vec<Order>,
    modules: Vec<Module>,
    chapters: Vec<Chapter>,
    lessons: Vec<Lesson>,
    progress: HashMap<(AccountId, LessonId), UserProgress>,
    build_jobs: HashMap<BuildJobId, BuildJob>,
}

impl Tables {
    fn account_mut(&mut self, id: AccountId) -> Option<&mut StoredAccount> {
        self.accounts.iter_mut().find(|a| a.account.id == id)
    }

    fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts
            .iter()
            .map(|a| &a.account)
            .find(|a| a.id == id)
    }

    fn order_mut(&mut self, id: OrderId) -> StoreResult<&mut Order> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    /// Rows newest first; later inserts win ties on `created_at`.
    fn newest_first<'a>(orders: impl DoubleEndedIterator<Item = &'a Order>) -> Vec<Order> {
        let mut list: Vec<Order> = orders.rev().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}

/// Store keeping every table in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply_order_event(
        &self,
        order_id: OrderId,
        event: OrderEvent,
        template_path: Option<&str>,
    ) -> StoreResult<Order> {
        let mut tables = self.tables.lock().await;
        let order = tables.order_mut(order_id)?;
        if let Transition::Applied(status) = order.status.apply(event)? {
            order.status = status;
            if let Some(path) = template_path {
                order.template_path = Some(path.to_owned());
            }
        }
        Ok(order.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut tables = self.tables.lock().await;
        if tables.accounts.iter().any(|a| a.account.email == account.email) {
            return Err(StoreError::Conflict("email already exists".to_owned()));
        }
        let stored = Account {
            id: AccountId::generate(),
            name: account.name,
            email: account.email,
            phone: account.phone,
            is_verified: account.is_verified,
            has_paid: account.has_paid,
            access_tier: account.access_tier,
            role: account.role,
            status: account.status,
            created_at: Utc::now(),
        };
        tables.accounts.push(StoredAccount {
            account: stored.clone(),
            password_hash: account.password_hash,
        });
        Ok(stored)
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.tables.lock().await.account(id).cloned())
    }

    async fn get_credentials(&self, email: &Email) -> StoreResult<Option<(Account, String)>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| &a.account.email == email)
            .map(|a| (a.account.clone(), a.password_hash.clone())))
    }

    async fn checkout(&self, checkout: Checkout) -> StoreResult<Order> {
        let mut tables = self.tables.lock().await;

        let existing = tables
            .accounts
            .iter_mut()
            .find(|a| a.account.email == checkout.email);
        let account_id = if let Some(stored) = existing {
            stored.account.name = checkout.name;
            stored.account.phone = checkout.phone;
            if !stored.account.has_paid {
                stored.account.access_tier = checkout.package;
            }
            stored.password_hash = checkout.password_hash;
            stored.account.id
        } else {
            let account = Account {
                id: AccountId::generate(),
                name: checkout.name,
                email: checkout.email,
                phone: checkout.phone,
                is_verified: false,
                has_paid: false,
                access_tier: checkout.package,
                role: Role::User,
                status: AccountStatus::Pending,
                created_at: Utc::now(),
            };
            let id = account.id;
            tables.accounts.push(StoredAccount {
                account,
                password_hash: checkout.password_hash,
            });
            id
        };

        let order = Order {
            id: OrderId::generate(),
            account_id,
            package_id: checkout.package,
            package_name: checkout.package_name,
            template_name: checkout.template_name,
            price: checkout.price,
            status: OrderStatus::Pending,
            template_path: None,
            created_at: Utc::now(),
        };
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders_by_account(&self, account_id: AccountId) -> StoreResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        Ok(Tables::newest_first(
            tables.orders.iter().filter(|o| o.account_id == account_id),
        ))
    }

    async fn list_order_queue(&self, queue: OrderQueue) -> StoreResult<Vec<OrderWithAccount>> {
        let tables = self.tables.lock().await;
        let status = queue.status();
        Tables::newest_first(tables.orders.iter().filter(|o| o.status == status))
            .into_iter()
            .map(|order| {
                let owner = tables.account(order.account_id).ok_or_else(|| {
                    StoreError::DataCorruption(format!("order {} has no account", order.id))
                })?;
                Ok(OrderWithAccount {
                    user: AccountSummary::from(owner),
                    order,
                })
            })
            .collect()
    }

    async fn verify_payment(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> StoreResult<PaymentVerified> {
        let mut tables = self.tables.lock().await;

        let order = tables.order_mut(order_id)?.clone();
        if tables.account(account_id).is_none() {
            return Err(StoreError::NotFound(format!("account {account_id}")));
        }
        if order.account_id != account_id {
            return Err(StoreError::InvalidInput(format!(
                "order {order_id} does not belong to account {account_id}"
            )));
        }

        let transition = order.status.apply(OrderEvent::VerifyPayment)?;

        let stored = tables
            .account_mut(account_id)
            .ok_or_else(|| StoreError::NotFound(format!("account {account_id}")))?;
        stored.account.is_verified = true;
        stored.account.has_paid = true;
        stored.account.status = AccountStatus::Active;
        stored.account.access_tier = order.package_id;
        let account = stored.account.clone();

        let order = tables.order_mut(order_id)?;
        let changed = if let Transition::Applied(status) = transition {
            order.status = status;
            true
        } else {
            false
        };

        Ok(PaymentVerified {
            account,
            order: order.clone(),
            changed,
        })
    }

    async fn complete_order(&self, order_id: OrderId, template_path: &str) -> StoreResult<Order> {
        self.apply_order_event(order_id, OrderEvent::Complete, Some(template_path))
            .await
    }

    async fn fail_order(&self, order_id: OrderId) -> StoreResult<Order> {
        self.apply_order_event(order_id, OrderEvent::Fail, None).await
    }

    async fn content_tree(&self) -> StoreResult<Vec<Module>> {
        let tables = self.tables.lock().await;
        Ok(assemble_tree(
            tables.modules.clone(),
            tables.chapters.clone(),
            tables.lessons.clone(),
        ))
    }

    async fn create_module(&self, module: NewModule) -> StoreResult<ModuleId> {
        let id = ModuleId::generate();
        self.tables.lock().await.modules.push(Module {
            id,
            title: module.title,
            description: module.description,
            is_published: module.is_published,
            order_index: module.order_index,
            chapters: Vec::new(),
        });
        Ok(id)
    }

    async fn create_chapter(&self, chapter: NewChapter) -> StoreResult<ChapterId> {
        let mut tables = self.tables.lock().await;
        if !tables.modules.iter().any(|m| m.id == chapter.module_id) {
            return Err(StoreError::NotFound(format!("module {}", chapter.module_id)));
        }
        let id = ChapterId::generate();
        tables.chapters.push(Chapter {
            id,
            module_id: chapter.module_id,
            title: chapter.title,
            description: chapter.description,
            is_published: chapter.is_published,
            order_index: chapter.order_index,
            lessons: Vec::new(),
        });
        Ok(id)
    }

    async fn create_lesson(&self, lesson: NewLesson) -> StoreResult<LessonId> {
        let mut tables = self.tables.lock().await;
        if !tables.chapters.iter().any(|c| c.id == lesson.chapter_id) {
            return Err(StoreError::NotFound(format!("chapter {}", lesson.chapter_id)));
        }
        let id = LessonId::generate();
        tables.lessons.push(Lesson {
            id,
            chapter_id: lesson.chapter_id,
            title: lesson.title,
            description: lesson.description,
            difficulty: lesson.difficulty,
            content: lesson.content,
            duration_minutes: lesson.duration_minutes,
            is_published: lesson.is_published,
            order_index: lesson.order_index,
            required_packages: lesson.required_packages,
            video_url: lesson.video_url,
            materials_url: lesson.materials_url,
        });
        Ok(id)
    }

    async fn get_lesson(&self, id: LessonId) -> StoreResult<Option<Lesson>> {
        let tables = self.tables.lock().await;
        Ok(tables.lessons.iter().find(|l| l.id == id).cloned())
    }

    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> StoreResult<Lesson> {
        let mut tables = self.tables.lock().await;
        let lesson = tables
            .lessons
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("lesson {id}")))?;
        patch.apply(lesson);
        Ok(lesson.clone())
    }

    async fn list_progress(&self, account_id: AccountId) -> StoreResult<Vec<UserProgress>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<UserProgress> = tables
            .progress
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.updated_at);
        Ok(rows)
    }

    async fn record_progress(
        &self,
        account_id: AccountId,
        lesson_id: LessonId,
        completed: bool,
    ) -> StoreResult<UserProgress> {
        let mut tables = self.tables.lock().await;
        if !tables.lessons.iter().any(|l| l.id == lesson_id) {
            return Err(StoreError::NotFound(format!("lesson {lesson_id}")));
        }
        let record = UserProgress {
            account_id,
            lesson_id,
            completed,
            updated_at: Utc::now(),
        };
        tables
            .progress
            .insert((account_id, lesson_id), record.clone());
        Ok(record)
    }

    async fn insert_build_job(&self, job: &BuildJob) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .build_jobs
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn get_build_job(&self, id: BuildJobId) -> StoreResult<Option<BuildJob>> {
        Ok(self.tables.lock().await.build_jobs.get(&id).cloned())
    }

    async fn resolve_build_job(
        &self,
        id: BuildJobId,
        resolution: BuildJobResolution,
    ) -> StoreResult<BuildJob> {
        let mut tables = self.tables.lock().await;
        let job = tables
            .build_jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("build job {id}")))?;
        if let Some(resolved) = job.resolve(&resolution)? {
            *job = resolved;
        }
        Ok(job.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use booster_core::{PackageTier, RequiredPackages};

    fn checkout(email: &str, package: PackageTier) -> Checkout {
        Checkout {
            name: "Budi".to_owned(),
            email: Email::parse(email).unwrap(),
            phone: Some("0812".to_owned()),
            password_hash: "hash-1".to_owned(),
            package,
            package_name: format!("Paket {package}"),
            template_name: "Kopi Senja".to_owned(),
            price: "Rp 1.000.000".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_checkout_creates_pending_account_and_order() {
        let store = MemoryStore::new();
        let order = store
            .checkout(checkout("b@x.com", PackageTier::Medium))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.template_path.is_none());
        let account = store.get_account(order.account_id).await.unwrap().unwrap();
        assert_eq!(account.access_tier, PackageTier::Medium);
        assert_eq!(account.status, AccountStatus::Pending);
        assert!(!account.has_paid);
    }

    #[tokio::test]
    async fn test_checkout_upserts_existing_account() {
        let store = MemoryStore::new();
        let first = store
            .checkout(checkout("b@x.com", PackageTier::Small))
            .await
            .unwrap();
        let mut again = checkout("b@x.com", PackageTier::Large);
        again.name = "Budi Santoso".to_owned();
        again.password_hash = "hash-2".to_owned();
        let second = store.checkout(again).await.unwrap();

        assert_eq!(first.account_id, second.account_id);
        let (account, hash) = store
            .get_credentials(&Email::parse("b@x.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.name, "Budi Santoso");
        assert_eq!(account.access_tier, PackageTier::Large);
        assert_eq!(hash, "hash-2");
    }

    #[tokio::test]
    async fn test_verify_payment_is_idempotent() {
        let store = MemoryStore::new();
        let order = store
            .checkout(checkout("b@x.com", PackageTier::Medium))
            .await
            .unwrap();

        let first = store.verify_payment(order.account_id, order.id).await.unwrap();
        assert!(first.changed);
        assert_eq!(first.order.status, OrderStatus::Paid);
        assert!(first.account.has_paid && first.account.is_verified);
        assert_eq!(first.account.status, AccountStatus::Active);

        let second = store.verify_payment(order.account_id, order.id).await.unwrap();
        assert!(!second.changed);
        assert_eq!(second.order.status, OrderStatus::Paid);
        assert!(second.account.has_paid && second.account.is_verified);
    }

    #[tokio::test]
    async fn test_verify_payment_checks_ownership() {
        let store = MemoryStore::new();
        let order = store
            .checkout(checkout("b@x.com", PackageTier::Medium))
            .await
            .unwrap();
        let other = store
            .checkout(checkout("c@x.com", PackageTier::Small))
            .await
            .unwrap();

        let err = store
            .verify_payment(other.account_id, order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let err = store
            .verify_payment(AccountId::generate(), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // Nothing was written by the rejected calls.
        let account = store.get_account(order.account_id).await.unwrap().unwrap();
        assert!(!account.has_paid);
    }

    #[tokio::test]
    async fn test_verify_payment_grants_the_verified_package() {
        let store = MemoryStore::new();
        let small = store
            .checkout(checkout("b@x.com", PackageTier::Small))
            .await
            .unwrap();
        store
            .checkout(checkout("b@x.com", PackageTier::Enterprise))
            .await
            .unwrap();

        let verified = store.verify_payment(small.account_id, small.id).await.unwrap();
        assert_eq!(verified.account.access_tier, PackageTier::Small);
    }

    #[tokio::test]
    async fn test_checkout_keeps_tier_of_paid_account() {
        let store = MemoryStore::new();
        let order = store
            .checkout(checkout("b@x.com", PackageTier::Medium))
            .await
            .unwrap();
        store.verify_payment(order.account_id, order.id).await.unwrap();

        let upgrade = store
            .checkout(checkout("b@x.com", PackageTier::Enterprise))
            .await
            .unwrap();
        let account = store.get_account(order.account_id).await.unwrap().unwrap();
        assert_eq!(account.access_tier, PackageTier::Medium);

        let verified = store
            .verify_payment(upgrade.account_id, upgrade.id)
            .await
            .unwrap();
        assert_eq!(verified.account.access_tier, PackageTier::Enterprise);
    }

    #[tokio::test]
    async fn test_complete_requires_payment_and_last_write_wins() {
        let store = MemoryStore::new();
        let order = store
            .checkout(checkout("b@x.com", PackageTier::Medium))
            .await
            .unwrap();

        let err = store.complete_order(order.id, "https://a").await.unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
        assert!(store.get_order(order.id).await.unwrap().unwrap().template_path.is_none());

        store.verify_payment(order.account_id, order.id).await.unwrap();
        let done = store.complete_order(order.id, "https://a").await.unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        assert_eq!(done.template_path.as_deref(), Some("https://a"));

        let again = store.complete_order(order.id, "https://b").await.unwrap();
        assert_eq!(again.template_path.as_deref(), Some("https://b"));
    }

    #[tokio::test]
    async fn test_fail_only_from_pending() {
        let store = MemoryStore::new();
        let order = store
            .checkout(checkout("b@x.com", PackageTier::Small))
            .await
            .unwrap();
        let failed = store.fail_order(order.id).await.unwrap();
        assert_eq!(failed.status, OrderStatus::Failed);
        assert!(store.verify_payment(order.account_id, order.id).await.is_err());
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first() {
        let store = MemoryStore::new();
        let first = store
            .checkout(checkout("b@x.com", PackageTier::Small))
            .await
            .unwrap();
        let second = store
            .checkout(checkout("b@x.com", PackageTier::Medium))
            .await
            .unwrap();

        let orders = store.list_orders_by_account(first.account_id).await.unwrap();
        let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let queue = store.list_order_queue(OrderQueue::Pending).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].order.id, second.id);
        assert_eq!(queue[0].user.email.as_str(), "b@x.com");
        assert!(store.list_order_queue(OrderQueue::Verified).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_upsert_and_missing_parents() {
        let store = MemoryStore::new();
        let err = store
            .create_chapter(NewChapter {
                module_id: ModuleId::generate(),
                title: "Orphan".to_owned(),
                description: None,
                is_published: true,
                order_index: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let module_id = store
            .create_module(NewModule {
                title: "Digital Marketing".to_owned(),
                description: None,
                is_published: true,
                order_index: 0,
            })
            .await
            .unwrap();
        let chapter_id = store
            .create_chapter(NewChapter {
                module_id,
                title: "Basics".to_owned(),
                description: None,
                is_published: true,
                order_index: 0,
            })
            .await
            .unwrap();
        let lesson_id = store
            .create_lesson(NewLesson {
                chapter_id,
                title: "Instagram".to_owned(),
                description: None,
                difficulty: None,
                content: None,
                duration_minutes: None,
                is_published: true,
                order_index: 0,
                required_packages: RequiredPackages::new([PackageTier::Small]).unwrap(),
                video_url: None,
                materials_url: None,
            })
            .await
            .unwrap();

        let account = AccountId::generate();
        store.record_progress(account, lesson_id, true).await.unwrap();
        store.record_progress(account, lesson_id, false).await.unwrap();
        let rows = store.list_progress(account).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].completed);

        let tree = store.content_tree().await.unwrap();
        assert_eq!(tree[0].chapters[0].lessons[0].id, lesson_id);
    }
}
