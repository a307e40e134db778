//! Integration tests for Vitrine.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory flows (no services needed)
//! cargo test -p vitrine-integration-tests
//!
//! # HTTP tests against a running dashboard
//! ADMIN_BASE_URL=http://localhost:3001 ADMIN_TEST_TOKEN=... \
//!     cargo test -p vitrine-integration-tests -- --ignored
//! ```
//!
//! This crate provides in-memory implementations of the persistence seams so
//! the store creation and cleanup flows can be driven end to end without a
//! database:
//!
//! - [`MemoryLedger`] - multi-owner [`StoreLedger`] with failure injection
//! - [`MemoryStorage`] - bucketed [`ObjectStorage`] with failure injection

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use vitrine_admin::db::RepositoryError;
use vitrine_admin::models::{NewStore, Store};
use vitrine_admin::services::StoreLedger;
use vitrine_admin::storage::{ObjectStorage, StorageError};
use vitrine_core::{Credits, OwnerId, StoreId, StoreSlug};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Ledger
// =============================================================================

/// In-memory owner balances and stores.
///
/// Clones share state, so a test can keep a handle on the ledger it gives to
/// a provisioner. Debits are atomic under one lock, matching the conditional
/// `UPDATE` the Postgres ledger issues.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: Mutex<HashMap<OwnerId, Credits>>,
    stores: Mutex<Vec<Store>>,
    fail_debit: AtomicBool,
    fail_insert: AtomicBool,
    fail_refund: AtomicBool,
    refunds: AtomicUsize,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `owner` a profile with `amount` credits.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is negative.
    #[must_use]
    pub fn with_owner(self, owner: OwnerId, amount: i64) -> Self {
        let credits = Credits::new(amount).expect("non-negative balance");
        lock(&self.state.balances).insert(owner, credits);
        self
    }

    /// Make every debit fail with a database error.
    pub fn fail_debits(&self) {
        self.state.fail_debit.store(true, Ordering::SeqCst);
    }

    /// Make every store insert fail with a database error.
    pub fn fail_inserts(&self) {
        self.state.fail_insert.store(true, Ordering::SeqCst);
    }

    /// Make every refund fail.
    pub fn fail_refunds(&self) {
        self.state.fail_refund.store(true, Ordering::SeqCst);
    }

    /// Current balance, `None` if the owner has no profile.
    #[must_use]
    pub fn balance(&self, owner: OwnerId) -> Option<Credits> {
        lock(&self.state.balances).get(&owner).copied()
    }

    /// Refund attempts so far.
    #[must_use]
    pub fn refund_attempts(&self) -> usize {
        self.state.refunds.load(Ordering::SeqCst)
    }

    /// Stores inserted so far.
    #[must_use]
    pub fn stores(&self) -> Vec<Store> {
        lock(&self.state.stores).clone()
    }
}

impl StoreLedger for MemoryLedger {
    async fn slug_exists(&self, slug: &StoreSlug) -> Result<bool, RepositoryError> {
        Ok(lock(&self.state.stores).iter().any(|s| s.slug == *slug))
    }

    async fn ensure_owner_profile(&self, owner: OwnerId) -> Result<Credits, RepositoryError> {
        Ok(*lock(&self.state.balances).entry(owner).or_insert(Credits::ZERO))
    }

    async fn try_debit(
        &self,
        owner: OwnerId,
        amount: Credits,
    ) -> Result<Option<Credits>, RepositoryError> {
        if self.state.fail_debit.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "statement timeout during debit".to_owned(),
            ));
        }
        let mut balances = lock(&self.state.balances);
        let Some(balance) = balances.get_mut(&owner) else {
            return Ok(None);
        };
        Ok(balance.debit(amount).ok().map(|next| {
            *balance = next;
            next
        }))
    }

    async fn credit(&self, owner: OwnerId, amount: Credits) -> Result<Credits, RepositoryError> {
        self.state.refunds.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_refund.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "owner profile is locked".to_owned(),
            ));
        }
        let mut balances = lock(&self.state.balances);
        let balance = balances.entry(owner).or_insert(Credits::ZERO);
        *balance = balance
            .credit(amount)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        Ok(*balance)
    }

    async fn insert_store(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        if self.state.fail_insert.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "connection reset during insert".to_owned(),
            ));
        }
        let mut stores = lock(&self.state.stores);
        if stores.iter().any(|s| s.slug == store.slug) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }
        let now = Utc::now();
        let row = Store {
            id: StoreId::generate(),
            owner_id: store.owner_id,
            slug: store.slug.clone(),
            name: store.name.clone(),
            contact_email: store.contact_email.clone(),
            access_username: store.access_username.clone(),
            access_password_hash: store.access_password_hash.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        stores.push(row.clone());
        Ok(row)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Public URL base used by [`MemoryStorage`].
pub const MEMORY_PUBLIC_URL: &str = "https://cdn.vitrine.test/storage";

/// In-memory object storage keyed by `(bucket, path)`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    fail_list: AtomicBool,
    fail_remove: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly and return its public URL.
    pub fn put(&self, bucket: &str, path: &str, bytes: &[u8]) -> String {
        lock(&self.objects).insert((bucket.to_owned(), path.to_owned()), bytes.to_vec());
        self.public_url(bucket, path)
    }

    /// Make `list` fail.
    pub fn fail_listing(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    /// Make `remove` fail.
    pub fn fail_removal(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }

    /// Whether an object exists.
    #[must_use]
    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        lock(&self.objects).contains_key(&(bucket.to_owned(), path.to_owned()))
    }

    /// Number of objects in `bucket`.
    #[must_use]
    pub fn count(&self, bucket: &str) -> usize {
        lock(&self.objects).keys().filter(|(b, _)| b == bucket).count()
    }

    fn unavailable() -> StorageError {
        StorageError::Api {
            status: 503,
            message: "storage unavailable".to_owned(),
        }
    }
}

impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        lock(&self.objects).insert((bucket.to_owned(), path.to_owned()), bytes);
        Ok(self.public_url(bucket, path))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(lock(&self.objects)
            .keys()
            .filter(|(b, p)| b == bucket && p.starts_with(prefix))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut objects = lock(&self.objects);
        for path in paths {
            objects.remove(&(bucket.to_owned(), path.clone()));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{MEMORY_PUBLIC_URL}/{bucket}/{path}")
    }

    fn object_path(&self, bucket: &str, url: &str) -> Option<String> {
        url.strip_prefix(MEMORY_PUBLIC_URL)?
            .strip_prefix('/')?
            .strip_prefix(bucket)?
            .strip_prefix('/')
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
    }
}
