//! Store creation with the credit guard.
//!
//! Creating a store costs [`STORE_CREATION_COST`] credits. The flow is:
//!
//! 1. Validate the request and hash any access password.
//! 2. Reject a slug that is already taken (no charge).
//! 3. Ensure the owner has a profile (created lazily with zero credits).
//! 4. Reject an insufficient balance (no mutation).
//! 5. Debit atomically; a concurrent spend that empties the balance is
//!    reported as insufficient credits.
//! 6. Insert the store. If that fails the debit is refunded exactly once and
//!    the insert failure is returned. A failed refund is reported, never
//!    swallowed.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use vitrine_core::{Credits, Email, OwnerId, STORE_CREATION_COST, StoreSlug};

use crate::db::RepositoryError;
use crate::models::{NewStore, Store};
use crate::services::store_access::{self, StoreAccessError};

/// Maximum store name length.
pub const MAX_STORE_NAME_LENGTH: usize = 100;

/// Persistence operations the store creation flow needs.
///
/// Implemented over Postgres by [`crate::db::PgStoreLedger`].
pub trait StoreLedger {
    /// Whether a store already uses `slug`.
    fn slug_exists(
        &self,
        slug: &StoreSlug,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Create the owner's profile if missing and return the balance.
    fn ensure_owner_profile(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Credits, RepositoryError>> + Send;

    /// Subtract `amount` only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when the balance was insufficient.
    fn try_debit(
        &self,
        owner: OwnerId,
        amount: Credits,
    ) -> impl Future<Output = Result<Option<Credits>, RepositoryError>> + Send;

    /// Add `amount` back to the balance and return the new balance.
    fn credit(
        &self,
        owner: OwnerId,
        amount: Credits,
    ) -> impl Future<Output = Result<Credits, RepositoryError>> + Send;

    /// Insert the store row.
    fn insert_store(
        &self,
        store: &NewStore,
    ) -> impl Future<Output = Result<Store, RepositoryError>> + Send;
}

/// A store creation request as submitted by the owner.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStoreRequest {
    pub name: String,
    /// Explicit slug; derived from the name when absent or blank.
    #[serde(default)]
    pub slug: Option<String>,
    pub contact_email: String,
    #[serde(default)]
    pub access_username: Option<String>,
    #[serde(default)]
    pub access_password: Option<String>,
}

/// Store creation failures.
#[derive(Debug, Error)]
pub enum StoreCreationError {
    #[error("{0}")]
    Validation(String),

    #[error("the store URL '{0}' is already taken")]
    DuplicateSlug(String),

    #[error("insufficient credits: {required} required, {balance} available")]
    InsufficientCredits {
        required: Credits,
        balance: Credits,
        shortfall: Credits,
    },

    #[error("credit deduction failed: {0}")]
    CreditDeductionFailed(#[source] RepositoryError),

    #[error("store could not be saved: {0}")]
    Persistence(#[source] RepositoryError),

    /// The insert failed and so did the refund of the debit.
    #[error("store could not be saved ({insert}) and refunding {amount} credits failed: {refund}")]
    RefundFailed {
        amount: Credits,
        insert: Box<StoreCreationError>,
        refund: RepositoryError,
    },
}

impl StoreCreationError {
    fn insufficient(balance: Credits) -> Self {
        Self::InsufficientCredits {
            required: STORE_CREATION_COST,
            balance,
            shortfall: balance.shortfall(STORE_CREATION_COST),
        }
    }
}

/// Runs the store creation flow against a [`StoreLedger`].
pub struct StoreProvisioner<L> {
    ledger: L,
}

impl<L: StoreLedger + Sync> StoreProvisioner<L> {
    /// Create a provisioner over `ledger`.
    #[must_use]
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Create a store for `owner`, charging [`STORE_CREATION_COST`].
    ///
    /// # Errors
    ///
    /// See [`StoreCreationError`]; every variant except `RefundFailed`
    /// leaves the balance as it was before the call.
    #[instrument(skip(self, request), fields(owner_id = %owner))]
    pub async fn create_store(
        &self,
        owner: OwnerId,
        request: NewStoreRequest,
    ) -> Result<Store, StoreCreationError> {
        let new_store = prepare(owner, request)?;

        if self
            .ledger
            .slug_exists(&new_store.slug)
            .await
            .map_err(StoreCreationError::Persistence)?
        {
            return Err(StoreCreationError::DuplicateSlug(
                new_store.slug.as_str().to_owned(),
            ));
        }

        let balance = self
            .ledger
            .ensure_owner_profile(owner)
            .await
            .map_err(StoreCreationError::Persistence)?;
        if !balance.covers(STORE_CREATION_COST) {
            return Err(StoreCreationError::insufficient(balance));
        }

        let remaining = self
            .ledger
            .try_debit(owner, STORE_CREATION_COST)
            .await
            .map_err(StoreCreationError::CreditDeductionFailed)?;
        let Some(remaining) = remaining else {
            // Spent elsewhere between the check and the debit.
            let balance = self
                .ledger
                .ensure_owner_profile(owner)
                .await
                .map_err(StoreCreationError::Persistence)?;
            return Err(StoreCreationError::insufficient(balance));
        };
        tracing::debug!(owner_id = %owner, remaining = %remaining, "Store creation debited");

        match self.ledger.insert_store(&new_store).await {
            Ok(store) => {
                tracing::info!(
                    owner_id = %owner,
                    store_id = %store.id,
                    slug = %store.slug,
                    "Store created"
                );
                Ok(store)
            }
            Err(insert_err) => {
                let insert = match insert_err {
                    RepositoryError::Conflict(_) => {
                        StoreCreationError::DuplicateSlug(new_store.slug.as_str().to_owned())
                    }
                    other => StoreCreationError::Persistence(other),
                };
                Err(self.refund(owner, insert).await)
            }
        }
    }

    async fn refund(&self, owner: OwnerId, insert: StoreCreationError) -> StoreCreationError {
        match self.ledger.credit(owner, STORE_CREATION_COST).await {
            Ok(balance) => {
                tracing::warn!(
                    owner_id = %owner,
                    balance = %balance,
                    error = %insert,
                    "Store insert failed; creation cost refunded"
                );
                insert
            }
            Err(refund) => {
                tracing::error!(
                    owner_id = %owner,
                    amount = %STORE_CREATION_COST,
                    insert_error = %insert,
                    refund_error = %refund,
                    "Store insert failed and the refund failed"
                );
                StoreCreationError::RefundFailed {
                    amount: STORE_CREATION_COST,
                    insert: Box::new(insert),
                    refund,
                }
            }
        }
    }
}

/// Validate a request and turn it into the row to insert.
///
/// # Errors
///
/// Returns `StoreCreationError::Validation` for any invalid field.
pub fn prepare(owner: OwnerId, request: NewStoreRequest) -> Result<NewStore, StoreCreationError> {
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(StoreCreationError::Validation("store name is required".to_owned()));
    }
    if name.chars().count() > MAX_STORE_NAME_LENGTH {
        return Err(StoreCreationError::Validation(format!(
            "store name must be at most {MAX_STORE_NAME_LENGTH} characters"
        )));
    }

    let slug = match request.slug.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => StoreSlug::parse(explicit),
        _ => StoreSlug::from_name(&name),
    }
    .map_err(|e| StoreCreationError::Validation(format!("invalid store URL: {e}")))?;

    let contact_email = Email::parse(request.contact_email.trim())
        .map_err(|e| StoreCreationError::Validation(format!("invalid contact email: {e}")))?;

    let (access_username, access_password_hash) =
        match (request.access_username, request.access_password) {
            (None, None) => (None, None),
            (Some(username), Some(password)) => {
                let username = store_access::validate_credentials(&username, &password)
                    .map_err(access_error)?;
                let hash = store_access::hash_password(&password).map_err(access_error)?;
                (Some(username), Some(hash))
            }
            _ => {
                return Err(StoreCreationError::Validation(
                    "access username and password must be set together".to_owned(),
                ));
            }
        };

    Ok(NewStore {
        owner_id: owner,
        slug,
        name,
        contact_email,
        access_username,
        access_password_hash,
    })
}

fn access_error(err: StoreAccessError) -> StoreCreationError {
    match err {
        StoreAccessError::Validation(message) => StoreCreationError::Validation(message),
        other => StoreCreationError::Validation(other.to_string()),
    }
}
