//! Owner profile repository.
//!
//! Profiles are keyed by the auth user id and created lazily with a zero
//! balance. Balance changes are single conditional `UPDATE`s so concurrent
//! requests cannot drive a balance below zero.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vitrine_core::{Credits, OwnerId};

use super::RepositoryError;
use crate::models::OwnerProfile;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OwnerProfileRow {
    id: Uuid,
    credits: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OwnerProfileRow> for OwnerProfile {
    type Error = RepositoryError;

    fn try_from(row: OwnerProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OwnerId::new(row.id),
            credits: credits_from_column(row.credits)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn credits_from_column(value: i64) -> Result<Credits, RepositoryError> {
    Credits::new(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid credit balance: {e}")))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for owner profiles and credit balances.
pub struct OwnerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OwnerRepository<'a> {
    /// Create a new owner repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile if it exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, owner: OwnerId) -> Result<Option<OwnerProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, OwnerProfileRow>(
            r"
            SELECT id, credits, created_at, updated_at
            FROM vitrine.owner_profile
            WHERE id = $1
            ",
        )
        .bind(owner.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a profile, creating it with a zero balance if absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, owner: OwnerId) -> Result<OwnerProfile, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, OwnerProfileRow>(
            r"
            INSERT INTO vitrine.owner_profile (id)
            VALUES ($1)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING id, credits, created_at, updated_at
            ",
        )
        .bind(owner.as_uuid())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Subtract `amount` only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when the balance was insufficient
    /// (including when the profile does not exist).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn try_debit(
        &self,
        owner: OwnerId,
        amount: Credits,
    ) -> Result<Option<Credits>, RepositoryError> {
        let balance: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE vitrine.owner_profile
            SET credits = credits - $2, updated_at = now()
            WHERE id = $1 AND credits >= $2
            RETURNING credits
            ",
        )
        .bind(owner.as_uuid())
        .bind(amount.amount())
        .fetch_optional(self.pool)
        .await?;

        balance.map(credits_from_column).transpose()
    }

    /// Add `amount` to the balance and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn credit(&self, owner: OwnerId, amount: Credits) -> Result<Credits, RepositoryError> {
        let balance: i64 = sqlx::query_scalar(
            r"
            UPDATE vitrine.owner_profile
            SET credits = credits + $2, updated_at = now()
            WHERE id = $1
            RETURNING credits
            ",
        )
        .bind(owner.as_uuid())
        .bind(amount.amount())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        credits_from_column(balance)
    }
}
