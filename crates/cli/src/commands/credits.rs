//! Credit administration.
//!
//! Owners buy credits outside the dashboard; support grants them here.

use uuid::Uuid;

use vitrine_admin::db::OwnerRepository;
use vitrine_core::{Credits, OwnerId};

use super::{CliError, connect};

/// Add `amount` credits to an owner, creating the profile if needed.
///
/// # Errors
///
/// Returns an error for a negative amount or a database failure.
pub async fn grant(owner: Uuid, amount: i64) -> Result<(), CliError> {
    let amount = Credits::new(amount)?;
    let owner = OwnerId::new(owner);
    let pool = connect().await?;

    let owners = OwnerRepository::new(&pool);
    owners.ensure(owner).await?;
    let balance = owners.credit(owner, amount).await?;

    tracing::info!(owner_id = %owner, granted = %amount, balance = %balance, "Credits granted");
    Ok(())
}

/// Log an owner's balance.
///
/// # Errors
///
/// Returns `CliError::NotFound` if the owner has no profile yet.
pub async fn show(owner: Uuid) -> Result<(), CliError> {
    let owner = OwnerId::new(owner);
    let pool = connect().await?;

    let profile = OwnerRepository::new(&pool)
        .get(owner)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("no owner profile for {owner}")))?;

    tracing::info!(owner_id = %owner, balance = %profile.credits, "Owner balance");
    Ok(())
}
