//! Cascading deletes with best-effort storage cleanup.
//!
//! Uploaded files are removed before the owning row. Storage failures are
//! logged and reported in a [`CleanupReport`] but never block the row
//! deletion; the database cascades take care of child rows.

use std::collections::BTreeSet;
use std::future::Future;

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use vitrine_core::{ProductId, StoreId, ThemeDeveloperId, ThemeId};

use crate::db::{ProductRepository, RepositoryError, StoreRepository, ThemeRepository};
use crate::models::{Product, ProductVariant};
use crate::storage::ObjectStorage;

/// The typed confirmation did not match the store name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("type the store name exactly to confirm deletion")]
pub struct ConfirmationMismatch;

/// Outcome of a best-effort storage removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Objects we attempted to remove.
    pub requested: usize,
    /// Objects confirmed removed.
    pub removed: usize,
    /// Storage error, if listing or removal failed.
    pub error: Option<String>,
}

impl CleanupReport {
    /// Whether every requested object was removed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none() && self.removed == self.requested
    }
}

/// Second confirmation step for store deletion: exact, case-sensitive match.
///
/// # Errors
///
/// Returns [`ConfirmationMismatch`] unless `typed` equals `store_name`.
pub fn confirm_store_deletion(store_name: &str, typed: &str) -> Result<(), ConfirmationMismatch> {
    if typed == store_name {
        Ok(())
    } else {
        Err(ConfirmationMismatch)
    }
}

/// Object paths of every uploaded file a product owns.
///
/// Product and variant images are translated from public URL to object path.
/// URLs outside `bucket` are skipped; duplicates are removed.
pub fn product_object_paths<S: ObjectStorage>(
    storage: &S,
    bucket: &str,
    product: &Product,
    variants: &[ProductVariant],
) -> Vec<String> {
    product
        .images
        .iter()
        .chain(variants.iter().flat_map(|v| v.images.iter()))
        .filter_map(|url| storage.object_path(bucket, url))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Drop paths whose public URL is still referenced by another record.
///
/// Paths are kept in their original order.
pub fn unshared_paths<S: ObjectStorage>(
    storage: &S,
    bucket: &str,
    paths: Vec<String>,
    in_use: &[String],
) -> Vec<String> {
    let shared: BTreeSet<String> = in_use
        .iter()
        .filter_map(|url| storage.object_path(bucket, url))
        .collect();
    paths.into_iter().filter(|p| !shared.contains(p)).collect()
}

/// Remove `paths`, logging instead of failing.
pub async fn remove_best_effort<S: ObjectStorage + Sync>(
    storage: &S,
    bucket: &str,
    paths: &[String],
) -> CleanupReport {
    if paths.is_empty() {
        return CleanupReport::default();
    }

    match storage.remove(bucket, paths).await {
        Ok(()) => CleanupReport {
            requested: paths.len(),
            removed: paths.len(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(
                bucket = %bucket,
                count = paths.len(),
                error = %e,
                "Storage cleanup failed; continuing with delete"
            );
            CleanupReport {
                requested: paths.len(),
                removed: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Remove `paths`, then run `delete_row` regardless of the cleanup outcome.
///
/// # Errors
///
/// Returns the error from `delete_row`.
pub async fn delete_with_cleanup<S, F, Fut, T, E>(
    storage: &S,
    bucket: &str,
    paths: &[String],
    delete_row: F,
) -> Result<(T, CleanupReport), E>
where
    S: ObjectStorage + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let report = remove_best_effort(storage, bucket, paths).await;
    let value = delete_row().await?;
    Ok((value, report))
}

/// Remove everything under `prefix`, then run `delete_row`.
///
/// A listing failure is logged and counted like a removal failure.
///
/// # Errors
///
/// Returns the error from `delete_row`.
pub async fn delete_prefixed<S, F, Fut, T, E>(
    storage: &S,
    bucket: &str,
    prefix: &str,
    delete_row: F,
) -> Result<(T, CleanupReport), E>
where
    S: ObjectStorage + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match storage.list(bucket, prefix).await {
        Ok(paths) => delete_with_cleanup(storage, bucket, &paths, delete_row).await,
        Err(e) => {
            tracing::warn!(
                bucket = %bucket,
                prefix = %prefix,
                error = %e,
                "Storage listing failed; deleting row without cleanup"
            );
            let value = delete_row().await?;
            Ok((
                value,
                CleanupReport {
                    error: Some(e.to_string()),
                    ..CleanupReport::default()
                },
            ))
        }
    }
}

/// Storage prefix of a store's uploads.
#[must_use]
pub fn store_prefix(store: StoreId) -> String {
    format!("{store}/")
}

/// Storage prefix of a theme's uploads.
#[must_use]
pub fn theme_prefix(theme: ThemeId) -> String {
    format!("{theme}/")
}

/// Delete a product, its variants and their images.
///
/// Images another product, variant or category of the store still points at
/// are left in place.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the store has no such product.
#[instrument(skip(pool, storage), fields(store_id = %store, product_id = %product))]
pub async fn delete_product<S: ObjectStorage + Sync>(
    pool: &PgPool,
    storage: &S,
    bucket: &str,
    store: StoreId,
    product: ProductId,
) -> Result<CleanupReport, RepositoryError> {
    let repo = ProductRepository::new(pool);
    let existing = repo
        .get(store, product)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let owned = product_object_paths(storage, bucket, &existing.product, &existing.variants);
    let in_use = repo.image_urls_in_use(store, product).await?;
    let paths = unshared_paths(storage, bucket, owned, &in_use);

    let ((), report) =
        delete_with_cleanup(storage, bucket, &paths, || repo.delete(store, product)).await?;
    tracing::info!(
        store_id = %store,
        product_id = %product,
        images_removed = report.removed,
        "Product deleted"
    );
    Ok(report)
}

/// Delete a store, its whole catalog and every file under its prefix.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the store does not exist.
#[instrument(skip(pool, storage), fields(store_id = %store))]
pub async fn delete_store<S: ObjectStorage + Sync>(
    pool: &PgPool,
    storage: &S,
    bucket: &str,
    store: StoreId,
) -> Result<CleanupReport, RepositoryError> {
    let repo = StoreRepository::new(pool);
    let ((), report) =
        delete_prefixed(storage, bucket, &store_prefix(store), || repo.delete(store)).await?;
    tracing::info!(
        store_id = %store,
        files_removed = report.removed,
        "Store deleted"
    );
    Ok(report)
}

/// Delete a developer's theme, its mock data and its uploads.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the developer has no such theme.
#[instrument(skip(pool, storage), fields(theme_id = %theme))]
pub async fn delete_theme<S: ObjectStorage + Sync>(
    pool: &PgPool,
    storage: &S,
    bucket: &str,
    developer: ThemeDeveloperId,
    theme: ThemeId,
) -> Result<CleanupReport, RepositoryError> {
    let repo = ThemeRepository::new(pool);
    if repo.get_theme(developer, theme).await?.is_none() {
        return Err(RepositoryError::NotFound);
    }
    let ((), report) = delete_prefixed(storage, bucket, &theme_prefix(theme), || {
        repo.delete_theme(developer, theme)
    })
    .await?;
    tracing::info!(theme_id = %theme, files_removed = report.removed, "Theme deleted");
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use url::Url;
    use vitrine_core::catalog::Combination;
    use vitrine_core::{VariantId, VariantPrice};

    use super::*;
    use crate::storage::{PublicUrls, StorageError};

    /// Storage that records removals and can be told to fail.
    struct RecordingStorage {
        urls: PublicUrls,
        objects: Vec<String>,
        removed: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingStorage {
        fn new(objects: &[&str], fail: bool) -> Self {
            Self {
                urls: PublicUrls::new(Url::parse("https://cdn.test/o").unwrap()),
                objects: objects.iter().map(|s| (*s).to_owned()).collect(),
                removed: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl ObjectStorage for RecordingStorage {
        async fn upload(
            &self,
            bucket: &str,
            path: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            Ok(self.urls.url(bucket, path))
        }

        async fn list(&self, _bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
            if self.fail {
                return Err(StorageError::InvalidPath("listing offline".to_owned()));
            }
            Ok(self
                .objects
                .iter()
                .filter(|p| p.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn remove(&self, _bucket: &str, paths: &[String]) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::Api {
                    status: 503,
                    message: "unavailable".to_owned(),
                });
            }
            self.removed.lock().unwrap().extend_from_slice(paths);
            Ok(())
        }

        fn public_url(&self, bucket: &str, path: &str) -> String {
            self.urls.url(bucket, path)
        }

        fn object_path(&self, bucket: &str, url: &str) -> Option<String> {
            self.urls.path(bucket, url)
        }
    }

    fn product(images: &[&str]) -> Product {
        Product {
            id: ProductId::generate(),
            store_id: StoreId::generate(),
            category_id: None,
            name: "Tee".to_owned(),
            description: String::new(),
            images: images.iter().map(|s| (*s).to_owned()).collect(),
            base_price: Decimal::new(1999, 2),
            quantity: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(product: &Product, images: &[&str]) -> ProductVariant {
        ProductVariant {
            id: VariantId::generate(),
            product_id: product.id,
            combination: Combination::default(),
            price: VariantPrice::UseBase,
            quantity: 1,
            images: images.iter().map(|s| (*s).to_owned()).collect(),
            is_active: true,
        }
    }

    #[test]
    fn test_confirmation_is_case_sensitive() {
        assert!(confirm_store_deletion("Corner Shop", "Corner Shop").is_ok());
        assert_eq!(
            confirm_store_deletion("Corner Shop", "corner shop"),
            Err(ConfirmationMismatch)
        );
        assert!(confirm_store_deletion("Corner Shop", "Corner Shop ").is_err());
    }

    #[test]
    fn test_product_paths_cover_variants_and_skip_foreign() {
        let storage = RecordingStorage::new(&[], false);
        let p = product(&[
            "https://cdn.test/o/product-images/s/a.png",
            "https://elsewhere.test/hotlinked.png",
        ]);
        let variants = vec![
            variant(&p, &["https://cdn.test/o/product-images/s/b.png"]),
            variant(&p, &["https://cdn.test/o/product-images/s/a.png"]),
        ];

        let paths = product_object_paths(&storage, "product-images", &p, &variants);
        assert_eq!(paths, vec!["s/a.png".to_owned(), "s/b.png".to_owned()]);
    }

    #[test]
    fn test_shared_images_are_kept() {
        let storage = RecordingStorage::new(&[], false);
        let paths = vec!["s/a.png".to_owned(), "s/b.png".to_owned()];
        let in_use = vec![
            "https://cdn.test/o/product-images/s/a.png".to_owned(),
            "https://cdn.test/o/theme-assets/s/b.png".to_owned(),
        ];

        let kept = unshared_paths(&storage, "product-images", paths, &in_use);
        assert_eq!(kept, vec!["s/b.png".to_owned()]);
    }

    #[tokio::test]
    async fn test_row_deleted_even_when_storage_fails() {
        let storage = RecordingStorage::new(&[], true);
        let deleted = Mutex::new(false);

        let ((), report) = delete_with_cleanup(
            &storage,
            "product-images",
            &["s/a.png".to_owned()],
            || async {
                *deleted.lock().unwrap() = true;
                Ok::<_, RepositoryError>(())
            },
        )
        .await
        .unwrap();

        assert!(*deleted.lock().unwrap());
        assert!(!report.is_complete());
        assert_eq!(report.requested, 1);
        assert_eq!(report.removed, 0);
    }

    #[tokio::test]
    async fn test_delete_prefixed_removes_only_prefix() {
        let storage = RecordingStorage::new(&["s1/a.png", "s1/b.png", "s2/c.png"], false);

        let ((), report) = delete_prefixed(&storage, "product-images", "s1/", || async {
            Ok::<_, RepositoryError>(())
        })
        .await
        .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.removed, 2);
        assert_eq!(
            *storage.removed.lock().unwrap(),
            vec!["s1/a.png".to_owned(), "s1/b.png".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_row_error_is_returned() {
        let storage = RecordingStorage::new(&["s1/a.png"], false);

        let result = delete_prefixed(&storage, "product-images", "s1/", || async {
            Err::<(), _>(RepositoryError::NotFound)
        })
        .await;

        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[test]
    fn test_prefixes() {
        let store = StoreId::generate();
        assert_eq!(store_prefix(store), format!("{store}/"));
    }
}
