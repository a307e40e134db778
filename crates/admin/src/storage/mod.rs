//! Object storage for product images and theme assets.
//!
//! Files are addressed by `(bucket, path)` and exposed at
//! `{public_url}/{bucket}/{path}`. Every upload gets a fresh path
//! (`{prefix}/{uuid}.{ext}`), so two records never share an object even when
//! their images have identical bytes.
//!
//! Two backends implement [`ObjectStorage`]:
//!
//! - [`LocalStorage`] - files under a directory, served by this process
//! - [`HttpStorage`] - a storage REST API reached with `reqwest`

mod http;
mod local;

pub use http::HttpStorage;
pub use local::LocalStorage;

use std::future::Future;

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The storage API returned an error response.
    #[error("storage API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Bucket or object path is not acceptable.
    #[error("invalid object path: {0}")]
    InvalidPath(String),
}

/// Operations on a bucketed object store.
pub trait ObjectStorage {
    /// Store `bytes` at `path` (overwriting) and return the public URL.
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Every object path under `prefix`, recursively.
    fn list(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Remove the given objects. Missing objects are not an error.
    fn remove(
        &self,
        bucket: &str,
        paths: &[String],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Public URL of an object.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Object path for a public URL in `bucket`, or `None` for foreign URLs.
    fn object_path(&self, bucket: &str, url: &str) -> Option<String>;
}

/// The configured storage backend.
#[derive(Debug, Clone)]
pub enum Storage {
    Local(LocalStorage),
    Http(HttpStorage),
}

impl Storage {
    /// Build the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Request` if the HTTP client cannot be built.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let public = PublicUrls::new(config.public_url.clone());
        Ok(match &config.backend {
            StorageBackend::Local { root } => Self::Local(LocalStorage::new(root.clone(), public)),
            StorageBackend::Http { url, service_key } => {
                Self::Http(HttpStorage::new(url.clone(), service_key, public)?)
            }
        })
    }
}

impl ObjectStorage for Storage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        match self {
            Self::Local(s) => s.upload(bucket, path, bytes, content_type).await,
            Self::Http(s) => s.upload(bucket, path, bytes, content_type).await,
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        match self {
            Self::Local(s) => s.list(bucket, prefix).await,
            Self::Http(s) => s.list(bucket, prefix).await,
        }
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        match self {
            Self::Local(s) => s.remove(bucket, paths).await,
            Self::Http(s) => s.remove(bucket, paths).await,
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        match self {
            Self::Local(s) => s.public_url(bucket, path),
            Self::Http(s) => s.public_url(bucket, path),
        }
    }

    fn object_path(&self, bucket: &str, url: &str) -> Option<String> {
        match self {
            Self::Local(s) => s.object_path(bucket, url),
            Self::Http(s) => s.object_path(bucket, url),
        }
    }
}

/// Maps between object paths and public URLs.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    base: String,
}

impl PublicUrls {
    /// Public URLs rooted at `base`.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            base: base.as_str().trim_end_matches('/').to_owned(),
        }
    }

    /// `{base}/{bucket}/{path}`
    #[must_use]
    pub fn url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Inverse of [`Self::url`]; query strings and fragments are dropped.
    #[must_use]
    pub fn path(&self, bucket: &str, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.base)?.strip_prefix('/')?;
        let rest = rest.strip_prefix(bucket)?.strip_prefix('/')?;
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        if path.is_empty() {
            return None;
        }
        Some(path.to_owned())
    }
}

/// Check a bucket name or object path for traversal and empty segments.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` naming the offending path.
pub fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.contains('\0')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidPath(path.to_owned()));
    }
    Ok(())
}

/// File extension for an accepted upload content type.
///
/// Only raster images are accepted.
#[must_use]
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

/// Fresh object path for one upload: `{prefix}/{uuid}.{extension}`.
#[must_use]
pub fn upload_path(prefix: &str, extension: &str) -> String {
    format!(
        "{}/{}.{extension}",
        prefix.trim_end_matches('/'),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn urls() -> PublicUrls {
        PublicUrls::new(Url::parse("https://cdn.vitrine.test/storage/").unwrap())
    }

    #[test]
    fn test_public_url_round_trip() {
        let urls = urls();
        let url = urls.url("product-images", "store/abc.png");
        assert_eq!(url, "https://cdn.vitrine.test/storage/product-images/store/abc.png");
        assert_eq!(
            urls.path("product-images", &url).as_deref(),
            Some("store/abc.png")
        );
    }

    #[test]
    fn test_foreign_urls_have_no_path() {
        let urls = urls();
        assert_eq!(urls.path("product-images", "https://elsewhere.test/a.png"), None);
        assert_eq!(
            urls.path(
                "product-images",
                "https://cdn.vitrine.test/storage/theme-assets/a.png"
            ),
            None
        );
        assert_eq!(
            urls.path("product", "https://cdn.vitrine.test/storage/product-images/a.png"),
            None
        );
    }

    #[test]
    fn test_path_drops_query() {
        let urls = urls();
        assert_eq!(
            urls.path(
                "product-images",
                "https://cdn.vitrine.test/storage/product-images/s/a.png?v=2"
            )
            .as_deref(),
            Some("s/a.png")
        );
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("store/abc.png").is_ok());
        assert!(validate_path("../etc/passwd").is_err());
        assert!(validate_path("store/../../x").is_err());
        assert!(validate_path("/abs").is_err());
        assert!(validate_path("a//b").is_err());
        assert!(validate_path("").is_err());
    }

    #[test]
    fn test_upload_paths_are_unique_per_upload() {
        let a = upload_path("store-1/", "png");
        let b = upload_path("store-1", "png");
        assert_ne!(a, b);
        for path in [&a, &b] {
            assert!(path.starts_with("store-1/"));
            assert!(path.ends_with(".png"));
            assert!(validate_path(path).is_ok());
        }
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/svg+xml"), None);
        assert_eq!(image_extension("text/html"), None);
    }
}
