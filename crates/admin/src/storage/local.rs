//! Filesystem-backed storage.

use std::path::{Path, PathBuf};

use super::{ObjectStorage, PublicUrls, StorageError, validate_path};

/// Stores objects at `{root}/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public: PublicUrls,
}

impl LocalStorage {
    /// Storage rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf, public: PublicUrls) -> Self {
        Self { root, public }
    }

    /// Root directory; served under `/files`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        validate_path(bucket)?;
        validate_path(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(self.public.url(bucket, path))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.trim_matches('/');
        let start = if prefix.is_empty() {
            validate_path(bucket)?;
            self.root.join(bucket)
        } else {
            self.resolve(bucket, prefix)?
        };

        let mut found = Vec::new();
        let mut pending = vec![(start, prefix.to_owned())];
        while let Some((dir, relative)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let child = if relative.is_empty() {
                    name
                } else {
                    format!("{relative}/{name}")
                };
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), child));
                } else {
                    found.push(child);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            let target = self.resolve(bucket, path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.public.url(bucket, path)
    }

    fn object_path(&self, bucket: &str, url: &str) -> Option<String> {
        self.public.path(bucket, url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(
            dir.path().to_path_buf(),
            PublicUrls::new(Url::parse("http://localhost:3001/files").unwrap()),
        )
    }

    #[tokio::test]
    async fn test_upload_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let url = storage
            .upload("product-images", "s1/a.png", b"a".to_vec(), "image/png")
            .await
            .unwrap();
        storage
            .upload("product-images", "s1/nested/b.png", b"b".to_vec(), "image/png")
            .await
            .unwrap();
        storage
            .upload("product-images", "s2/c.png", b"c".to_vec(), "image/png")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:3001/files/product-images/s1/a.png");
        assert_eq!(
            storage.list("product-images", "s1/").await.unwrap(),
            vec!["s1/a.png".to_owned(), "s1/nested/b.png".to_owned()]
        );

        storage
            .remove("product-images", &["s1/a.png".to_owned(), "s1/gone.png".to_owned()])
            .await
            .unwrap();
        assert_eq!(
            storage.list("product-images", "s1").await.unwrap(),
            vec!["s1/nested/b.png".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_missing_prefix_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(storage(&dir).list("product-images", "nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let err = storage
            .upload("product-images", "../escape.png", b"x".to_vec(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));

        let err = storage
            .remove("..", &["a.png".to_owned()])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }
}
