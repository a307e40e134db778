//! Storage REST API backend.
//!
//! - Upload: `POST {url}/object/{bucket}/{path}` with the raw bytes
//! - List: `POST {url}/object/list/{bucket}` with `{prefix, limit, offset}`
//! - Remove: `DELETE {url}/object/{bucket}` with `{prefixes: [...]}`
//!
//! Authentication sends the service key both as a bearer token and as the
//! `apikey` header.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ObjectStorage, PublicUrls, StorageError, validate_path};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const LIST_PAGE_SIZE: usize = 1000;

/// Storage API client.
#[derive(Clone)]
pub struct HttpStorage {
    inner: Arc<HttpStorageInner>,
}

struct HttpStorageInner {
    client: reqwest::Client,
    base: String,
    public: PublicUrls,
}

impl std::fmt::Debug for HttpStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStorage")
            .field("base", &self.inner.base)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
}

/// Entry returned by the list endpoint. Folders have no `id`.
#[derive(Deserialize)]
struct ListEntry {
    name: String,
    id: Option<String>,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl HttpStorage {
    /// Create a client for the API at `url`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the key is not a valid header
    /// value, or `StorageError::Request` if the client fails to build.
    pub fn new(url: Url, service_key: &SecretString, public: PublicUrls) -> Result<Self, StorageError> {
        let invalid_key = |_| StorageError::InvalidPath("service key is not a valid header".into());

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", service_key.expose_secret()))
                .map_err(invalid_key)?,
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(service_key.expose_secret()).map_err(invalid_key)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpStorageInner {
                client,
                base: url.as_str().trim_end_matches('/').to_owned(),
                public,
            }),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        offset: usize,
    ) -> Result<Vec<ListEntry>, StorageError> {
        let response = self
            .inner
            .client
            .post(format!("{}/object/list/{bucket}", self.inner.base))
            .json(&ListRequest {
                prefix,
                limit: LIST_PAGE_SIZE,
                offset,
            })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

impl ObjectStorage for HttpStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_path(bucket)?;
        validate_path(path)?;

        let response = self
            .inner
            .client
            .post(format!("{}/object/{bucket}/{path}", self.inner.base))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;

        Ok(self.inner.public.url(bucket, path))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_path(bucket)?;

        let mut found = Vec::new();
        let mut folders = vec![prefix.trim_matches('/').to_owned()];
        while let Some(folder) = folders.pop() {
            let mut offset = 0;
            loop {
                let page = self.list_page(bucket, &folder, offset).await?;
                let count = page.len();
                for entry in page {
                    let path = if folder.is_empty() {
                        entry.name
                    } else {
                        format!("{folder}/{}", entry.name)
                    };
                    if entry.id.is_some() {
                        found.push(path);
                    } else {
                        folders.push(path);
                    }
                }
                if count < LIST_PAGE_SIZE {
                    break;
                }
                offset += count;
            }
        }

        found.sort();
        Ok(found)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        validate_path(bucket)?;
        if paths.is_empty() {
            return Ok(());
        }
        for path in paths {
            validate_path(path)?;
        }

        let response = self
            .inner
            .client
            .delete(format!("{}/object/{bucket}", self.inner.base))
            .json(&RemoveRequest { prefixes: paths })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public.url(bucket, path)
    }

    fn object_path(&self, bucket: &str, url: &str) -> Option<String> {
        self.inner.public.path(bucket, url)
    }
}
