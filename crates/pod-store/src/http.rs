use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;
use pod_crypto::ContentHasher;
use pod_types::Digest;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// Outcome of a single failed request attempt.
enum Attempt {
    Retry(StoreError),
    Fail(StoreError),
}

impl Attempt {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Attempt::Retry(StoreError::Timeout { attempts: 1 })
        } else {
            Attempt::Retry(StoreError::Unavailable(err.to_string()))
        }
    }

    fn from_status(status: StatusCode, digest: Option<Digest>) -> Self {
        match status {
            StatusCode::NOT_FOUND => match digest {
                Some(d) => Attempt::Fail(StoreError::NotFound(d)),
                None => Attempt::Fail(StoreError::Unavailable("endpoint not found".into())),
            },
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                Attempt::Retry(StoreError::Unavailable(format!("store returned {s}")))
            }
            s => Attempt::Fail(StoreError::Unavailable(format!("store rejected request: {s}"))),
        }
    }
}

#[derive(Deserialize)]
struct PutResponse {
    digest: Digest,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    max_size: usize,
}

/// Client for a remote content store speaking the `/objects` + `/pins` API.
///
/// Transient failures (timeouts, connection errors, 5xx) are retried with
/// exponential backoff. `NotFound` is returned immediately. Responses whose
/// bytes hash to the requested digest are kept in an LRU cache; anything
/// else is passed through uncached.
pub struct HttpContentStore {
    client: Client,
    config: StoreConfig,
    hasher: ContentHasher,
    cache: Option<Mutex<LruCache<Digest, Vec<u8>>>>,
}

impl HttpContentStore {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StoreError::Unavailable(format!("http client: {e}")))?;
        let cache = NonZeroUsize::new(config.cache_capacity).map(|n| Mutex::new(LruCache::new(n)));
        Ok(Self {
            client,
            config,
            hasher: ContentHasher::CONTENT,
            cache,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Shareable public link for a digest.
    pub fn gateway_url(&self, digest: &Digest) -> String {
        format!(
            "{}/{}",
            self.config.gateway_url.trim_end_matches('/'),
            digest.to_hex()
        )
    }

    /// Number of verified payloads currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache
            .as_ref()
            .map(|c| c.lock().expect("lock poisoned").len())
            .unwrap_or(0)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn check_enabled(&self) -> StoreResult<()> {
        if self.config.disabled {
            Err(StoreError::Disabled)
        } else {
            Ok(())
        }
    }

    fn cached(&self, digest: &Digest) -> Option<Vec<u8>> {
        let cache = self.cache.as_ref()?;
        cache.lock().expect("lock poisoned").get(digest).cloned()
    }

    fn remember(&self, digest: Digest, bytes: &[u8]) {
        if let Some(cache) = &self.cache {
            cache.lock().expect("lock poisoned").put(digest, bytes.to_vec());
        }
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Attempt>>,
    {
        let policy = self.config.retry_policy();
        let total = policy.attempts();
        let mut last = StoreError::Unavailable("no attempt made".into());
        for n in 1..=total {
            match attempt().await {
                Ok(value) => {
                    debug!(op, attempt = n, "store request succeeded");
                    return Ok(value);
                }
                Err(Attempt::Fail(err)) => return Err(err),
                Err(Attempt::Retry(err)) => {
                    if n < total {
                        let delay = policy.delay(n);
                        warn!(op, attempt = n, error = %err, ?delay, "store request failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    last = err;
                }
            }
        }
        warn!(op, attempts = total, error = %last, "store request failed, giving up");
        Err(match last {
            StoreError::Timeout { .. } => StoreError::Timeout { attempts: total },
            other => other,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, Attempt> {
        request.send().await.map_err(Attempt::from_reqwest)
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn put(&self, payload: &[u8]) -> StoreResult<Digest> {
        self.check_enabled()?;
        let expected = self.hasher.hash(payload);
        let url = self.url("/objects");
        let url = url.as_str();
        let reported = self
            .with_retry("put", move || async move {
                let resp = self
                    .send(
                        self.client
                            .put(url)
                            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                            .body(payload.to_vec()),
                    )
                    .await?;
                let status = resp.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    let max = resp
                        .json::<ErrorBody>()
                        .await
                        .map(|b| b.max_size)
                        .unwrap_or(0);
                    return Err(Attempt::Fail(StoreError::PayloadTooLarge {
                        size: payload.len(),
                        max,
                    }));
                }
                if !status.is_success() {
                    return Err(Attempt::from_status(status, None));
                }
                resp.json::<PutResponse>()
                    .await
                    .map(|r| r.digest)
                    .map_err(|e| Attempt::Fail(StoreError::Serialization(e.to_string())))
            })
            .await?;

        if reported != expected {
            return Err(StoreError::HashMismatch { expected, reported });
        }
        self.remember(expected, payload);
        Ok(expected)
    }

    async fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>> {
        self.check_enabled()?;
        if let Some(bytes) = self.cached(digest) {
            debug!(digest = %digest.short_hex(), "served from cache");
            return Ok(bytes);
        }
        let url = self.url(&format!("/objects/{}", digest.to_hex()));
        let url = url.as_str();
        let bytes = self
            .with_retry("get", move || async move {
                let resp = self.send(self.client.get(url)).await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(Attempt::from_status(status, Some(*digest)));
                }
                resp.bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(Attempt::from_reqwest)
            })
            .await?;

        if self.hasher.verify(&bytes, digest) {
            self.remember(*digest, &bytes);
        } else {
            debug!(digest = %digest.short_hex(), "payload does not match digest, not cached");
        }
        Ok(bytes)
    }

    async fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        self.check_enabled()?;
        if self.cached(digest).is_some() {
            return Ok(true);
        }
        let url = self.url(&format!("/objects/{}", digest.to_hex()));
        let url = url.as_str();
        self.with_retry("exists", move || async move {
            let resp = self.send(self.client.head(url)).await?;
            match resp.status() {
                s if s.is_success() => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                s => Err(Attempt::from_status(s, Some(*digest))),
            }
        })
        .await
    }

    async fn pin(&self, digest: &Digest) -> StoreResult<()> {
        self.check_enabled()?;
        let url = self.url(&format!("/pins/{}", digest.to_hex()));
        let url = url.as_str();
        self.with_retry("pin", move || async move {
            let resp = self.send(self.client.post(url)).await?;
            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(Attempt::from_status(status, Some(*digest)))
            }
        })
        .await
    }

    async fn unpin(&self, digest: &Digest) -> StoreResult<()> {
        self.check_enabled()?;
        let url = self.url(&format!("/pins/{}", digest.to_hex()));
        let url = url.as_str();
        self.with_retry("unpin", move || async move {
            let resp = self.send(self.client.delete(url)).await?;
            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(Attempt::from_status(status, Some(*digest)))
            }
        })
        .await
    }
}

impl std::fmt::Debug for HttpContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentStore")
            .field("base_url", &self.config.base_url)
            .field("cached", &self.cached_len())
            .finish()
    }
}
