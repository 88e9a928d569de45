//! Reward Store Client
//!
//! Boundary to the reward aggregator service: lists current reward
//! records, persists leaf snapshots, and returns the latest snapshot for
//! claim-time rebuilds. The trait seam keeps both settlement flows
//! testable without a live aggregator.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::core::snapshot::LeafSnapshot;
use crate::rewards::record::RewardRecord;

/// Reward store failures. Surfaced to the caller; no on-chain action is
/// taken once the store is unreachable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The aggregator could not be reached.
    #[error("reward store unreachable: {0}")]
    Unreachable(String),

    /// The aggregator answered with a non-success status.
    #[error("reward store returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The aggregator's response did not match the expected shape.
    #[error("malformed reward store response: {0}")]
    Malformed(String),
}

/// Operations this core consumes from the reward aggregator.
#[async_trait]
pub trait RewardStore: Send + Sync {
    /// List all current reward records.
    async fn list_records(&self) -> Result<Vec<RewardRecord>, StoreError>;

    /// Look up the record registered for a user identity.
    async fn find_record(&self, user_tag: &str) -> Result<Option<RewardRecord>, StoreError>;

    /// Persist a settled leaf snapshot, replacing the previous one.
    async fn save_snapshot(&self, snapshot: &LeafSnapshot) -> Result<(), StoreError>;

    /// Retrieve the latest persisted snapshot, if any settlement ran yet.
    async fn latest_snapshot(&self) -> Result<Option<LeafSnapshot>, StoreError>;
}

/// HTTP client for the aggregator's REST API.
pub struct HttpRewardStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRewardStore {
    /// Create a client for the aggregator at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RewardStore for HttpRewardStore {
    async fn list_records(&self) -> Result<Vec<RewardRecord>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, "/rewards")
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn find_record(&self, user_tag: &str) -> Result<Option<RewardRecord>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/rewards/{user_tag}"))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::check(response)
            .await?
            .json()
            .await
            .map(Some)
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn save_snapshot(&self, snapshot: &LeafSnapshot) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::PUT, "/snapshot")
            .json(snapshot)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    async fn latest_snapshot(&self) -> Result<Option<LeafSnapshot>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, "/snapshot")
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::check(response)
            .await?
            .json()
            .await
            .map(Some)
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store used by settlement and claim tests.

    use std::sync::Mutex;

    use super::*;

    /// Deterministic in-memory reward store.
    pub struct MemoryRewardStore {
        records: Vec<RewardRecord>,
        snapshot: Mutex<Option<LeafSnapshot>>,
        fail_fetch: bool,
    }

    impl MemoryRewardStore {
        pub fn with_records(records: Vec<RewardRecord>) -> Self {
            Self {
                records,
                snapshot: Mutex::new(None),
                fail_fetch: false,
            }
        }

        pub fn unreachable() -> Self {
            Self {
                records: Vec::new(),
                snapshot: Mutex::new(None),
                fail_fetch: true,
            }
        }

        pub fn with_snapshot(self, snapshot: LeafSnapshot) -> Self {
            *self.snapshot.lock().unwrap() = Some(snapshot);
            self
        }

        pub fn stored_snapshot(&self) -> Option<LeafSnapshot> {
            self.snapshot.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RewardStore for MemoryRewardStore {
        async fn list_records(&self) -> Result<Vec<RewardRecord>, StoreError> {
            if self.fail_fetch {
                return Err(StoreError::Unreachable("store offline".into()));
            }
            Ok(self.records.clone())
        }

        async fn find_record(&self, user_tag: &str) -> Result<Option<RewardRecord>, StoreError> {
            if self.fail_fetch {
                return Err(StoreError::Unreachable("store offline".into()));
            }
            Ok(self
                .records
                .iter()
                .find(|record| record.user_tag == user_tag)
                .cloned())
        }

        async fn save_snapshot(&self, snapshot: &LeafSnapshot) -> Result<(), StoreError> {
            *self.snapshot.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }

        async fn latest_snapshot(&self) -> Result<Option<LeafSnapshot>, StoreError> {
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }
}
