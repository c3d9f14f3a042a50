use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RemoteStore;
use crate::config::StoreConfig;
use crate::domain::{Metadata, UploadRecord};
use crate::error::{ConfigError, StoreError};

/// how writes authenticate against the realtime database
#[derive(Clone)]
pub enum Credential {
    /// legacy database secret or firebase id token, sent as `auth=`
    DatabaseSecret(String),
    /// google oauth2 access token, sent as `access_token=`
    AccessToken(String),
}

#[derive(Deserialize)]
struct CredentialFile {
    database_secret: Option<String>,
    access_token: Option<String>,
    private_key: Option<String>,
}

impl Credential {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Credential {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|reason| ConfigError::Credential {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_json(content: &str) -> Result<Self, String> {
        let file: CredentialFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(token) = present(file.access_token) {
            return Ok(Self::AccessToken(token));
        }
        if let Some(secret) = present(file.database_secret) {
            return Ok(Self::DatabaseSecret(secret));
        }
        if file.private_key.is_some() {
            return Err(
                "service account keys must be exchanged for an access_token first".to_string(),
            );
        }
        Err("expected a database_secret or access_token field".to_string())
    }

    fn query_pair(&self) -> (&'static str, &str) {
        match self {
            Self::DatabaseSecret(s) => ("auth", s.as_str()),
            Self::AccessToken(t) => ("access_token", t.as_str()),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseSecret(_) => f.write_str("DatabaseSecret(..)"),
            Self::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// firebase realtime database over its rest api
pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: String,
    root: String,
    credential: Credential,
}

impl FirebaseStore {
    pub fn new(config: &StoreConfig, credential: Credential) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.database_url.trim_end_matches('/').to_string(),
            root: config.root.trim_matches('/').to_string(),
            credential,
        })
    }

    fn url(&self, path: &str) -> String {
        if self.root.is_empty() {
            format!("{}/{}.json", self.base_url, path)
        } else {
            format!("{}/{}/{}.json", self.base_url, self.root, path)
        }
    }

    async fn put<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), StoreError> {
        self.client
            .put(self.url(path))
            .query(&[self.credential.query_pair()])
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn set_current(&self, record: &UploadRecord) -> Result<(), StoreError> {
        self.put("current", record).await
    }

    async fn push_history(&self, record: &UploadRecord) -> Result<String, StoreError> {
        let response: PushResponse = self
            .client
            .post(self.url("history"))
            .query(&[self.credential.query_pair()])
            .json(record)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.name.is_empty() {
            return Err(StoreError::Response("push returned an empty key".to_string()));
        }
        Ok(response.name)
    }

    async fn delete_history(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete(self.url(&format!("history/{key}")))
            .query(&[self.credential.query_pair()])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn history_keys(&self) -> Result<Vec<String>, StoreError> {
        // shallow listing maps every child key to `true`; an empty node is `null`
        let listing: Option<BTreeMap<String, serde_json::Value>> = self
            .client
            .get(self.url("history"))
            .query(&[self.credential.query_pair(), ("shallow", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // push keys are time-ordered, so lexical order is insertion order
        Ok(listing.map(|m| m.into_keys().collect()).unwrap_or_default())
    }

    async fn set_metadata(&self, metadata: &Metadata) -> Result<(), StoreError> {
        self.put("metadata", metadata).await
    }
}
