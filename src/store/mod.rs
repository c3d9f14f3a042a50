//! ==============================================================================
//! store - remote key-value store abstraction
//! ==============================================================================
//!
//! purpose:
//!     the uploader only needs five operations from the hosted database. the
//!     `RemoteStore` trait names them so the loop can run against the real
//!     firebase rest api or against an in-memory double.
//!
//! layout under the namespace root (default `cement_plant_data`):
//!     current    overwritten every cycle
//!     history    append-only list, store-generated keys
//!     metadata   overwritten every cycle
//!
//! relationships:
//!     - used by: uploader.rs
//!     - firebase.rs: reqwest client for the realtime database rest api
//!     - memory.rs: process-local store for tests and dry runs
//!
//! ==============================================================================

mod firebase;
mod memory;

pub use firebase::{Credential, FirebaseStore};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::domain::{Metadata, UploadRecord};
use crate::error::StoreError;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// overwrite the current snapshot
    async fn set_current(&self, record: &UploadRecord) -> Result<(), StoreError>;

    /// append to history, returning the key the store assigned
    async fn push_history(&self, record: &UploadRecord) -> Result<String, StoreError>;

    async fn delete_history(&self, key: &str) -> Result<(), StoreError>;

    /// existing history keys, oldest first
    async fn history_keys(&self) -> Result<Vec<String>, StoreError>;

    async fn set_metadata(&self, metadata: &Metadata) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<S> {
    async fn set_current(&self, record: &UploadRecord) -> Result<(), StoreError> {
        (**self).set_current(record).await
    }

    async fn push_history(&self, record: &UploadRecord) -> Result<String, StoreError> {
        (**self).push_history(record).await
    }

    async fn delete_history(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete_history(key).await
    }

    async fn history_keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).history_keys().await
    }

    async fn set_metadata(&self, metadata: &Metadata) -> Result<(), StoreError> {
        (**self).set_metadata(metadata).await
    }
}
