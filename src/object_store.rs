use std::collections::BTreeSet;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{aws::AmazonS3Builder, path::Path as ObjectPath, ObjectStore};
use tracing::{debug, info};

use crate::config::{Backend, StoreConfig};
use crate::error::Result;

/// A single bucket on an S3-compatible store (IBM COS, MinIO, AWS), a local
/// directory, or memory.
///
/// Stages see only three operations: list the keys, fetch a whole object
/// and write a whole object.
/// `key` as the store lists it back: percent-encoded, empty segments and
/// surrounding `/` removed. Two keys address the same object exactly when
/// their canonical forms are equal.
pub fn canonical_key(key: &str) -> String {
    ObjectPath::from(key).to_string()
}

#[derive(Clone, Debug)]
pub struct Bucket {
    name: String,
    store: Arc<dyn ObjectStore>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new("memory", Arc::new(InMemory::new()))
    }

    /// Builds the client described by `config`.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        match &config.backend {
            Backend::S3 {
                endpoint,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&config.bucket)
                    .with_region(region)
                    .with_virtual_hosted_style_request(false);
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(key) = access_key_id {
                    builder = builder.with_access_key_id(key);
                }
                if let Some(secret) = secret_access_key {
                    builder = builder.with_secret_access_key(secret);
                }
                info!(bucket = %config.bucket, ?endpoint, "connecting to object storage");
                Ok(Self::new(config.bucket.clone(), Arc::new(builder.build()?)))
            }
            Backend::Local { root } => {
                info!(root = %root.display(), "using local directory as bucket");
                let store = LocalFileSystem::new_with_prefix(root)?;
                Ok(Self::new(config.bucket.clone(), Arc::new(store)))
            }
            Backend::Memory => Ok(Self::new(config.bucket.clone(), Arc::new(InMemory::new()))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every key currently in the bucket.
    pub async fn keys(&self) -> Result<BTreeSet<String>> {
        let objects: Vec<_> = self.store.list(None).try_collect().await?;
        let keys: BTreeSet<String> = objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect();
        debug!(bucket = %self.name, count = keys.len(), "listed objects");
        Ok(keys)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let result = self.store.get(&ObjectPath::from(key)).await?;
        let bytes = result.bytes().await?;
        debug!(bucket = %self.name, key, size = bytes.len(), "fetched object");
        Ok(bytes.to_vec())
    }

    pub async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let size = body.len();
        self.store.put(&ObjectPath::from(key), body.into()).await?;
        info!(bucket = %self.name, key, size, "object pushed to object storage");
        Ok(())
    }
}
