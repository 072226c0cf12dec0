use std::sync::Arc;

use sled::{Batch, Tree};
use thiserror::Error;
use tracing::{debug, trace};

use super::config::SledConfig;
use crate::hash::H256;

/// Content-addressed node storage.
pub trait HashDB {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, key: &H256) -> Result<Option<Vec<u8>>, Self::Error>;
    /// Idempotent: a key always maps to the same bytes.
    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), Self::Error>;
    /// Applies every write or none of them.
    fn batch(&self, writes: Vec<(H256, Vec<u8>)>) -> Result<(), Self::Error>;
    fn flush(&self) -> Result<(), Self::Error>;
}

impl<D: HashDB + ?Sized> HashDB for Arc<D> {
    type Error = D::Error;

    fn get(&self, key: &H256) -> Result<Option<Vec<u8>>, Self::Error> {
        (**self).get(key)
    }

    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), Self::Error> {
        (**self).put(key, value)
    }

    fn batch(&self, writes: Vec<(H256, Vec<u8>)>) -> Result<(), Self::Error> {
        (**self).batch(writes)
    }

    fn flush(&self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
}

#[derive(Debug)]
pub struct SledDB {
    tree: Tree,
    flush_on_batch: bool,
}

impl SledDB {
    pub fn open(path: impl AsRef<std::path::Path>, tree_name: &str) -> Result<Self, StoreError> {
        Self::with_config(&SledConfig {
            path: path.as_ref().to_path_buf(),
            tree: tree_name.to_string(),
            ..SledConfig::default()
        })
    }

    pub fn with_config(config: &SledConfig) -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .path(&config.path)
            .temporary(config.temporary)
            .cache_capacity(config.cache_capacity)
            .open()?;
        let tree = db.open_tree(config.tree.as_bytes())?;
        debug!(path = %config.path.display(), tree = %config.tree, "opened sled node store");
        Ok(Self {
            tree,
            flush_on_batch: config.flush_on_batch,
        })
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl HashDB for SledDB {
    type Error = StoreError;

    fn get(&self, key: &H256) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.tree.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), Self::Error> {
        trace!(key = %hex::encode(key), len = value.len(), "put node");
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn batch(&self, writes: Vec<(H256, Vec<u8>)>) -> Result<(), Self::Error> {
        let count = writes.len();
        let mut batch = Batch::default();
        for (key, value) in writes {
            batch.insert(key.to_vec(), value);
        }
        self.tree.apply_batch(batch)?;
        if self.flush_on_batch {
            self.tree.flush()?;
        }
        trace!(count, "applied node batch");
        Ok(())
    }

    fn flush(&self) -> Result<(), Self::Error> {
        self.tree.flush()?;
        Ok(())
    }
}
