use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::db::HashDB;
use crate::hash::H256;

/// Node store kept in a `HashMap`; a batch lands under one write lock.
#[derive(Debug, Default)]
pub struct MemoryDB {
    nodes: RwLock<HashMap<H256, Vec<u8>>>,
}

impl MemoryDB {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<H256, Vec<u8>>> {
        self.nodes.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<H256, Vec<u8>>> {
        self.nodes.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, key: &H256) -> bool {
        self.read().contains_key(key)
    }

    pub fn remove(&self, key: &H256) -> Option<Vec<u8>> {
        self.write().remove(key)
    }
}

impl HashDB for MemoryDB {
    type Error = Infallible;

    fn get(&self, key: &H256) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.read().get(key).cloned())
    }

    fn put(&self, key: H256, value: Vec<u8>) -> Result<(), Self::Error> {
        self.write().insert(key, value);
        Ok(())
    }

    fn batch(&self, writes: Vec<(H256, Vec<u8>)>) -> Result<(), Self::Error> {
        self.write().extend(writes);
        Ok(())
    }

    fn flush(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}
