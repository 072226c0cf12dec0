use thiserror::Error;

use crate::hash::H256;

#[derive(Debug, Error)]
pub enum TrieError {
    /// Nibbles can only be packed into bytes two at a time.
    #[error("odd nibble count {0} cannot be packed into bytes")]
    InvalidLength(usize),

    #[error("malformed hex-prefix encoding: {0}")]
    MalformedEncoding(String),

    #[error("malformed node: {0}")]
    MalformedNode(String),

    /// A node that would break the minimal-form invariant.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("node 0x{} not found in store", hex::encode(.0))]
    NodeNotFound(H256),

    #[error("node store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrieError {
    pub(crate) fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TrieError::Store(Box::new(err))
    }
}
