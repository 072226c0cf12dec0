pub mod error;
pub mod hash;
pub mod kv;
pub mod rlp;
pub mod trie;
pub mod utils;

pub use error::TrieError;
pub use hash::{EMPTY_ROOT, H256, keccak256};
pub use kv::{HashDB, MemoryDB, SledConfig, SledDB, StoreError};
pub use trie::{
    BranchNode, ChildRef, ExtensionNode, HexPrefix, LeafNode, NibblePath, Node, Trie,
};
