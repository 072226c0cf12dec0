pub mod codec;
pub mod hex_prefix;
pub mod node;
pub mod path;
pub mod trie;

pub use codec::{decode_node, encode_node};
pub use hex_prefix::HexPrefix;
pub use node::{BranchNode, ChildRef, ExtensionNode, INLINE_THRESHOLD, LeafNode, Node};
pub use path::{NibblePath, bytes_to_nibbles, nibbles_to_bytes, to_compact_hex_encoding};
pub use trie::Trie;
