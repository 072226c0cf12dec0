//! Node <-> RLP bytes.
//!
//! Leaf:      [hp(path, leaf), value]
//! Extension: [hp(path, ext), child]
//! Branch:    [child_0 .. child_15, value]
//! Empty:     0x80

use super::hex_prefix::HexPrefix;
use super::node::{
    BranchNode, ChildRef, ExtensionNode, INLINE_THRESHOLD, LeafNode, Node, empty_children,
};
use crate::error::TrieError;
use crate::rlp::{EMPTY_STRING, RlpData, decode_rlp, encode_list_raw, encode_rlp, encode_string};

fn encode_child(child: &ChildRef) -> Vec<u8> {
    match child {
        ChildRef::Inline(bytes) => bytes.clone(), // already RLP, embed as is
        ChildRef::Hashed(h) => encode_string(h),
    }
}

pub fn encode_node(node: &Node) -> Vec<u8> {
    match node {
        Node::Empty => vec![EMPTY_STRING],
        Node::Leaf(leaf) => {
            let encoded_path = HexPrefix::leaf(leaf.path.clone()).to_bytes();
            encode_list_raw(&[encode_string(&encoded_path), encode_string(&leaf.value)])
        }
        Node::Extension(ext) => {
            let encoded_path = HexPrefix::extension(ext.path().clone()).to_bytes();
            encode_list_raw(&[encode_string(&encoded_path), encode_child(ext.child())])
        }
        Node::Branch(branch) => {
            let mut items: Vec<Vec<u8>> = Vec::with_capacity(17);
            for child in branch.children() {
                items.push(match child {
                    Some(child) => encode_child(child),
                    None => vec![EMPTY_STRING],
                });
            }
            items.push(encode_string(branch.value().unwrap_or_default()));
            encode_list_raw(&items)
        }
    }
}

fn malformed(msg: impl Into<String>) -> TrieError {
    TrieError::MalformedNode(msg.into())
}

fn bytes_field(field: &RlpData, what: &str) -> Result<Vec<u8>, TrieError> {
    field
        .as_bytes()
        .map(<[u8]>::to_vec)
        .map_err(|e| malformed(format!("{}: {}", what, e)))
}

/// Distinguish inline bytes vs 32-byte hash.
fn decode_child(field: &RlpData) -> Result<ChildRef, TrieError> {
    match field {
        RlpData::String(bytes) => {
            let hash: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                malformed(format!("child reference of {} bytes", bytes.len()))
            })?;
            Ok(ChildRef::Hashed(hash))
        }
        RlpData::List(_) => {
            let encoded = encode_rlp(field);
            if encoded.len() >= INLINE_THRESHOLD {
                return Err(malformed(format!(
                    "inline child of {} bytes",
                    encoded.len()
                )));
            }
            Ok(ChildRef::Inline(encoded))
        }
    }
}

fn decode_short(items: &[RlpData]) -> Result<Node, TrieError> {
    let path_bytes = items[0]
        .as_bytes()
        .map_err(|e| malformed(format!("path: {}", e)))?;
    let prefix = HexPrefix::from_bytes(path_bytes)?;

    if prefix.is_leaf {
        let value = bytes_field(&items[1], "leaf value")?;
        if value.is_empty() {
            return Err(malformed("leaf with empty value"));
        }
        Ok(Node::Leaf(LeafNode::new(prefix.path, value)))
    } else {
        let child = decode_child(&items[1])?;
        let ext = ExtensionNode::new(prefix.path, child).map_err(|e| malformed(e.to_string()))?;
        Ok(Node::Extension(ext))
    }
}

fn decode_branch(items: &[RlpData]) -> Result<Node, TrieError> {
    let mut children = empty_children();
    for (slot, field) in children.iter_mut().zip(&items[..16]) {
        if !matches!(field, RlpData::String(b) if b.is_empty()) {
            *slot = Some(decode_child(field)?);
        }
    }

    let value = bytes_field(&items[16], "branch value")?;
    let value = (!value.is_empty()).then_some(value);

    let branch = BranchNode::new(children, value).map_err(|e| malformed(e.to_string()))?;
    Ok(Node::Branch(branch))
}

pub fn decode_node(bytes: &[u8]) -> Result<Node, TrieError> {
    let rlp = decode_rlp(bytes).map_err(|e| malformed(e.to_string()))?;

    match &rlp {
        RlpData::String(b) if b.is_empty() => Ok(Node::Empty),
        RlpData::String(_) => Err(malformed("top-level node must be a list")),
        RlpData::List(items) => match items.len() {
            2 => decode_short(items),
            17 => decode_branch(items),
            n => Err(malformed(format!("list of {} items", n))),
        },
    }
}
