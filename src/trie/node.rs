use std::array;
use std::fmt;

use super::codec::encode_node;
use super::path::NibblePath;
use crate::error::TrieError;
use crate::hash::{H256, keccak256};

/// Child encodings shorter than this are embedded in their parent.
pub const INLINE_THRESHOLD: usize = 32;

/// How a parent refers to one of its children.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildRef {
    /// The child's full encoding, stored inside the parent.
    Inline(Vec<u8>),
    /// Keccak of the child's encoding; the bytes live in the node store.
    Hashed(H256),
}

impl ChildRef {
    /// Picks the reference form for an encoded node.
    pub fn from_encoded(encoded: &[u8]) -> Self {
        if encoded.len() < INLINE_THRESHOLD {
            ChildRef::Inline(encoded.to_vec())
        } else {
            ChildRef::Hashed(keccak256(encoded))
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ChildRef::Inline(_))
    }
}

impl fmt::Display for ChildRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChildRef::Hashed(h) => write!(f, "0x{}", hex::encode(h)),
            ChildRef::Inline(bytes) => write!(f, "inline 0x{}", hex::encode(bytes)),
        }
    }
}

//--- Node Kinds ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafNode {
    pub path: NibblePath,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionNode {
    path: NibblePath,
    child: ChildRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchNode {
    children: [Option<ChildRef>; 16], // 0-15 nibbles
    value: Option<Vec<u8>>,
}

//--- Merkle Patricia Node ---
#[derive(Clone, Debug)]
pub enum Node {
    Empty,
    Leaf(LeafNode),
    Extension(ExtensionNode),
    Branch(BranchNode),
}

impl LeafNode {
    pub fn new(path: NibblePath, value: Vec<u8>) -> Self {
        Self { path, value }
    }
}

impl ExtensionNode {
    /// An extension must consume at least one nibble.
    pub fn new(path: NibblePath, child: ChildRef) -> Result<Self, TrieError> {
        if path.is_empty() {
            return Err(TrieError::InvalidNode("extension with empty path".into()));
        }
        Ok(Self { path, child })
    }

    pub fn path(&self) -> &NibblePath {
        &self.path
    }

    pub fn child(&self) -> &ChildRef {
        &self.child
    }

    pub fn into_parts(self) -> (NibblePath, ChildRef) {
        (self.path, self.child)
    }
}

pub fn empty_children() -> [Option<ChildRef>; 16] {
    array::from_fn(|_| None)
}

impl BranchNode {
    /// Fails unless the branch has two children, or one child and a value.
    pub fn new(children: [Option<ChildRef>; 16], value: Option<Vec<u8>>) -> Result<Self, TrieError> {
        let count = children.iter().flatten().count();
        let minimal = count >= 2 || (count == 1 && value.is_some());
        if !minimal {
            return Err(TrieError::InvalidNode(format!(
                "branch with {} children and {} value",
                count,
                if value.is_some() { "a" } else { "no" }
            )));
        }
        Ok(Self { children, value })
    }

    pub fn children(&self) -> &[Option<ChildRef>; 16] {
        &self.children
    }

    pub fn child(&self, nibble: u8) -> Option<&ChildRef> {
        self.children
            .get(nibble as usize)
            .and_then(|child| child.as_ref())
    }

    pub fn child_count(&self) -> usize {
        self.children.iter().flatten().count()
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn into_parts(self) -> ([Option<ChildRef>; 16], Option<Vec<u8>>) {
        (self.children, self.value)
    }
}

impl Node {
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Empty => "empty",
            Node::Leaf(_) => "leaf",
            Node::Extension(_) => "extension",
            Node::Branch(_) => "branch",
        }
    }

    /// Canonical serialized form.
    pub fn encode(&self) -> Vec<u8> {
        encode_node(self)
    }

    /// Storage key of this node.
    pub fn hash(&self) -> H256 {
        keccak256(&self.encode())
    }

    /// Reference a parent would hold to this node. `None` for `Empty`,
    /// which parents represent as an absent slot.
    pub fn child_ref(&self) -> Option<ChildRef> {
        match self {
            Node::Empty => None,
            node => Some(ChildRef::from_encoded(&node.encode())),
        }
    }
}

/// Two nodes are equal when they serialize to the same bytes.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Empty => write!(f, "Empty"),
            Node::Leaf(leaf) => write!(
                f,
                "Leaf({}) -> 0x{}",
                leaf.path,
                hex::encode(&leaf.value)
            ),
            Node::Extension(ext) => write!(f, "Ext({}) -> {}", ext.path, ext.child),
            Node::Branch(branch) => {
                write!(f, "Branch[")?;
                let mut first = true;
                for (nibble, _) in branch
                    .children
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.is_some())
                {
                    if !first {
                        write!(f, ",")?;
                    }
                    write!(f, "{:x}", nibble)?;
                    first = false;
                }
                write!(f, "]")?;
                if let Some(v) = &branch.value {
                    write!(f, " value 0x{}", hex::encode(v))?;
                }
                Ok(())
            }
        }
    }
}
