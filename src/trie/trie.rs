use tracing::trace;

use super::codec::{decode_node, encode_node};
use super::node::{BranchNode, ChildRef, ExtensionNode, LeafNode, Node, empty_children};
use super::path::{NibblePath, bytes_to_nibbles};
use crate::error::TrieError;
use crate::hash::{EMPTY_ROOT, H256, keccak256};
use crate::kv::HashDB;

/// Nodes created by one mutation, written to the store as a single batch.
#[derive(Debug, Default)]
struct WriteSet {
    writes: Vec<(H256, Vec<u8>)>,
}

impl WriteSet {
    /// Serializes `node` and returns how a parent should reference it,
    /// staging a store write when it is too large to inline.
    fn commit(&mut self, node: &Node) -> Option<ChildRef> {
        if node.is_empty() {
            return None;
        }
        let encoded = encode_node(node);
        let child = ChildRef::from_encoded(&encoded);
        if let ChildRef::Hashed(hash) = child {
            self.writes.push((hash, encoded));
        }
        Some(child)
    }
}

#[derive(Debug)]
enum DeleteResult {
    NotFound,      // Key wasn't found
    Deleted(Node), // Key was deleted, replace the visited node with this one
}

/// Merkle-Patricia trie over a content-addressed node store.
///
/// Only the root hash is held in memory. Every mutation builds new nodes
/// bottom-up and swaps in a new root; nodes reachable from older roots are
/// left untouched, so those roots stay readable through [`Trie::get_at_root`].
#[derive(Debug)]
pub struct Trie<D: HashDB> {
    db: D,
    root: H256,
}

impl<D: HashDB> Trie<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            root: EMPTY_ROOT,
        }
    }

    /// Opens a trie at a previously committed root.
    pub fn with_root(db: D, root: H256) -> Self {
        Self { db, root }
    }

    pub fn root_hash(&self) -> H256 {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root == EMPTY_ROOT
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn into_db(self) -> D {
        self.db
    }

    fn load(&self, hash: &H256) -> Result<Node, TrieError> {
        let encoded = self
            .db
            .get(hash)
            .map_err(TrieError::store)?
            .ok_or(TrieError::NodeNotFound(*hash))?;
        decode_node(&encoded)
    }

    fn load_root(&self, root: &H256) -> Result<Node, TrieError> {
        if *root == EMPTY_ROOT {
            return Ok(Node::Empty);
        }
        self.load(root)
    }

    pub fn root_node(&self) -> Result<Node, TrieError> {
        self.load_root(&self.root)
    }

    /// Turns a child reference into the node it points at.
    pub fn resolve(&self, child: &ChildRef) -> Result<Node, TrieError> {
        match child {
            ChildRef::Inline(encoded) => decode_node(encoded),
            ChildRef::Hashed(hash) => self.load(hash),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        self.get_at_root(&self.root, key)
    }

    /// Looks `key` up under any root that is still in the store.
    pub fn get_at_root(&self, root: &H256, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let nibbles = bytes_to_nibbles(key);
        let mut path: &[u8] = &nibbles;
        let mut node = self.load_root(root)?;

        loop {
            match node {
                Node::Empty => return Ok(None),
                Node::Leaf(leaf) => {
                    return Ok((leaf.path.as_slice() == path).then_some(leaf.value));
                }
                Node::Extension(ext) => {
                    let prefix = ext.path().as_slice();
                    if !path.starts_with(prefix) {
                        return Ok(None);
                    }
                    path = &path[prefix.len()..];
                    node = self.resolve(ext.child())?;
                }
                Node::Branch(branch) => match path.split_first() {
                    None => return Ok(branch.value().map(<[u8]>::to_vec)),
                    Some((&nibble, rest)) => match branch.child(nibble) {
                        None => return Ok(None),
                        Some(child) => {
                            node = self.resolve(child)?;
                            path = rest;
                        }
                    },
                },
            }
        }
    }

    /// Inserts or overwrites `key`. An empty value deletes the key, since the
    /// empty string marks an absent value in the node encoding.
    pub fn put(&mut self, key: &[u8], value: impl AsRef<[u8]>) -> Result<(), TrieError> {
        let value = value.as_ref();
        if value.is_empty() {
            self.delete(key)?;
            return Ok(());
        }

        let nibbles = bytes_to_nibbles(key);
        let root = self.root_node()?;
        let mut writes = WriteSet::default();
        let new_root = self.insert_at(root, &nibbles, value.to_vec(), &mut writes)?;
        self.commit_root(new_root, writes)
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool, TrieError> {
        let nibbles = bytes_to_nibbles(key);
        let root = self.root_node()?;
        let mut writes = WriteSet::default();
        match self.delete_at(root, &nibbles, &mut writes)? {
            DeleteResult::NotFound => Ok(false),
            DeleteResult::Deleted(new_root) => {
                self.commit_root(new_root, writes)?;
                Ok(true)
            }
        }
    }

    /// Stores the staged nodes plus the new root in one batch, then moves
    /// the root pointer. The root is always stored by hash, even when small.
    fn commit_root(&mut self, root: Node, mut writes: WriteSet) -> Result<(), TrieError> {
        let hash = match root {
            Node::Empty => EMPTY_ROOT,
            root => {
                let encoded = encode_node(&root);
                let hash = keccak256(&encoded);
                writes.writes.push((hash, encoded));
                hash
            }
        };

        let count = writes.writes.len();
        if count > 0 {
            self.db.batch(writes.writes).map_err(TrieError::store)?;
        }
        trace!(root = %hex::encode(hash), nodes = count, "committed trie root");
        self.root = hash;
        Ok(())
    }

    /// Puts `prefix` in front of `node`, merging paths so that no two
    /// extensions end up chained and no extension points at a leaf.
    fn prefixed(&self, prefix: &[u8], node: Node, writes: &mut WriteSet) -> Result<Node, TrieError> {
        if prefix.is_empty() {
            return Ok(node);
        }
        match node {
            Node::Empty => Ok(Node::Empty),
            Node::Leaf(leaf) => Ok(Node::Leaf(LeafNode::new(
                NibblePath::from(prefix).merge(&leaf.path),
                leaf.value,
            ))),
            Node::Extension(ext) => {
                let (path, child) = ext.into_parts();
                let merged = NibblePath::from(prefix).merge(&path);
                Ok(Node::Extension(ExtensionNode::new(merged, child)?))
            }
            branch @ Node::Branch(_) => match writes.commit(&branch) {
                Some(child) => Ok(Node::Extension(ExtensionNode::new(
                    NibblePath::from(prefix),
                    child,
                )?)),
                None => Ok(Node::Empty),
            },
        }
    }

    fn insert_at(
        &self,
        node: Node,
        path: &[u8],
        value: Vec<u8>,
        writes: &mut WriteSet,
    ) -> Result<Node, TrieError> {
        match node {
            Node::Empty => Ok(Node::Leaf(LeafNode::new(NibblePath::from(path), value))),

            Node::Leaf(leaf) => {
                let k = leaf.path.lcp_len(path);
                if k == leaf.path.len() && k == path.len() {
                    // identical keys, we should override the value
                    return Ok(Node::Leaf(LeafNode::new(leaf.path, value)));
                }

                // Build a branch at the divergent point
                let mut children = empty_children();
                let mut branch_value = None;

                let old_rem = &leaf.path.nibbles[k..];
                match old_rem.split_first() {
                    None => branch_value = Some(leaf.value),
                    Some((&nibble, rest)) => {
                        let old_leaf = Node::Leaf(LeafNode::new(NibblePath::from(rest), leaf.value));
                        children[nibble as usize] = writes.commit(&old_leaf);
                    }
                }

                let new_rem = &path[k..];
                match new_rem.split_first() {
                    None => branch_value = Some(value),
                    Some((&nibble, rest)) => {
                        let new_leaf = Node::Leaf(LeafNode::new(NibblePath::from(rest), value));
                        children[nibble as usize] = writes.commit(&new_leaf);
                    }
                }

                let branch = Node::Branch(BranchNode::new(children, branch_value)?);
                self.prefixed(&path[..k], branch, writes)
            }

            Node::Extension(ext) => {
                let k = ext.path().lcp_len(path);
                let (ext_path, child) = ext.into_parts();

                if k == ext_path.len() {
                    // whole extension matches, continue into its child
                    let child = self.resolve(&child)?;
                    let new_child = self.insert_at(child, &path[k..], value, writes)?;
                    return self.prefixed(ext_path.as_slice(), new_child, writes);
                }

                // Split the extension where the paths diverge
                let mut children = empty_children();
                let mut branch_value = None;

                let ext_rem = &ext_path.nibbles[k..];
                if let Some((&nibble, rest)) = ext_rem.split_first() {
                    children[nibble as usize] = if rest.is_empty() {
                        Some(child)
                    } else {
                        let shorter = ExtensionNode::new(NibblePath::from(rest), child)?;
                        writes.commit(&Node::Extension(shorter))
                    };
                }

                let new_rem = &path[k..];
                match new_rem.split_first() {
                    None => branch_value = Some(value),
                    Some((&nibble, rest)) => {
                        let new_leaf = Node::Leaf(LeafNode::new(NibblePath::from(rest), value));
                        children[nibble as usize] = writes.commit(&new_leaf);
                    }
                }

                let branch = Node::Branch(BranchNode::new(children, branch_value)?);
                self.prefixed(&path[..k], branch, writes)
            }

            Node::Branch(branch) => {
                let (mut children, mut branch_value) = branch.into_parts();
                match path.split_first() {
                    None => branch_value = Some(value),
                    Some((&nibble, rest)) => {
                        let slot = &mut children[nibble as usize];
                        let child = match slot.take() {
                            Some(child) => self.resolve(&child)?,
                            None => Node::Empty,
                        };
                        let new_child = self.insert_at(child, rest, value, writes)?;
                        *slot = writes.commit(&new_child);
                    }
                }
                Ok(Node::Branch(BranchNode::new(children, branch_value)?))
            }
        }
    }

    fn delete_at(
        &self,
        node: Node,
        path: &[u8],
        writes: &mut WriteSet,
    ) -> Result<DeleteResult, TrieError> {
        match node {
            Node::Empty => Ok(DeleteResult::NotFound),

            Node::Leaf(leaf) => {
                if leaf.path.as_slice() == path {
                    Ok(DeleteResult::Deleted(Node::Empty))
                } else {
                    Ok(DeleteResult::NotFound)
                }
            }

            Node::Extension(ext) => {
                // the whole extension path must match, otherwise the key doesn't exist
                if !path.starts_with(ext.path().as_slice()) {
                    return Ok(DeleteResult::NotFound);
                }
                let (ext_path, child) = ext.into_parts();
                let child = self.resolve(&child)?;
                match self.delete_at(child, &path[ext_path.len()..], writes)? {
                    DeleteResult::NotFound => Ok(DeleteResult::NotFound),
                    DeleteResult::Deleted(new_child) => Ok(DeleteResult::Deleted(
                        self.prefixed(ext_path.as_slice(), new_child, writes)?,
                    )),
                }
            }

            Node::Branch(branch) => {
                let (mut children, mut branch_value) = branch.into_parts();
                let mut fresh = None;

                match path.split_first() {
                    None => {
                        if branch_value.take().is_none() {
                            return Ok(DeleteResult::NotFound);
                        }
                    }
                    Some((&nibble, rest)) => {
                        let slot = nibble as usize;
                        let Some(child) = children[slot].take() else {
                            return Ok(DeleteResult::NotFound);
                        };
                        let child = self.resolve(&child)?;
                        match self.delete_at(child, rest, writes)? {
                            DeleteResult::NotFound => return Ok(DeleteResult::NotFound),
                            DeleteResult::Deleted(new_child) => {
                                if !new_child.is_empty() {
                                    fresh = Some((slot, new_child));
                                }
                            }
                        }
                    }
                }

                let node = self.collapse_branch(children, branch_value, fresh, writes)?;
                Ok(DeleteResult::Deleted(node))
            }
        }
    }

    /// Rebuilds a branch after a removal. `fresh` is the replacement for the
    /// slot the key went through, not yet committed so that a collapse can
    /// merge it without writing it first.
    fn collapse_branch(
        &self,
        mut children: [Option<ChildRef>; 16],
        value: Option<Vec<u8>>,
        fresh: Option<(usize, Node)>,
        writes: &mut WriteSet,
    ) -> Result<Node, TrieError> {
        let mut live: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_some())
            .map(|(slot, _)| slot)
            .collect();
        if let Some((slot, _)) = &fresh {
            live.push(*slot);
        }

        match (live.as_slice(), value) {
            ([], None) => Ok(Node::Empty),
            ([], Some(value)) => Ok(Node::Leaf(LeafNode::new(NibblePath::default(), value))),
            // Branch with single child and no value should collapse
            (&[slot], None) => {
                let child = match fresh {
                    Some((_, node)) => node,
                    None => match children[slot].take() {
                        Some(child) => self.resolve(&child)?,
                        None => Node::Empty,
                    },
                };
                self.prefixed(&[slot as u8], child, writes)
            }
            (_, value) => {
                if let Some((slot, node)) = fresh {
                    children[slot] = writes.commit(&node);
                }
                Ok(Node::Branch(BranchNode::new(children, value)?))
            }
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::kv::MemoryDB;
    use rand::random;

    fn trie() -> Trie<MemoryDB> {
        Trie::new(MemoryDB::new())
    }

    #[test]
    fn empty_trie_has_empty_root() {
        let trie = trie();
        assert_eq!(trie.root_hash(), EMPTY_ROOT);
        assert!(trie.is_empty());
        assert_eq!(trie.root_node().unwrap(), Node::Empty);
        assert!(trie.db().is_empty());
    }

    #[test]
    fn single_insert_creates_leaf_root() {
        let mut trie = trie();
        let key = random::<[u8; 32]>();

        trie.put(&key, b"hello").unwrap();

        match trie.root_node().unwrap() {
            Node::Leaf(leaf) => {
                assert_eq!(leaf.path, NibblePath::from_bytes(&key));
                assert_eq!(leaf.value, b"hello".to_vec());
            }
            other => panic!("expected leaf root, got {}", other),
        }
        // small root is still stored under its hash
        assert_eq!(trie.db().len(), 1);
    }

    #[test]
    fn divergent_keys_create_branch_root() {
        let mut trie = trie();
        let key1 = [0x10u8; 32];
        let key2 = [0xf0u8; 32];

        trie.put(&key1, b"hello").unwrap();
        trie.put(&key2, b"world").unwrap();

        assert!(matches!(trie.root_node().unwrap(), Node::Branch(_)));
    }

    #[test]
    fn common_prefix_creates_extension() {
        let mut trie = trie();

        let mut key1 = random::<[u8; 32]>();
        let mut key2 = random::<[u8; 32]>();
        key1[..6].copy_from_slice(b"common");
        key2[..6].copy_from_slice(b"common");
        key1[6..].copy_from_slice(b"abcdefghijklmnopqrstuvwxyz");
        key2[6..].copy_from_slice(b"zyxwvutsrqponmlkjihgfedcba");

        trie.put(&key1, b"hello").unwrap();
        trie.put(&key2, b"world").unwrap();

        match trie.root_node().unwrap() {
            Node::Extension(ext) => {
                // 'a' (0x61) and 'z' (0x7a) already differ in the high nibble
                assert_eq!(ext.path(), &NibblePath::from_bytes(&key1[..6]));
                assert!(matches!(trie.resolve(ext.child()).unwrap(), Node::Branch(_)));
            }
            other => panic!("expected extension root, got {}", other),
        }
    }

    #[test]
    fn key_ending_at_branch_stores_value_in_branch() {
        let mut trie = trie();
        trie.put(b"dog", b"puppy").unwrap();
        trie.put(b"doge", b"coin").unwrap();

        let Node::Extension(ext) = trie.root_node().unwrap() else {
            panic!("expected extension root");
        };
        assert_eq!(ext.path(), &NibblePath::from_bytes(b"dog"));
        let Node::Branch(branch) = trie.resolve(ext.child()).unwrap() else {
            panic!("expected branch below extension");
        };
        assert_eq!(branch.value(), Some(&b"puppy"[..]));
        assert_eq!(branch.child_count(), 1);
    }

    #[test]
    fn splitting_extension_at_last_nibble_reuses_child() {
        let mut trie = trie();
        trie.put(&[0x12, 0x34], b"a").unwrap();
        trie.put(&[0x12, 0x35], b"b").unwrap();
        // extension [1,2,3] -> branch at 4/5; now diverge at the third nibble
        trie.put(&[0x12, 0x44], b"c").unwrap();

        assert_eq!(trie.get(&[0x12, 0x34]).unwrap(), Some(b"a".to_vec()));
        assert_eq!(trie.get(&[0x12, 0x35]).unwrap(), Some(b"b".to_vec()));
        assert_eq!(trie.get(&[0x12, 0x44]).unwrap(), Some(b"c".to_vec()));

        let Node::Extension(ext) = trie.root_node().unwrap() else {
            panic!("expected extension root");
        };
        assert_eq!(ext.path().nibbles, vec![1, 2]);
    }

    #[test]
    fn delete_collapses_branch_into_leaf() {
        let mut trie = trie();
        trie.put(b"dog", b"puppy").unwrap();
        trie.put(b"doge", b"coin").unwrap();

        assert!(trie.delete(b"dog").unwrap());

        match trie.root_node().unwrap() {
            Node::Leaf(leaf) => assert_eq!(leaf.path, NibblePath::from_bytes(b"doge")),
            other => panic!("expected leaf root, got {}", other),
        }
    }

    #[test]
    fn delete_branch_value_keeps_other_children() {
        let mut trie = trie();
        trie.put(b"do", b"verb").unwrap();
        trie.put(b"dog", b"puppy").unwrap();
        trie.put(b"doge", b"coin").unwrap();

        assert!(trie.delete(b"dog").unwrap());
        assert_eq!(trie.get(b"do").unwrap(), Some(b"verb".to_vec()));
        assert_eq!(trie.get(b"doge").unwrap(), Some(b"coin".to_vec()));
        assert_eq!(trie.get(b"dog").unwrap(), None);
    }

    #[test]
    fn delete_missing_key_leaves_root() {
        let mut trie = trie();
        trie.put(b"dog", b"puppy").unwrap();
        let root = trie.root_hash();

        assert!(!trie.delete(b"cat").unwrap());
        assert!(!trie.delete(b"do").unwrap());
        assert!(!trie.delete(b"doge").unwrap());
        assert_eq!(trie.root_hash(), root);
    }

    #[test]
    fn empty_value_deletes() {
        let mut trie = trie();
        trie.put(b"dog", b"puppy").unwrap();
        trie.put(b"dog", b"").unwrap();
        assert!(trie.is_empty());
        assert_eq!(trie.get(b"dog").unwrap(), None);
    }

    #[test]
    fn empty_key_is_a_valid_key() {
        let mut trie = trie();
        trie.put(b"", b"root").unwrap();
        trie.put(b"a", b"x").unwrap();

        assert_eq!(trie.get(b"").unwrap(), Some(b"root".to_vec()));
        assert_eq!(trie.get(b"a").unwrap(), Some(b"x".to_vec()));
        assert_eq!(
            hex::encode(trie.root_hash()),
            "945ce6bcb8909027052c7e79360e6935731fc001e6c341b392ce30b50b3dc26e"
        );

        assert!(trie.delete(b"").unwrap());
        assert_eq!(trie.get(b"").unwrap(), None);
        assert!(matches!(trie.root_node().unwrap(), Node::Leaf(_)));
    }

    #[test]
    fn missing_node_is_reported() {
        let mut trie = trie();
        for i in 0u8..32 {
            trie.put(&[i; 8], [i; 40]).unwrap();
        }
        let Node::Branch(branch) = trie.root_node().unwrap() else {
            panic!("expected branch root");
        };
        let Some(ChildRef::Hashed(hash)) = branch.child(0).cloned() else {
            panic!("expected hashed child");
        };
        trie.db().remove(&hash);

        assert!(matches!(
            trie.get(&[0u8; 8]),
            Err(TrieError::NodeNotFound(h)) if h == hash
        ));
        assert!(matches!(
            trie.put(&[0u8; 8], b"new"),
            Err(TrieError::NodeNotFound(_))
        ));
        // unaffected subtrees still resolve
        assert_eq!(trie.get(&[0x1f; 8]).unwrap(), Some(vec![0x1f; 40]));
    }

    #[test]
    fn missing_root_is_reported() {
        let trie = Trie::with_root(MemoryDB::new(), [7u8; 32]);
        assert!(matches!(
            trie.get(b"anything"),
            Err(TrieError::NodeNotFound(_))
        ));
    }
}
