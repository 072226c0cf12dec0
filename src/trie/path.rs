use std::fmt;

use super::hex_prefix;
use crate::error::TrieError;

/// Half-byte path representation (256 -> 16 possible values for trie sparsity)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NibblePath {
    pub nibbles: Vec<u8>,
}

impl From<&[u8]> for NibblePath {
    fn from(nibbles: &[u8]) -> Self {
        NibblePath::new(nibbles.to_vec())
    }
}

impl From<Vec<u8>> for NibblePath {
    fn from(nibbles: Vec<u8>) -> Self {
        NibblePath::new(nibbles)
    }
}

impl NibblePath {
    /// Elements must be 0-15; checked in debug builds only.
    pub fn new(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|&n| n < 16), "nibble out of range");
        NibblePath { nibbles }
    }

    /// Every key byte becomes two nibbles, high half first.
    pub fn from_bytes(bytes: &[u8]) -> NibblePath {
        NibblePath {
            nibbles: bytes_to_nibbles(bytes),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TrieError> {
        nibbles_to_bytes(&self.nibbles)
    }

    pub fn to_compact_hex_encoding(&self) -> Vec<u8> {
        to_compact_hex_encoding(&self.nibbles)
    }

    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.nibbles
    }

    pub fn merge(&self, other: &NibblePath) -> NibblePath {
        let mut merged_nibbles = self.nibbles.clone();
        merged_nibbles.extend_from_slice(&other.nibbles);
        NibblePath {
            nibbles: merged_nibbles,
        }
    }

    /// Length of the longest common prefix with `other`.
    pub fn lcp_len(&self, other: &[u8]) -> usize {
        lcp_len(&self.nibbles, other)
    }
}

impl fmt::Display for NibblePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for nibble in &self.nibbles {
            write!(f, "{:x}", nibble)?;
        }
        Ok(())
    }
}

pub fn lcp_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4); // extracts the higher 4 bits
        nibbles.push(byte & 0x0f); // extracts the lower 4 bits
    }
    nibbles
}

pub fn nibbles_to_bytes(nibbles: &[u8]) -> Result<Vec<u8>, TrieError> {
    if nibbles.len() % 2 != 0 {
        return Err(TrieError::InvalidLength(nibbles.len()));
    }
    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| pair[0] << 4 | pair[1])
        .collect())
}

/// Packs a raw path with the leaf flag left out: the first nibble only
/// carries odd/even parity.
pub fn to_compact_hex_encoding(nibbles: &[u8]) -> Vec<u8> {
    hex_prefix::encode(nibbles, false)
}
