//! Hex-prefix path encoding.
//!
//! The high nibble of the first byte holds `2 * is_leaf + (len % 2)`. An odd
//! path stores its first nibble in the low half of that byte; an even path
//! pads it with zero. The remaining nibbles are packed two per byte.

use super::path::NibblePath;
use crate::error::TrieError;

const LEAF_FLAG: u8 = 0x2;
const ODD_FLAG: u8 = 0x1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPrefix {
    pub path: NibblePath,
    pub is_leaf: bool,
}

impl HexPrefix {
    pub fn new(path: NibblePath, is_leaf: bool) -> Self {
        Self { path, is_leaf }
    }

    pub fn leaf(path: NibblePath) -> Self {
        Self::new(path, true)
    }

    pub fn extension(path: NibblePath) -> Self {
        Self::new(path, false)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.path.nibbles, self.is_leaf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrieError> {
        let (path, is_leaf) = decode(bytes)?;
        Ok(Self { path, is_leaf })
    }
}

/// Encoded size for a path of `path_len` nibbles: `ceil((path_len + 1) / 2)`.
pub fn encoded_len(path_len: usize) -> usize {
    path_len / 2 + 1
}

/// Every element of `path` must be a nibble (0-15). Checked in debug
/// builds; release builds keep only the low half of each element, so the
/// flag nibble can never be overwritten.
pub fn encode(path: &[u8], is_leaf: bool) -> Vec<u8> {
    debug_assert!(path.iter().all(|&n| n < 16), "nibble out of range");
    let odd = path.len() % 2 == 1;
    let mut flag = if is_leaf { LEAF_FLAG } else { 0 };
    let mut encoded = Vec::with_capacity(encoded_len(path.len()));

    let rest = if odd {
        flag |= ODD_FLAG;
        encoded.push(flag << 4 | (path[0] & 0x0f));
        &path[1..]
    } else {
        encoded.push(flag << 4);
        path
    };

    encoded.extend(
        rest.chunks_exact(2)
            .map(|pair| (pair[0] & 0x0f) << 4 | (pair[1] & 0x0f)),
    );
    encoded
}

pub fn decode(bytes: &[u8]) -> Result<(NibblePath, bool), TrieError> {
    let (&first, rest) = bytes
        .split_first()
        .ok_or_else(|| TrieError::MalformedEncoding("empty input".into()))?;

    let flag = first >> 4;
    if flag > (LEAF_FLAG | ODD_FLAG) {
        return Err(TrieError::MalformedEncoding(format!(
            "invalid flag nibble {:#x}",
            flag
        )));
    }

    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if flag & ODD_FLAG != 0 {
        nibbles.push(first & 0x0f);
    }
    for byte in rest {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }

    Ok((NibblePath { nibbles }, flag & LEAF_FLAG != 0))
}
