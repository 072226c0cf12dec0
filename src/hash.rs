use sha3::{Digest, Keccak256};

/// 32-byte Keccak digest.
pub type H256 = [u8; 32];

/// Root hash of an empty trie: keccak256 of the RLP empty string (0x80).
pub const EMPTY_ROOT: H256 = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
];

pub fn keccak256(bytes: &[u8]) -> H256 {
    Keccak256::digest(bytes).into()
}
