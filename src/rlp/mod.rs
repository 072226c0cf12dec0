//! Recursive length-prefix encoding.
//!
//! A value is either a byte string or a list of values. Trie nodes and any
//! other payload type in the system share this one wire format.

pub mod registry;

pub use registry::{CodecRegistry, RlpCodec};

use thiserror::Error;

/// Encoding of the empty byte string, also the marker for "nothing here".
pub const EMPTY_STRING: u8 = 0x80;
/// Encoding of the empty list.
pub const EMPTY_LIST: u8 = 0xc0;
/// Deepest list nesting the decoder will follow.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RlpData {
    String(Vec<u8>),
    List(Vec<RlpData>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RlpError {
    #[error("input is empty")]
    Empty,
    #[error("insufficient data: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("{0} trailing bytes after item")]
    TrailingBytes(usize),
    #[error("non-canonical encoding: {0}")]
    NonCanonical(&'static str),
    #[error("length prefix does not fit in usize")]
    LengthOverflow,
    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },
    #[error("lists nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("integer wider than 8 bytes")]
    IntegerOverflow,
    #[error("no codec registered for {0}")]
    UnknownCodec(&'static str),
    #[error("{0}")]
    Custom(String),
}

impl RlpData {
    pub fn kind(&self) -> &'static str {
        match self {
            RlpData::String(_) => "string",
            RlpData::List(_) => "list",
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], RlpError> {
        match self {
            RlpData::String(bytes) => Ok(bytes),
            other => Err(RlpError::UnexpectedShape {
                expected: "string",
                found: other.kind(),
            }),
        }
    }

    pub fn as_list(&self) -> Result<&[RlpData], RlpError> {
        match self {
            RlpData::List(items) => Ok(items),
            other => Err(RlpError::UnexpectedShape {
                expected: "list",
                found: other.kind(),
            }),
        }
    }

    /// Big-endian scalar with leading zeros stripped; zero is the empty string.
    pub fn from_u64(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let first_non_zero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        RlpData::String(bytes[first_non_zero..].to_vec())
    }

    pub fn as_u64(&self) -> Result<u64, RlpError> {
        let bytes = self.as_bytes()?;
        if bytes.len() > 8 {
            return Err(RlpError::IntegerOverflow);
        }
        if bytes.first() == Some(&0) {
            return Err(RlpError::NonCanonical("scalar with leading zero"));
        }
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}

/// Convert a length value to its minimal big-endian byte representation (no leading zeros)
fn length_to_minimal_bytes(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let first_non_zero = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[first_non_zero..].to_vec()
}

fn to_integer(data: &[u8]) -> Result<usize, RlpError> {
    if data.len() > std::mem::size_of::<usize>() {
        return Err(RlpError::LengthOverflow);
    }
    Ok(data
        .iter()
        .fold(0usize, |acc, &byte| (acc << 8) | byte as usize))
}

fn encode_length(len: usize, offset: u8) -> Vec<u8> {
    if len <= 55 {
        return vec![len as u8 + offset];
    }
    let len_bytes = length_to_minimal_bytes(len);
    let mut result = Vec::with_capacity(1 + len_bytes.len());
    result.push(len_bytes.len() as u8 + offset + 55);
    result.extend_from_slice(&len_bytes);
    result
}

pub fn encode_string(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return bytes.to_vec();
    }
    let mut encoded = encode_length(bytes.len(), 0x80);
    encoded.extend_from_slice(bytes);
    encoded
}

/// Wrap items that are already encoded in a list header.
pub fn encode_list_raw<I: AsRef<[u8]>>(items: &[I]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(|item| item.as_ref().len()).sum();
    let mut encoded = encode_length(payload_len, 0xc0);
    encoded.reserve(payload_len);
    for item in items {
        encoded.extend_from_slice(item.as_ref());
    }
    encoded
}

pub fn encode_rlp(data: &RlpData) -> Vec<u8> {
    match data {
        RlpData::String(bytes) => encode_string(bytes),
        RlpData::List(items) => {
            let encoded: Vec<Vec<u8>> = items.iter().map(encode_rlp).collect();
            encode_list_raw(&encoded)
        }
    }
}

fn take(data: &[u8], start: usize, len: usize) -> Result<&[u8], RlpError> {
    let end = start.checked_add(len).ok_or(RlpError::LengthOverflow)?;
    if data.len() < end {
        return Err(RlpError::Truncated {
            needed: end,
            available: data.len(),
        });
    }
    Ok(&data[start..end])
}

/// Reads a long-form length of `len_of_len` bytes following the prefix byte.
fn long_length(data: &[u8], len_of_len: usize) -> Result<usize, RlpError> {
    let len_bytes = take(data, 1, len_of_len)?;
    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonical("length with leading zero"));
    }
    let len = to_integer(len_bytes)?;
    if len <= 55 {
        return Err(RlpError::NonCanonical("long form for short payload"));
    }
    Ok(len)
}

fn decode_list_payload(mut payload: &[u8], depth: usize) -> Result<Vec<RlpData>, RlpError> {
    if depth > MAX_DEPTH {
        return Err(RlpError::TooDeep(MAX_DEPTH));
    }
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, consumed) = decode_nested(payload, depth)?;
        items.push(item);
        payload = &payload[consumed..];
    }
    Ok(items)
}

/// Decodes one item from the front of `data`, returning it and the bytes consumed.
fn decode_item(data: &[u8]) -> Result<(RlpData, usize), RlpError> {
    decode_nested(data, 0)
}

/// `depth` counts the lists enclosing `data`.
fn decode_nested(data: &[u8], depth: usize) -> Result<(RlpData, usize), RlpError> {
    let prefix = *data.first().ok_or(RlpError::Empty)?;

    match prefix {
        0..=0x7f => Ok((RlpData::String(vec![prefix]), 1)),
        0x80..=0xb7 => {
            let len = (prefix - 0x80) as usize;
            let payload = take(data, 1, len)?;
            if len == 1 && payload[0] < 0x80 {
                return Err(RlpError::NonCanonical("single byte below 0x80 with header"));
            }
            Ok((RlpData::String(payload.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let len_of_len = (prefix - 0xb7) as usize;
            let len = long_length(data, len_of_len)?;
            let payload = take(data, 1 + len_of_len, len)?;
            Ok((RlpData::String(payload.to_vec()), 1 + len_of_len + len))
        }
        0xc0..=0xf7 => {
            let len = (prefix - 0xc0) as usize;
            let payload = take(data, 1, len)?;
            Ok((RlpData::List(decode_list_payload(payload, depth + 1)?), 1 + len))
        }
        0xf8..=0xff => {
            let len_of_len = (prefix - 0xf7) as usize;
            let len = long_length(data, len_of_len)?;
            let payload = take(data, 1 + len_of_len, len)?;
            Ok((
                RlpData::List(decode_list_payload(payload, depth + 1)?),
                1 + len_of_len + len,
            ))
        }
    }
}

/// Decodes exactly one item; leftover bytes are an error.
pub fn decode_rlp(data: &[u8]) -> Result<RlpData, RlpError> {
    let (item, consumed) = decode_item(data)?;
    if consumed != data.len() {
        return Err(RlpError::TrailingBytes(data.len() - consumed));
    }
    Ok(item)
}
