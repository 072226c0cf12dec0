use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use super::{EMPTY_LIST, RlpData, RlpError, decode_rlp, encode_rlp};

/// Encode/decode pair for one payload type against the shared RLP format.
pub trait RlpCodec: Send + Sync {
    type Item;

    fn encode(&self, item: &Self::Item) -> RlpData;
    fn decode(&self, data: &RlpData) -> Result<Self::Item, RlpError>;
}

/// Maps payload types to their codecs.
///
/// Built once when a component starts and handed to whatever needs to
/// serialize payloads. Nothing registers itself implicitly.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

type BoxedCodec<T> = Box<dyn RlpCodec<Item = T>>;

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` for `T`. Returns `true` if it replaced an earlier one.
    pub fn register<T, C>(&mut self, codec: C) -> bool
    where
        T: 'static,
        C: RlpCodec<Item = T> + 'static,
    {
        let boxed: BoxedCodec<T> = Box::new(codec);
        self.codecs
            .insert(TypeId::of::<T>(), Box::new(boxed))
            .is_some()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.codecs.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn codec<T: 'static>(&self) -> Result<&dyn RlpCodec<Item = T>, RlpError> {
        self.codecs
            .get(&TypeId::of::<T>())
            .and_then(|codec| codec.downcast_ref::<BoxedCodec<T>>())
            .map(|codec| codec.as_ref())
            .ok_or(RlpError::UnknownCodec(type_name::<T>()))
    }

    pub fn encode<T: 'static>(&self, item: &T) -> Result<Vec<u8>, RlpError> {
        Ok(encode_rlp(&self.codec::<T>()?.encode(item)))
    }

    pub fn decode<T: 'static>(&self, bytes: &[u8]) -> Result<T, RlpError> {
        self.codec::<T>()?.decode(&decode_rlp(bytes)?)
    }

    /// `None` is written as the empty list.
    pub fn encode_optional<T: 'static>(&self, item: Option<&T>) -> Result<Vec<u8>, RlpError> {
        match item {
            Some(item) => self.encode(item),
            None => Ok(vec![EMPTY_LIST]),
        }
    }

    /// An empty list decodes to `None`.
    pub fn decode_optional<T: 'static>(&self, bytes: &[u8]) -> Result<Option<T>, RlpError> {
        let data = decode_rlp(bytes)?;
        if matches!(&data, RlpData::List(items) if items.is_empty()) {
            return Ok(None);
        }
        self.codec::<T>()?.decode(&data).map(Some)
    }
}
