//! Codec Module
//!
//! Converts cached values to and from the bytes kept in the backing store.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

// == Codec ==
/// Value <-> bytes conversion used by the distributed cache.
///
/// `unmarshal` writes into a caller-supplied value so a codec can reuse the
/// destination; on error the destination is left unchanged.
pub trait Codec<V>: Send + Sync {
    fn marshal(&self, value: &V) -> Result<Vec<u8>>;

    fn unmarshal(&self, bytes: &[u8], value: &mut V) -> Result<()>;
}

mod sealed {
    pub trait Sealed {}
}

/// Primitive types carried by [`TextCodec`] as their textual form.
pub trait TextValue: sealed::Sealed + Display + FromStr {}

macro_rules! text_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl TextValue for $ty {}
        )*
    };
}

text_value!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String,
);

// == Text Codec ==
/// Stores primitives as their decimal / literal text, readable by other
/// clients of the same store.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl<V: TextValue> Codec<V> for TextCodec {
    fn marshal(&self, value: &V) -> Result<Vec<u8>> {
        Ok(value.to_string().into_bytes())
    }

    fn unmarshal(&self, bytes: &[u8], value: &mut V) -> Result<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CacheError::Serialization(format!("invalid utf-8: {}", e)))?;
        *value = text
            .parse()
            .map_err(|_| CacheError::Serialization(format!("cannot parse {:?}", text)))?;
        Ok(())
    }
}

// == JSON Codec ==
/// Stores any serde type as JSON.
pub struct JsonCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonCodec<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<V> Codec<V> for JsonCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn marshal(&self, value: &V) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal(&self, bytes: &[u8], value: &mut V) -> Result<()> {
        *value = serde_json::from_slice(bytes)?;
        Ok(())
    }
}
