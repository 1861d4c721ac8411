//! Module `codec` supplies the small set of `Codec` implementations
//! needed to exercise the engine without a caller-supplied codec: raw
//! bytes, fixed-width numerics (grounded on `types.rs`'s
//! `to_be_bytes`/`from_be_bytes` pattern for `i32`/`i64`), UTF-8
//! strings, and a void codec for tuples that carry no value.

use std::convert::TryInto;

use crate::{
    error::{Error, Result},
    traits::Codec,
};

/// Passes bytes through unchanged.
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: Option<&Vec<u8>>) -> Result<Option<Vec<u8>>> {
        Ok(value.cloned())
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        Ok(bytes.map(|b| b.to_vec()))
    }
}

/// UTF-8 strings, stored as their raw bytes.
pub struct Utf8Codec;

impl Codec<String> for Utf8Codec {
    fn encode(&self, value: Option<&String>) -> Result<Option<Vec<u8>>> {
        Ok(value.map(|s| s.as_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<String>> {
        match bytes {
            None => Ok(None),
            Some(b) => {
                let s = String::from_utf8(b.to_vec())
                    .map_err(|e| Error::Backend(format!("utf8 decode: {}", e)))?;
                Ok(Some(s))
            }
        }
    }
}

/// Fixed-width big-endian encoding for `f64`.
pub struct NumericCodec;

impl Codec<f64> for NumericCodec {
    fn encode(&self, value: Option<&f64>) -> Result<Option<Vec<u8>>> {
        Ok(value.map(|v| v.to_be_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<f64>> {
        match bytes {
            None => Ok(None),
            Some(b) if b.len() == 8 => {
                let arr: [u8; 8] = b.try_into().unwrap();
                Ok(Some(f64::from_be_bytes(arr)))
            }
            Some(b) => Err(Error::Backend(format!("f64 decode: expected 8 bytes, got {}", b.len()))),
        }
    }
}

impl Codec<i64> for NumericCodec {
    fn encode(&self, value: Option<&i64>) -> Result<Option<Vec<u8>>> {
        Ok(value.map(|v| v.to_be_bytes().to_vec()))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<i64>> {
        match bytes {
            None => Ok(None),
            Some(b) if b.len() == 8 => {
                let arr: [u8; 8] = b.try_into().unwrap();
                Ok(Some(i64::from_be_bytes(arr)))
            }
            Some(b) => Err(Error::Backend(format!("i64 decode: expected 8 bytes, got {}", b.len()))),
        }
    }
}

/// For tuples that carry no value. Rejects anything but an absent
/// value on either side of the round trip.
pub struct VoidCodec;

impl Codec<()> for VoidCodec {
    fn encode(&self, value: Option<&()>) -> Result<Option<Vec<u8>>> {
        match value {
            None => Ok(None),
            Some(_) => Err(Error::Misuse("VoidCodec cannot encode a present value".to_string())),
        }
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<()>> {
        match bytes {
            None => Ok(None),
            Some(_) => Err(Error::Misuse("VoidCodec cannot decode a present value".to_string())),
        }
    }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
