//! Canonical binary codec for strata objects.
//!
//! The encoding is self-describing (every value opens with a kind byte),
//! little-endian, and canonical: map keys are emitted in ascending byte
//! order and all lengths are fixed-width u64, so re-encoding a decoded
//! object reproduces its bytes exactly. Content hashes are SHA3-256 over
//! these bytes, which makes them portable across implementations.
//!
//! Kind bytes:
//!
//! ```text
//! 0x01 string   0x02 bytes    0x03 bool       0x04 int64    0x05 float64
//! 0x06 map      0x07 list     0x08 hash
//! 0x64 commit   0x65 dataroot 0x66 collection 0x67 document
//! ```
//!
//! `Value::Null` has no wire representation; a nullable document field that
//! is null is simply absent from the encoded map.

mod decode;
mod encode;
mod error;
mod kind;

pub use decode::{
    decode_collection, decode_commit, decode_data_root, decode_document, decode_object,
    decode_value,
};
pub use encode::{
    encode_collection, encode_commit, encode_data_root, encode_document, encode_object,
    encode_value,
};
pub use error::{CodecError, CodecResult};
pub use kind::Kind;

use strata_types::{Hash, Object};

/// SHA3-256 of arbitrary bytes. The single content-addressing entry point.
pub fn content_hash(data: &[u8]) -> Hash {
    Hash::digest(data)
}

/// Encode an object and return both its canonical bytes and their hash.
pub fn hash_object(object: &Object) -> CodecResult<(Hash, Vec<u8>)> {
    let bytes = encode_object(object)?;
    let hash = content_hash(&bytes);
    Ok((hash, bytes))
}
