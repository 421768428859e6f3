use bytes::{BufMut, BytesMut};

use strata_types::{Collection, Commit, DataRoot, Document, Hash, Object, Value};

use crate::error::{CodecError, CodecResult};
use crate::kind::Kind;

/// Encode a value to its canonical bytes.
///
/// `Value::Null` is rejected: null is expressed by absence from the
/// enclosing document, never by a wire kind.
pub fn encode_value(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buf = BytesMut::new();
    put_value(&mut buf, value)?;
    Ok(buf.to_vec())
}

/// Encode a commit: kind, parent hashes as a list, data-root hash.
pub fn encode_commit(commit: &Commit) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(Kind::Commit.as_byte());
    buf.put_u8(Kind::List.as_byte());
    buf.put_u64_le(commit.parents.len() as u64);
    for parent in &commit.parents {
        put_hash(&mut buf, parent);
    }
    put_hash(&mut buf, &commit.data_root);
    buf.to_vec()
}

/// Encode a data-root: kind, then name → collection hash in sorted order.
pub fn encode_data_root(root: &DataRoot) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(Kind::DataRoot.as_byte());
    put_hash_map(&mut buf, &root.collections);
    buf.to_vec()
}

/// Encode a collection: kind, then id → document hash in sorted order.
pub fn encode_collection(collection: &Collection) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(Kind::Collection.as_byte());
    put_hash_map(&mut buf, &collection.documents);
    buf.to_vec()
}

/// Encode a document: kind, then field → value in sorted order.
///
/// Null-valued fields are dropped — absence is the canonical spelling of
/// null, so documents that agree on every present field encode identically.
pub fn encode_document(document: &Document) -> CodecResult<Vec<u8>> {
    let mut buf = BytesMut::new();
    buf.put_u8(Kind::Document.as_byte());
    let present: Vec<(&String, &Value)> = document
        .fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .collect();
    buf.put_u8(Kind::Map.as_byte());
    buf.put_u64_le(present.len() as u64);
    for (key, value) in present {
        put_string(&mut buf, key);
        put_value(&mut buf, value)?;
    }
    Ok(buf.to_vec())
}

/// Encode any object kind.
pub fn encode_object(object: &Object) -> CodecResult<Vec<u8>> {
    match object {
        Object::Commit(c) => Ok(encode_commit(c)),
        Object::DataRoot(r) => Ok(encode_data_root(r)),
        Object::Collection(c) => Ok(encode_collection(c)),
        Object::Document(d) => encode_document(d),
    }
}

fn put_value(buf: &mut BytesMut, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => return Err(CodecError::Unencodable("null has no wire kind")),
        Value::Bool(b) => {
            buf.put_u8(Kind::Bool.as_byte());
            buf.put_u8(u8::from(*b));
        }
        Value::Int(i) => {
            buf.put_u8(Kind::Int64.as_byte());
            buf.put_u64_le(*i as u64);
        }
        Value::Float(f) => {
            buf.put_u8(Kind::Float64.as_byte());
            buf.put_u64_le(f.to_bits());
        }
        Value::String(s) => put_string(buf, s),
        Value::Bytes(b) => {
            buf.put_u8(Kind::Bytes.as_byte());
            buf.put_u64_le(b.len() as u64);
            buf.put_slice(b);
        }
        Value::List(items) => {
            buf.put_u8(Kind::List.as_byte());
            buf.put_u64_le(items.len() as u64);
            for item in items {
                put_value(buf, item)?;
            }
        }
        Value::Map(map) => {
            buf.put_u8(Kind::Map.as_byte());
            buf.put_u64_le(map.len() as u64);
            for (key, item) in map {
                put_string(buf, key);
                put_value(buf, item)?;
            }
        }
    }
    Ok(())
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u8(Kind::String.as_byte());
    buf.put_u64_le(s.len() as u64);
    buf.put_slice(s.as_bytes());
}

fn put_hash(buf: &mut BytesMut, hash: &Hash) {
    buf.put_u8(Kind::Hash.as_byte());
    buf.put_u64_le(32);
    buf.put_slice(hash.as_bytes());
}

fn put_hash_map(buf: &mut BytesMut, map: &std::collections::BTreeMap<String, Hash>) {
    buf.put_u8(Kind::Map.as_byte());
    buf.put_u64_le(map.len() as u64);
    for (key, hash) in map {
        put_string(buf, key);
        put_hash(buf, hash);
    }
}
