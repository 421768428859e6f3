use std::collections::BTreeMap;

use strata_types::{Collection, Commit, DataRoot, Document, Hash, Object, Value};

use crate::error::{CodecError, CodecResult};
use crate::kind::Kind;

/// Decode a single value. The input must contain exactly one value.
pub fn decode_value(data: &[u8]) -> CodecResult<Value> {
    let mut reader = Reader::new(data);
    let value = read_value(&mut reader)?;
    reader.finish()?;
    Ok(value)
}

/// Decode a commit. The input must contain exactly one commit.
pub fn decode_commit(data: &[u8]) -> CodecResult<Commit> {
    let mut reader = Reader::new(data);
    reader.expect_kind(Kind::Commit, "commit")?;
    let commit = read_commit_body(&mut reader)?;
    reader.finish()?;
    Ok(commit)
}

/// Decode a data-root.
pub fn decode_data_root(data: &[u8]) -> CodecResult<DataRoot> {
    let mut reader = Reader::new(data);
    reader.expect_kind(Kind::DataRoot, "dataroot")?;
    let root = DataRoot::new(read_hash_map(&mut reader)?);
    reader.finish()?;
    Ok(root)
}

/// Decode a collection.
pub fn decode_collection(data: &[u8]) -> CodecResult<Collection> {
    let mut reader = Reader::new(data);
    reader.expect_kind(Kind::Collection, "collection")?;
    let collection = Collection::new(read_hash_map(&mut reader)?);
    reader.finish()?;
    Ok(collection)
}

/// Decode a document.
pub fn decode_document(data: &[u8]) -> CodecResult<Document> {
    let mut reader = Reader::new(data);
    reader.expect_kind(Kind::Document, "document")?;
    let document = read_document_body(&mut reader)?;
    reader.finish()?;
    Ok(document)
}

/// Decode any of the four object kinds, dispatching on the leading byte.
pub fn decode_object(data: &[u8]) -> CodecResult<Object> {
    let mut reader = Reader::new(data);
    let kind = Kind::from_byte(reader.take_u8()?)?;
    let object = match kind {
        Kind::Commit => Object::Commit(read_commit_body(&mut reader)?),
        Kind::DataRoot => Object::DataRoot(DataRoot::new(read_hash_map(&mut reader)?)),
        Kind::Collection => Object::Collection(Collection::new(read_hash_map(&mut reader)?)),
        Kind::Document => Object::Document(read_document_body(&mut reader)?),
        other => {
            return Err(CodecError::WrongKind {
                expected: "commit, dataroot, collection, or document",
                found: other.as_byte(),
            })
        }
    };
    reader.finish()?;
    Ok(object)
}

// ---------------------------------------------------------------------------
// Body readers
// ---------------------------------------------------------------------------

fn read_commit_body(reader: &mut Reader<'_>) -> CodecResult<Commit> {
    reader.expect_kind(Kind::List, "list")?;
    let count = reader.take_len()?;
    let mut parents = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        parents.push(read_tagged_hash(reader)?);
    }
    let data_root = read_tagged_hash(reader)?;
    Ok(Commit::new(parents, data_root))
}

fn read_document_body(reader: &mut Reader<'_>) -> CodecResult<Document> {
    reader.expect_kind(Kind::Map, "map")?;
    let count = reader.take_len()?;
    let mut fields = BTreeMap::new();
    let mut last_key: Option<String> = None;
    for _ in 0..count {
        let key = read_tagged_string(reader)?;
        check_key_order(&mut last_key, &key)?;
        let value = read_value(reader)?;
        fields.insert(key, value);
    }
    Ok(Document::new(fields))
}

fn read_hash_map(reader: &mut Reader<'_>) -> CodecResult<BTreeMap<String, Hash>> {
    reader.expect_kind(Kind::Map, "map")?;
    let count = reader.take_len()?;
    let mut map = BTreeMap::new();
    let mut last_key: Option<String> = None;
    for _ in 0..count {
        let key = read_tagged_string(reader)?;
        check_key_order(&mut last_key, &key)?;
        let hash = read_tagged_hash(reader)?;
        map.insert(key, hash);
    }
    Ok(map)
}

fn read_value(reader: &mut Reader<'_>) -> CodecResult<Value> {
    let kind = Kind::from_byte(reader.take_u8()?)?;
    match kind {
        Kind::String => Ok(Value::String(read_string_body(reader)?)),
        Kind::Bytes => {
            let len = reader.take_len()?;
            Ok(Value::Bytes(reader.take_slice(len)?.to_vec()))
        }
        Kind::Bool => match reader.take_u8()? {
            0x00 => Ok(Value::Bool(false)),
            0x01 => Ok(Value::Bool(true)),
            other => Err(CodecError::InvalidBool(other)),
        },
        Kind::Int64 => Ok(Value::Int(reader.take_u64()? as i64)),
        Kind::Float64 => Ok(Value::Float(f64::from_bits(reader.take_u64()?))),
        Kind::List => {
            let count = reader.take_len()?;
            let mut items = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                items.push(read_value(reader)?);
            }
            Ok(Value::List(items))
        }
        Kind::Map => {
            let count = reader.take_len()?;
            let mut map = BTreeMap::new();
            let mut last_key: Option<String> = None;
            for _ in 0..count {
                let key = read_tagged_string(reader)?;
                check_key_order(&mut last_key, &key)?;
                let value = read_value(reader)?;
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        // Hashes and object kinds never appear in value position.
        other => Err(CodecError::WrongKind {
            expected: "value kind",
            found: other.as_byte(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Primitive readers
// ---------------------------------------------------------------------------

fn read_tagged_string(reader: &mut Reader<'_>) -> CodecResult<String> {
    reader.expect_kind(Kind::String, "string")?;
    read_string_body(reader)
}

fn read_string_body(reader: &mut Reader<'_>) -> CodecResult<String> {
    let len = reader.take_len()?;
    let bytes = reader.take_slice(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::InvalidUtf8(e.to_string()))
}

fn read_tagged_hash(reader: &mut Reader<'_>) -> CodecResult<Hash> {
    reader.expect_kind(Kind::Hash, "hash")?;
    let len = reader.take_u64()?;
    if len != 32 {
        return Err(CodecError::InvalidHashLength(len));
    }
    let bytes = reader.take_slice(32)?;
    let mut raw = [0u8; 32];
    raw.copy_from_slice(bytes);
    Ok(Hash::from_raw(raw))
}

fn check_key_order(last: &mut Option<String>, key: &str) -> CodecResult<()> {
    if let Some(prev) = last {
        if prev.as_str() >= key {
            return Err(CodecError::NonCanonicalMap(key.to_string()));
        }
    }
    *last = Some(key.to_string());
    Ok(())
}

/// Byte cursor with truncation checks. All reads advance the position.
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take_u8(&mut self) -> CodecResult<u8> {
        let slice = self.take_slice(1)?;
        Ok(slice[0])
    }

    fn take_u64(&mut self) -> CodecResult<u64> {
        let slice = self.take_slice(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(slice);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a u64 length and narrow it to usize. Callers cap preallocation,
    /// so a corrupt length fails on a truncation check rather than an
    /// oversized reserve.
    fn take_len(&mut self) -> CodecResult<usize> {
        let len = self.take_u64()?;
        usize::try_from(len).map_err(|_| CodecError::LengthOutOfRange(len))
    }

    fn take_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.data.len() < len {
            return Err(CodecError::Truncated {
                needed: len - self.data.len(),
                remaining: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn expect_kind(&mut self, expected: Kind, name: &'static str) -> CodecResult<()> {
        let byte = self.take_u8()?;
        let kind = Kind::from_byte(byte)?;
        if kind != expected {
            return Err(CodecError::WrongKind {
                expected: name,
                found: byte,
            });
        }
        Ok(())
    }

    fn finish(&self) -> CodecResult<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes(self.data.len()))
        }
    }
}
