use std::collections::BTreeMap;

use crate::hash::Hash;
use crate::value::Value;

/// The kind of a persisted object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    DataRoot,
    Collection,
    Document,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::DataRoot => write!(f, "dataroot"),
            Self::Collection => write!(f, "collection"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// A point in history: parent commits plus the data tree they produced.
///
/// `parents` is empty only for the genesis commit; one entry for an
/// ordinary commit, two for a merge. Order is preserved — the canonical
/// encoding keeps parents in insertion order, so reordering would change
/// the commit's own hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub parents: Vec<Hash>,
    pub data_root: Hash,
}

impl Commit {
    pub fn new(parents: Vec<Hash>, data_root: Hash) -> Self {
        Self { parents, data_root }
    }

    /// Returns `true` if this is a genesis commit.
    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns `true` if this is a merge commit.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// The data tree root of one commit: collection name → collection hash.
///
/// The key set equals the non-builtin object types of the schema. BTreeMap
/// keeps keys in ascending byte order, which the canonical encoding
/// requires.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataRoot {
    pub collections: BTreeMap<String, Hash>,
}

impl DataRoot {
    pub fn new(collections: BTreeMap<String, Hash>) -> Self {
        Self { collections }
    }

    pub fn get(&self, name: &str) -> Option<&Hash> {
        self.collections.get(name)
    }
}

/// One collection: document id → document hash. Ids are UUIDv4 strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    pub documents: BTreeMap<String, Hash>,
}

impl Collection {
    pub fn new(documents: BTreeMap<String, Hash>) -> Self {
        Self { documents }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Hash> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A schema-typed record of fields.
///
/// Null-valued fields are never stored: a nullable field that is null is
/// simply absent, so two documents that agree on every present field encode
/// to the same bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field value, treating absence as null.
    pub fn field_or_null(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }
}

/// Union of the four persisted object kinds, for generic put/get paths.
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    Commit(Commit),
    DataRoot(DataRoot),
    Collection(Collection),
    Document(Document),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Commit(_) => ObjectKind::Commit,
            Self::DataRoot(_) => ObjectKind::DataRoot,
            Self::Collection(_) => ObjectKind::Collection,
            Self::Document(_) => ObjectKind::Document,
        }
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Self::Commit(commit)
    }
}

impl From<DataRoot> for Object {
    fn from(root: DataRoot) -> Self {
        Self::DataRoot(root)
    }
}

impl From<Collection> for Object {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

impl From<Document> for Object {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}
