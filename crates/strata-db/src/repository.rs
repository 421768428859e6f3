use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use strata_codec::{
    decode_collection, decode_commit, decode_data_root, decode_document, hash_object,
};
use strata_dag::{merge_base, CommitReader, DagError, DagResult};
use strata_schema::{compile, CompiledSchema};
use strata_store::{object_key, Storage, StoreError, HEAD_KEY, SCHEMA_KEY};
use strata_types::{Collection, Commit, DataRoot, Document, Hash, Object};

use crate::error::{DbError, DbResult};
use crate::merge::{Conflict, ConflictResolver, Resolution, TheirsResolver};
use crate::transaction::Transaction;

/// Handle to one strata database.
///
/// Everything except the `head` and `schema` keys is content-addressed and
/// immutable; the repository is the exclusive writer of those two cells and
/// callers serialize access to it.
pub struct Repository<S: Storage> {
    storage: S,
    schema: CompiledSchema,
    resolver: Box<dyn ConflictResolver>,
}

impl<S: Storage> Repository<S> {
    /// Initialize a fresh database: compile the schema, write one empty
    /// collection per object type, the data-root, the genesis commit, and
    /// persist the `schema` and `head` keys.
    pub fn init(storage: S, schema_source: &str) -> DbResult<Self> {
        let schema = compile(schema_source)?;
        let repo = Self {
            storage,
            schema,
            resolver: Box::new(TheirsResolver),
        };
        repo.storage.put(SCHEMA_KEY, schema_source.as_bytes())?;
        let genesis = repo.transaction(Hash::zero())?.commit()?;
        repo.set_head(genesis)?;
        debug!(genesis = %genesis.short_hex(), "repository initialized");
        Ok(repo)
    }

    /// Open an initialized database. Missing `schema` or `head` keys mean
    /// `init` never ran here.
    pub fn open(storage: S) -> DbResult<Self> {
        let source_bytes = match storage.get(SCHEMA_KEY) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => return Err(DbError::NotInitialized),
            Err(e) => return Err(e.into()),
        };
        let source = String::from_utf8(source_bytes)
            .map_err(|e| DbError::Corrupt(format!("schema key is not UTF-8: {e}")))?;
        let schema = compile(&source)?;
        let repo = Self {
            storage,
            schema,
            resolver: Box::new(TheirsResolver),
        };
        // An initialized repository always has a head.
        match repo.storage.get(HEAD_KEY) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => return Err(DbError::NotInitialized),
            Err(e) => return Err(e.into()),
        }
        Ok(repo)
    }

    /// The compiled schema.
    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the conflict resolver used by [`merge`](Self::merge).
    pub fn set_resolver(&mut self, resolver: Box<dyn ConflictResolver>) {
        self.resolver = resolver;
    }

    // -----------------------------------------------------------------
    // Head
    // -----------------------------------------------------------------

    /// The current head commit hash.
    pub fn head(&self) -> DbResult<Hash> {
        let bytes = self.storage.get(HEAD_KEY)?;
        Hash::from_slice(&bytes).map_err(|e| DbError::Corrupt(format!("head key: {e}")))
    }

    pub(crate) fn set_head(&self, hash: Hash) -> DbResult<()> {
        self.storage.put(HEAD_KEY, hash.as_bytes())?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------

    /// Encode, hash, and store an object under its hex key. Idempotent by
    /// content: storing the same object twice writes the same key.
    pub fn create_object(&self, object: &Object) -> DbResult<Hash> {
        let (hash, bytes) = hash_object(object)?;
        self.storage.put(&object_key(&hash), &bytes)?;
        Ok(hash)
    }

    pub fn get_commit(&self, hash: &Hash) -> DbResult<Commit> {
        Ok(decode_commit(&self.storage.get(&object_key(hash))?)?)
    }

    pub fn get_data_root(&self, hash: &Hash) -> DbResult<DataRoot> {
        Ok(decode_data_root(&self.storage.get(&object_key(hash))?)?)
    }

    pub fn get_collection(&self, hash: &Hash) -> DbResult<Collection> {
        Ok(decode_collection(&self.storage.get(&object_key(hash))?)?)
    }

    pub fn get_document(&self, hash: &Hash) -> DbResult<Document> {
        Ok(decode_document(&self.storage.get(&object_key(hash))?)?)
    }

    // -----------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------

    /// Open a writable staged view rooted at `base`.
    pub fn transaction(&self, base: Hash) -> DbResult<Transaction<'_, S>> {
        Transaction::open(self, base)
    }

    // -----------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------

    /// Three-way merge `other` into the current head and advance head.
    ///
    /// Fast-forwards when head is an ancestor of `other`; no-ops when
    /// `other` is already contained in head. On true divergence, a merge
    /// commit with parents `[head, other]` is produced; its data-root is
    /// derived per document from (base, ours, theirs), consulting the
    /// conflict resolver where both sides changed.
    pub fn merge(&self, other: Hash) -> DbResult<()> {
        let head = self.head()?;
        if head == other {
            return Ok(());
        }
        let bases = merge_base(self, &head, &other)?;
        if bases.contains(&head) {
            debug!(from = %head.short_hex(), to = %other.short_hex(), "fast-forward merge");
            return self.set_head(other);
        }
        if bases.contains(&other) {
            // Head already contains the incoming commit.
            return Ok(());
        }
        let base = *bases
            .first()
            .ok_or_else(|| DbError::MergeConflict("no common ancestor".to_string()))?;

        let base_root = self.get_data_root(&self.get_commit(&base)?.data_root)?;
        let ours_root = self.get_data_root(&self.get_commit(&head)?.data_root)?;
        let theirs_root = self.get_data_root(&self.get_commit(&other)?.data_root)?;

        let mut collection_names: BTreeSet<&String> = BTreeSet::new();
        collection_names.extend(base_root.collections.keys());
        collection_names.extend(ours_root.collections.keys());
        collection_names.extend(theirs_root.collections.keys());

        let mut merged_collections = BTreeMap::new();
        for name in collection_names {
            let merged = self.merge_collection(
                name,
                self.load_documents(base_root.get(name))?,
                self.load_documents(ours_root.get(name))?,
                self.load_documents(theirs_root.get(name))?,
            )?;
            let hash = self.create_object(&Object::from(Collection::new(merged)))?;
            merged_collections.insert(name.clone(), hash);
        }

        let data_root = self.create_object(&Object::from(DataRoot::new(merged_collections)))?;
        let commit = self.create_object(&Object::from(Commit::new(vec![head, other], data_root)))?;
        debug!(
            ours = %head.short_hex(),
            theirs = %other.short_hex(),
            base = %base.short_hex(),
            merged = %commit.short_hex(),
            "three-way merge"
        );
        self.set_head(commit)
    }

    fn load_documents(&self, hash: Option<&Hash>) -> DbResult<BTreeMap<String, Hash>> {
        match hash {
            Some(hash) => Ok(self.get_collection(hash)?.documents),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Merge one collection id by id.
    ///
    /// Agreement or a one-sided change resolves structurally; a two-sided
    /// change goes to the resolver. A `None` side is an absent document, so
    /// deletes cede to the unchanged side automatically.
    fn merge_collection(
        &self,
        name: &str,
        base: BTreeMap<String, Hash>,
        ours: BTreeMap<String, Hash>,
        theirs: BTreeMap<String, Hash>,
    ) -> DbResult<BTreeMap<String, Hash>> {
        let mut ids: BTreeSet<&String> = BTreeSet::new();
        ids.extend(base.keys());
        ids.extend(ours.keys());
        ids.extend(theirs.keys());

        let mut merged = BTreeMap::new();
        for id in ids {
            let b = base.get(id).copied();
            let o = ours.get(id).copied();
            let t = theirs.get(id).copied();
            let chosen = if o == t {
                o
            } else if o == b {
                t
            } else if t == b {
                o
            } else {
                let conflict = Conflict {
                    collection: name,
                    id,
                    base: b,
                    ours: o,
                    theirs: t,
                };
                match self.resolver.resolve(&conflict) {
                    Resolution::Ours => o,
                    Resolution::Theirs => t,
                    Resolution::Fail => {
                        return Err(DbError::MergeConflict(format!(
                            "both sides changed {name}/{id}"
                        )))
                    }
                }
            };
            if let Some(hash) = chosen {
                merged.insert(id.clone(), hash);
            }
        }
        Ok(merged)
    }

    // -----------------------------------------------------------------
    // Introspection helpers
    // -----------------------------------------------------------------

    /// Collection name → sorted document ids at head. Test helper.
    pub fn dump(&self) -> DbResult<BTreeMap<String, Vec<String>>> {
        let head = self.head()?;
        let root = self.get_data_root(&self.get_commit(&head)?.data_root)?;
        let mut out = BTreeMap::new();
        for (name, hash) in &root.collections {
            let ids: Vec<String> = self.get_collection(hash)?.documents.into_keys().collect();
            out.insert(name.clone(), ids);
        }
        Ok(out)
    }
}

impl<S: Storage> CommitReader for Repository<S> {
    fn load_commit(&self, hash: &Hash) -> DagResult<Commit> {
        match self.get_commit(hash) {
            Ok(commit) => Ok(commit),
            Err(DbError::Store(StoreError::NotFound(_))) => Err(DagError::MissingCommit(*hash)),
            Err(e) => Err(DagError::Read(e.to_string())),
        }
    }
}
