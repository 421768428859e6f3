use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as Json;
use tracing::debug;
use uuid::Uuid;

use strata_schema::{FieldDef, FieldType, ObjectDef, ScalarKind};
use strata_store::Storage;
use strata_types::{Collection, Commit, DataRoot, Document, Hash, Object, Value};

use crate::error::{DbError, DbResult};
use crate::filter::eval_filter;
use crate::repository::Repository;

/// A staged, schema-validated view over one base commit.
///
/// All writes land in the staged collection maps (document blobs go to
/// storage immediately — they are unreachable garbage if the transaction is
/// abandoned, which an append-only store tolerates). The transaction
/// observes its own writes; nothing is visible to others until
/// [`commit`](Self::commit) returns the new commit hash and the caller
/// merges it into head.
pub struct Transaction<'r, S: Storage> {
    repo: &'r Repository<S>,
    base: Hash,
    collections: BTreeMap<String, BTreeMap<String, Hash>>,
    base_hashes: BTreeMap<String, Hash>,
    dirty: BTreeSet<String>,
}

impl<'r, S: Storage> Transaction<'r, S> {
    pub(crate) fn open(repo: &'r Repository<S>, base: Hash) -> DbResult<Self> {
        let mut collections = BTreeMap::new();
        let mut base_hashes = BTreeMap::new();
        let mut dirty = BTreeSet::new();
        if base.is_zero() {
            // Uninitialized repository: every declared type starts empty
            // and must be written out by the genesis commit.
            for name in repo.schema().collection_names() {
                collections.insert(name.to_string(), BTreeMap::new());
                dirty.insert(name.to_string());
            }
        } else {
            let commit = repo.get_commit(&base)?;
            let root = repo.get_data_root(&commit.data_root)?;
            for (name, hash) in &root.collections {
                collections.insert(name.clone(), repo.get_collection(hash)?.documents);
                base_hashes.insert(name.clone(), *hash);
            }
        }
        Ok(Self {
            repo,
            base,
            collections,
            base_hashes,
            dirty,
        })
    }

    /// The base commit this transaction reads from.
    pub fn base(&self) -> Hash {
        self.base
    }

    /// The compiled schema (shared with the repository).
    pub fn schema(&self) -> &strata_schema::CompiledSchema {
        self.repo.schema()
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// The staged-or-persisted document under `collection`/`id`.
    pub fn read_document(&self, collection: &str, id: &str) -> DbResult<Document> {
        let hash = self.document_hash(collection, id)?;
        self.repo.get_document(&hash)
    }

    /// Content hash of the document as currently staged. Backs the `hash`
    /// system field.
    pub fn document_hash(&self, collection: &str, id: &str) -> DbResult<Hash> {
        let documents = self.documents_map(collection)?;
        documents
            .get(id)
            .copied()
            .ok_or_else(|| DbError::not_found(collection, id))
    }

    /// Lazy cursor over a snapshot of `(id, document)` pairs.
    pub fn documents(&self, collection: &str) -> DbResult<DocumentCursor<'r, S>> {
        let entries: Vec<(String, Hash)> = self
            .documents_map(collection)?
            .iter()
            .map(|(id, hash)| (id.clone(), *hash))
            .collect();
        Ok(DocumentCursor {
            repo: self.repo,
            entries,
            pos: 0,
        })
    }

    /// Evaluate a document filter against `collection`/`id`.
    pub fn matches(&self, collection: &str, id: &str, filter: &Json) -> DbResult<bool> {
        let def = self.object_def(collection)?;
        let doc = self.read_document(collection, id)?;
        eval_filter(self, def, id, &doc, filter)
    }

    // -----------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------

    /// Validate `value` against the collection's type and stage a new
    /// document (or reuse an existing one when the value is `{id: …}`).
    /// Returns the document id.
    pub fn create_document(&mut self, collection: &str, value: &Json) -> DbResult<String> {
        let def = self.object_def(collection)?.clone();
        self.check_create(&def, value)?;
        self.stage_create(&def, value)
    }

    /// Pure validation pass: no staging happens until the whole value tree
    /// is known good, so a failed create leaves nothing behind.
    fn check_create(&self, def: &ObjectDef, value: &Json) -> DbResult<()> {
        let Some(object) = value.as_object() else {
            return Err(DbError::type_mismatch(
                &def.name,
                "",
                "object",
                json_kind(value),
            ));
        };

        if object.contains_key("id") {
            return self.check_reference(def, object);
        }

        for (key, item) in object {
            if key == "hash" {
                return Err(DbError::ReservedField(key.clone()));
            }
            let field = def.field(key).ok_or_else(|| DbError::UnknownField {
                collection: def.name.clone(),
                field: key.clone(),
            })?;
            if item.is_null() {
                continue;
            }
            self.check_field_value(def, field, item)?;
        }

        for field in &def.fields {
            let missing = object.get(&field.name).map_or(true, Json::is_null);
            if field.required && missing {
                return Err(DbError::type_mismatch(
                    &def.name,
                    &field.name,
                    "non-null value",
                    "null",
                ));
            }
        }
        Ok(())
    }

    /// `{id: X}` is a reference, not a document: X must already resolve.
    fn check_reference(
        &self,
        def: &ObjectDef,
        object: &serde_json::Map<String, Json>,
    ) -> DbResult<()> {
        let Some(id) = object.get("id").and_then(Json::as_str) else {
            return Err(DbError::type_mismatch(
                &def.name,
                "id",
                "string id",
                json_kind(&object["id"]),
            ));
        };
        if object.len() > 1 {
            return Err(DbError::type_mismatch(
                &def.name,
                "id",
                "a reference carrying only id",
                "id plus other fields",
            ));
        }
        let documents = self.documents_map(&def.name)?;
        if !documents.contains_key(id) {
            return Err(DbError::not_found(&def.name, id));
        }
        Ok(())
    }

    fn check_field_value(&self, def: &ObjectDef, field: &FieldDef, item: &Json) -> DbResult<()> {
        match &field.ty {
            FieldType::Scalar(kind) => {
                coerce_scalar(*kind, item).map(|_| ()).ok_or_else(|| {
                    DbError::type_mismatch(&def.name, &field.name, kind.type_name(), json_kind(item))
                })
            }
            FieldType::Enum(en) => self.check_enum(def, &field.name, en, item),
            FieldType::ScalarList(kind) => {
                let items = self.check_list(def, &field.name, item)?;
                for element in items {
                    coerce_scalar(*kind, element).ok_or_else(|| {
                        DbError::type_mismatch(
                            &def.name,
                            &field.name,
                            kind.type_name(),
                            json_kind(element),
                        )
                    })?;
                }
                Ok(())
            }
            FieldType::EnumList(en) => {
                let items = self.check_list(def, &field.name, item)?;
                for element in items {
                    self.check_enum(def, &field.name, en, element)?;
                }
                Ok(())
            }
            FieldType::Relation(target) => {
                let target_def = self.object_def(target)?.clone();
                self.check_create(&target_def, item)
            }
            FieldType::RelationList(target) => {
                let target_def = self.object_def(target)?.clone();
                let items = self.check_list(def, &field.name, item)?;
                for element in items {
                    self.check_create(&target_def, element)?;
                }
                Ok(())
            }
        }
    }

    fn check_enum(&self, def: &ObjectDef, field: &str, en: &str, item: &Json) -> DbResult<()> {
        let values = self
            .repo
            .schema()
            .enum_values(en)
            .ok_or_else(|| DbError::UnknownCollection(en.to_string()))?;
        match item.as_str() {
            Some(s) if values.iter().any(|v| v == s) => Ok(()),
            _ => Err(DbError::type_mismatch(
                &def.name,
                field,
                format!("enum {en}"),
                item.to_string(),
            )),
        }
    }

    fn check_list<'j>(&self, def: &ObjectDef, field: &str, item: &'j Json) -> DbResult<&'j Vec<Json>> {
        item.as_array().ok_or_else(|| {
            DbError::type_mismatch(&def.name, field, "list", json_kind(item))
        })
    }

    /// Staging pass: builds the document bottom-up, creating nested
    /// relations along the way. `value` has already passed `check_create`.
    fn stage_create(&mut self, def: &ObjectDef, value: &Json) -> DbResult<String> {
        let object = value
            .as_object()
            .ok_or_else(|| DbError::type_mismatch(&def.name, "", "object", json_kind(value)))?;

        if let Some(id) = object.get("id").and_then(Json::as_str) {
            // Reference: reuse the existing document.
            return Ok(id.to_string());
        }

        let mut fields: BTreeMap<String, Value> = BTreeMap::new();
        for field in def.fields.clone() {
            let Some(item) = object.get(&field.name) else {
                continue;
            };
            if item.is_null() {
                continue;
            }
            let value = self.stage_field_value(&def.name, &field, item)?;
            fields.insert(field.name.clone(), value);
        }

        let id = Uuid::new_v4().to_string();
        self.write_document(&def.name, &id, Document::new(fields))?;
        Ok(id)
    }

    fn stage_field_value(
        &mut self,
        collection: &str,
        field: &FieldDef,
        item: &Json,
    ) -> DbResult<Value> {
        match &field.ty {
            FieldType::Scalar(kind) => coerce_scalar(*kind, item).ok_or_else(|| {
                DbError::type_mismatch(collection, &field.name, kind.type_name(), json_kind(item))
            }),
            FieldType::Enum(en) => match item.as_str() {
                Some(s) => Ok(Value::String(s.to_string())),
                None => Err(DbError::type_mismatch(
                    collection,
                    &field.name,
                    format!("enum {en}"),
                    json_kind(item),
                )),
            },
            FieldType::ScalarList(kind) => {
                let mut out = Vec::new();
                for element in item.as_array().into_iter().flatten() {
                    out.push(coerce_scalar(*kind, element).ok_or_else(|| {
                        DbError::type_mismatch(
                            collection,
                            &field.name,
                            kind.type_name(),
                            json_kind(element),
                        )
                    })?);
                }
                Ok(Value::List(out))
            }
            FieldType::EnumList(_) => {
                let mut out = Vec::new();
                for element in item.as_array().into_iter().flatten() {
                    out.push(Value::String(
                        element.as_str().unwrap_or_default().to_string(),
                    ));
                }
                Ok(Value::List(out))
            }
            FieldType::Relation(target) => {
                let target_def = self.object_def(target)?.clone();
                let id = self.stage_create(&target_def, item)?;
                Ok(Value::String(id))
            }
            FieldType::RelationList(target) => {
                let target_def = self.object_def(target)?.clone();
                let mut ids = Vec::new();
                for element in item.as_array().into_iter().flatten() {
                    ids.push(Value::String(self.stage_create(&target_def, element)?));
                }
                Ok(Value::List(ids))
            }
        }
    }

    // -----------------------------------------------------------------
    // Patch
    // -----------------------------------------------------------------

    /// Apply a patch to one document: per field exactly one operation
    /// (`set` or `append`); relation fields recurse into the referenced
    /// document; untouched fields carry over.
    pub fn patch_document(&mut self, collection: &str, id: &str, patch: &Json) -> DbResult<()> {
        let def = self.object_def(collection)?.clone();
        let current = self.read_document(collection, id)?;
        self.check_patch(&def, &current, patch)?;
        self.stage_patch(&def, id, &current, patch)
    }

    fn check_patch(&self, def: &ObjectDef, current: &Document, patch: &Json) -> DbResult<()> {
        let Some(object) = patch.as_object() else {
            return Err(DbError::InvalidPatch(format!(
                "patch for {:?} must be an object",
                def.name
            )));
        };
        for (key, ops) in object {
            if key == "id" || key == "hash" {
                return Err(DbError::ReservedField(key.clone()));
            }
            let field = def.field(key).ok_or_else(|| DbError::UnknownField {
                collection: def.name.clone(),
                field: key.clone(),
            })?;
            match &field.ty {
                FieldType::Relation(target) => {
                    // Nested patch on the referenced document.
                    let Some(Value::String(target_id)) = current.get(key) else {
                        return Err(DbError::InvalidPatch(format!(
                            "cannot patch through null relation {:?}.{key:?}",
                            def.name
                        )));
                    };
                    let target_def = self.object_def(target)?.clone();
                    let target_doc = self.read_document(target, target_id)?;
                    self.check_patch(&target_def, &target_doc, ops)?;
                }
                FieldType::RelationList(target) => {
                    self.check_relation_list_patch(def, field, target, ops)?;
                }
                _ => self.check_leaf_patch(def, field, ops)?,
            }
        }
        Ok(())
    }

    fn check_leaf_patch(&self, def: &ObjectDef, field: &FieldDef, ops: &Json) -> DbResult<()> {
        let object = patch_ops(def, field, ops)?;
        let has_set = object.contains_key("set");
        let has_append = object.contains_key("append");
        if has_append && !field.ty.is_list() {
            return Err(DbError::InvalidPatch(format!(
                "append on non-list field {:?}.{:?}",
                def.name, field.name
            )));
        }
        for (op, operand) in object {
            match op.as_str() {
                "set" => {
                    if operand.is_null() {
                        if field.required {
                            return Err(DbError::type_mismatch(
                                &def.name,
                                &field.name,
                                "non-null value",
                                "null",
                            ));
                        }
                    } else {
                        self.check_field_value(def, field, operand)?;
                    }
                }
                "append" => {
                    self.check_field_value(def, field, operand)?;
                }
                other => {
                    return Err(DbError::InvalidPatch(format!(
                        "unknown operation {other:?} on {:?}.{:?}",
                        def.name, field.name
                    )))
                }
            }
        }
        arity_check(def, field, has_set, has_append)
    }

    fn check_relation_list_patch(
        &self,
        def: &ObjectDef,
        field: &FieldDef,
        target: &str,
        ops: &Json,
    ) -> DbResult<()> {
        let object = patch_ops(def, field, ops)?;
        let has_set = object.contains_key("set");
        let has_append = object.contains_key("append");
        let has_filter = object.contains_key("filter");
        if has_filter && !has_set {
            return Err(DbError::InvalidPatch(format!(
                "filter on {:?}.{:?} requires set",
                def.name, field.name
            )));
        }
        let target_def = self.object_def(target)?.clone();
        for (op, operand) in object {
            match op.as_str() {
                "set" | "append" => {
                    if op == "set" && operand.is_null() {
                        continue;
                    }
                    let items = self.check_list(def, &field.name, operand)?;
                    for element in items {
                        self.check_create(&target_def, element)?;
                    }
                }
                "filter" => {
                    if !operand.is_null() && !operand.is_object() {
                        return Err(DbError::InvalidFilter(format!(
                            "list patch filter on {:?}.{:?} must be an object",
                            def.name, field.name
                        )));
                    }
                }
                other => {
                    return Err(DbError::InvalidPatch(format!(
                        "unknown operation {other:?} on {:?}.{:?}",
                        def.name, field.name
                    )))
                }
            }
        }
        arity_check(def, field, has_set, has_append)
    }

    fn stage_patch(
        &mut self,
        def: &ObjectDef,
        id: &str,
        current: &Document,
        patch: &Json,
    ) -> DbResult<()> {
        let object = patch
            .as_object()
            .ok_or_else(|| DbError::InvalidPatch("patch must be an object".to_string()))?;

        let mut fields = current.fields.clone();
        for (key, ops) in object {
            let field = def
                .field(key)
                .ok_or_else(|| DbError::UnknownField {
                    collection: def.name.clone(),
                    field: key.clone(),
                })?
                .clone();
            match &field.ty {
                FieldType::Relation(target) => {
                    let Some(Value::String(target_id)) = current.get(key) else {
                        return Err(DbError::InvalidPatch(format!(
                            "cannot patch through null relation {:?}.{key:?}",
                            def.name
                        )));
                    };
                    let target_id = target_id.clone();
                    let target = target.clone();
                    let target_def = self.object_def(&target)?.clone();
                    let target_doc = self.read_document(&target, &target_id)?;
                    self.stage_patch(&target_def, &target_id, &target_doc, ops)?;
                    // The relation id itself is unchanged.
                }
                FieldType::RelationList(target) => {
                    let target = target.clone();
                    let new_value =
                        self.apply_relation_list_ops(def, &field, &target, current, ops)?;
                    apply_new_value(&mut fields, &field.name, new_value);
                }
                _ => {
                    let new_value = self.apply_leaf_ops(def, &field, current, ops)?;
                    apply_new_value(&mut fields, &field.name, new_value);
                }
            }
        }
        self.write_document(&def.name, id, Document::new(fields))
    }

    /// Apply `set`/`append` to a scalar, enum, or scalar-list field.
    fn apply_leaf_ops(
        &mut self,
        def: &ObjectDef,
        field: &FieldDef,
        current: &Document,
        ops: &Json,
    ) -> DbResult<Value> {
        let object = patch_ops(def, field, ops)?;
        if let Some(operand) = object.get("set") {
            if operand.is_null() {
                return Ok(Value::Null);
            }
            return self.stage_field_value(&def.name, field, operand);
        }
        if let Some(operand) = object.get("append") {
            let appended = self.stage_field_value(&def.name, field, operand)?;
            let Value::List(new_items) = appended else {
                return Err(DbError::InvalidPatch(format!(
                    "append operand on {:?}.{:?} must be a list",
                    def.name, field.name
                )));
            };
            let mut items = match current.get(&field.name) {
                Some(Value::List(existing)) => existing.clone(),
                _ => Vec::new(),
            };
            items.extend(new_items);
            return Ok(Value::List(items));
        }
        Err(DbError::InvalidPatch(format!(
            "no operation on {:?}.{:?}",
            def.name, field.name
        )))
    }

    /// Apply a relation-list patch. `append` creates (or references) the
    /// new documents and extends the id list. `set` without a filter
    /// replaces the whole list; with a filter, elements matching the filter
    /// are replaced and the rest kept.
    fn apply_relation_list_ops(
        &mut self,
        def: &ObjectDef,
        field: &FieldDef,
        target: &str,
        current: &Document,
        ops: &Json,
    ) -> DbResult<Value> {
        let object = patch_ops(def, field, ops)?.clone();
        let target_def = self.object_def(target)?.clone();
        let current_ids: Vec<String> = match current.get(&field.name) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        if let Some(operand) = object.get("append") {
            let mut ids = current_ids;
            for element in operand.as_array().into_iter().flatten() {
                ids.push(self.stage_create(&target_def, element)?);
            }
            return Ok(Value::List(ids.into_iter().map(Value::String).collect()));
        }

        let Some(operand) = object.get("set") else {
            return Err(DbError::InvalidPatch(format!(
                "no operation on {:?}.{:?}",
                def.name, field.name
            )));
        };
        if operand.is_null() {
            return Ok(Value::Null);
        }

        let kept: Vec<String> = match object.get("filter") {
            Some(filter) if !filter.is_null() => {
                let mut kept = Vec::new();
                for id in &current_ids {
                    let doc = self.read_document(target, id)?;
                    if !eval_quantifier_element(self, &target_def, id, &doc, filter)? {
                        kept.push(id.clone());
                    }
                }
                kept
            }
            _ => Vec::new(),
        };

        let mut ids = kept;
        for element in operand.as_array().into_iter().flatten() {
            ids.push(self.stage_create(&target_def, element)?);
        }
        Ok(Value::List(ids.into_iter().map(Value::String).collect()))
    }

    // -----------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------

    /// Remove `id` from the collection map. The document blob stays in the
    /// store (append-only); it simply becomes unreachable from the new
    /// commit.
    pub fn delete_document(&mut self, collection: &str, id: &str) -> DbResult<()> {
        self.object_def(collection)?;
        let documents = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| DbError::UnknownCollection(collection.to_string()))?;
        if documents.remove(id).is_none() {
            return Err(DbError::not_found(collection, id));
        }
        self.dirty.insert(collection.to_string());
        Ok(())
    }

    // -----------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------

    /// Serialize touched collections, the new data-root, and a new commit
    /// with the base as sole parent (no parents for genesis).
    pub fn commit(self) -> DbResult<Hash> {
        let mut roots = BTreeMap::new();
        for (name, documents) in &self.collections {
            let hash = if self.dirty.contains(name) {
                self.repo
                    .create_object(&Object::from(Collection::new(documents.clone())))?
            } else {
                // Untouched collections keep their stored root.
                match self.base_hashes.get(name) {
                    Some(hash) => *hash,
                    None => self
                        .repo
                        .create_object(&Object::from(Collection::new(documents.clone())))?,
                }
            };
            roots.insert(name.clone(), hash);
        }
        let data_root = self
            .repo
            .create_object(&Object::from(DataRoot::new(roots)))?;
        let parents = if self.base.is_zero() {
            Vec::new()
        } else {
            vec![self.base]
        };
        let commit = self
            .repo
            .create_object(&Object::from(Commit::new(parents, data_root)))?;
        debug!(
            base = %self.base.short_hex(),
            commit = %commit.short_hex(),
            dirty = self.dirty.len(),
            "transaction committed"
        );
        Ok(commit)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    pub(crate) fn object_def(&self, collection: &str) -> DbResult<&ObjectDef> {
        self.repo
            .schema()
            .object(collection)
            .ok_or_else(|| DbError::UnknownCollection(collection.to_string()))
    }

    fn documents_map(&self, collection: &str) -> DbResult<&BTreeMap<String, Hash>> {
        self.object_def(collection)?;
        self.collections
            .get(collection)
            .ok_or_else(|| DbError::UnknownCollection(collection.to_string()))
    }

    fn write_document(&mut self, collection: &str, id: &str, document: Document) -> DbResult<()> {
        let hash = self.repo.create_object(&Object::from(document))?;
        self.collections
            .get_mut(collection)
            .ok_or_else(|| DbError::UnknownCollection(collection.to_string()))?
            .insert(id.to_string(), hash);
        self.dirty.insert(collection.to_string());
        Ok(())
    }
}

/// Elements matching any of the filter's quantifier-style entries.
///
/// A list-patch filter is a `TListFilterInput`; for replacement purposes an
/// element is "selected" when it matches every sub-filter under `any`/`all`
/// (a bare filter object is accepted too).
fn eval_quantifier_element<S: Storage>(
    tx: &Transaction<'_, S>,
    def: &ObjectDef,
    id: &str,
    doc: &Document,
    filter: &Json,
) -> DbResult<bool> {
    let Some(object) = filter.as_object() else {
        return Err(DbError::InvalidFilter(
            "list patch filter must be an object".to_string(),
        ));
    };
    // Quantifier keys hold sub-filter lists; anything else is treated as a
    // direct document filter.
    if ["all", "any", "none"].iter().any(|k| object.contains_key(*k)) {
        for key in ["all", "any"] {
            if let Some(subfilters) = object.get(key) {
                for subfilter in as_filter_slice(subfilters) {
                    if eval_filter(tx, def, id, doc, subfilter)? {
                        return Ok(true);
                    }
                }
            }
        }
        if let Some(subfilters) = object.get("none") {
            for subfilter in as_filter_slice(subfilters) {
                if !eval_filter(tx, def, id, doc, subfilter)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    } else {
        eval_filter(tx, def, id, doc, filter)
    }
}

fn as_filter_slice(value: &Json) -> Vec<&Json> {
    match value {
        Json::Array(items) => items.iter().collect(),
        Json::Null => Vec::new(),
        other => vec![other],
    }
}

fn patch_ops<'j>(
    def: &ObjectDef,
    field: &FieldDef,
    ops: &'j Json,
) -> DbResult<&'j serde_json::Map<String, Json>> {
    ops.as_object().ok_or_else(|| {
        DbError::InvalidPatch(format!(
            "patch for {:?}.{:?} must be an operation object",
            def.name, field.name
        ))
    })
}

/// Exactly one of `set`/`append`.
fn arity_check(def: &ObjectDef, field: &FieldDef, has_set: bool, has_append: bool) -> DbResult<()> {
    match (has_set, has_append) {
        (true, false) | (false, true) => Ok(()),
        (false, false) => Err(DbError::InvalidPatch(format!(
            "no operation on {:?}.{:?}",
            def.name, field.name
        ))),
        (true, true) => Err(DbError::InvalidPatch(format!(
            "more than one operation on {:?}.{:?}",
            def.name, field.name
        ))),
    }
}

fn apply_new_value(fields: &mut BTreeMap<String, Value>, name: &str, value: Value) {
    if value.is_null() {
        fields.remove(name);
    } else {
        fields.insert(name.to_string(), value);
    }
}

/// Coerce a JSON leaf to the declared scalar kind. `None` on mismatch.
fn coerce_scalar(kind: ScalarKind, item: &Json) -> Option<Value> {
    match kind {
        ScalarKind::Id | ScalarKind::String => item.as_str().map(|s| Value::String(s.to_string())),
        ScalarKind::Int => item.as_i64().map(Value::Int),
        // Integer literals coerce onto Float fields.
        ScalarKind::Float => item.as_f64().map(Value::Float),
        ScalarKind::Boolean => item.as_bool().map(Value::Bool),
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

/// Lazy cursor over a snapshot of one collection.
///
/// The snapshot is taken when the cursor is created; staging more writes
/// does not grow or shrink an open cursor.
pub struct DocumentCursor<'r, S: Storage> {
    repo: &'r Repository<S>,
    entries: Vec<(String, Hash)>,
    pos: usize,
}

impl<S: Storage> DocumentCursor<'_, S> {
    /// Returns `true` once the cursor is exhausted.
    pub fn done(&self) -> bool {
        self.pos >= self.entries.len()
    }

    /// The next `(id, document)` pair, or `None` when exhausted.
    pub fn next(&mut self) -> DbResult<Option<(String, Document)>> {
        let Some((id, hash)) = self.entries.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        let document = self.repo.get_document(hash)?;
        Ok(Some((id.clone(), document)))
    }

    /// Ids remaining in the snapshot, without loading documents.
    pub fn remaining_ids(&self) -> Vec<String> {
        self.entries[self.pos..]
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_store::MemoryStorage;

    const SCHEMA: &str = r#"
        enum Role { ADMIN USER }
        type User {
            name: String!
            age: Int
            score: Float
            active: Boolean
            role: Role
            tags: [String]
            boss: User
            friends: [User]
        }
    "#;

    fn repo() -> Repository<MemoryStorage> {
        Repository::init(MemoryStorage::new(), SCHEMA).unwrap()
    }

    fn tx(repo: &Repository<MemoryStorage>) -> Transaction<'_, MemoryStorage> {
        repo.transaction(repo.head().unwrap()).unwrap()
    }

    #[test]
    fn create_and_read_back() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "Bob", "age": 30}))
            .unwrap();
        let doc = tx.read_document("User", &id).unwrap();
        assert_eq!(doc.field_or_null("name"), Value::String("Bob".into()));
        assert_eq!(doc.field_or_null("age"), Value::Int(30));
    }

    #[test]
    fn transaction_observes_own_writes_before_commit() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "A"})).unwrap();
        assert!(tx.read_document("User", &id).is_ok());
        // A second transaction on the same base does not see it.
        let other = repo.transaction(repo.head().unwrap()).unwrap();
        assert!(other.read_document("User", &id).is_err());
    }

    #[test]
    fn int_literal_coerces_onto_float_field() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "F", "score": 3}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("score"),
            Value::Float(3.0)
        );
    }

    #[test]
    fn float_literal_rejected_on_int_field() {
        let repo = repo();
        let mut tx = tx(&repo);
        let err = tx
            .create_document("User", &json!({"name": "X", "age": 1.5}))
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let err = tx
            .create_document("User", &json!({"name": "X", "nope": 1}))
            .unwrap_err();
        assert!(matches!(err, DbError::UnknownField { .. }));
    }

    #[test]
    fn unknown_collection_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let err = tx.create_document("Ghost", &json!({})).unwrap_err();
        assert!(matches!(err, DbError::UnknownCollection(_)));
    }

    #[test]
    fn reserved_hash_field_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let err = tx
            .create_document("User", &json!({"name": "X", "hash": "h"}))
            .unwrap_err();
        assert!(matches!(err, DbError::ReservedField(_)));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let err = tx.create_document("User", &json!({"age": 3})).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
        // Explicit null is no better.
        let err = tx
            .create_document("User", &json!({"name": null}))
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn failed_create_stages_nothing() {
        let repo = repo();
        let mut tx = tx(&repo);
        // Nested relation is valid but the outer document is not.
        let err = tx.create_document(
            "User",
            &json!({"name": "X", "boss": {"name": "B"}, "bogus": 1}),
        );
        assert!(err.is_err());
        let mut cursor = tx.documents("User").unwrap();
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn enum_values_are_validated() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "E", "role": "ADMIN"}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("role"),
            Value::String("ADMIN".into())
        );
        let err = tx
            .create_document("User", &json!({"name": "E", "role": "NOPE"}))
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn nested_relation_is_created_recursively() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "A", "boss": {"name": "B"}}))
            .unwrap();
        let doc = tx.read_document("User", &id).unwrap();
        let Some(Value::String(boss_id)) = doc.get("boss") else {
            panic!("boss is not an id");
        };
        let boss = tx.read_document("User", boss_id).unwrap();
        assert_eq!(boss.field_or_null("name"), Value::String("B".into()));
    }

    #[test]
    fn relation_reference_reuses_existing_document() {
        let repo = repo();
        let mut tx = tx(&repo);
        let boss_id = tx.create_document("User", &json!({"name": "Boss"})).unwrap();
        let before = tx.documents("User").unwrap().remaining_ids().len();
        let id = tx
            .create_document("User", &json!({"name": "A", "boss": {"id": boss_id}}))
            .unwrap();
        let after = tx.documents("User").unwrap().remaining_ids().len();
        // Only the outer document is new.
        assert_eq!(after, before + 1);
        let doc = tx.read_document("User", &id).unwrap();
        assert_eq!(doc.field_or_null("boss"), Value::String(boss_id));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let err = tx
            .create_document("User", &json!({"name": "A", "boss": {"id": "nope"}}))
            .unwrap_err();
        assert!(matches!(err, DbError::DocumentNotFound { .. }));
    }

    #[test]
    fn reference_with_extra_fields_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let boss_id = tx.create_document("User", &json!({"name": "B"})).unwrap();
        let err = tx
            .create_document(
                "User",
                &json!({"name": "A", "boss": {"id": boss_id, "name": "X"}}),
            )
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn patch_set_replaces() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "Bob"})).unwrap();
        tx.patch_document("User", &id, &json!({"name": {"set": "Alice"}}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("name"),
            Value::String("Alice".into())
        );
    }

    #[test]
    fn patch_set_null_clears_nullable_field() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "B", "age": 9}))
            .unwrap();
        tx.patch_document("User", &id, &json!({"age": {"set": null}}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("age"),
            Value::Null
        );
    }

    #[test]
    fn patch_set_null_on_required_field_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "B"})).unwrap();
        let err = tx
            .patch_document("User", &id, &json!({"name": {"set": null}}))
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn patch_append_extends_list_in_place() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "B", "tags": ["a"]}))
            .unwrap();
        tx.patch_document("User", &id, &json!({"tags": {"append": ["b", "c"]}}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("tags"),
            Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into()),
                Value::String("c".into()),
            ])
        );
    }

    #[test]
    fn patch_append_on_absent_list_starts_empty() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "B"})).unwrap();
        tx.patch_document("User", &id, &json!({"tags": {"append": ["x"]}}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("tags"),
            Value::List(vec![Value::String("x".into())])
        );
    }

    #[test]
    fn patch_untouched_fields_carry_over() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "B", "age": 4}))
            .unwrap();
        tx.patch_document("User", &id, &json!({"name": {"set": "C"}}))
            .unwrap();
        assert_eq!(
            tx.read_document("User", &id).unwrap().field_or_null("age"),
            Value::Int(4)
        );
    }

    #[test]
    fn patch_arity_is_enforced() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "B", "tags": []}))
            .unwrap();
        let err = tx
            .patch_document("User", &id, &json!({"tags": {}}))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPatch(_)));
        let err = tx
            .patch_document("User", &id, &json!({"tags": {"set": ["a"], "append": ["b"]}}))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPatch(_)));
        let err = tx
            .patch_document("User", &id, &json!({"name": {"bump": 1}}))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPatch(_)));
    }

    #[test]
    fn patch_append_on_scalar_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "B"})).unwrap();
        let err = tx
            .patch_document("User", &id, &json!({"name": {"append": ["x"]}}))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPatch(_)));
    }

    #[test]
    fn patch_reserved_fields_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "B"})).unwrap();
        for field in ["id", "hash"] {
            let err = tx
                .patch_document("User", &id, &json!({field: {"set": "x"}}))
                .unwrap_err();
            assert!(matches!(err, DbError::ReservedField(_)));
        }
    }

    #[test]
    fn patch_recurses_through_relation() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document("User", &json!({"name": "A", "boss": {"name": "B"}}))
            .unwrap();
        tx.patch_document("User", &id, &json!({"boss": {"name": {"set": "B2"}}}))
            .unwrap();
        let doc = tx.read_document("User", &id).unwrap();
        let Some(Value::String(boss_id)) = doc.get("boss") else {
            panic!("boss missing");
        };
        assert_eq!(
            tx.read_document("User", boss_id).unwrap().field_or_null("name"),
            Value::String("B2".into())
        );
    }

    #[test]
    fn patch_through_null_relation_is_rejected() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "A"})).unwrap();
        let err = tx
            .patch_document("User", &id, &json!({"boss": {"name": {"set": "B"}}}))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPatch(_)));
    }

    #[test]
    fn relation_list_append_creates_and_links() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "A"})).unwrap();
        tx.patch_document(
            "User",
            &id,
            &json!({"friends": {"append": [{"name": "F1"}, {"name": "F2"}]}}),
        )
        .unwrap();
        let doc = tx.read_document("User", &id).unwrap();
        let Some(Value::List(friends)) = doc.get("friends") else {
            panic!("friends missing");
        };
        assert_eq!(friends.len(), 2);
    }

    #[test]
    fn relation_list_set_replaces() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx
            .create_document(
                "User",
                &json!({"name": "A", "friends": [{"name": "Old"}]}),
            )
            .unwrap();
        tx.patch_document(
            "User",
            &id,
            &json!({"friends": {"set": [{"name": "New"}]}}),
        )
        .unwrap();
        let doc = tx.read_document("User", &id).unwrap();
        let Some(Value::List(friends)) = doc.get("friends") else {
            panic!("friends missing");
        };
        assert_eq!(friends.len(), 1);
        let Value::String(fid) = &friends[0] else {
            panic!("friend is not an id");
        };
        assert_eq!(
            tx.read_document("User", fid).unwrap().field_or_null("name"),
            Value::String("New".into())
        );
    }

    #[test]
    fn relation_list_filter_requires_set() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "A"})).unwrap();
        let err = tx
            .patch_document(
                "User",
                &id,
                &json!({"friends": {"append": [{"name": "F"}], "filter": {"any": []}}}),
            )
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPatch(_)));
    }

    #[test]
    fn delete_removes_from_collection() {
        let repo = repo();
        let mut tx = tx(&repo);
        let id = tx.create_document("User", &json!({"name": "D"})).unwrap();
        tx.delete_document("User", &id).unwrap();
        assert!(matches!(
            tx.read_document("User", &id),
            Err(DbError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            tx.delete_document("User", &id),
            Err(DbError::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn cursor_snapshots_at_creation() {
        let repo = repo();
        let mut tx = tx(&repo);
        tx.create_document("User", &json!({"name": "One"})).unwrap();
        let mut cursor = tx.documents("User").unwrap();
        tx.create_document("User", &json!({"name": "Two"})).unwrap();
        let mut count = 0;
        while cursor.next().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
        assert!(cursor.done());
    }

    #[test]
    fn commit_chains_to_base() {
        let repo = repo();
        let head = repo.head().unwrap();
        let mut tx = repo.transaction(head).unwrap();
        tx.create_document("User", &json!({"name": "C"})).unwrap();
        let new_hash = tx.commit().unwrap();
        let commit = repo.get_commit(&new_hash).unwrap();
        assert_eq!(commit.parents, vec![head]);
    }

    #[test]
    fn empty_commit_reuses_collection_roots() {
        let repo = repo();
        let head = repo.head().unwrap();
        let old_root = repo
            .get_data_root(&repo.get_commit(&head).unwrap().data_root)
            .unwrap();
        let new_hash = repo.transaction(head).unwrap().commit().unwrap();
        let new_root = repo
            .get_data_root(&repo.get_commit(&new_hash).unwrap().data_root)
            .unwrap();
        assert_eq!(old_root, new_root);
    }
}
