use std::collections::HashMap;

use graphql_parser::query::{
    Definition, Directive, Document, Field, FragmentDefinition, OperationDefinition, Selection,
    SelectionSet, TypeCondition, VariableDefinition,
};
use serde_json::{Map, Value as Json};
use tracing::debug;

use strata_db::{Repository, Transaction};
use strata_schema::FieldType;
use strata_store::Storage;
use strata_types::{CancelToken, Hash, Value};

use crate::error::{QueryError, QueryResult};
use crate::introspection;
use crate::request::{GraphQLError, Location, QueryParams, QueryResponse};
use crate::values::{resolve_arguments, resolve_value};

type Fragments<'d, 'b> = HashMap<String, &'b FragmentDefinition<'d, String>>;
type QField<'a> = Field<'a, String>;
type QSelectionSet<'a> = SelectionSet<'a, String>;

/// Per-request state shared across field resolution.
struct RequestCtx<'d, 'b> {
    fragments: Fragments<'d, 'b>,
    variables: Map<String, Json>,
    cancel: CancelToken,
}

impl RequestCtx<'_, '_> {
    fn check_cancel(&self) -> QueryResult<()> {
        if self.cancel.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Query,
    Mutation,
}

impl OpKind {
    fn root_name(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
        }
    }
}

struct Operation<'d, 'b> {
    kind: OpKind,
    selection_set: &'b QSelectionSet<'d>,
    directives: &'b [Directive<'d, String>],
    variable_definitions: &'b [VariableDefinition<'d, String>],
}

/// Resolves requests against a repository.
pub struct Executor<'r, S: Storage> {
    repo: &'r Repository<S>,
}

impl<'r, S: Storage> Executor<'r, S> {
    pub fn new(repo: &'r Repository<S>) -> Self {
        Self { repo }
    }

    /// Execute one request. Never panics and never returns `Err`: every
    /// failure mode lands in the response's `errors`.
    pub fn execute(&self, params: &QueryParams) -> QueryResponse {
        let document = match graphql_parser::parse_query::<String>(&params.query) {
            Ok(document) => document,
            Err(e) => return error_response(QueryError::Parse(e.to_string())),
        };
        match self.execute_document(&document, params) {
            Ok(response) => response,
            Err(e) => error_response(e),
        }
    }

    fn execute_document<'d, 'b>(
        &self,
        document: &'b Document<'d, String>,
        params: &QueryParams,
    ) -> QueryResult<QueryResponse> {
        let mut fragments: Fragments<'d, 'b> = HashMap::new();
        for definition in &document.definitions {
            if let Definition::Fragment(fragment) = definition {
                fragments.insert(fragment.name.clone(), fragment);
            }
        }

        let operation = select_operation(document, params.operation_name.as_deref())?;
        let variables = bind_variables(operation.variable_definitions, params.variables.as_ref())?;
        let ctx = RequestCtx {
            fragments,
            variables,
            cancel: params.cancel.clone(),
        };

        let base = match revision_from(operation.directives, &ctx)? {
            Some(hash) => {
                // The pinned hash must name a stored commit.
                if self.repo.get_commit(&hash).is_err() {
                    return Err(QueryError::InvalidRevision(format!(
                        "no commit {}",
                        hash.short_hex()
                    )));
                }
                hash
            }
            None => self.repo.head()?,
        };
        let mut tx = self.repo.transaction(base)?;

        let root = operation.kind.root_name();
        let fields = collect_fields(operation.selection_set, &ctx.fragments, root)?;
        if fields.is_empty() {
            return Err(QueryError::Selection(format!("{root} selection is empty")));
        }

        let mut data = Map::new();
        let mut errors = Vec::new();
        for field in fields {
            ctx.check_cancel()?;
            let key = field.alias.as_ref().unwrap_or(&field.name).clone();
            match self.resolve_root_field(&mut tx, field, operation.kind, &ctx) {
                Ok(value) => {
                    data.insert(key, value);
                }
                Err(e) => {
                    errors.push(GraphQLError::at_field(
                        e.to_string(),
                        &key,
                        Location {
                            line: field.position.line,
                            column: field.position.column,
                        },
                    ));
                    data.insert(key, Json::Null);
                }
            }
        }

        if operation.kind == OpKind::Mutation {
            let commit = tx.commit()?;
            self.repo.merge(commit)?;
            debug!(commit = %commit.short_hex(), "mutation committed and merged");
        }

        Ok(QueryResponse {
            data: Some(Json::Object(data)),
            errors,
        })
    }

    fn resolve_root_field<'d, 'b>(
        &self,
        tx: &mut Transaction<'_, S>,
        field: &'b QField<'d>,
        kind: OpKind,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let name = field.name.as_str();
        if name == "__typename" {
            return Ok(Json::String(kind.root_name().to_string()));
        }
        if kind == OpKind::Query {
            if name == "__schema" {
                let mut schema = introspection::schema_json(self.repo.schema().registry());
                introspection::resolve_named_kinds(self.repo.schema().registry(), &mut schema);
                return project_json(&schema, &field.selection_set, ctx);
            }
            if name == "__type" {
                let args = resolve_arguments(&field.arguments, &ctx.variables)?;
                let Some(type_name) = args.get("name").and_then(Json::as_str) else {
                    return Err(QueryError::Selection("__type requires name".to_string()));
                };
                let mut ty = introspection::type_json(self.repo.schema().registry(), type_name);
                introspection::resolve_named_kinds(self.repo.schema().registry(), &mut ty);
                return project_json(&ty, &field.selection_set, ctx);
            }
        }

        let args = resolve_arguments(&field.arguments, &ctx.variables)?;
        match kind {
            OpKind::Query => {
                if let Some(ty) = known_type(self.repo, name, "list") {
                    return self.resolve_list(tx, &ty, field, &args, ctx);
                }
                if let Some(ty) = known_type(self.repo, name, "find") {
                    return self.resolve_find(tx, &ty, field, &args, ctx);
                }
            }
            OpKind::Mutation => {
                if let Some(ty) = known_type(self.repo, name, "create") {
                    return self.resolve_create(tx, &ty, field, &args, ctx);
                }
                if let Some(ty) = known_type(self.repo, name, "update") {
                    return self.resolve_update(tx, &ty, field, &args, ctx);
                }
                if let Some(ty) = known_type(self.repo, name, "delete") {
                    return self.resolve_delete(tx, &ty, field, &args, ctx);
                }
            }
        }
        Err(QueryError::Selection(format!(
            "unknown field {name:?} on {}",
            kind.root_name()
        )))
    }

    // -----------------------------------------------------------------
    // Root field resolvers
    // -----------------------------------------------------------------

    fn resolve_list<'d, 'b>(
        &self,
        tx: &Transaction<'_, S>,
        ty: &str,
        field: &'b QField<'d>,
        args: &Map<String, Json>,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let filter = args.get("filter").cloned().unwrap_or(Json::Null);
        let mut out = Vec::new();
        for id in self.matching_ids(tx, ty, &filter, ctx)? {
            out.push(self.project_document(tx, ty, &id, &field.selection_set, ctx)?);
        }
        Ok(Json::Array(out))
    }

    fn resolve_find<'d, 'b>(
        &self,
        tx: &Transaction<'_, S>,
        ty: &str,
        field: &'b QField<'d>,
        args: &Map<String, Json>,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let Some(id) = args.get("id").and_then(Json::as_str) else {
            return Err(QueryError::Selection(format!("find{ty} requires id")));
        };
        // Existence check first, so a missing id errors rather than
        // projecting nothing.
        tx.read_document(ty, id)?;
        self.project_document(tx, ty, id, &field.selection_set, ctx)
    }

    fn resolve_create<'d, 'b>(
        &self,
        tx: &mut Transaction<'_, S>,
        ty: &str,
        field: &'b QField<'d>,
        args: &Map<String, Json>,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let Some(data) = args.get("data") else {
            return Err(QueryError::Selection(format!("create{ty} requires data")));
        };
        let id = tx.create_document(ty, data)?;
        self.project_document(tx, ty, &id, &field.selection_set, ctx)
    }

    fn resolve_update<'d, 'b>(
        &self,
        tx: &mut Transaction<'_, S>,
        ty: &str,
        field: &'b QField<'d>,
        args: &Map<String, Json>,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let Some(patch) = args.get("patch") else {
            return Err(QueryError::Selection(format!("update{ty} requires patch")));
        };
        let filter = args.get("filter").cloned().unwrap_or(Json::Null);
        let ids = self.matching_ids(tx, ty, &filter, ctx)?;
        for id in &ids {
            tx.patch_document(ty, id, patch)?;
        }
        let mut out = Vec::new();
        for id in &ids {
            out.push(self.project_document(tx, ty, id, &field.selection_set, ctx)?);
        }
        Ok(Json::Array(out))
    }

    fn resolve_delete<'d, 'b>(
        &self,
        tx: &mut Transaction<'_, S>,
        ty: &str,
        field: &'b QField<'d>,
        args: &Map<String, Json>,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let filter = args.get("filter").cloned().unwrap_or(Json::Null);
        let ids = self.matching_ids(tx, ty, &filter, ctx)?;
        // Project the pre-delete values, then drop the documents.
        let mut out = Vec::new();
        for id in &ids {
            out.push(self.project_document(tx, ty, id, &field.selection_set, ctx)?);
        }
        for id in &ids {
            tx.delete_document(ty, id)?;
        }
        Ok(Json::Array(out))
    }

    fn matching_ids(
        &self,
        tx: &Transaction<'_, S>,
        ty: &str,
        filter: &Json,
        ctx: &RequestCtx<'_, '_>,
    ) -> QueryResult<Vec<String>> {
        let mut cursor = tx.documents(ty)?;
        let mut ids = Vec::new();
        while let Some((id, _)) = cursor.next()? {
            ctx.check_cancel()?;
            if tx.matches(ty, &id, filter)? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    // -----------------------------------------------------------------
    // Projection
    // -----------------------------------------------------------------

    fn project_document<'d, 'b>(
        &self,
        tx: &Transaction<'_, S>,
        ty: &str,
        id: &str,
        selection_set: &'b QSelectionSet<'d>,
        ctx: &RequestCtx<'d, 'b>,
    ) -> QueryResult<Json> {
        let def = self
            .repo
            .schema()
            .object(ty)
            .ok_or_else(|| QueryError::Selection(format!("unknown type {ty:?}")))?;
        let fields = collect_fields(selection_set, &ctx.fragments, ty)?;
        if fields.is_empty() {
            return Err(QueryError::Selection(format!(
                "{ty} requires a selection set"
            )));
        }
        let doc = tx.read_document(ty, id)?;

        let mut out = Map::new();
        for field in fields {
            let key = field.alias.as_ref().unwrap_or(&field.name).clone();
            let name = field.name.as_str();
            let value = match name {
                "__typename" => Json::String(ty.to_string()),
                "id" => Json::String(id.to_string()),
                "hash" => Json::String(tx.document_hash(ty, id)?.to_hex()),
                _ => {
                    let field_def = def.field(name).ok_or_else(|| {
                        QueryError::Selection(format!("unknown field {name:?} on {ty}"))
                    })?;
                    match &field_def.ty {
                        FieldType::Scalar(_)
                        | FieldType::Enum(_)
                        | FieldType::ScalarList(_)
                        | FieldType::EnumList(_) => {
                            require_leaf(field, ty)?;
                            doc.field_or_null(name).to_json()
                        }
                        FieldType::Relation(target) => {
                            require_selection(field, ty)?;
                            match doc.field_or_null(name) {
                                Value::String(target_id) => self.project_document(
                                    tx,
                                    target,
                                    &target_id,
                                    &field.selection_set,
                                    ctx,
                                )?,
                                _ => Json::Null,
                            }
                        }
                        FieldType::RelationList(target) => {
                            require_selection(field, ty)?;
                            let args = resolve_arguments(&field.arguments, &ctx.variables)?;
                            let filter = args.get("filter").cloned().unwrap_or(Json::Null);
                            let ids: Vec<String> = match doc.field_or_null(name) {
                                Value::List(items) => items
                                    .iter()
                                    .filter_map(|v| v.as_str().map(str::to_string))
                                    .collect(),
                                _ => Vec::new(),
                            };
                            let mut projected = Vec::new();
                            for target_id in ids {
                                if tx.matches(target, &target_id, &filter)? {
                                    projected.push(self.project_document(
                                        tx,
                                        target,
                                        &target_id,
                                        &field.selection_set,
                                        ctx,
                                    )?);
                                }
                            }
                            Json::Array(projected)
                        }
                    }
                }
            };
            out.insert(key, value);
        }
        Ok(Json::Object(out))
    }
}

// ---------------------------------------------------------------------------
// Operation and selection plumbing
// ---------------------------------------------------------------------------

fn select_operation<'d, 'b>(
    document: &'b Document<'d, String>,
    operation_name: Option<&str>,
) -> QueryResult<Operation<'d, 'b>> {
    let mut operations = Vec::new();
    for definition in &document.definitions {
        let Definition::Operation(operation) = definition else {
            continue;
        };
        let op = match operation {
            OperationDefinition::SelectionSet(selection_set) => Operation {
                kind: OpKind::Query,
                selection_set,
                directives: &[],
                variable_definitions: &[],
            },
            OperationDefinition::Query(query) => Operation {
                kind: OpKind::Query,
                selection_set: &query.selection_set,
                directives: &query.directives,
                variable_definitions: &query.variable_definitions,
            },
            OperationDefinition::Mutation(mutation) => Operation {
                kind: OpKind::Mutation,
                selection_set: &mutation.selection_set,
                directives: &mutation.directives,
                variable_definitions: &mutation.variable_definitions,
            },
            OperationDefinition::Subscription(_) => {
                return Err(QueryError::Unsupported(
                    "subscriptions are not supported".to_string(),
                ))
            }
        };
        let name = match operation {
            OperationDefinition::Query(q) => q.name.as_deref(),
            OperationDefinition::Mutation(m) => m.name.as_deref(),
            _ => None,
        };
        operations.push((name, op));
    }

    match operation_name {
        Some(wanted) => operations
            .into_iter()
            .find(|(name, _)| *name == Some(wanted))
            .map(|(_, op)| op)
            .ok_or_else(|| QueryError::OperationUndefined(format!("no operation named {wanted:?}"))),
        None => {
            let mut iter = operations.into_iter();
            let first = iter
                .next()
                .ok_or_else(|| QueryError::OperationUndefined("no operations".to_string()))?;
            if iter.next().is_some() {
                return Err(QueryError::OperationUndefined(
                    "multiple operations; operationName is required".to_string(),
                ));
            }
            Ok(first.1)
        }
    }
}

/// Merge provided variables over the operation's declared defaults.
fn bind_variables(
    definitions: &[VariableDefinition<'_, String>],
    provided: Option<&Map<String, Json>>,
) -> QueryResult<Map<String, Json>> {
    let mut variables = Map::new();
    let empty = Map::new();
    for definition in definitions {
        if let Some(default) = &definition.default_value {
            variables.insert(definition.name.clone(), resolve_value(default, &empty)?);
        }
    }
    if let Some(provided) = provided {
        for (name, value) in provided {
            variables.insert(name.clone(), value.clone());
        }
    }
    Ok(variables)
}

/// Read `@revision(hash:)` off the operation, if present.
fn revision_from(
    directives: &[Directive<'_, String>],
    ctx: &RequestCtx<'_, '_>,
) -> QueryResult<Option<Hash>> {
    let Some(directive) = directives.iter().find(|d| d.name == "revision") else {
        return Ok(None);
    };
    let Some((_, value)) = directive.arguments.iter().find(|(name, _)| name == "hash") else {
        return Err(QueryError::InvalidRevision(
            "@revision requires hash".to_string(),
        ));
    };
    let resolved = resolve_value(value, &ctx.variables)?;
    let Some(hex) = resolved.as_str() else {
        return Err(QueryError::InvalidRevision(format!(
            "hash must be a string, got {resolved}"
        )));
    };
    Hash::from_hex(hex)
        .map(Some)
        .map_err(|e| QueryError::InvalidRevision(e.to_string()))
}

/// Flatten a selection set into fields, expanding fragments whose type
/// condition matches `type_name` (or is absent).
fn collect_fields<'d, 'b>(
    selection_set: &'b QSelectionSet<'d>,
    fragments: &Fragments<'d, 'b>,
    type_name: &str,
) -> QueryResult<Vec<&'b QField<'d>>> {
    let mut out = Vec::new();
    for item in &selection_set.items {
        match item {
            Selection::Field(field) => out.push(field),
            Selection::FragmentSpread(spread) => {
                let fragment = fragments.get(&spread.fragment_name).ok_or_else(|| {
                    QueryError::Parse(format!("unknown fragment {:?}", spread.fragment_name))
                })?;
                let TypeCondition::On(on) = &fragment.type_condition;
                if on == type_name {
                    out.extend(collect_fields(&fragment.selection_set, fragments, type_name)?);
                }
            }
            Selection::InlineFragment(inline) => {
                let applies = match &inline.type_condition {
                    Some(TypeCondition::On(on)) => on == type_name,
                    None => true,
                };
                if applies {
                    out.extend(collect_fields(&inline.selection_set, fragments, type_name)?);
                }
            }
        }
    }
    Ok(out)
}

/// Flatten a selection set, expanding every fragment regardless of its
/// type condition. Used for introspection trees, whose meta-types are not
/// in the registry.
fn collect_fields_any<'d, 'b>(
    selection_set: &'b QSelectionSet<'d>,
    fragments: &Fragments<'d, 'b>,
) -> QueryResult<Vec<&'b QField<'d>>> {
    let mut out = Vec::new();
    for item in &selection_set.items {
        match item {
            Selection::Field(field) => out.push(field),
            Selection::FragmentSpread(spread) => {
                let fragment = fragments.get(&spread.fragment_name).ok_or_else(|| {
                    QueryError::Parse(format!("unknown fragment {:?}", spread.fragment_name))
                })?;
                out.extend(collect_fields_any(&fragment.selection_set, fragments)?);
            }
            Selection::InlineFragment(inline) => {
                out.extend(collect_fields_any(&inline.selection_set, fragments)?);
            }
        }
    }
    Ok(out)
}

/// Prune a ready-made JSON tree by a selection set (introspection results).
fn project_json<'d, 'b>(
    value: &Json,
    selection_set: &'b QSelectionSet<'d>,
    ctx: &RequestCtx<'d, 'b>,
) -> QueryResult<Json> {
    if selection_set.items.is_empty() {
        return Ok(value.clone());
    }
    match value {
        Json::Object(map) => {
            let mut out = Map::new();
            for field in collect_fields_any(selection_set, &ctx.fragments)? {
                let key = field.alias.as_ref().unwrap_or(&field.name).clone();
                let projected = match map.get(field.name.as_str()) {
                    Some(inner) => project_json(inner, &field.selection_set, ctx)?,
                    None => Json::Null,
                };
                out.insert(key, projected);
            }
            Ok(Json::Object(out))
        }
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(project_json(item, selection_set, ctx)?);
            }
            Ok(Json::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn known_type<'t, S: Storage>(
    repo: &'t Repository<S>,
    field_name: &'t str,
    prefix: &str,
) -> Option<String> {
    let ty = field_name.strip_prefix(prefix)?;
    repo.schema().object(ty).map(|def| def.name.clone())
}

fn require_selection(field: &QField<'_>, ty: &str) -> QueryResult<()> {
    if field.selection_set.items.is_empty() {
        return Err(QueryError::Selection(format!(
            "field {:?} on {ty} requires a selection set",
            field.name
        )));
    }
    Ok(())
}

fn require_leaf(field: &QField<'_>, ty: &str) -> QueryResult<()> {
    if !field.selection_set.items.is_empty() {
        return Err(QueryError::Selection(format!(
            "field {:?} on {ty} does not take a selection set",
            field.name
        )));
    }
    Ok(())
}

fn error_response(error: QueryError) -> QueryResponse {
    QueryResponse {
        data: None,
        errors: vec![GraphQLError::new(error.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_store::MemoryStorage;

    const SCHEMA: &str = r#"
        type User {
            name: String!
            age: Int
            tags: [String]
            boss: User
            friends: [User]
        }
    "#;

    fn repo() -> Repository<MemoryStorage> {
        Repository::init(MemoryStorage::new(), SCHEMA).unwrap()
    }

    fn run(repo: &Repository<MemoryStorage>, query: &str) -> QueryResponse {
        Executor::new(repo).execute(&QueryParams::new(query))
    }

    fn run_ok(repo: &Repository<MemoryStorage>, query: &str) -> Json {
        let response = run(repo, query);
        assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
        response.data.expect("data")
    }

    #[test]
    fn parse_error_aborts_request() {
        let repo = repo();
        let response = run(&repo, "{ listUser { ");
        assert!(response.data.is_none());
        assert!(response.errors[0].message.contains("parse"));
    }

    #[test]
    fn typename_on_roots() {
        let repo = repo();
        assert_eq!(
            run_ok(&repo, "{ __typename }"),
            json!({"__typename": "Query"})
        );
        assert_eq!(
            run_ok(&repo, "mutation { __typename }"),
            json!({"__typename": "Mutation"})
        );
    }

    #[test]
    fn create_then_list() {
        let repo = repo();
        let created = run_ok(
            &repo,
            r#"mutation { createUser(data: {name: "Bob", age: 30}) { id name age } }"#,
        );
        assert_eq!(created["createUser"]["name"], json!("Bob"));
        assert_eq!(created["createUser"]["age"], json!(30));

        let listed = run_ok(&repo, "{ listUser { name } }");
        assert_eq!(listed, json!({"listUser": [{"name": "Bob"}]}));
    }

    #[test]
    fn find_by_id_roundtrip() {
        let repo = repo();
        let created = run_ok(&repo, r#"mutation { createUser(data: {name: "Ada"}) { id } }"#);
        let id = created["createUser"]["id"].as_str().unwrap();
        let found = run_ok(&repo, &format!(r#"{{ findUser(id: "{id}") {{ name }} }}"#));
        assert_eq!(found, json!({"findUser": {"name": "Ada"}}));
    }

    #[test]
    fn find_missing_id_is_a_field_error() {
        let repo = repo();
        let response = run(&repo, r#"{ findUser(id: "nope") { name } }"#);
        assert_eq!(response.data.unwrap()["findUser"], Json::Null);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].path, vec![json!("findUser")]);
    }

    #[test]
    fn sibling_fields_survive_one_failure() {
        let repo = repo();
        let response = run(
            &repo,
            r#"{ bad: findUser(id: "nope") { name } ok: listUser { name } }"#,
        );
        let data = response.data.unwrap();
        assert_eq!(data["bad"], Json::Null);
        assert_eq!(data["ok"], json!([]));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].path, vec![json!("bad")]);
    }

    #[test]
    fn aliases_rename_response_keys() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "A"}) { id } }"#);
        let data = run_ok(&repo, "{ everyone: listUser { moniker: name } }");
        assert_eq!(data, json!({"everyone": [{"moniker": "A"}]}));
    }

    #[test]
    fn fragments_expand() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "F", age: 1}) { id } }"#);
        let data = run_ok(
            &repo,
            r#"
            query { listUser { ...parts } }
            fragment parts on User { name age }
            "#,
        );
        assert_eq!(data, json!({"listUser": [{"name": "F", "age": 1}]}));
    }

    #[test]
    fn inline_fragments_expand() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "I"}) { id } }"#);
        let data = run_ok(&repo, "{ listUser { ... on User { name } } }");
        assert_eq!(data, json!({"listUser": [{"name": "I"}]}));
    }

    #[test]
    fn named_operation_is_selected() {
        let repo = repo();
        let params = QueryParams::new(
            "query A { __typename } query B { listUser { id } }",
        )
        .with_operation("B");
        let response = Executor::new(&repo).execute(&params);
        assert!(response.errors.is_empty());
        assert_eq!(response.data.unwrap(), json!({"listUser": []}));
    }

    #[test]
    fn ambiguous_operation_is_rejected() {
        let repo = repo();
        let response = run(&repo, "query A { __typename } query B { __typename }");
        assert!(response.errors[0].message.contains("operation"));
    }

    #[test]
    fn unknown_operation_name_is_rejected() {
        let repo = repo();
        let params = QueryParams::new("query A { __typename }").with_operation("Z");
        let response = Executor::new(&repo).execute(&params);
        assert!(response.errors[0].message.contains("operation"));
    }

    #[test]
    fn unknown_root_field_is_a_field_error() {
        let repo = repo();
        let response = run(&repo, "{ listGhost { id } }");
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.contains("unknown field"));
    }

    #[test]
    fn variables_flow_into_arguments() {
        let repo = repo();
        let mut variables = Map::new();
        variables.insert("data".to_string(), json!({"name": "V", "age": 7}));
        let params = QueryParams::new(
            "mutation M($data: UserCreateInput) { createUser(data: $data) { name age } }",
        )
        .with_variables(variables);
        let response = Executor::new(&repo).execute(&params);
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.unwrap()["createUser"],
            json!({"name": "V", "age": 7})
        );
    }

    #[test]
    fn variable_defaults_apply() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "D", age: 5}) { id } }"#);
        let data = run_ok(
            &repo,
            r#"query Q($min: Int = 3) { listUser(filter: {age: {gte: $min}}) { name } }"#,
        );
        assert_eq!(data, json!({"listUser": [{"name": "D"}]}));
    }

    #[test]
    fn update_patches_matches() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "Bob"}) { id } }"#);
        let data = run_ok(
            &repo,
            r#"mutation { updateUser(filter: {name: {eq: "Bob"}}, patch: {name: {set: "Alice"}}) { name } }"#,
        );
        assert_eq!(data, json!({"updateUser": [{"name": "Alice"}]}));
        let listed = run_ok(&repo, "{ listUser { name } }");
        assert_eq!(listed, json!({"listUser": [{"name": "Alice"}]}));
    }

    #[test]
    fn delete_returns_pre_delete_values() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "Gone"}) { id } }"#);
        let data = run_ok(
            &repo,
            r#"mutation { deleteUser(filter: {name: {eq: "Gone"}}) { name } }"#,
        );
        assert_eq!(data, json!({"deleteUser": [{"name": "Gone"}]}));
        assert_eq!(run_ok(&repo, "{ listUser { id } }"), json!({"listUser": []}));
    }

    #[test]
    fn relation_projection_recurses() {
        let repo = repo();
        run_ok(
            &repo,
            r#"mutation { createUser(data: {name: "A", boss: {name: "B"}}) { id } }"#,
        );
        let data = run_ok(
            &repo,
            r#"{ listUser(filter: {name: {eq: "A"}}) { name boss { name } } }"#,
        );
        assert_eq!(
            data,
            json!({"listUser": [{"name": "A", "boss": {"name": "B"}}]})
        );
    }

    #[test]
    fn relation_list_projection_applies_field_filter() {
        let repo = repo();
        run_ok(
            &repo,
            r#"mutation { createUser(data: {name: "A", friends: [{name: "F1"}, {name: "F2"}]}) { id } }"#,
        );
        let data = run_ok(
            &repo,
            r#"{ listUser(filter: {name: {eq: "A"}}) { friends(filter: {name: {eq: "F2"}}) { name } } }"#,
        );
        assert_eq!(
            data,
            json!({"listUser": [{"friends": [{"name": "F2"}]}]})
        );
    }

    #[test]
    fn scalar_field_rejects_subselection() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "A"}) { id } }"#);
        let response = run(&repo, "{ listUser { name { x } } }");
        assert!(!response.errors.is_empty());
    }

    #[test]
    fn relation_field_requires_subselection() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "A"}) { id } }"#);
        let response = run(&repo, "{ listUser { boss } }");
        assert!(!response.errors.is_empty());
    }

    #[test]
    fn hash_field_projects_document_hash() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "H"}) { id } }"#);
        let data = run_ok(&repo, "{ listUser { hash } }");
        let hash = data["listUser"][0]["hash"].as_str().unwrap();
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn revision_pins_reads_to_history() {
        let repo = repo();
        run_ok(&repo, r#"mutation { createUser(data: {name: "Old"}) { id } }"#);
        let old_head = repo.head().unwrap().to_hex();
        run_ok(
            &repo,
            r#"mutation { updateUser(filter: {name: {eq: "Old"}}, patch: {name: {set: "New"}}) { id } }"#,
        );
        let pinned = run_ok(
            &repo,
            &format!(r#"query Q @revision(hash: "{old_head}") {{ listUser {{ name }} }}"#),
        );
        assert_eq!(pinned, json!({"listUser": [{"name": "Old"}]}));
        let current = run_ok(&repo, "{ listUser { name } }");
        assert_eq!(current, json!({"listUser": [{"name": "New"}]}));
    }

    #[test]
    fn malformed_revision_is_rejected() {
        let repo = repo();
        let response = run(&repo, r#"query Q @revision(hash: "zzz") { listUser { id } }"#);
        assert!(response.errors[0].message.contains("revision"));
        let response = run(&repo, "query Q @revision { listUser { id } }");
        assert!(response.errors[0].message.contains("revision"));
    }

    #[test]
    fn unknown_revision_commit_is_rejected() {
        let repo = repo();
        let missing = Hash::digest(b"not a commit").to_hex();
        let response = run(
            &repo,
            &format!(r#"query Q @revision(hash: "{missing}") {{ listUser {{ id }} }}"#),
        );
        assert!(!response.errors.is_empty());
    }

    #[test]
    fn cancelled_request_aborts() {
        let repo = repo();
        let cancel = CancelToken::new();
        cancel.cancel();
        let params = QueryParams::new("{ listUser { id } }").with_cancel(cancel);
        let response = Executor::new(&repo).execute(&params);
        assert!(response.data.is_none());
        assert!(response.errors[0].message.contains("cancel"));
    }

    #[test]
    fn introspection_schema_smoke() {
        let repo = repo();
        let data = run_ok(
            &repo,
            "{ __schema { queryType { name } mutationType { name } types { name kind } } }",
        );
        assert_eq!(data["__schema"]["queryType"]["name"], json!("Query"));
        let types = data["__schema"]["types"].as_array().unwrap();
        assert!(types.iter().any(|t| t["name"] == json!("User")));
    }

    #[test]
    fn introspection_type_lookup() {
        let repo = repo();
        let data = run_ok(
            &repo,
            r#"{ __type(name: "User") { name kind fields { name type { kind name ofType { name } } } } }"#,
        );
        assert_eq!(data["__type"]["kind"], json!("OBJECT"));
        let fields = data["__type"]["fields"].as_array().unwrap();
        assert!(fields.iter().any(|f| f["name"] == json!("name")));
    }

    #[test]
    fn mutation_advances_head() {
        let repo = repo();
        let before = repo.head().unwrap();
        run_ok(&repo, r#"mutation { createUser(data: {name: "X"}) { id } }"#);
        assert_ne!(repo.head().unwrap(), before);
    }

    #[test]
    fn query_does_not_advance_head() {
        let repo = repo();
        let before = repo.head().unwrap();
        run_ok(&repo, "{ listUser { id } }");
        assert_eq!(repo.head().unwrap(), before);
    }
}
