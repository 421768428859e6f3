//! Static introspection over the generated schema.
//!
//! `__schema` and `__type` answers are assembled as plain JSON from the
//! type registry, then pruned by the request's selection set like any
//! other object tree. Only the meta-fields this engine can honestly
//! describe are emitted; deprecation is always `false` because the
//! generated surface has no deprecated members.

use serde_json::{json, Value as Json};

use strata_schema::{TypeRef, TypeRegistry, TypeSpec};

/// The full `__schema` JSON.
pub fn schema_json(registry: &TypeRegistry) -> Json {
    let types: Vec<Json> = registry.types.iter().map(type_spec_json).collect();
    let directives: Vec<Json> = registry
        .directives
        .iter()
        .map(|directive| {
            json!({
                "name": directive.name,
                "description": Json::Null,
                "locations": directive.locations,
                "args": directive
                    .args
                    .iter()
                    .map(|arg| input_value_json(&arg.name, &arg.ty))
                    .collect::<Vec<Json>>(),
            })
        })
        .collect();
    json!({
        "queryType": {"name": "Query"},
        "mutationType": {"name": "Mutation"},
        "subscriptionType": Json::Null,
        "types": types,
        "directives": directives,
    })
}

/// The `__type(name:)` JSON, or null for an unknown name.
pub fn type_json(registry: &TypeRegistry, name: &str) -> Json {
    registry.get(name).map(type_spec_json).unwrap_or(Json::Null)
}

fn type_spec_json(spec: &TypeSpec) -> Json {
    let mut out = json!({
        "kind": spec.kind(),
        "name": spec.name(),
        "description": Json::Null,
        "fields": Json::Null,
        "inputFields": Json::Null,
        "interfaces": Json::Null,
        "enumValues": Json::Null,
        "possibleTypes": Json::Null,
    });
    match spec {
        TypeSpec::Object { fields, .. } => {
            out["interfaces"] = json!([]);
            out["fields"] = fields
                .iter()
                .map(|field| {
                    json!({
                        "name": field.name,
                        "description": Json::Null,
                        "args": field
                            .args
                            .iter()
                            .map(|arg| input_value_json(&arg.name, &arg.ty))
                            .collect::<Vec<Json>>(),
                        "type": type_ref_json(&field.ty),
                        "isDeprecated": false,
                        "deprecationReason": Json::Null,
                    })
                })
                .collect::<Vec<Json>>()
                .into();
        }
        TypeSpec::Input { fields, .. } => {
            out["inputFields"] = fields
                .iter()
                .map(|field| input_value_json(&field.name, &field.ty))
                .collect::<Vec<Json>>()
                .into();
        }
        TypeSpec::Enum { values, .. } => {
            out["enumValues"] = values
                .iter()
                .map(|value| {
                    json!({
                        "name": value,
                        "description": Json::Null,
                        "isDeprecated": false,
                        "deprecationReason": Json::Null,
                    })
                })
                .collect::<Vec<Json>>()
                .into();
        }
        TypeSpec::Scalar { .. } => {}
    }
    out
}

fn input_value_json(name: &str, ty: &TypeRef) -> Json {
    json!({
        "name": name,
        "description": Json::Null,
        "type": type_ref_json(ty),
        "defaultValue": Json::Null,
    })
}

/// A type reference with NON_NULL / LIST wrappers as nested `ofType`.
fn type_ref_json(ty: &TypeRef) -> Json {
    match ty {
        TypeRef::Named(name) => json!({
            "kind": "UNRESOLVED",
            "name": name,
            "ofType": Json::Null,
        }),
        TypeRef::NonNull(inner) => json!({
            "kind": "NON_NULL",
            "name": Json::Null,
            "ofType": type_ref_json(inner),
        }),
        TypeRef::List(inner) => json!({
            "kind": "LIST",
            "name": Json::Null,
            "ofType": type_ref_json(inner),
        }),
    }
}

/// Patch `UNRESOLVED` named references with their actual kind.
///
/// Named references are resolved in a second pass because `type_ref_json`
/// has no registry in scope.
pub fn resolve_named_kinds(registry: &TypeRegistry, value: &mut Json) {
    match value {
        Json::Object(map) => {
            if map.get("kind") == Some(&json!("UNRESOLVED")) {
                let kind = map
                    .get("name")
                    .and_then(Json::as_str)
                    .and_then(|name| registry.get(name))
                    .map(TypeSpec::kind)
                    .unwrap_or("SCALAR");
                map.insert("kind".to_string(), json!(kind));
            }
            for item in map.values_mut() {
                resolve_named_kinds(registry, item);
            }
        }
        Json::Array(items) => {
            for item in items {
                resolve_named_kinds(registry, item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::compile;

    fn registry() -> TypeRegistry {
        compile("enum Role { ADMIN } type User { name: String role: Role friends: [User] }")
            .unwrap()
            .registry()
            .clone()
    }

    #[test]
    fn schema_names_roots() {
        let registry = registry();
        let mut schema = schema_json(&registry);
        resolve_named_kinds(&registry, &mut schema);
        assert_eq!(schema["queryType"]["name"], json!("Query"));
        assert_eq!(schema["mutationType"]["name"], json!("Mutation"));
        assert_eq!(schema["subscriptionType"], Json::Null);
    }

    #[test]
    fn schema_lists_generated_types() {
        let registry = registry();
        let schema = schema_json(&registry);
        let names: Vec<&str> = schema["types"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        for expected in ["User", "UserFilterInput", "UserCreateInput", "Role", "Query"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn type_json_resolves_wrappers() {
        let registry = registry();
        let mut user = type_json(&registry, "User");
        resolve_named_kinds(&registry, &mut user);
        let fields = user["fields"].as_array().unwrap();
        let id = fields.iter().find(|f| f["name"] == json!("id")).unwrap();
        assert_eq!(id["type"]["kind"], json!("NON_NULL"));
        assert_eq!(id["type"]["ofType"]["name"], json!("ID"));
        assert_eq!(id["type"]["ofType"]["kind"], json!("SCALAR"));
    }

    #[test]
    fn unknown_type_is_null() {
        assert_eq!(type_json(&registry(), "Ghost"), Json::Null);
    }

    #[test]
    fn enum_values_are_listed() {
        let registry = registry();
        let role = type_json(&registry, "Role");
        assert_eq!(role["enumValues"][0]["name"], json!("ADMIN"));
        assert_eq!(role["fields"], Json::Null);
    }

    #[test]
    fn directive_is_described() {
        let registry = registry();
        let schema = schema_json(&registry);
        assert_eq!(schema["directives"][0]["name"], json!("revision"));
    }
}
