use std::collections::BTreeMap;

use graphql_parser::schema::{self, Definition, TypeDefinition};
use tracing::debug;

use crate::catalog::{CompiledSchema, FieldDef, FieldType, ObjectDef, ScalarKind};
use crate::error::{SchemaError, SchemaResult};
use crate::registry::{DirectiveSpec, FieldSpec, InputValueDef, TypeRef, TypeRegistry, TypeSpec};
use crate::render::render_sdl;
use crate::RESERVED_FIELDS;

/// Type names the user may not declare.
const RESERVED_TYPES: [&str; 8] = [
    "Query",
    "Mutation",
    "Subscription",
    "String",
    "Int",
    "Float",
    "Boolean",
    "ID",
];

/// Compile a user SDL fragment into the full generated surface.
pub fn compile(source: &str) -> SchemaResult<CompiledSchema> {
    let document: schema::Document<'_, String> =
        graphql_parser::parse_schema(source).map_err(|e| SchemaError::Parse(e.to_string()))?;

    // First pass: collect declared names so field types can be classified.
    let mut enums: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut object_names: Vec<String> = Vec::new();

    for definition in &document.definitions {
        match definition {
            Definition::TypeDefinition(TypeDefinition::Object(object)) => {
                check_type_name(&object.name, &object_names, &enums)?;
                object_names.push(object.name.clone());
            }
            Definition::TypeDefinition(TypeDefinition::Enum(en)) => {
                check_type_name(&en.name, &object_names, &enums)?;
                let mut values = Vec::new();
                for value in &en.values {
                    if values.contains(&value.name) {
                        return Err(SchemaError::DuplicateEnumValue {
                            enum_name: en.name.clone(),
                            value: value.name.clone(),
                        });
                    }
                    values.push(value.name.clone());
                }
                enums.insert(en.name.clone(), values);
            }
            Definition::TypeDefinition(TypeDefinition::Scalar(s)) => {
                return Err(SchemaError::Unsupported(format!(
                    "scalar declaration {:?}",
                    s.name
                )))
            }
            Definition::TypeDefinition(TypeDefinition::Interface(i)) => {
                return Err(SchemaError::Unsupported(format!(
                    "interface declaration {:?}",
                    i.name
                )))
            }
            Definition::TypeDefinition(TypeDefinition::Union(u)) => {
                return Err(SchemaError::Unsupported(format!(
                    "union declaration {:?}",
                    u.name
                )))
            }
            Definition::TypeDefinition(TypeDefinition::InputObject(io)) => {
                return Err(SchemaError::Unsupported(format!(
                    "input declaration {:?}",
                    io.name
                )))
            }
            Definition::SchemaDefinition(_) => {
                return Err(SchemaError::Unsupported("schema definition".to_string()))
            }
            Definition::TypeExtension(_) => {
                return Err(SchemaError::Unsupported("type extension".to_string()))
            }
            Definition::DirectiveDefinition(d) => {
                return Err(SchemaError::Unsupported(format!(
                    "directive declaration {:?}",
                    d.name
                )))
            }
        }
    }

    if object_names.is_empty() {
        return Err(SchemaError::Empty);
    }

    // Second pass: classify fields against the collected names.
    let mut objects: BTreeMap<String, ObjectDef> = BTreeMap::new();
    for definition in &document.definitions {
        let Definition::TypeDefinition(TypeDefinition::Object(object)) = definition else {
            continue;
        };
        let mut fields: Vec<FieldDef> = Vec::new();
        for field in &object.fields {
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(SchemaError::ReservedField {
                    type_name: object.name.clone(),
                    field: field.name.clone(),
                });
            }
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    type_name: object.name.clone(),
                    field: field.name.clone(),
                });
            }
            if !field.arguments.is_empty() {
                return Err(SchemaError::Unsupported(format!(
                    "arguments on field {:?} of {:?}",
                    field.name, object.name
                )));
            }
            let (ty, required) =
                classify_field(&object.name, &field.name, &field.field_type, &object_names, &enums)?;
            fields.push(FieldDef {
                name: field.name.clone(),
                ty,
                required,
            });
        }
        objects.insert(
            object.name.clone(),
            ObjectDef {
                name: object.name.clone(),
                fields,
            },
        );
    }

    let registry = build_registry(&objects, &enums);
    let sdl = render_sdl(&registry);
    debug!(
        objects = objects.len(),
        enums = enums.len(),
        generated_types = registry.types.len(),
        "schema compiled"
    );

    Ok(CompiledSchema {
        source: source.to_string(),
        objects,
        enums,
        registry,
        sdl,
    })
}

fn check_type_name(
    name: &str,
    objects: &[String],
    enums: &BTreeMap<String, Vec<String>>,
) -> SchemaResult<()> {
    if RESERVED_TYPES.contains(&name) {
        return Err(SchemaError::ReservedType(name.to_string()));
    }
    if objects.iter().any(|n| n == name) || enums.contains_key(name) {
        return Err(SchemaError::DuplicateType(name.to_string()));
    }
    Ok(())
}

/// Classify a parsed field type into the catalog shape.
///
/// Outer non-null marks the field required; element non-null inside a list
/// is accepted and normalized away (list values never store nulls).
fn classify_field(
    type_name: &str,
    field_name: &str,
    parsed: &schema::Type<'_, String>,
    object_names: &[String],
    enums: &BTreeMap<String, Vec<String>>,
) -> SchemaResult<(FieldType, bool)> {
    let (inner, required) = match parsed {
        schema::Type::NonNullType(inner) => (inner.as_ref(), true),
        other => (other, false),
    };

    match inner {
        schema::Type::NamedType(name) => {
            let ty = classify_named(type_name, field_name, name, object_names, enums, false)?;
            Ok((ty, required))
        }
        schema::Type::ListType(element) => {
            let element = match element.as_ref() {
                schema::Type::NonNullType(inner) => inner.as_ref(),
                other => other,
            };
            match element {
                schema::Type::NamedType(name) => {
                    let ty = classify_named(type_name, field_name, name, object_names, enums, true)?;
                    Ok((ty, required))
                }
                _ => Err(SchemaError::Unsupported(format!(
                    "nested list in field {field_name:?} of {type_name:?}"
                ))),
            }
        }
        schema::Type::NonNullType(_) => Err(SchemaError::Unsupported(format!(
            "double non-null in field {field_name:?} of {type_name:?}"
        ))),
    }
}

fn classify_named(
    type_name: &str,
    field_name: &str,
    referenced: &str,
    object_names: &[String],
    enums: &BTreeMap<String, Vec<String>>,
    in_list: bool,
) -> SchemaResult<FieldType> {
    if let Some(kind) = ScalarKind::from_name(referenced) {
        return Ok(if in_list {
            FieldType::ScalarList(kind)
        } else {
            FieldType::Scalar(kind)
        });
    }
    if enums.contains_key(referenced) {
        return Ok(if in_list {
            FieldType::EnumList(referenced.to_string())
        } else {
            FieldType::Enum(referenced.to_string())
        });
    }
    if object_names.iter().any(|n| n == referenced) {
        return Ok(if in_list {
            FieldType::RelationList(referenced.to_string())
        } else {
            FieldType::Relation(referenced.to_string())
        });
    }
    Err(SchemaError::UnknownFieldType {
        type_name: type_name.to_string(),
        field: field_name.to_string(),
        referenced: referenced.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Registry generation
// ---------------------------------------------------------------------------

fn build_registry(
    objects: &BTreeMap<String, ObjectDef>,
    enums: &BTreeMap<String, Vec<String>>,
) -> TypeRegistry {
    let mut types = Vec::new();

    for kind in ScalarKind::all() {
        types.push(TypeSpec::Scalar {
            name: kind.type_name().to_string(),
        });
    }
    for kind in ScalarKind::all() {
        types.extend(scalar_prelude(kind));
    }
    for (name, values) in enums {
        types.extend(enum_types(name, values));
    }
    for def in objects.values() {
        types.extend(object_types(def));
    }
    types.push(query_root(objects));
    types.push(mutation_root(objects));

    TypeRegistry {
        types,
        directives: vec![DirectiveSpec {
            name: "revision".to_string(),
            args: vec![InputValueDef::new(
                "hash",
                TypeRef::non_null(TypeRef::named("String")),
            )],
            locations: vec!["QUERY", "MUTATION"],
        }],
    }
}

/// Filter, list-filter, patch, and list-patch inputs for one scalar.
fn scalar_prelude(kind: ScalarKind) -> Vec<TypeSpec> {
    let name = kind.type_name();
    let named = || TypeRef::named(name);
    let named_list = || TypeRef::list(TypeRef::non_null(named()));

    let mut filter_fields = vec![
        InputValueDef::new("eq", named()),
        InputValueDef::new("neq", named()),
    ];
    if kind.is_ordered() {
        filter_fields.push(InputValueDef::new("gt", named()));
        filter_fields.push(InputValueDef::new("gte", named()));
        filter_fields.push(InputValueDef::new("lt", named()));
        filter_fields.push(InputValueDef::new("lte", named()));
    }
    if kind != ScalarKind::Boolean {
        filter_fields.push(InputValueDef::new("in", named_list()));
        filter_fields.push(InputValueDef::new("nin", named_list()));
    }

    vec![
        TypeSpec::Input {
            name: format!("{name}FilterInput"),
            fields: filter_fields,
        },
        TypeSpec::Input {
            name: format!("{name}ListFilterInput"),
            fields: quantifier_fields(&format!("{name}FilterInput")),
        },
        TypeSpec::Input {
            name: format!("{name}PatchInput"),
            fields: vec![InputValueDef::new("set", named())],
        },
        TypeSpec::Input {
            name: format!("{name}ListPatchInput"),
            fields: vec![
                InputValueDef::new("set", named_list()),
                InputValueDef::new("append", named_list()),
            ],
        },
    ]
}

/// The enum itself plus its filter/patch inputs.
fn enum_types(name: &str, values: &[String]) -> Vec<TypeSpec> {
    let named = || TypeRef::named(name);
    let named_list = || TypeRef::list(TypeRef::non_null(named()));
    vec![
        TypeSpec::Enum {
            name: name.to_string(),
            values: values.to_vec(),
        },
        TypeSpec::Input {
            name: format!("{name}FilterInput"),
            fields: vec![
                InputValueDef::new("eq", named()),
                InputValueDef::new("neq", named()),
                InputValueDef::new("in", named_list()),
                InputValueDef::new("nin", named_list()),
            ],
        },
        TypeSpec::Input {
            name: format!("{name}ListFilterInput"),
            fields: quantifier_fields(&format!("{name}FilterInput")),
        },
        TypeSpec::Input {
            name: format!("{name}PatchInput"),
            fields: vec![InputValueDef::new("set", named())],
        },
        TypeSpec::Input {
            name: format!("{name}ListPatchInput"),
            fields: vec![
                InputValueDef::new("set", named_list()),
                InputValueDef::new("append", named_list()),
            ],
        },
    ]
}

/// `all` / `any` / `none`, each a list of the element filter.
fn quantifier_fields(element_filter: &str) -> Vec<InputValueDef> {
    let filters = || TypeRef::list(TypeRef::non_null(TypeRef::named(element_filter)));
    vec![
        InputValueDef::new("all", filters()),
        InputValueDef::new("any", filters()),
        InputValueDef::new("none", filters()),
    ]
}

/// Output type + the five generated inputs for one object type.
fn object_types(def: &ObjectDef) -> Vec<TypeSpec> {
    let name = &def.name;

    // Output object: system fields first, then declared fields.
    let mut fields = vec![
        FieldSpec::new("id", TypeRef::non_null(TypeRef::named("ID"))),
        FieldSpec::new("hash", TypeRef::non_null(TypeRef::named("String"))),
    ];
    for field in &def.fields {
        let spec = match &field.ty {
            FieldType::Scalar(kind) => {
                FieldSpec::new(&field.name, maybe_required(TypeRef::named(kind.type_name()), field.required))
            }
            FieldType::Enum(en) => {
                FieldSpec::new(&field.name, maybe_required(TypeRef::named(en), field.required))
            }
            FieldType::Relation(target) => {
                FieldSpec::new(&field.name, maybe_required(TypeRef::named(target), field.required))
            }
            FieldType::ScalarList(kind) => FieldSpec::new(
                &field.name,
                maybe_required(TypeRef::list(TypeRef::named(kind.type_name())), field.required),
            ),
            FieldType::EnumList(en) => FieldSpec::new(
                &field.name,
                maybe_required(TypeRef::list(TypeRef::named(en)), field.required),
            ),
            FieldType::RelationList(target) => FieldSpec::with_args(
                &field.name,
                vec![InputValueDef::new(
                    "filter",
                    TypeRef::named(format!("{target}FilterInput")),
                )],
                maybe_required(TypeRef::list(TypeRef::named(target)), field.required),
            ),
        };
        fields.push(spec);
    }

    // TFilterInput: combinators, system fields, declared fields.
    let self_filter_list = TypeRef::list(TypeRef::non_null(TypeRef::named(format!(
        "{name}FilterInput"
    ))));
    let mut filter_fields = vec![
        InputValueDef::new("and", self_filter_list.clone()),
        InputValueDef::new("or", self_filter_list),
        InputValueDef::new("not", TypeRef::named(format!("{name}FilterInput"))),
        InputValueDef::new("id", TypeRef::named("IDFilterInput")),
        InputValueDef::new("hash", TypeRef::named("StringFilterInput")),
    ];
    for field in &def.fields {
        filter_fields.push(InputValueDef::new(
            &field.name,
            TypeRef::named(filter_input_name(&field.ty)),
        ));
    }

    // TPatchInput.
    let mut patch_fields = vec![InputValueDef::new("id", TypeRef::named("IDPatchInput"))];
    for field in &def.fields {
        patch_fields.push(InputValueDef::new(
            &field.name,
            TypeRef::named(patch_input_name(&field.ty)),
        ));
    }

    // TCreateInput: optional id for relation reuse, then declared fields.
    let mut create_fields = vec![InputValueDef::new("id", TypeRef::named("ID"))];
    for field in &def.fields {
        let ty = match &field.ty {
            FieldType::Scalar(kind) => maybe_required(TypeRef::named(kind.type_name()), field.required),
            FieldType::Enum(en) => maybe_required(TypeRef::named(en), field.required),
            FieldType::Relation(target) => {
                maybe_required(TypeRef::named(format!("{target}CreateInput")), field.required)
            }
            FieldType::ScalarList(kind) => maybe_required(
                TypeRef::list(TypeRef::non_null(TypeRef::named(kind.type_name()))),
                field.required,
            ),
            FieldType::EnumList(en) => maybe_required(
                TypeRef::list(TypeRef::non_null(TypeRef::named(en))),
                field.required,
            ),
            FieldType::RelationList(target) => maybe_required(
                TypeRef::list(TypeRef::non_null(TypeRef::named(format!("{target}CreateInput")))),
                field.required,
            ),
        };
        create_fields.push(InputValueDef::new(&field.name, ty));
    }

    vec![
        TypeSpec::Object {
            name: name.clone(),
            fields,
        },
        TypeSpec::Input {
            name: format!("{name}FilterInput"),
            fields: filter_fields,
        },
        TypeSpec::Input {
            name: format!("{name}ListFilterInput"),
            fields: quantifier_fields(&format!("{name}FilterInput")),
        },
        TypeSpec::Input {
            name: format!("{name}PatchInput"),
            fields: patch_fields,
        },
        TypeSpec::Input {
            name: format!("{name}ListPatchInput"),
            fields: vec![
                InputValueDef::new(
                    "set",
                    TypeRef::list(TypeRef::non_null(TypeRef::named(format!("{name}CreateInput")))),
                ),
                InputValueDef::new(
                    "append",
                    TypeRef::list(TypeRef::non_null(TypeRef::named(format!("{name}CreateInput")))),
                ),
                InputValueDef::new("filter", TypeRef::named(format!("{name}ListFilterInput"))),
            ],
        },
        TypeSpec::Input {
            name: format!("{name}CreateInput"),
            fields: create_fields,
        },
    ]
}

fn maybe_required(ty: TypeRef, required: bool) -> TypeRef {
    if required {
        TypeRef::non_null(ty)
    } else {
        ty
    }
}

/// Name of the filter input matching a field shape.
pub(crate) fn filter_input_name(ty: &FieldType) -> String {
    match ty {
        FieldType::Scalar(kind) => format!("{}FilterInput", kind.type_name()),
        FieldType::Enum(en) => format!("{en}FilterInput"),
        FieldType::Relation(target) => format!("{target}FilterInput"),
        FieldType::ScalarList(kind) => format!("{}ListFilterInput", kind.type_name()),
        FieldType::EnumList(en) => format!("{en}ListFilterInput"),
        FieldType::RelationList(target) => format!("{target}ListFilterInput"),
    }
}

/// Name of the patch input matching a field shape.
pub(crate) fn patch_input_name(ty: &FieldType) -> String {
    match ty {
        FieldType::Scalar(kind) => format!("{}PatchInput", kind.type_name()),
        FieldType::Enum(en) => format!("{en}PatchInput"),
        FieldType::Relation(target) => format!("{target}PatchInput"),
        FieldType::ScalarList(kind) => format!("{}ListPatchInput", kind.type_name()),
        FieldType::EnumList(en) => format!("{en}ListPatchInput"),
        FieldType::RelationList(target) => format!("{target}ListPatchInput"),
    }
}

fn query_root(objects: &BTreeMap<String, ObjectDef>) -> TypeSpec {
    let mut fields = Vec::new();
    for name in objects.keys() {
        fields.push(FieldSpec::with_args(
            format!("list{name}"),
            vec![InputValueDef::new(
                "filter",
                TypeRef::named(format!("{name}FilterInput")),
            )],
            TypeRef::list(TypeRef::named(name)),
        ));
        fields.push(FieldSpec::with_args(
            format!("find{name}"),
            vec![InputValueDef::new(
                "id",
                TypeRef::non_null(TypeRef::named("ID")),
            )],
            TypeRef::named(name),
        ));
    }
    TypeSpec::Object {
        name: "Query".to_string(),
        fields,
    }
}

fn mutation_root(objects: &BTreeMap<String, ObjectDef>) -> TypeSpec {
    let mut fields = Vec::new();
    for name in objects.keys() {
        fields.push(FieldSpec::with_args(
            format!("create{name}"),
            vec![InputValueDef::new(
                "data",
                TypeRef::named(format!("{name}CreateInput")),
            )],
            TypeRef::named(name),
        ));
        fields.push(FieldSpec::with_args(
            format!("update{name}"),
            vec![
                InputValueDef::new("filter", TypeRef::named(format!("{name}FilterInput"))),
                InputValueDef::new("patch", TypeRef::named(format!("{name}PatchInput"))),
            ],
            TypeRef::list(TypeRef::named(name)),
        ));
        fields.push(FieldSpec::with_args(
            format!("delete{name}"),
            vec![InputValueDef::new(
                "filter",
                TypeRef::named(format!("{name}FilterInput")),
            )],
            TypeRef::list(TypeRef::named(name)),
        ));
    }
    TypeSpec::Object {
        name: "Mutation".to_string(),
        fields,
    }
}
