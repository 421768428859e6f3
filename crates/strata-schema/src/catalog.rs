use std::collections::BTreeMap;

use crate::registry::TypeRegistry;

/// The five builtin leaf scalars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Id,
    String,
    Int,
    Float,
    Boolean,
}

impl ScalarKind {
    /// GraphQL type name; also the prefix of the generated input names
    /// (`StringFilterInput`, `IntPatchInput`, …).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::String => "String",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
        }
    }

    /// Look up a builtin scalar by its GraphQL name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ID" => Some(Self::Id),
            "String" => Some(Self::String),
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// All builtin scalars, in prelude order.
    pub fn all() -> [Self; 5] {
        [Self::Id, Self::String, Self::Int, Self::Float, Self::Boolean]
    }

    /// Whether the leaf has a natural ordering (gt/gte/lt/lte apply).
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::String | Self::Int | Self::Float)
    }
}

/// Shape of one declared field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarKind),
    Enum(String),
    /// One-relation: the value is the id of a document in the named type.
    Relation(String),
    ScalarList(ScalarKind),
    EnumList(String),
    /// Many-relation: a list of ids into the named type.
    RelationList(String),
}

impl FieldType {
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::ScalarList(_) | Self::EnumList(_) | Self::RelationList(_)
        )
    }

    /// The related type name, for relation and relation-list fields.
    pub fn relation_target(&self) -> Option<&str> {
        match self {
            Self::Relation(name) | Self::RelationList(name) => Some(name),
            _ => None,
        }
    }
}

/// One declared field: name, shape, and whether null is allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
}

/// One declared object type and its fields, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl ObjectDef {
    /// Look up a declared field by name. System fields are not here.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A compiled user schema: catalog, enums, generated type registry, SDL.
///
/// The catalog is the single source of truth — the transaction validates
/// against it, the executor resolves against it, and the registry (hence
/// the rendered SDL and introspection output) is derived from it.
#[derive(Clone, Debug)]
pub struct CompiledSchema {
    pub(crate) source: String,
    pub(crate) objects: BTreeMap<String, ObjectDef>,
    pub(crate) enums: BTreeMap<String, Vec<String>>,
    pub(crate) registry: TypeRegistry,
    pub(crate) sdl: String,
}

impl CompiledSchema {
    /// The user's original SDL source, as persisted under the `schema` key.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Look up an object type.
    pub fn object(&self, name: &str) -> Option<&ObjectDef> {
        self.objects.get(name)
    }

    /// All object types, sorted by name.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectDef> {
        self.objects.values()
    }

    /// Object type names, sorted. These are exactly the collection names.
    pub fn collection_names(&self) -> Vec<&str> {
        self.objects.keys().map(String::as_str).collect()
    }

    /// Values of a declared enum.
    pub fn enum_values(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// The generated type registry (inputs, roots, prelude, directives).
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The fully elaborated SDL of the generated surface.
    pub fn sdl(&self) -> &str {
        &self.sdl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_names_roundtrip() {
        for kind in ScalarKind::all() {
            assert_eq!(ScalarKind::from_name(kind.type_name()), Some(kind));
        }
        assert_eq!(ScalarKind::from_name("User"), None);
    }

    #[test]
    fn ordering_applies_to_string_int_float() {
        assert!(ScalarKind::String.is_ordered());
        assert!(ScalarKind::Int.is_ordered());
        assert!(ScalarKind::Float.is_ordered());
        assert!(!ScalarKind::Boolean.is_ordered());
        assert!(!ScalarKind::Id.is_ordered());
    }

    #[test]
    fn field_type_lists() {
        assert!(FieldType::ScalarList(ScalarKind::String).is_list());
        assert!(FieldType::RelationList("User".into()).is_list());
        assert!(!FieldType::Relation("User".into()).is_list());
    }

    #[test]
    fn relation_targets() {
        assert_eq!(
            FieldType::Relation("User".into()).relation_target(),
            Some("User")
        );
        assert_eq!(
            FieldType::RelationList("Tag".into()).relation_target(),
            Some("Tag")
        );
        assert_eq!(FieldType::Scalar(ScalarKind::Int).relation_target(), None);
    }

    #[test]
    fn object_field_lookup() {
        let def = ObjectDef {
            name: "User".into(),
            fields: vec![FieldDef {
                name: "age".into(),
                ty: FieldType::Scalar(ScalarKind::Int),
                required: false,
            }],
        };
        assert!(def.field("age").is_some());
        assert!(def.field("id").is_none());
    }
}
