//! Descriptions of every type in the generated surface.
//!
//! The registry is the presentational twin of the catalog: one entry per
//! GraphQL type (objects, inputs, enums, scalars) plus directives. SDL
//! rendering and introspection both walk it, so the two can never drift
//! apart.

/// Reference to a type, with NON_NULL / LIST wrappers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// `[T!]!`-style SDL spelling.
    pub fn render(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::NonNull(inner) => format!("{}!", inner.render()),
            Self::List(inner) => format!("[{}]", inner.render()),
        }
    }

    /// The innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::NonNull(inner) | Self::List(inner) => inner.base_name(),
        }
    }
}

/// A named argument or input-object field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputValueDef {
    pub name: String,
    pub ty: TypeRef,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A field on an output object type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub args: Vec<InputValueDef>,
    pub ty: TypeRef,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            ty,
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<InputValueDef>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            args,
            ty,
        }
    }
}

/// One type in the generated surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSpec {
    Scalar {
        name: String,
    },
    Object {
        name: String,
        fields: Vec<FieldSpec>,
    },
    Input {
        name: String,
        fields: Vec<InputValueDef>,
    },
    Enum {
        name: String,
        values: Vec<String>,
    },
}

impl TypeSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name }
            | Self::Object { name, .. }
            | Self::Input { name, .. }
            | Self::Enum { name, .. } => name,
        }
    }

    /// Introspection `__TypeKind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar { .. } => "SCALAR",
            Self::Object { .. } => "OBJECT",
            Self::Input { .. } => "INPUT_OBJECT",
            Self::Enum { .. } => "ENUM",
        }
    }
}

/// A directive usable in requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveSpec {
    pub name: String,
    pub args: Vec<InputValueDef>,
    pub locations: Vec<&'static str>,
}

/// All generated types plus the request directives.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    pub types: Vec<TypeSpec>,
    pub directives: Vec<DirectiveSpec>,
}

impl TypeRegistry {
    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Option<&TypeSpec> {
        self.types.iter().find(|t| t.name() == name)
    }

    pub fn query_type(&self) -> Option<&TypeSpec> {
        self.get("Query")
    }

    pub fn mutation_type(&self) -> Option<&TypeSpec> {
        self.get("Mutation")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_rendering() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("User"))));
        assert_eq!(ty.render(), "[User!]!");
        assert_eq!(ty.base_name(), "User");
    }

    #[test]
    fn spec_kinds() {
        assert_eq!(TypeSpec::Scalar { name: "ID".into() }.kind(), "SCALAR");
        assert_eq!(
            TypeSpec::Enum {
                name: "Role".into(),
                values: vec![]
            }
            .kind(),
            "ENUM"
        );
    }

    #[test]
    fn registry_lookup() {
        let registry = TypeRegistry {
            types: vec![TypeSpec::Object {
                name: "Query".into(),
                fields: vec![],
            }],
            directives: vec![],
        };
        assert!(registry.query_type().is_some());
        assert!(registry.mutation_type().is_none());
        assert!(registry.get("Nope").is_none());
    }
}
