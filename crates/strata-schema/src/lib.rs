//! Schema compiler for strata.
//!
//! The user declares object types and enums in a GraphQL SDL fragment:
//!
//! ```graphql
//! type User {
//!     name: String!
//!     age: Int
//!     tags: [String]
//!     boss: User
//!     friends: [User]
//! }
//! ```
//!
//! [`compile`] turns that into a [`CompiledSchema`]: a typed catalog (the
//! single source of truth for validation and execution) plus a
//! [`TypeRegistry`] describing every generated type — per-type filter,
//! patch and create inputs, the scalar prelude, the `@revision` directive,
//! and the `Query`/`Mutation` roots. The registry renders to SDL and backs
//! introspection.

pub mod catalog;
pub mod compile;
pub mod error;
pub mod registry;
pub mod render;

pub use catalog::{CompiledSchema, FieldDef, FieldType, ObjectDef, ScalarKind};
pub use compile::compile;
pub use error::{SchemaError, SchemaResult};
pub use registry::{DirectiveSpec, FieldSpec, InputValueDef, TypeRef, TypeRegistry, TypeSpec};

/// Field names reserved for the system on every object type.
pub const RESERVED_FIELDS: [&str; 2] = ["id", "hash"];
