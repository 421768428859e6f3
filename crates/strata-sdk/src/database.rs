use std::collections::BTreeMap;

use tracing::debug;

use strata_db::{ConflictResolver, DbResult, Repository};
use strata_query::{Executor, QueryParams, QueryResponse};
use strata_store::{MemoryStorage, Storage};
use strata_types::Hash;

/// One schema-driven, commit-structured document database.
pub struct Database<S: Storage = MemoryStorage> {
    repo: Repository<S>,
}

impl Database<MemoryStorage> {
    /// Initialize a throwaway in-memory database.
    pub fn in_memory(schema_source: &str) -> DbResult<Self> {
        Self::init(MemoryStorage::new(), schema_source)
    }
}

impl<S: Storage> Database<S> {
    /// Initialize a fresh database on `storage`.
    pub fn init(storage: S, schema_source: &str) -> DbResult<Self> {
        let repo = Repository::init(storage, schema_source)?;
        debug!("database initialized");
        Ok(Self { repo })
    }

    /// Open a database previously initialized on `storage`.
    pub fn open(storage: S) -> DbResult<Self> {
        Ok(Self {
            repo: Repository::open(storage)?,
        })
    }

    /// Execute one GraphQL request.
    pub fn execute(&self, params: &QueryParams) -> QueryResponse {
        Executor::new(&self.repo).execute(params)
    }

    /// Convenience wrapper: execute a bare query string.
    pub fn execute_str(&self, query: &str) -> QueryResponse {
        self.execute(&QueryParams::new(query))
    }

    /// The current head commit hash.
    pub fn head(&self) -> DbResult<Hash> {
        self.repo.head()
    }

    /// The fully elaborated SDL of the generated surface.
    pub fn sdl(&self) -> &str {
        self.repo.schema().sdl()
    }

    /// Collection name → sorted document ids at head. Test helper.
    pub fn dump(&self) -> DbResult<BTreeMap<String, Vec<String>>> {
        self.repo.dump()
    }

    /// Replace the merge conflict resolver.
    pub fn set_resolver(&mut self, resolver: Box<dyn ConflictResolver>) {
        self.repo.set_resolver(resolver);
    }

    /// Direct access to the underlying repository.
    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_execute() {
        let db = Database::in_memory("type User { name: String }").unwrap();
        let response = db.execute_str("{ listUser { id } }");
        assert!(response.is_ok());
    }

    #[test]
    fn sdl_is_exposed() {
        let db = Database::in_memory("type User { name: String }").unwrap();
        assert!(db.sdl().contains("type User"));
    }

    #[test]
    fn open_rejects_empty_storage() {
        assert!(Database::open(MemoryStorage::new()).is_err());
    }
}
