//! Table registry built at startup and installed on a SQLite connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::Connection;

use crate::cursor::TableModule;
use crate::error::{Error, Result};
use crate::sqlite;

/// Maps table names to the modules that serve them.
///
/// # Example
///
/// ```ignore
/// let mut registry = Registry::new();
/// registry.register(Arc::new(CommitsModule::new(repo_path)))?;
/// registry.install(&conn)?;
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    modules: BTreeMap<String, Arc<dyn TableModule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module; a second module with the same name is rejected.
    pub fn register(&mut self, module: Arc<dyn TableModule>) -> Result<()> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(Error::Descriptor {
                table: name,
                reason: "registered twice".into(),
            });
        }
        self.modules.insert(name, module);
        Ok(())
    }

    pub fn register_all<I>(&mut self, modules: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<dyn TableModule>>,
    {
        modules.into_iter().try_for_each(|m| self.register(m))
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn TableModule>> {
        self.modules
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn TableModule>> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Makes every registered table queryable on `conn`.
    pub fn install(&self, conn: &Connection) -> Result<()> {
        for module in self.modules.values() {
            sqlite::install(conn, Arc::clone(module))?;
            tracing::debug!(table = module.name(), "installed virtual table");
        }
        Ok(())
    }
}
