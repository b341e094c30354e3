//! Connection registry for initialized databases.
//!
//! Holds one live client plus its introspected schema per database name.
//! Initialization is all-or-nothing: either every configured database
//! connects and introspects, or the previous registry contents stay in
//! place untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::config::ConnectionConfig;
use crate::db::{self, DatabaseClient, Schema};
use crate::error::{Result, StewardError};

/// A registered database: its client and the schema captured at init time.
pub struct RegistryEntry {
    pub client: Arc<dyn DatabaseClient>,
    pub schema: Schema,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Thread-safe map of database name to live connection.
///
/// Entries are handed out as `Arc` clones so no lock is held across an
/// await point.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<String, Arc<RegistryEntry>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects and introspects every configured database, then swaps the
    /// result in as the new registry contents.
    ///
    /// If any connection or introspection fails, the error is returned and
    /// the registry keeps its previous contents. Clients built for the
    /// failed batch are closed before returning.
    pub async fn initialize(&self, configs: &HashMap<String, ConnectionConfig>) -> Result<()> {
        let mut staged: HashMap<String, Arc<RegistryEntry>> = HashMap::new();

        for (name, config) in configs {
            let name = name.trim().to_lowercase();

            let client = match db::connect(config).await {
                Ok(client) => client,
                Err(e) => {
                    close_all(staged).await;
                    return Err(StewardError::connection(format!(
                        "Failed to connect to '{}': {}",
                        name, e
                    )));
                }
            };

            let schema = match client.introspect_schema().await {
                Ok(schema) => schema,
                Err(e) => {
                    let _ = client.close().await;
                    close_all(staged).await;
                    return Err(StewardError::connection(format!(
                        "Failed to introspect '{}': {}",
                        name, e
                    )));
                }
            };

            info!(
                database = %name,
                tables = schema.tables.len(),
                "Database initialized"
            );
            staged.insert(name, Arc::new(RegistryEntry { client, schema }));
        }

        let old = {
            let mut entries = self.entries.write().expect("registry lock");
            std::mem::replace(&mut *entries, staged)
        };
        close_all(old).await;

        Ok(())
    }

    /// Inserts a single entry, replacing any existing entry for the name.
    ///
    /// Names are lowercased, matching how initialization stores them.
    pub fn insert(&self, name: impl Into<String>, client: Arc<dyn DatabaseClient>, schema: Schema) {
        let name = name.into().trim().to_lowercase();
        self.entries
            .write()
            .expect("registry lock")
            .insert(name, Arc::new(RegistryEntry { client, schema }));
    }

    /// Returns the entry for the given database name.
    pub fn get(&self, name: &str) -> Result<Arc<RegistryEntry>> {
        self.entries
            .read()
            .expect("registry lock")
            .get(name)
            .cloned()
            .ok_or_else(|| StewardError::UnknownDatabase(name.to_string()))
    }

    /// Returns the client for the given database name.
    pub fn client(&self, name: &str) -> Result<Arc<dyn DatabaseClient>> {
        Ok(Arc::clone(&self.get(name)?.client))
    }

    /// Returns true if the registry has an entry for the name.
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .expect("registry lock")
            .contains_key(name)
    }

    /// Returns the registered database names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .expect("registry lock")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Returns every registered schema, sorted by database name.
    ///
    /// This is what the classifier prompt is built from.
    pub fn schemas(&self) -> Vec<(String, Schema)> {
        let mut schemas: Vec<(String, Schema)> = self
            .entries
            .read()
            .expect("registry lock")
            .iter()
            .map(|(name, entry)| (name.clone(), entry.schema.clone()))
            .collect();
        schemas.sort_by(|a, b| a.0.cmp(&b.0));
        schemas
    }

    /// Returns true if no databases are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("registry lock").is_empty()
    }
}

/// Closes every client in the map, ignoring close errors.
async fn close_all(entries: HashMap<String, Arc<RegistryEntry>>) {
    for entry in entries.into_values() {
        let _ = entry.client.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockDatabaseClient;

    fn registry_with(names: &[&str]) -> ConnectionRegistry {
        let registry = ConnectionRegistry::new();
        for name in names {
            registry.insert(
                *name,
                Arc::new(MockDatabaseClient::new()),
                Schema::default(),
            );
        }
        registry
    }

    #[test]
    fn test_empty_registry() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
        assert!(!registry.contains("shop"));
    }

    #[test]
    fn test_get_unknown_database() {
        let registry = registry_with(&["shop"]);
        let err = registry.get("warehouse").unwrap_err();
        assert!(matches!(err, StewardError::UnknownDatabase(name) if name == "warehouse"));
    }

    #[test]
    fn test_insert_lowercases_names() {
        let registry = ConnectionRegistry::new();
        registry.insert(
            " Shop ",
            Arc::new(MockDatabaseClient::new()),
            Schema::default(),
        );

        assert!(registry.contains("shop"));
        assert!(!registry.contains(" Shop "));
    }

    #[test]
    fn test_names_sorted() {
        let registry = registry_with(&["shop", "crm", "warehouse"]);
        assert_eq!(registry.names(), vec!["crm", "shop", "warehouse"]);
    }

    #[test]
    fn test_schemas_sorted_by_name() {
        let registry = registry_with(&["shop", "crm"]);
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].0, "crm");
        assert_eq!(schemas[1].0, "shop");
    }

    #[test]
    fn test_client_returns_arc() {
        let registry = registry_with(&["shop"]);
        assert!(registry.client("shop").is_ok());
    }
}
