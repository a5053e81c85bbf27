//! SurrealDB connection setup
//!
//! Supports in-memory, explicit URL, local file and cloud (WebSocket)
//! connections. Every path selects the namespace/database and runs
//! [`crate::migrations::init_schema`] before handing the connection out.

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

use crate::error::StateError;
use crate::migrations;
use crate::Result;

/// Default namespace for fleet data
pub const DEFAULT_NAMESPACE: &str = "fleet";
/// Default database name
pub const DEFAULT_DATABASE: &str = "main";
/// Local persistence directory used when nothing else is configured
pub const DEFAULT_LOCAL_PATH: &str = ".fleet/db";

/// How cloud credentials are checked at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    /// Credentials belong to one namespace/database pair.
    Database,
    /// Server-wide root credentials.
    Root,
}

/// Remote fleet store reached over WebSocket.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    pub scope: AuthScope,
}

impl CloudConfig {
    /// Database-scoped credentials against the default fleet namespace.
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            scope: AuthScope::Database,
        }
    }

    /// Read `SURREALDB_ENDPOINT`, `SURREALDB_USERNAME` and `SURREALDB_PASSWORD`
    /// plus the optional `SURREALDB_NAMESPACE`, `SURREALDB_DATABASE` and
    /// `SURREALDB_ROOT` from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `None` unless endpoint, username and password are all present.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let mut config = Self::new(
            lookup("SURREALDB_ENDPOINT")?,
            lookup("SURREALDB_USERNAME")?,
            lookup("SURREALDB_PASSWORD")?,
        );
        if let Some(ns) = lookup("SURREALDB_NAMESPACE") {
            config.namespace = ns;
        }
        if let Some(db) = lookup("SURREALDB_DATABASE") {
            config.database = db;
        }
        if lookup("SURREALDB_ROOT").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            config.scope = AuthScope::Root;
        }
        Some(config)
    }
}

/// Connect to `mem://` and initialize the schema.
#[instrument]
pub async fn connect_in_memory() -> Result<Surreal<Any>> {
    connect_url("mem://").await
}

/// Connect to an arbitrary engine URL (`mem://`, `surrealkv://path`, `ws://host`).
#[instrument]
pub async fn connect_url(url: &str) -> Result<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

    db.use_ns(DEFAULT_NAMESPACE)
        .use_db(DEFAULT_DATABASE)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;
    Ok(db)
}

/// Connect to SurrealDB Cloud with credentials.
#[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
pub async fn connect_cloud(config: &CloudConfig) -> Result<Surreal<Any>> {
    info!(scope = ?config.scope, "connecting to remote fleet store");

    let db = surrealdb::engine::any::connect(&config.endpoint)
        .await
        .map_err(|e| {
            StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
        })?;

    let signin = match config.scope {
        AuthScope::Root => {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
        }
        AuthScope::Database => {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
        }
    };
    signin.map_err(|e| {
        StateError::Connection(format!("sign-in as {:?} user failed: {}", config.scope, e))
    })?;

    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| {
            StateError::Connection(format!("Failed to select namespace/database: {}", e))
        })?;

    migrations::init_schema(&db).await?;
    info!("remote fleet store ready");
    Ok(db)
}

/// Connect using environment variables
///
/// - If the cloud variables are set, connects to cloud.
/// - If SURREALDB_URL is set, connects to that URL.
/// - Otherwise persists locally under `.fleet/db` via SurrealKV.
#[instrument]
pub async fn connect_from_env() -> Result<Surreal<Any>> {
    if let Some(config) = CloudConfig::from_env() {
        return connect_cloud(&config).await;
    }

    if let Ok(url) = std::env::var("SURREALDB_URL") {
        info!(url = %url, "using SURREALDB_URL");
        return connect_url(&url).await;
    }

    std::fs::create_dir_all(DEFAULT_LOCAL_PATH).map_err(|e| {
        StateError::Connection(format!(
            "Failed to create database directory {}: {}",
            DEFAULT_LOCAL_PATH, e
        ))
    })?;
    let url = format!("surrealkv://{}", DEFAULT_LOCAL_PATH);
    info!(url = %url, "using local fleet store");
    connect_url(&url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn cloud_config_needs_all_credentials() {
        let partial = env(&[
            ("SURREALDB_ENDPOINT", "wss://db.example"),
            ("SURREALDB_USERNAME", "ops"),
        ]);
        assert!(CloudConfig::from_lookup(partial).is_none());
    }

    #[test]
    fn cloud_config_reads_optional_overrides() {
        let full = env(&[
            ("SURREALDB_ENDPOINT", "wss://db.example"),
            ("SURREALDB_USERNAME", "ops"),
            ("SURREALDB_PASSWORD", "secret"),
            ("SURREALDB_NAMESPACE", "staging"),
            ("SURREALDB_ROOT", "TRUE"),
        ]);
        let config = CloudConfig::from_lookup(full).unwrap();
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.scope, AuthScope::Root);
    }

    #[test]
    fn cloud_config_defaults_to_database_scope() {
        let config = CloudConfig::new("wss://db.example", "ops", "secret");
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.scope, AuthScope::Database);
    }

    #[tokio::test]
    async fn in_memory_connection_initializes_schema() {
        let db = connect_in_memory().await.expect("connect");
        // Re-running the migrations on a live connection must not fail.
        migrations::init_schema(&db).await.expect("re-init");
    }
}
