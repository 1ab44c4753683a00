//! Layered configuration.
//!
//! Sources, lowest priority first:
//! 1. Compiled-in defaults (in-memory store, `info` logging)
//! 2. A TOML file, if a path is given
//! 3. Environment overrides with prefix `INVENTORY_` and `__` as the nesting
//!    separator (e.g. `INVENTORY_STORE__BACKEND=sqlite`)

use std::path::Path;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Which [`crate::store::Store`] implementation backs the system.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Only read by the SQLite backend.
    pub database_url: String,
    pub max_connections: u32,
    /// Request queue size of the in-memory store actor.
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl InventoryConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("store.backend", "memory")?
            .set_default("store.database_url", "sqlite::memory:")?
            .set_default("store.max_connections", 4i64)?
            .set_default("store.channel_capacity", 32i64)?
            .set_default("logging.json", false)?
            .set_default("logging.filter", "info")?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // The prefix separator has to be set explicitly, otherwise `config`
        // reuses the `__` nesting separator after the prefix too.
        builder = builder.add_source(
            Environment::with_prefix("INVENTORY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: InventoryConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.store.channel_capacity == 0 {
            bail!("store.channel_capacity must be at least 1");
        }
        if self.store.max_connections == 0 {
            bail!("store.max_connections must be at least 1");
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.database_url.trim().is_empty() {
            bail!("store.database_url is required for the sqlite backend");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that touch the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        std::env::remove_var("INVENTORY_STORE__BACKEND");
        std::env::remove_var("INVENTORY_STORE__CHANNEL_CAPACITY");
        std::env::remove_var("INVENTORY_LOGGING__JSON");
    }

    fn write_temp_toml(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        write!(f, "{}", content).expect("write temp file");
        f
    }

    #[test]
    fn defaults_select_the_memory_store() {
        let _lock = lock_env();
        clear_env();

        let cfg = InventoryConfig::load(None).expect("load defaults");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.channel_capacity, 32);
        assert!(!cfg.logging.json);
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let _lock = lock_env();
        clear_env();

        let file = write_temp_toml(
            r#"
[store]
backend = "sqlite"
database_url = "sqlite://inventory.db"
max_connections = 2
"#,
        );
        let cfg = InventoryConfig::load(Some(file.path())).expect("load file");
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.database_url, "sqlite://inventory.db");
        assert_eq!(cfg.store.max_connections, 2);
    }

    #[test]
    fn environment_overrides_file() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("INVENTORY_STORE__BACKEND", "memory");
        std::env::set_var("INVENTORY_LOGGING__JSON", "true");

        let file = write_temp_toml("[store]\nbackend = \"sqlite\"\n");
        let cfg = InventoryConfig::load(Some(file.path()));
        clear_env();

        let cfg = cfg.expect("load with env");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(cfg.logging.json);
    }

    #[test]
    fn zero_channel_capacity_is_rejected() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("INVENTORY_STORE__CHANNEL_CAPACITY", "0");

        let result = InventoryConfig::load(None);
        clear_env();

        assert!(result.is_err());
    }
}
