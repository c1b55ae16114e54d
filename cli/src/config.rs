use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use directories::ProjectDirs;

use crate::hosted::{HostedConfig, HostedStore};
use pantry_core::catalog::IngredientCatalog;
use pantry_core::store::{FileStore, SqliteStore, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// JSON documents in the data directory
    File,
    /// Local SQLite database in the data directory
    Sqlite,
    /// Hosted PostgREST-compatible database
    Hosted,
}

/// Storage and catalog options shared by every command.
#[derive(Debug, Args)]
pub struct StorageArgs {
    /// Storage backend
    #[arg(long, env = "PANTRY_BACKEND", value_enum, default_value_t = Backend::Sqlite, global = true)]
    pub backend: Backend,
    /// Directory for the SQLite database and JSON documents
    #[arg(long, env = "PANTRY_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
    /// Ingredient catalog (JSON mapping category -> choices)
    #[arg(long, env = "PANTRY_CATALOG", default_value = "ingredients.json", global = true)]
    pub catalog: PathBuf,
    /// Base URL of the hosted database (hosted backend)
    #[arg(long, env = "PANTRY_HOSTED_URL", global = true)]
    pub hosted_url: Option<String>,
    /// Service API key for the hosted database (hosted backend)
    #[arg(long, env = "PANTRY_HOSTED_KEY", hide_env_values = true, global = true)]
    pub hosted_key: Option<String>,
    /// Request timeout for the hosted database, in seconds
    #[arg(long, env = "PANTRY_HOSTED_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub hosted_timeout_secs: u64,
}

pub struct Config {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
    pub hosted: Option<HostedConfig>,
}

impl Config {
    pub fn load(args: StorageArgs) -> Result<Self> {
        let data_dir = match args.data_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "pantry")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let hosted = match (args.hosted_url, args.hosted_key) {
            (Some(base_url), Some(api_key)) => Some(HostedConfig {
                base_url,
                api_key,
                timeout: Duration::from_secs(args.hosted_timeout_secs),
            }),
            _ => None,
        };

        Ok(Config {
            backend: args.backend,
            db_path: data_dir.join("pantry.db"),
            data_dir,
            catalog_path: args.catalog,
            hosted,
        })
    }

    /// The catalog is required for generation; a missing or malformed file is fatal.
    pub fn load_catalog(&self) -> Result<IngredientCatalog> {
        IngredientCatalog::load(&self.catalog_path).with_context(|| {
            format!(
                "Failed to load ingredient catalog from {}",
                self.catalog_path.display()
            )
        })
    }

    pub fn open_storage(&self) -> Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match self.backend {
            Backend::File => Arc::new(FileStore::open(&self.data_dir)?),
            Backend::Sqlite => Arc::new(SqliteStore::open(&self.db_path).with_context(|| {
                format!("Failed to open database: {}", self.db_path.display())
            })?),
            Backend::Hosted => {
                let hosted = self.hosted.as_ref().context(
                    "The hosted backend needs --hosted-url and --hosted-key (or PANTRY_HOSTED_URL / PANTRY_HOSTED_KEY)",
                )?;
                Arc::new(HostedStore::new(hosted)?)
            }
        };
        Ok(storage)
    }
}
