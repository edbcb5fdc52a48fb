use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the mentorship server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Which entity store implementation backs the API.
    pub store_backend: StoreBackend,
    /// MongoDB connection string; required when `store_backend` is `mongo`.
    pub mongodb_uri: Option<String>,
    /// Database holding the `students` and `mentors` collections.
    pub mongodb_database: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// What happens to already-assigned students when a bulk assignment hits a missing id.
    pub bulk_assign_on_missing: PartialAssignPolicy,
}

/// Supported entity store backends.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// MongoDB over the native driver.
    #[default]
    Mongo,
    /// Process-local map; contents vanish on exit.
    Memory,
}

/// Handling of writes already committed when a bulk assignment aborts on a missing student.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartialAssignPolicy {
    /// Leave earlier students assigned and report the failure.
    #[default]
    Keep,
    /// Clear the mentor on students assigned earlier in the same batch before failing.
    Revert,
}

/// Default database name used when `MONGODB_DATABASE` is unset.
pub const DEFAULT_DATABASE: &str = "mentorship";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = load_env_optional("STORE_BACKEND")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("STORE_BACKEND".into()))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            store_backend,
            mongodb_uri: load_env_optional("MONGODB_URI")
                .or_else(|| load_env_optional("URL_NAME")),
            mongodb_database: load_env_optional("MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            server_port: load_env_optional("SERVER_PORT")
                .or_else(|| load_env_optional("PORT"))
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            bulk_assign_on_missing: load_env_optional("BULK_ASSIGN_ON_MISSING")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("BULK_ASSIGN_ON_MISSING".into()))
                })
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Connection string for the MongoDB backend, accepting the legacy `URL_NAME` alias.
    pub fn require_mongodb_uri(&self) -> Result<&str, ConfigError> {
        self.mongodb_uri
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("MONGODB_URI".into()))
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::str::FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" | "in-memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for PartialAssignPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "revert" | "rollback" => Ok(Self::Revert),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
///
/// `.env` is read first so local development does not need exported variables.
pub fn init_config(overrides: ConfigOverrides) -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let mut config = Config::from_env()?;
    overrides.apply(&mut config);
    tracing::debug!(
        store_backend = ?config.store_backend,
        database = %config.mongodb_database,
        server_port = ?config.server_port,
        bulk_assign_on_missing = ?config.bulk_assign_on_missing,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

/// Command-line values that take precedence over environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Port to listen on.
    pub server_port: Option<u16>,
    /// Store backend to use.
    pub store_backend: Option<StoreBackend>,
    /// MongoDB database name.
    pub mongodb_database: Option<String>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.server_port {
            config.server_port = Some(port);
        }
        if let Some(store) = self.store_backend {
            config.store_backend = store;
        }
        if let Some(database) = self.mongodb_database {
            config.mongodb_database = database;
        }
    }
}
