use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";
const MIN_LOOKUP_HEADROOM_MS: u64 = 250;

/// Linear backoff step between catalog retries.
pub const CATALOG_RETRY_BACKOFF_MS: u64 = 200;

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `BOOKSHELF__*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let cfg = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }

    /// Budget for one external lookup, retries included.
    ///
    /// The smaller of the catalog's own worst case and the server request
    /// timeout minus some headroom, so a hanging provider still ends in an
    /// envelope rather than the server's timeout response.
    pub fn lookup_deadline(&self) -> Duration {
        let request_ms = self.server.request_timeout_ms;
        let headroom = (request_ms / 10).max(MIN_LOOKUP_HEADROOM_MS);
        let server_budget = request_ms.saturating_sub(headroom).max(1);

        Duration::from_millis(server_budget.min(self.catalog.worst_case_ms()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// `host:port` pair the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Where books are persisted.
///
/// `memory://` keeps everything in-process; a `postgres://` URL selects the
/// relational store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "memory://".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_acquire_timeout_ms() -> u64 {
        3000
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
        }
    }
}

/// Remote book-metadata provider used by the external lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "CatalogSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "CatalogSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "CatalogSettings::default_max_retries")]
    pub max_retries: u32,
}

impl CatalogSettings {
    fn default_base_url() -> String {
        "https://www.anapioficeandfire.com/api/books".to_string()
    }

    fn default_timeout_ms() -> u64 {
        5000
    }

    fn default_max_retries() -> u32 {
        2
    }

    /// Every attempt timing out, plus the linear backoff between them.
    pub fn worst_case_ms(&self) -> u64 {
        let attempts = u64::from(self.max_retries) + 1;
        let backoff: u64 = (1..attempts).map(|n| n * CATALOG_RETRY_BACKOFF_MS).sum();
        self.timeout_ms.saturating_mul(attempts).saturating_add(backoff)
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_ms: Self::default_timeout_ms(),
            max_retries: Self::default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_is_in_memory() {
        let settings = Settings::default();
        assert_eq!(settings.database.url, "memory://");
    }

    #[test]
    fn default_catalog_points_at_ice_and_fire() {
        let settings = Settings::default();
        assert_eq!(
            settings.catalog.base_url,
            "https://www.anapioficeandfire.com/api/books"
        );
        assert_eq!(settings.catalog.timeout_ms, 5000);
    }

    #[test]
    fn lookup_deadline_fits_inside_request_timeout() {
        let settings = Settings::default();
        assert_eq!(settings.catalog.worst_case_ms(), 15600);
        assert_eq!(settings.lookup_deadline(), Duration::from_millis(13500));

        let mut tight = Settings::default();
        tight.server.request_timeout_ms = 1500;
        tight.catalog.timeout_ms = 500;
        assert_eq!(tight.lookup_deadline(), Duration::from_millis(1250));

        let mut roomy = Settings::default();
        roomy.server.request_timeout_ms = 60000;
        assert_eq!(roomy.lookup_deadline(), Duration::from_millis(15600));
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(
            "staging".parse::<Environment>().unwrap(),
            Environment::Staging
        );
    }

    #[test]
    fn missing_config_dir_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("bookshelf-settings-missing");
        let settings = Settings::load_from(&dir, "production").unwrap();
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let server = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 9090,
            request_timeout_ms: 1000,
        };
        assert_eq!(server.bind_address(), "127.0.0.1:9090");
    }
}
