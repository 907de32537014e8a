//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Content path configuration.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Document store configuration.
    pub couch: CouchConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Content path configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Root directory for all content (images, themes, staging).
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,
    /// URL prefix under which stored assets are publicly served.
    #[serde(default = "default_public_subdir")]
    pub public_subdir: String,
}

fn default_content_root() -> PathBuf {
    PathBuf::from("./content")
}

fn default_public_subdir() -> String {
    "/content/images".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            public_subdir: default_public_subdir(),
        }
    }
}

impl PathsConfig {
    /// Directory uploaded images are stored in.
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.content_root.join("images")
    }

    /// Directory installed themes live in.
    #[must_use]
    pub fn themes_dir(&self) -> PathBuf {
        self.content_root.join("themes")
    }

    /// Directory incoming uploads are staged in before being saved.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.content_root.join("staging")
    }
}

/// Document store (CouchDB/Cloudant) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CouchConfig {
    /// Store host, e.g. `account.cloudant.com` or `localhost:5984`.
    pub url: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Application identity used to namespace the database.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Suffix appended to the application identity to form the database name.
    #[serde(default = "default_database_suffix")]
    pub database_suffix: String,
    /// Explicit database name; overrides the derived name when set.
    #[serde(default)]
    pub database: Option<String>,
    /// Timeout applied to every store request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_app_name() -> String {
    "inkwell".to_string()
}

fn default_database_suffix() -> String {
    "-assets".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl CouchConfig {
    /// The target database name: the explicit override when present,
    /// otherwise the application identity with the configured suffix.
    #[must_use]
    pub fn database_name(&self) -> String {
        self.database
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.app_name, self.database_suffix))
    }

    /// Base URL of the store's HTTP interface.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}", self.url)
    }

    /// Public base URL for stored assets: `https://{host}/{db}`.
    #[must_use]
    pub fn public_base_url(&self) -> String {
        format!("https://{}/{}", self.url, self.database_name())
    }

    /// Extracts store credentials from a platform service-binding document
    /// (the JSON blob PaaS environments expose in `VCAP_SERVICES`).
    ///
    /// The first `user-provided` service entry's credentials are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or no user-provided
    /// service with `username`, `password`, and `url` credentials is bound.
    pub fn from_service_binding(services_json: &str) -> Result<Self, config::ConfigError> {
        let services: serde_json::Value = serde_json::from_str(services_json)
            .map_err(|e| config::ConfigError::Message(format!("invalid service binding: {e}")))?;

        let creds = services
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(name, _)| name.starts_with("user-provided"))
            .filter_map(|(_, entries)| entries.as_array())
            .flatten()
            .filter_map(|entry| entry.get("credentials"))
            .next()
            .ok_or_else(|| {
                config::ConfigError::Message("no user-provided service bound".to_string())
            })?;

        let field = |key: &str| -> Result<String, config::ConfigError> {
            creds
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(String::from)
                .ok_or_else(|| {
                    config::ConfigError::Message(format!("service binding missing `{key}`"))
                })
        };

        Ok(Self {
            url: field("url")?,
            username: field("username")?,
            password: field("password")?,
            app_name: default_app_name(),
            database_suffix: default_database_suffix(),
            database: creds
                .get("database")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            timeout_secs: default_timeout_secs(),
        })
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// When a `VCAP_SERVICES` binding is present it supplies the store
    /// credentials, overriding any file-based `couch` section.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("INKWELL").separator("__"))
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;

        if let Ok(services) = std::env::var("VCAP_SERVICES") {
            let app_name = app_config.couch.app_name.clone();
            app_config.couch = CouchConfig::from_service_binding(&services)?;
            app_config.couch.app_name = app_name;
        }

        Ok(app_config)
    }
}
