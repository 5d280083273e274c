//! Configuration loading and types for the recordings gateway.
//!
//! Configuration is read from an optional YAML file and deserialized into
//! the [`Config`] struct, then selected environment variables are layered
//! on top (see [`Config::apply_env_overrides`]).  Each subsection governs a
//! different part of the system: networking, the storage backend, logging,
//! and observability.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health probe).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings. Both are enabled by default.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,

    /// Enable the `/health` probe.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            health_check: true,
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `aws` or `memory`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// AWS S3 configuration.
    #[serde(default)]
    pub aws: AwsStorageConfig,

    /// In-memory backend configuration.
    #[serde(default)]
    pub memory: MemoryStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            aws: AwsStorageConfig::default(),
            memory: MemoryStorageConfig::default(),
        }
    }
}

/// AWS S3 backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsStorageConfig {
    /// Bucket holding the recordings. Required for the `aws` backend.
    #[serde(default)]
    pub bucket: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Key prefix inside the bucket; stripped from listed keys.
    #[serde(default)]
    pub prefix: String,
    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: String,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,
    /// Explicit AWS access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: String,
    /// Explicit AWS secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,
}

impl Default for AwsStorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            prefix: String::new(),
            endpoint_url: String::new(),
            use_path_style: false,
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

/// In-memory backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryStorageConfig {
    /// Base URL that signed links point at (this server's `/blobs` route).
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// HMAC secret for signed links. A random one is generated when empty.
    #[serde(default)]
    pub signing_secret: String,
    /// Directory whose regular files are loaded as recordings at startup.
    #[serde(default)]
    pub seed_dir: String,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            signing_secret: String::new(),
            seed_dir: String::new(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9012
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_storage_backend() -> String {
    "aws".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:9012".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Environment overrides -----------------------------------------------------

impl Config {
    /// Layer environment variables over file values.
    ///
    /// `lookup` resolves a variable name; empty values are ignored.
    /// Recognised: `AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// `S3_BUCKET_NAME`, `RECORDINGS_STORAGE_BACKEND`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("RECORDINGS_STORAGE_BACKEND") {
            self.storage.backend = v;
        }
        if let Some(v) = get("AWS_REGION") {
            self.storage.aws.region = v;
        }
        if let Some(v) = get("AWS_ACCESS_KEY_ID") {
            self.storage.aws.access_key_id = v;
        }
        if let Some(v) = get("AWS_SECRET_ACCESS_KEY") {
            self.storage.aws.secret_access_key = v;
        }
        if let Some(v) = get("S3_BUCKET_NAME") {
            self.storage.aws.bucket = v;
        }
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.storage.backend.as_str() {
            "aws" => {
                if self.storage.aws.bucket.is_empty() {
                    anyhow::bail!(
                        "storage.backend is 'aws' but no bucket is configured (set storage.aws.bucket or S3_BUCKET_NAME)"
                    );
                }
            }
            "memory" => {}
            other => anyhow::bail!("unknown storage.backend '{other}' (expected 'aws' or 'memory')"),
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => anyhow::bail!("unknown logging.format '{other}' (expected 'text' or 'json')"),
        }
    }
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

/// Load the file if given, apply process environment overrides, validate.
pub fn resolve_config(path: Option<&str>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => Config::default(),
    };
    config.apply_env_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}
