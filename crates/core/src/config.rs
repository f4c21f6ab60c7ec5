//! Configuration management for Grounded.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.grounded/config.yaml` or an explicit path)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the document pool and the config
//! file are resolved relative to the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers the knowledge crate knows how to construct.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .grounded/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Document pool root (docs/, images/, audio/ live below it)
    pub data_dir: PathBuf,

    /// HTTP listener settings
    pub server: ServerConfig,

    /// Retrieval knobs
    pub retrieval: RetrievalConfig,

    /// Embedding model selection
    pub embedding: EmbeddingSettings,

    /// Build and query deadlines
    pub limits: LimitsConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5050,
        }
    }
}

/// Retrieval knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors requested from the index
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Largest squared L2 distance still considered evidence. Lower is stricter.
    ///
    /// Distances are measured on unit vectors, so the range is [0, 4]. The
    /// default of 1.5 suits MiniLM-style sentence models (`ollama` with
    /// `all-minilm`). The `trigram` hash spreads unrelated text differently,
    /// so retune this whenever the provider or model changes.
    #[serde(rename = "maxDistance")]
    pub max_distance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_distance: 1.5,
        }
    }
}

/// Embedding model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" (offline hashing, the default) or "ollama"
    /// (a pretrained sentence model served over HTTP)
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Normalize vectors to unit length
    pub normalize: bool,

    /// Provider endpoint (ollama only)
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds (ollama only)
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            normalize: true,
            endpoint: None,
            timeout_secs: None,
        }
    }
}

/// Build and query deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(rename = "buildTimeoutSecs")]
    pub build_timeout_secs: u64,

    #[serde(rename = "queryTimeoutSecs")]
    pub query_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            build_timeout_secs: 300,
            query_timeout_secs: 30,
        }
    }
}

/// Full configuration file structure. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    data: Option<DataSection>,
    server: Option<ServerSection>,
    retrieval: Option<RetrievalSection>,
    embedding: Option<EmbeddingSection>,
    limits: Option<LimitsSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalSection {
    #[serde(rename = "topK")]
    top_k: Option<usize>,
    #[serde(rename = "maxDistance")]
    max_distance: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    normalize: Option<bool>,
    endpoint: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LimitsSection {
    #[serde(rename = "buildTimeoutSecs")]
    build_timeout_secs: Option<u64>,
    #[serde(rename = "queryTimeoutSecs")]
    query_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

/// Command-line values that take precedence over every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            data_dir: PathBuf::from("data"),
            server: ServerConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingSettings::default(),
            limits: LimitsConfig::default(),
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `GROUNDED_WORKSPACE`: Override workspace path
    /// - `GROUNDED_CONFIG`: Path to config file
    /// - `GROUNDED_DATA_DIR`: Document pool root
    /// - `GROUNDED_HOST` / `GROUNDED_PORT`: HTTP listener
    /// - `GROUNDED_MAX_DISTANCE`: Confidence threshold
    /// - `GROUNDED_EMBEDDING_PROVIDER`: Embedding provider
    /// - `OLLAMA_URL`: Embedding endpoint for the ollama provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use grounded_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Data dir: {:?}", config.resolved_data_dir());
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("GROUNDED_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(config_file) = std::env::var("GROUNDED_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.grounded_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = file.data.and_then(|d| d.path) {
            result.data_dir = PathBuf::from(path);
        }

        if let Some(server) = file.server {
            if let Some(host) = server.host {
                result.server.host = host;
            }
            if let Some(port) = server.port {
                result.server.port = port;
            }
        }

        if let Some(retrieval) = file.retrieval {
            if let Some(top_k) = retrieval.top_k {
                result.retrieval.top_k = top_k;
            }
            if let Some(max_distance) = retrieval.max_distance {
                result.retrieval.max_distance = max_distance;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if let Some(normalize) = embedding.normalize {
                result.embedding.normalize = normalize;
            }
            if embedding.endpoint.is_some() {
                result.embedding.endpoint = embedding.endpoint;
            }
            if embedding.timeout_secs.is_some() {
                result.embedding.timeout_secs = embedding.timeout_secs;
            }
        }

        if let Some(limits) = file.limits {
            if let Some(secs) = limits.build_timeout_secs {
                result.limits.build_timeout_secs = secs;
            }
            if let Some(secs) = limits.query_timeout_secs {
                result.limits.query_timeout_secs = secs;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Environment variables override the YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(data_dir) = std::env::var("GROUNDED_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(host) = std::env::var("GROUNDED_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("GROUNDED_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid GROUNDED_PORT '{}': {}", port, e)))?;
        }

        if let Ok(max_distance) = std::env::var("GROUNDED_MAX_DISTANCE") {
            self.retrieval.max_distance = max_distance.parse().map_err(|e| {
                AppError::Config(format!(
                    "Invalid GROUNDED_MAX_DISTANCE '{}': {}",
                    max_distance, e
                ))
            })?;
        }

        if let Ok(provider) = std::env::var("GROUNDED_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.embedding.endpoint = Some(url);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Workspace and config file are consumed by [`AppConfig::load`]; the
    /// remaining flags win over every other layer.
    pub fn with_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(data_dir) = overrides.data_dir {
            self.data_dir = data_dir;
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .grounded directory.
    pub fn grounded_dir(&self) -> PathBuf {
        self.workspace.join(".grounded")
    }

    /// Document pool root, resolved against the workspace when relative.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            self.workspace.join(&self.data_dir)
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.embedding.provider.as_str();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        let max_distance = self.retrieval.max_distance;
        if !max_distance.is_finite() || max_distance < 0.0 {
            return Err(AppError::Config(format!(
                "retrieval.maxDistance must be a non-negative number, got {}",
                max_distance
            )));
        }

        if self.limits.build_timeout_secs == 0 || self.limits.query_timeout_secs == 0 {
            return Err(AppError::Config(
                "Timeouts must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.max_distance, 1.5);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.server.port, 5050);
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_grounded_dir() {
        let config = AppConfig::default();
        assert!(config.grounded_dir().ends_with(".grounded"));
    }

    #[test]
    fn test_resolved_data_dir_relative_and_absolute() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(config.resolved_data_dir(), temp.path().join("data"));

        config.data_dir = temp.path().join("elsewhere");
        assert_eq!(config.resolved_data_dir(), temp.path().join("elsewhere"));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
data:
  path: pool
server:
  port: 8080
retrieval:
  topK: 5
  maxDistance: 0.9
embedding:
  provider: ollama
  model: all-minilm
  endpoint: http://localhost:11434
limits:
  queryTimeoutSecs: 10
logging:
  level: debug
  color: false
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();

        assert_eq!(merged.data_dir, PathBuf::from("pool"));
        assert_eq!(merged.server.port, 8080);
        assert_eq!(merged.server.host, "0.0.0.0");
        assert_eq!(merged.retrieval.top_k, 5);
        assert_eq!(merged.retrieval.max_distance, 0.9);
        assert_eq!(merged.embedding.provider, "ollama");
        assert_eq!(merged.embedding.dimensions, 384);
        assert_eq!(
            merged.embedding.endpoint.as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(merged.limits.query_timeout_secs, 10);
        assert_eq!(merged.limits.build_timeout_secs, 300);
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_empty_yaml_keeps_defaults() {
        let merged = AppConfig::default().merge_yaml_str("").unwrap();
        assert_eq!(merged.retrieval, RetrievalConfig::default());
    }

    #[test]
    fn test_load_reads_workspace_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".grounded")).unwrap();
        std::fs::write(
            temp.path().join(".grounded/config.yaml"),
            "retrieval:\n  maxDistance: 0.75\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.retrieval.max_distance, 0.75);
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("missing.yaml")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(CliOverrides {
            data_dir: Some(PathBuf::from("/srv/pool")),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(overridden.data_dir, PathBuf::from("/srv/pool"));
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_retrieval_knobs() {
        let mut config = AppConfig::default();
        config.retrieval.max_distance = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.limits.build_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
