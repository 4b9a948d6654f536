//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with BLOGOS_)
//! 2. Config file (blogos.toml)
//! 3. Default values
//!
//! The database URL usually carries credentials and belongs in the
//! environment (`BLOGOS_DATABASE_URL`), not in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sea-orm connection string, e.g. `postgres://...` or `sqlite://blog.db`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://blogos.db?mode=rwc".to_string(),
        }
    }
}

/// Slug allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlugConfig {
    /// Numeric suffixes tried before giving up with a conflict
    pub max_attempts: u32,
    /// Length of the random suffix used when a name yields no slug
    pub random_suffix_len: usize,
    /// Literal used when a name has no ASCII alphanumerics at all
    pub fallback_token: String,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            random_suffix_len: 6,
            fallback_token: "tag".to_string(),
        }
    }
}

/// Article listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticlesConfig {
    /// Articles per listing page
    pub per_page: u32,
    /// Size of the home page feed
    pub latest_limit: u32,
    /// Maximum related articles returned for a detail page
    pub related_limit: u32,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            per_page: 10,
            latest_limit: 8,
            related_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// Maximum comment length in characters
    pub max_length: usize,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self { max_length: 5000 }
    }
}

/// View-count de-duplication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Window in which repeat views from one session are not counted
    pub dedup_window_minutes: u64,
    /// Upper bound on tracked (session, article) pairs
    pub max_tracked: u64,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            dedup_window_minutes: 30,
            max_tracked: 100_000,
        }
    }
}

/// Comment moderation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// How long the sensitive word list is cached before reloading
    pub word_cache_seconds: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            word_cache_seconds: 60,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slug: SlugConfig,
    pub articles: ArticlesConfig,
    pub comments: CommentsConfig,
    pub views: ViewsConfig,
    pub moderation: ModerationConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("blogos.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // e.g. BLOGOS_DATABASE_URL
            .add_source(
                Environment::with_prefix("BLOGOS")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reload configuration from file
    pub fn reload() -> Result<(), ConfigError> {
        let new_config = Self::load()?;
        if let Ok(mut config) = APP_CONFIG.write() {
            *config = new_config;
            log::info!("Configuration reloaded");
        }
        Ok(())
    }
}

/// Initialize application configuration
///
/// Triggers the lazy load and logs the result. Call early in startup.
pub fn init() {
    let config = get_config();
    log::info!(
        "Configuration loaded: articles.per_page = {}, slug.max_attempts = {}",
        config.articles.per_page,
        config.slug.max_attempts
    );
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

pub fn database() -> DatabaseConfig {
    get_config().database
}
