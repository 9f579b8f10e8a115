//! Runtime settings for canvass.
//!
//! Built-in defaults are overlaid by `config.toml`, which is overlaid by
//! `CANVASS_`-prefixed environment variables. Section and key are split by a
//! double underscore, so `CANVASS_ADMIN__PASSWORD` sets `admin.password`.
//! The admin password should only ever come from the environment.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Loaded on first access.
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
    pub base_url: String,
    /// Address the HTTP server binds to.
    pub bind: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Canvass".to_string(),
            description: "Surveys, responses and reports".to_string(),
            base_url: "http://localhost:8080".to_string(),
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Session and cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session lifetime in minutes (default: 24 hours)
    pub session_timeout_minutes: u32,
    /// Seconds between expired session sweeps
    pub session_sweep_seconds: u64,
    /// Send the session cookie over HTTPS only
    pub secure_cookies: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: 1440,
            session_sweep_seconds: 300,
            secure_cookies: false,
        }
    }
}

/// Bootstrap administrator, created at startup when missing.
/// An empty name or password disables the bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    pub name: String,
    /// Should be set through CANVASS_ADMIN__PASSWORD
    pub password: String,
    pub email: String,
}

impl AdminConfig {
    pub fn is_enabled(&self) -> bool {
        !self.name.trim().is_empty() && !self.password.is_empty()
    }
}

/// Builder limits and dashboard table sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum questions per survey
    pub max_questions: u32,
    /// Maximum options per choice question
    pub max_options: u32,
    /// Rows in the dashboard recent activity table
    pub recent_activity: u32,
    /// Rows in the dashboard top surveys table
    pub top_surveys: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_questions: 100,
            max_options: 50,
            recent_activity: 10,
            top_surveys: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Reads `path` (optional) plus the environment over the defaults.
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("CANVASS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Forces the first load so problems show up in the startup log.
pub fn init() {
    let config = get_config();
    log::info!(
        "Settings loaded for {} (bind {}, sessions {} min)",
        config.site.name,
        config.site.bind,
        config.security.session_timeout_minutes
    );
}

/// A snapshot of the current settings.
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

pub fn site() -> SiteConfig {
    get_config().site
}

pub fn security() -> SecurityConfig {
    get_config().security
}

pub fn admin() -> AdminConfig {
    get_config().admin
}

pub fn limits() -> LimitsConfig {
    get_config().limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "Canvass");
        assert_eq!(config.security.session_timeout_minutes, 1440);
        assert_eq!(config.limits.top_surveys, 5);
        assert_eq!(config.limits.recent_activity, 10);
    }

    #[test]
    fn test_admin_bootstrap_disabled_by_default() {
        let config = AppConfig::default();
        assert!(!config.admin.is_enabled());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Staff Pulse"
base_url = "https://pulse.example.com"

[security]
session_timeout_minutes = 60

[admin]
name = "root"
password = "hunter22"

[limits]
max_questions = 10
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Staff Pulse");
        assert_eq!(config.site.base_url, "https://pulse.example.com");
        assert_eq!(config.security.session_timeout_minutes, 60);
        assert!(config.admin.is_enabled());
        assert_eq!(config.limits.max_questions, 10);
        // Keys missing from the file keep their defaults.
        assert_eq!(config.limits.max_options, 50);
        assert_eq!(config.site.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_absent_file_is_not_an_error() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "Canvass");
        assert_eq!(config.limits.max_options, 50);
    }
}
