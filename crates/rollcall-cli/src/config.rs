//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Default session windows, overridable per run.
    pub session: SessionDefaults,

    /// Reader device path; `None` reads UIDs from stdin.
    pub reader_device: Option<PathBuf>,

    /// Indicator hardware selection.
    pub signals: SignalsConfig,

    /// Report notification, if configured.
    pub notify: Option<NotifyConfig>,
}

/// Default session windows (the original device ran 4 minutes with a
/// 2-minute on-time window).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionDefaults {
    pub total_secs: u64,
    pub on_time_cutoff_secs: u64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            total_secs: 240,
            on_time_cutoff_secs: 120,
        }
    }
}

/// Which signal backend to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalBackend {
    /// Log cues through tracing. Safe default for development hosts.
    #[default]
    Console,
    /// Drive sysfs GPIO pins.
    Gpio,
}

/// Indicator hardware configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalsConfig {
    pub backend: SignalBackend,
    pub green_pin: u32,
    pub red_pin: u32,
    pub buzzer_pin: u32,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            backend: SignalBackend::Console,
            green_pin: 20,
            red_pin: 21,
            buzzer_pin: 18,
        }
    }
}

/// Report notification settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint the report JSON is posted to.
    pub endpoint: String,
    /// Recipient identifier forwarded with the report.
    pub recipient: String,
    /// Optional bearer token.
    pub auth_token: Option<String>,
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("endpoint", &self.endpoint)
            .field("recipient", &self.recipient)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("session", &self.session)
            .field("reader_device", &self.reader_device)
            .field("signals", &self.signals)
            .field("notify", &self.notify)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("rollcall.db"),
            session: SessionDefaults::default(),
            reader_device: None,
            signals: SignalsConfig::default(),
            notify: None,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ROLLCALL_*), with __ for nesting
        figment = figment.merge(Env::prefixed("ROLLCALL_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for rollcall.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rollcall"))
}

/// Returns the platform-specific data directory for rollcall.
///
/// On Linux: `~/.local/share/rollcall`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rollcall"))
}
