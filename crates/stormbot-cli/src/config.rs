//! Configuration vault – reads/writes `~/.stormbot/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use stormbot_types::Limits;

/// Persisted configuration stored in `~/.stormbot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the advisory decision service.
    #[serde(default = "default_oracle_url")]
    pub oracle_url: String,

    /// Model name the service should use.
    #[serde(default = "default_oracle_model")]
    pub oracle_model: String,

    /// API key for the decision service (stored as plain text – the vault
    /// restricts file permissions on `~/.stormbot/config.toml`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub oracle_api_key: String,

    /// Whether a gyro is mounted; enables closed-loop turns.
    #[serde(default = "default_use_gyro")]
    pub use_gyro: bool,

    /// espeak voice used for announcements.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Safety ceilings and pacing.
    #[serde(default)]
    pub limits: Limits,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("oracle_url", &self.oracle_url)
            .field("oracle_model", &self.oracle_model)
            .field(
                "oracle_api_key",
                if self.oracle_api_key.is_empty() {
                    &"<not set>"
                } else {
                    &"<redacted>"
                },
            )
            .field("use_gyro", &self.use_gyro)
            .field("voice", &self.voice)
            .field("limits", &self.limits)
            .finish()
    }
}

fn default_oracle_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_oracle_model() -> String {
    "gemma-3-27b-it".to_string()
}
fn default_use_gyro() -> bool {
    true
}
fn default_voice() -> String {
    "en".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle_url: default_oracle_url(),
            oracle_model: default_oracle_model(),
            oracle_api_key: String::new(),
            use_gyro: default_use_gyro(),
            voice: default_voice(),
            limits: Limits::default(),
        }
    }
}

/// Return the path to `~/.stormbot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".stormbot").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `STORMBOT_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `STORMBOT_ORACLE_URL` | `oracle_url` |
/// | `STORMBOT_MODEL` | `oracle_model` |
/// | `STORMBOT_API_KEY` | `oracle_api_key` |
/// | `STORMBOT_VOICE` | `voice` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("STORMBOT_ORACLE_URL") {
        cfg.oracle_url = v;
    }
    if let Ok(v) = std::env::var("STORMBOT_MODEL") {
        cfg.oracle_model = v;
    }
    if let Ok(v) = std::env::var("STORMBOT_API_KEY") {
        cfg.oracle_api_key = v;
    }
    if let Ok(v) = std::env::var("STORMBOT_VOICE") {
        cfg.voice = v;
    }
}

/// Save the config to disk, creating `~/.stormbot/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
