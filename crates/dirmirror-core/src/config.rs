use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration loaded from `~/.config/dirmirror/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Connect timeout for the native client, in seconds.
    pub connect_timeout_secs: u64,
    /// Total time allowed for one request (listing or file), in seconds.
    pub timeout_secs: u64,
    /// Transfers slower than this many bytes/s for `low_speed_time_secs` are aborted.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Redirect cap for the native client (login flows redirect several times).
    pub max_redirections: u32,
    /// External program used when the native client fails. Empty disables the fallback.
    #[serde(default = "default_fallback_command")]
    pub fallback_command: String,
    /// Overrides the computed `User-Agent` header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_fallback_command() -> String {
    "curl".to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            max_redirections: 10,
            fallback_command: default_fallback_command(),
            user_agent: None,
        }
    }
}

impl MirrorConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }

    /// The external fallback program, if one is configured.
    pub fn fallback_program(&self) -> Option<&str> {
        let cmd = self.fallback_command.trim();
        if cmd.is_empty() {
            None
        } else {
            Some(cmd)
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dirmirror")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MirrorConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MirrorConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_from(path: &Path) -> Result<MirrorConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: MirrorConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = MirrorConfig::default();
        assert_eq!(cfg.connect_timeout_secs, 30);
        assert_eq!(cfg.timeout_secs, 3600);
        assert_eq!(cfg.max_redirections, 10);
        assert_eq!(cfg.fallback_program(), Some("curl"));
        assert!(cfg.user_agent.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = MirrorConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: MirrorConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.connect_timeout_secs, cfg.connect_timeout_secs);
        assert_eq!(parsed.low_speed_limit, cfg.low_speed_limit);
        assert_eq!(parsed.fallback_command, cfg.fallback_command);
    }

    #[test]
    fn config_toml_missing_optional_fields() {
        let toml = r#"
            connect_timeout_secs = 5
            timeout_secs = 60
            low_speed_limit = 1
            low_speed_time_secs = 10
            max_redirections = 3
        "#;
        let cfg: MirrorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.fallback_program(), Some("curl"));
        assert!(cfg.user_agent.is_none());
    }

    #[test]
    fn empty_fallback_command_disables_fallback() {
        let toml = r#"
            connect_timeout_secs = 5
            timeout_secs = 60
            low_speed_limit = 1
            low_speed_time_secs = 10
            max_redirections = 3
            fallback_command = "  "
            user_agent = "mirror-test/1.0"
        "#;
        let cfg: MirrorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.fallback_program(), None);
        assert_eq!(cfg.user_agent.as_deref(), Some("mirror-test/1.0"));
    }

    #[test]
    fn load_from_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = MirrorConfig::default();
        cfg.timeout_secs = 42;
        fs::write(&path, toml::to_string_pretty(&cfg).unwrap()).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.timeout_secs, 42);
    }

    #[test]
    fn load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from(&dir.path().join("nope.toml")).is_err());
    }
}
