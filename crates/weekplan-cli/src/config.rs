//! Configuration file management for weekplan.
//!
//! Provides a TOML-based config file at `~/.config/weekplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use weekplan_core::{CredentialResolver, GeminiBackend, GeminiConfig, GenerationInvoker, RuleSet};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub rules: RulesSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BackendSection {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    /// Consulted only after the build-time key and the environment.
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RulesSection {
    /// Path to a text file holding a custom rule-set.
    pub file: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the weekplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/weekplan` or `~/.config/weekplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("weekplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("weekplan")
}

/// Return the path to the weekplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix, since it may hold an API key.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Read a rule-set from a text file.
pub fn read_rules_file(path: &Path) -> Result<RuleSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    Ok(RuleSet::new(text))
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Where the active rule-set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    Default,
    File(PathBuf),
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct WeekplanConfig {
    pub gemini: GeminiConfig,
    pub rules: RuleSet,
    pub rules_source: RulesSource,
    /// Config-file API key, the last resort for credential resolution.
    pub api_key_fallback: Option<String>,
}

impl WeekplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Model: `cli_model` > `WEEKPLAN_MODEL` env > `backend.model` > `GeminiConfig::DEFAULT_MODEL`
    /// - Endpoint: `WEEKPLAN_ENDPOINT` env > `backend.endpoint` > `GeminiConfig::DEFAULT_ENDPOINT`
    /// - Rules: `cli_rules` > `WEEKPLAN_RULES_FILE` env > `rules.file` > built-in default
    pub fn resolve(cli_model: Option<&str>, cli_rules: Option<&Path>) -> Result<Self> {
        let file_config = load_config().ok().unwrap_or_default();
        let defaults = GeminiConfig::default();

        let model = if let Some(model) = cli_model {
            model.to_string()
        } else if let Some(model) = non_empty_env("WEEKPLAN_MODEL") {
            model
        } else if let Some(ref model) = file_config.backend.model {
            model.clone()
        } else {
            defaults.model.clone()
        };

        let endpoint = if let Some(endpoint) = non_empty_env("WEEKPLAN_ENDPOINT") {
            endpoint
        } else if let Some(ref endpoint) = file_config.backend.endpoint {
            endpoint.clone()
        } else {
            defaults.endpoint.clone()
        };

        let rules_path = if let Some(path) = cli_rules {
            Some(path.to_path_buf())
        } else if let Some(path) = non_empty_env("WEEKPLAN_RULES_FILE") {
            Some(PathBuf::from(path))
        } else {
            file_config.rules.file.as_ref().map(PathBuf::from)
        };

        let (rules, rules_source) = match rules_path {
            Some(path) => (read_rules_file(&path)?, RulesSource::File(path)),
            None => (RuleSet::default(), RulesSource::Default),
        };

        Ok(Self {
            gemini: GeminiConfig {
                model,
                endpoint,
                temperature: file_config.backend.temperature.unwrap_or(defaults.temperature),
                timeout_secs: file_config.backend.timeout_secs.unwrap_or(defaults.timeout_secs),
            },
            rules,
            rules_source,
            api_key_fallback: file_config.backend.api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Build the Gemini-backed invoker for this configuration.
    pub fn invoker(&self) -> Result<GenerationInvoker> {
        let backend = GeminiBackend::new(self.gemini.clone())
            .context("failed to construct the Gemini client")?;
        let credentials =
            CredentialResolver::from_environment().with_fallback(self.api_key_fallback.clone());
        if credentials.resolve().is_none() {
            tracing::warn!(
                vars = %credentials.env_names().join(", "),
                "no API key configured; generation will fail until one is set"
            );
        }
        Ok(GenerationInvoker::new(Arc::new(backend), credentials))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point XDG_CONFIG_HOME at a temp dir for the duration of `f`.
    fn with_config_home<T>(f: impl FnOnce(&Path) -> T) -> T {
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let out = f(tmp.path());

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        out
    }

    fn clear_vars() {
        for name in ["WEEKPLAN_MODEL", "WEEKPLAN_ENDPOINT", "WEEKPLAN_RULES_FILE"] {
            unsafe { std::env::remove_var(name) };
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        with_config_home(|_| {
            let original = ConfigFile {
                backend: BackendSection {
                    model: Some("gemini-2.5-pro".to_string()),
                    api_key: Some("from-file".to_string()),
                    ..Default::default()
                },
                rules: RulesSection::default(),
            };
            save_config(&original).unwrap();
            let loaded = load_config().unwrap();
            assert_eq!(loaded.backend.model.as_deref(), Some("gemini-2.5-pro"));
            assert_eq!(loaded.backend.api_key.as_deref(), Some("from-file"));
        });
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        with_config_home(|_| {
            save_config(&ConfigFile::default()).unwrap();
            let meta = std::fs::metadata(config_path()).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        });
    }

    #[test]
    fn partial_config_file_parses() {
        let cfg: ConfigFile = toml::from_str("[backend]\nmodel = \"m\"\n").unwrap();
        assert_eq!(cfg.backend.model.as_deref(), Some("m"));
        assert!(cfg.rules.file.is_none());
        let empty: ConfigFile = toml::from_str("").unwrap();
        assert!(empty.backend.model.is_none());
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_vars();
        with_config_home(|_| {
            let config = WeekplanConfig::resolve(None, None).unwrap();
            assert_eq!(config.gemini, GeminiConfig::default());
            assert_eq!(config.rules_source, RulesSource::Default);
            assert!(config.rules.is_default());
            assert!(config.api_key_fallback.is_none());
        });
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        clear_vars();
        unsafe { std::env::set_var("WEEKPLAN_MODEL", "env-model") };
        with_config_home(|_| {
            let config = WeekplanConfig::resolve(Some("cli-model"), None).unwrap();
            assert_eq!(config.gemini.model, "cli-model");
        });
        clear_vars();
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_vars();
        unsafe { std::env::set_var("WEEKPLAN_MODEL", "env-model") };
        unsafe { std::env::set_var("WEEKPLAN_ENDPOINT", "http://localhost:1/v1beta") };
        with_config_home(|_| {
            save_config(&ConfigFile {
                backend: BackendSection {
                    model: Some("file-model".to_string()),
                    endpoint: Some("http://file/v1beta".to_string()),
                    temperature: Some(0.9),
                    ..Default::default()
                },
                rules: RulesSection::default(),
            })
            .unwrap();
            let config = WeekplanConfig::resolve(None, None).unwrap();
            assert_eq!(config.gemini.model, "env-model");
            assert_eq!(config.gemini.endpoint, "http://localhost:1/v1beta");
            assert_eq!(config.gemini.temperature, 0.9);
        });
        clear_vars();
    }

    #[test]
    fn resolve_reads_rules_file_from_config() {
        let _lock = lock_env();
        clear_vars();
        with_config_home(|home| {
            let rules_path = home.join("rules.txt");
            std::fs::write(&rules_path, "自定义规则").unwrap();
            save_config(&ConfigFile {
                backend: BackendSection::default(),
                rules: RulesSection {
                    file: Some(rules_path.display().to_string()),
                },
            })
            .unwrap();

            let config = WeekplanConfig::resolve(None, None).unwrap();
            assert_eq!(config.rules.as_str(), "自定义规则");
            assert_eq!(config.rules_source, RulesSource::File(rules_path));
        });
    }

    #[test]
    fn resolve_errors_on_missing_rules_file() {
        let _lock = lock_env();
        clear_vars();
        with_config_home(|home| {
            let missing = home.join("nope.txt");
            let err = WeekplanConfig::resolve(None, Some(&missing)).unwrap_err();
            assert!(
                err.to_string().contains("failed to read rules file"),
                "unexpected error: {err}"
            );
        });
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("weekplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
