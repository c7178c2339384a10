//! Backend credential resolution.
//!
//! Resolution order: a key injected at build time, then the runtime
//! environment under several recognized names, then an optional fallback
//! (the CLI passes the config-file value). Blank values are skipped.

use std::env;

/// Runtime environment variables checked for the backend key, in order.
pub const RUNTIME_KEY_VARS: [&str; 4] = [
    "WEEKPLAN_API_KEY",
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "API_KEY",
];

/// Key captured from the build environment, if any.
fn build_time_key() -> Option<&'static str> {
    option_env!("WEEKPLAN_API_KEY").or(option_env!("GEMINI_API_KEY"))
}

/// Resolves the generative backend access key.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    build_time: Option<String>,
    env_names: Vec<String>,
    fallback: Option<String>,
}

impl CredentialResolver {
    /// Resolver over the build-time key and [`RUNTIME_KEY_VARS`].
    pub fn from_environment() -> Self {
        Self {
            build_time: build_time_key().map(str::to_string),
            env_names: RUNTIME_KEY_VARS.iter().map(|s| s.to_string()).collect(),
            fallback: None,
        }
    }

    /// Resolver that always yields `key`. Useful for tests and for keys
    /// passed explicitly on the command line.
    pub fn fixed(key: impl Into<String>) -> Self {
        Self {
            build_time: Some(key.into()),
            env_names: Vec::new(),
            fallback: None,
        }
    }

    /// Resolver that never yields a key.
    pub fn none() -> Self {
        Self {
            build_time: None,
            env_names: Vec::new(),
            fallback: None,
        }
    }

    /// Add a last-resort key, consulted after the environment.
    pub fn with_fallback(mut self, key: Option<String>) -> Self {
        self.fallback = key;
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Option<String> {
        self.resolve_with(|name| env::var(name).ok())
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_blank(self.build_time.clone())
            .or_else(|| {
                self.env_names
                    .iter()
                    .find_map(|name| non_blank(lookup(name)))
            })
            .or_else(|| non_blank(self.fallback.clone()))
    }

    /// Names checked at runtime, for error messages.
    pub fn env_names(&self) -> &[String] {
        &self.env_names
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::from_environment()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
