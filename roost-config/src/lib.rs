//! Loader for Roost configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached, with `ROOST__`-prefixed
//! environment variables applied on top (`ROOST__CACHE__DATABASE=other`).
//! String values may reference `${VAR}` placeholders, which are expanded after
//! merging.
//!
//! ```yaml
//! version: "1"
//! twitter:
//!   auth_token: "${TWITTER_BEARER}"
//!   csrf_token: "${TWITTER_CSRF}"
//!   cookie: "${TWITTER_COOKIE}"
//! cache:
//!   url: "sqlite://roost-cache.db?mode=rwc"
//!   database: "ai-cache"
//!   index: "index"
//! logging:
//!   format: json
//!   stderr: true
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RoostConfig {
    pub version: Option<String>,
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Credentials and endpoint for the upstream API.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    /// Bearer token sent as `Authorization`.
    pub auth_token: String,
    /// Value of the `ct0` cookie, echoed in `x-csrf-token`.
    pub csrf_token: String,
    /// Full `Cookie` header for the session.
    pub cookie: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Storage server location plus the logical database and index collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_url")]
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
            database: default_database(),
            index: default_index(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// `text` or `json`.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub stderr: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_base_url() -> String {
    "https://twitter.com".into()
}
fn default_cache_url() -> String {
    "sqlite://roost-cache.db?mode=rwc".into()
}
fn default_database() -> String {
    "ai-cache".into()
}
fn default_index() -> String {
    "index".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (files + env overrides).
pub struct RoostConfigLoader {
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
}

impl Default for RoostConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RoostConfigLoader {
    /// Start with no files; `ROOST__` env overrides are always applied last.
    ///
    /// ```
    /// use roost_config::RoostConfigLoader;
    ///
    /// let cfg = RoostConfigLoader::new()
    ///     .with_yaml_str("twitter: { auth_token: a, csrf_token: b, cookie: c }")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.twitter.base_url, "https://twitter.com");
    /// assert_eq!(cfg.cache.database, "ai-cache");
    /// assert_eq!(cfg.cache.index, "index");
    /// ```
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is skipped when absent, for env-only deployments.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use roost_config::RoostConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_COOKIE", "auth_token=xyz; ct0=abc"); }
    ///
    /// let cfg = RoostConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// twitter:
    ///   auth_token: "bearer"
    ///   csrf_token: "abc"
    ///   cookie: "${DOC_COOKIE}"
    /// cache:
    ///   database: "scratch"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(cfg.twitter.cookie, "auth_token=xyz; ct0=abc");
    /// assert_eq!(cfg.cache.database, "scratch");
    /// assert_eq!(cfg.cache.index, "index");
    ///
    /// unsafe { std::env::remove_var("DOC_COOKIE"); }
    /// ```
    pub fn load(self) -> Result<RoostConfig, ConfigError> {
        let mut builder = Config::builder();
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix("ROOST")
                .separator("__")
                .try_parsing(true),
        );

        let mut v: Value = builder.build()?.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
