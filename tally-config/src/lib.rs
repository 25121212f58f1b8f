//! Loader for tally configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: serde defaults, the YAML file (optional unless
//! given explicitly), `TALLY_`-prefixed environment variables using `__` for
//! nesting (`TALLY_VERIFY__THRESHOLD=25`), and finally `${VAR}` expansion in
//! every string value. Command-line flags are layered on top by the binary.
//!
//! ```yaml
//! twitter:
//!   bearer_token: "${TWITTER_BEARER_TOKEN}"
//! scan:
//!   conversation_id: "1473394217284255744"
//!   categories:
//!     - { keyword: catalandao, label: catalan, valid_label: catalanDAO }
//!     - { keyword: dataverse, label: dataverse, valid_label: dataverse }
//! verify:
//!   threshold: 10
//! ```
use config::{Config, Environment, File};
pub use config::ConfigError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tally_common::observability::LogFormat;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_CONVERSATION_ID: &str = "1473394217284255744";
pub const DEFAULT_THRESHOLD: u64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub twitter: TwitterConfig,
    pub scan: ScanConfig,
    pub verify: VerifyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub bearer_token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            base_url: "https://api.twitter.com".into(),
            timeout_secs: 15,
        }
    }
}

impl TwitterConfig {
    /// Token usable for requests: blank values and placeholders left
    /// unresolved by env expansion count as missing.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.contains("${"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pagination {
    #[default]
    NextToken,
    UntilId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    pub keyword: String,
    /// Used in `total <label> voters found`.
    pub label: String,
    /// Used in `<valid_label> valid voters`; defaults to `label`.
    #[serde(default)]
    pub valid_label: Option<String>,
}

impl CategoryConfig {
    pub fn valid_label(&self) -> &str {
        self.valid_label.as_deref().unwrap_or(&self.label)
    }
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            keyword: "catalandao".into(),
            label: "catalan".into(),
            valid_label: Some("catalanDAO".into()),
        },
        CategoryConfig {
            keyword: "dataverse".into(),
            label: "dataverse".into(),
            valid_label: None,
        },
    ]
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub conversation_id: String,
    pub page_size: u32,
    pub pagination: Pagination,
    pub categories: Vec<CategoryConfig>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            conversation_id: DEFAULT_CONVERSATION_ID.into(),
            page_size: 100,
            pagination: Pagination::default(),
            categories: default_categories(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub qps: f64,
    pub burst: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self { qps: 1.0, burst: 1 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub threshold: u64,
    pub batch_size: usize,
    pub rate: RateConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            batch_size: 50,
            rate: RateConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: false,
            filter: "info".into(),
        }
    }
}

impl TallyConfig {
    /// Structural checks the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.categories.len() != 2 {
            return Err(ConfigError::Message(format!(
                "scan.categories must list exactly two keyword categories, found {}",
                self.scan.categories.len()
            )));
        }
        if !(self.verify.rate.qps.is_finite() && self.verify.rate.qps > 0.0) {
            return Err(ConfigError::Message(format!(
                "verify.rate.qps must be a positive number, got {}",
                self.verify.rate.qps
            )));
        }
        Ok(())
    }
}

// Env overrides are parsed eagerly, so a numeric id arrives as a number.
fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
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

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TallyConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TallyConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TallyConfigLoader {
    /// Start with `TALLY_` env overrides only; every field has a default.
    ///
    /// ```
    /// use tally_config::TallyConfigLoader;
    ///
    /// let config = TallyConfigLoader::new()
    ///     .with_yaml_str("verify:\n  threshold: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.verify.threshold, 3);
    /// assert_eq!(config.verify.batch_size, 50);
    /// assert_eq!(config.scan.categories.len(), 2);
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(
            Environment::with_prefix("TALLY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file that must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is merged only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use tally_config::{Pagination, TallyConfigLoader};
    ///
    /// let cfg = TallyConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// scan:
    ///   conversation_id: 42
    ///   pagination: until_id
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.scan.conversation_id, "42");
    /// assert_eq!(cfg.scan.pagination, Pagination::UntilId);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use tally_config::TallyConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_BEARER", "injected-from-env"); }
    ///
    /// let config = TallyConfigLoader::new()
    ///     .with_yaml_str("twitter:\n  bearer_token: \"${DOC_BEARER}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.twitter.bearer_token(), Some("injected-from-env"));
    ///
    /// unsafe { std::env::remove_var("DOC_BEARER"); }
    /// ```
    pub fn load(self) -> Result<TallyConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: TallyConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
