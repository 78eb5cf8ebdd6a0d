//! Environment-scoped settings and override precedence
//!
//! Each environment has one flat TOML file under the config directory
//! (`config/dev.toml`, `config/qa.toml`, ...). The file is read once per
//! resolver; every later `load` is a no-op. Settings that the operator may
//! override per run are resolved through [`Precedence`]:
//!
//! ```text
//! explicit override  >  process environment variable  >  config file
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Environment name used when neither an override nor `ENV` is present.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// File-backed settings for a single environment.
#[derive(Debug, Clone)]
struct LoadedConfig {
    environment: String,
    path: PathBuf,
    values: BTreeMap<String, String>,
}

/// Loads environment settings at most once and serves the file tier.
#[derive(Debug)]
pub struct ConfigResolver {
    config_dir: PathBuf,
    loaded: OnceCell<LoadedConfig>,
}

impl ConfigResolver {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            loaded: OnceCell::new(),
        }
    }

    /// Load `<config_dir>/<environment>.toml`.
    ///
    /// Only the first successful call reads anything. A later call with a
    /// different environment name keeps the original settings and logs a
    /// warning.
    pub fn load(&self, environment: &str) -> E2eResult<()> {
        if let Some(existing) = self.loaded.get() {
            if existing.environment != environment {
                warn!(
                    loaded = %existing.environment,
                    requested = %environment,
                    "Config already loaded; ignoring request for a different environment"
                );
            }
            return Ok(());
        }

        let loaded = self
            .loaded
            .get_or_try_init(|| read_environment_file(&self.config_dir, environment))?;

        info!(
            "Loaded {} setting(s) for '{}' from {}",
            loaded.values.len(),
            loaded.environment,
            loaded.path.display()
        );
        Ok(())
    }

    /// Whether a config file has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Name of the environment whose file was loaded, if any.
    pub fn environment(&self) -> Option<&str> {
        self.loaded.get().map(|c| c.environment.as_str())
    }

    /// File value for `key`, or `None` when absent or nothing is loaded.
    pub fn get(&self, key: &str) -> Option<String> {
        self.loaded.get().and_then(|c| c.values.get(key).cloned())
    }

    /// File value for `key`, falling back to `default`.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// File value for `key` parsed as an unsigned integer.
    ///
    /// Absent keys yield `Ok(None)`; present but malformed values are a
    /// configuration error.
    pub fn get_u64(&self, key: &str) -> E2eResult<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
                E2eError::Configuration(format!("{} must be a whole number, got '{}'", key, raw))
            }),
        }
    }
}

fn read_environment_file(dir: &Path, environment: &str) -> E2eResult<LoadedConfig> {
    let path = dir.join(format!("{}.toml", environment));
    debug!("Reading environment config {}", path.display());

    let content = std::fs::read_to_string(&path).map_err(|e| {
        E2eError::Configuration(format!(
            "Unable to load environment config: {} ({}): {}",
            environment,
            path.display(),
            e
        ))
    })?;

    let table: toml::Table = toml::from_str(&content).map_err(|e| {
        E2eError::Configuration(format!(
            "Unable to parse environment config: {} ({}): {}",
            environment,
            path.display(),
            e
        ))
    })?;

    let mut values = BTreeMap::new();
    for (key, value) in table {
        let text = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            other => {
                return Err(E2eError::Configuration(format!(
                    "{} in {} must be a scalar, got {}",
                    key,
                    path.display(),
                    other.type_str()
                )))
            }
        };
        values.insert(key, text);
    }

    Ok(LoadedConfig {
        environment: environment.to_string(),
        path,
        values,
    })
}

/// Settings the operator can override per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Environment,
    Browser,
    Headless,
    BaseUrl,
    ScreenshotEveryStep,
    WebDriverUrl,
}

impl Setting {
    /// Process environment variable consulted for this setting.
    pub fn env_var(&self) -> &'static str {
        match self {
            Setting::Environment => "ENV",
            Setting::Browser => "BROWSER",
            Setting::Headless => "HEADLESS",
            Setting::BaseUrl => "BASE_URL",
            Setting::ScreenshotEveryStep => "SCREENSHOT_EVERY_STEP",
            Setting::WebDriverUrl => "WEBDRIVER_URL",
        }
    }

    /// Config file key providing the default, if the setting has one.
    pub fn file_key(&self) -> Option<&'static str> {
        match self {
            Setting::Environment | Setting::ScreenshotEveryStep => None,
            Setting::Browser => Some("BROWSER"),
            Setting::Headless => Some("HEADLESS"),
            Setting::BaseUrl => Some("APP_URL"),
            Setting::WebDriverUrl => Some("WEBDRIVER_URL"),
        }
    }
}

/// Explicit per-run overrides, typically from the runner's command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    values: HashMap<Setting, String>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, setting: Setting, value: impl Into<String>) -> Self {
        self.set(setting, value);
        self
    }

    pub fn set(&mut self, setting: Setting, value: impl Into<String>) {
        self.values.insert(setting, value.into());
    }

    pub fn get(&self, setting: Setting) -> Option<&str> {
        self.values.get(&setting).map(String::as_str)
    }
}

/// Source of process environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Assembles the override chain for a single lookup.
pub struct Precedence<'a> {
    overrides: &'a Overrides,
    env: &'a dyn EnvSource,
    config: &'a ConfigResolver,
}

impl<'a> Precedence<'a> {
    pub fn new(
        overrides: &'a Overrides,
        env: &'a dyn EnvSource,
        config: &'a ConfigResolver,
    ) -> Self {
        Self { overrides, env, config }
    }

    /// Highest-precedence value present for `setting`.
    ///
    /// A tier counts as present when it is set at all, even to an empty
    /// string; blank values are rejected by the caller where that matters.
    pub fn resolve(&self, setting: Setting) -> Option<String> {
        if let Some(value) = self.overrides.get(setting) {
            return Some(value.to_string());
        }
        if let Some(value) = self.env.var(setting.env_var()) {
            return Some(value);
        }
        setting.file_key().and_then(|key| self.config.get(key))
    }

    /// Like [`resolve`](Self::resolve) with a fallback for the bottom tier.
    pub fn resolve_or(&self, setting: Setting, default: &str) -> String {
        self.resolve(setting).unwrap_or_else(|| default.to_string())
    }

    /// Boolean setting; only a case-insensitive `true` is true.
    pub fn resolve_flag(&self, setting: Setting) -> bool {
        self.resolve(setting).map(|v| parse_flag(&v)).unwrap_or(false)
    }
}

/// Lenient boolean parsing: `"true"` in any case is true, anything else false.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_env(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(format!("{}.toml", name)), body).unwrap();
    }

    fn resolver_with(files: &[(&str, &str)]) -> (TempDir, ConfigResolver) {
        let tmp = TempDir::new().unwrap();
        for (name, body) in files {
            write_env(tmp.path(), name, body);
        }
        let resolver = ConfigResolver::new(tmp.path());
        (tmp, resolver)
    }

    #[test]
    fn test_load_reads_scalars_as_strings() {
        let (_tmp, config) = resolver_with(&[(
            "dev",
            "BROWSER = \"chrome\"\nHEADLESS = true\nVISIBILITY_TIMEOUT = 10\n",
        )]);
        config.load("dev").unwrap();

        assert_eq!(config.get("BROWSER").as_deref(), Some("chrome"));
        assert_eq!(config.get("HEADLESS").as_deref(), Some("true"));
        assert_eq!(config.get_u64("VISIBILITY_TIMEOUT").unwrap(), Some(10));
    }

    #[test]
    fn test_missing_key_is_absent_not_error() {
        let (_tmp, config) = resolver_with(&[("dev", "BROWSER = \"chrome\"\n")]);
        config.load("dev").unwrap();

        assert_eq!(config.get("NOPE"), None);
        assert_eq!(config.get_or("NOPE", "fallback"), "fallback");
        assert_eq!(config.get_u64("NOPE").unwrap(), None);
    }

    #[test]
    fn test_second_load_with_other_environment_keeps_first() {
        let (_tmp, config) = resolver_with(&[
            ("dev", "APP_URL = \"https://dev.example\"\n"),
            ("qa", "APP_URL = \"https://qa.example\"\n"),
        ]);
        config.load("dev").unwrap();
        config.load("qa").unwrap();

        assert_eq!(config.environment(), Some("dev"));
        assert_eq!(config.get("APP_URL").as_deref(), Some("https://dev.example"));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let (_tmp, config) = resolver_with(&[]);
        let err = config.load("staging").unwrap_err();

        assert!(matches!(err, E2eError::Configuration(ref msg) if msg.contains("staging")));
        assert!(!config.is_loaded());
    }

    #[test]
    fn test_corrupt_file_is_configuration_error() {
        let (_tmp, config) = resolver_with(&[("dev", "BROWSER = = chrome")]);
        assert!(matches!(config.load("dev"), Err(E2eError::Configuration(_))));
    }

    #[test]
    fn test_malformed_number_is_configuration_error() {
        let (_tmp, config) = resolver_with(&[("dev", "FLUENT_TIMEOUT = \"soon\"\n")]);
        config.load("dev").unwrap();
        assert!(config.get_u64("FLUENT_TIMEOUT").is_err());
    }

    #[test]
    fn test_precedence_override_beats_env_beats_file() {
        let (_tmp, config) = resolver_with(&[("dev", "BROWSER = \"chrome\"\n")]);
        config.load("dev").unwrap();

        let mut env = HashMap::new();
        let overrides = Overrides::new();
        assert_eq!(
            Precedence::new(&overrides, &env, &config).resolve(Setting::Browser).as_deref(),
            Some("chrome")
        );

        env.insert("BROWSER".to_string(), "firefox".to_string());
        assert_eq!(
            Precedence::new(&overrides, &env, &config).resolve(Setting::Browser).as_deref(),
            Some("firefox")
        );

        let overrides = Overrides::new().with(Setting::Browser, "edge");
        assert_eq!(
            Precedence::new(&overrides, &env, &config).resolve(Setting::Browser).as_deref(),
            Some("edge")
        );
    }

    #[test]
    fn test_precedence_absent_everywhere_is_none() {
        let (_tmp, config) = resolver_with(&[("dev", "BROWSER = \"chrome\"\n")]);
        config.load("dev").unwrap();
        let env: HashMap<String, String> = HashMap::new();
        let overrides = Overrides::new();
        let precedence = Precedence::new(&overrides, &env, &config);

        assert_eq!(precedence.resolve(Setting::BaseUrl), None);
        assert!(!precedence.resolve_flag(Setting::ScreenshotEveryStep));
    }

    #[test]
    fn test_base_url_reads_app_url_from_file() {
        let (_tmp, config) = resolver_with(&[("dev", "APP_URL = \"https://calc.example\"\n")]);
        config.load("dev").unwrap();
        let env: HashMap<String, String> = HashMap::new();
        let overrides = Overrides::new();

        assert_eq!(
            Precedence::new(&overrides, &env, &config).resolve(Setting::BaseUrl).as_deref(),
            Some("https://calc.example")
        );
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag(""));
    }
}
