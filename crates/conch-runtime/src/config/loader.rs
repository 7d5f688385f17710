//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//!
//! 1. `ConchConfig::default()`
//! 2. `conch.<profile>.<ext>` next to the main file
//! 3. the main file, `conch.<ext>` or `config.<ext>`
//! 4. `CONCH_*` environment variables, `__` separating nested keys
//! 5. values set on the loader
//!
//! `<ext>` is `toml` with the `toml-config` feature (default) and
//! `yaml`/`yml` with `yaml-config`. Files are looked up in the search paths;
//! without explicit ones, the working directory and `<user config dir>/conch`.
//!
//! ```text
//! CONCH_LOGGING__LEVEL=debug              logging.level = "debug"
//! CONCH_CONSOLE__LOG_RETURN_VALUES=false  console.log_return_values = false
//! CONCH_RUNTIME__PROMPT_SYMBOL="$ "       runtime.prompt_symbol = "$ "
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .set("console.history_limit", 500)
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use figment::providers::{Env, Serialized};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::ConchConfig;

const ENV_PREFIX: &str = "CONCH_";
const BASE_NAMES: [&str; 2] = ["conch", "config"];

/// Selects the `conch.<profile>.<ext>` file merged under the main file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// `CONCH_PROFILE`, or development.
    pub fn from_env() -> Self {
        std::env::var(format!("{ENV_PREFIX}PROFILE"))
            .map(|name| Self::from(name.as_str()))
            .unwrap_or_default()
    }
}

impl From<&str> for Profile {
    fn from(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            "production" | "prod" => Self::Production,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File formats compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl ConfigFormat {
    const ENABLED: &'static [Self] = &[
        #[cfg(feature = "toml-config")]
        Self::Toml,
        #[cfg(feature = "yaml-config")]
        Self::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    #[allow(unused_variables)]
    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

/// Builds a [`ConchConfig`] from defaults, files, environment and overrides.
pub struct ConfigLoader {
    profile: Profile,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            file: None,
            env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::from(profile.into().as_str());
        self
    }

    /// Adds a directory to look for configuration files in.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/conch`.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("conch")),
            None => self,
        }
    }

    /// Uses exactly this file; no search, no profile file.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers a whole configuration above every other source.
    pub fn merge(mut self, config: ConchConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Overrides one dotted key, e.g. `set("logging.level", "debug")`.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::global(key, value));
        self
    }

    /// The files that will be merged, lowest priority first.
    pub fn discover(&self) -> ConfigResult<Vec<PathBuf>> {
        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            if ConfigFormat::of(path).is_none() {
                return Err(ConfigError::UnsupportedFormat(path.clone()));
            }
            return Ok(vec![path.clone()]);
        }

        let directories = if self.search_paths.is_empty() {
            default_search_paths()
        } else {
            self.search_paths.clone()
        };

        for directory in &directories {
            for format in ConfigFormat::ENABLED {
                for ext in format.extensions() {
                    for base in BASE_NAMES {
                        let main = directory.join(format!("{base}.{ext}"));
                        if !main.exists() {
                            continue;
                        }
                        let profiled =
                            directory.join(format!("{base}.{}.{ext}", self.profile.as_str()));
                        let mut files = Vec::with_capacity(2);
                        if profiled.exists() {
                            files.push(profiled);
                        }
                        files.push(main);
                        return Ok(files);
                    }
                }
            }
        }

        debug!(paths = ?directories, "no configuration file found");
        Ok(Vec::new())
    }

    pub fn load(self) -> ConfigResult<ConchConfig> {
        let mut figment = Figment::from(Serialized::defaults(ConchConfig::default()));
        for path in self.discover()? {
            info!(path = %path.display(), "loading configuration file");
            if let Some(format) = ConfigFormat::of(&path) {
                figment = format.merge(figment, &path);
            }
        }

        if self.env {
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        let config: ConchConfig = figment.merge(self.overrides).extract()?;
        debug!(profile = %self.profile, level = %config.logging.level, "configuration loaded");
        Ok(config)
    }
}

fn default_search_paths() -> Vec<PathBuf> {
    std::env::current_dir()
        .ok()
        .into_iter()
        .chain(dirs::config_dir().map(|dir| dir.join("conch")))
        .collect()
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<ConchConfig> {
    ConfigLoader::new().load()
}

/// Loads one file plus environment variables.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<ConchConfig> {
    ConfigLoader::new().file(path).load()
}
