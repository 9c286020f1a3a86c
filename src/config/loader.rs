//! Finding, reading and writing `ringin.toml`.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "ringin.toml";

/// Names an explicit config file; checked before any other location.
const CONFIG_PATH_ENV: &str = "RINGIN_CONFIG";

const ENV_PORT: &str = "RINGIN_SERIAL_PORT";
const ENV_BAUD: &str = "RINGIN_SERIAL_BAUD_RATE";
const ENV_PROGRAM: &str = "RINGIN_PROGRAM_COMMAND";
const ENV_LOG_LEVEL: &str = "RINGIN_LOG_LEVEL";

/// A validated configuration and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl ConfigLoader {
    /// Search the standard locations, fall back to defaults, then apply
    /// `RINGIN_*` overrides and validate.
    ///
    /// Locations, first hit wins:
    /// 1. the file named by `RINGIN_CONFIG`
    /// 2. `./ringin.toml`
    /// 3. `ringin.toml` in the platform config directory
    ///    (`~/.config/ringin/` on Linux)
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();
        let config = match &config_path {
            Some(path) => read_config(path)?,
            None => Config::default(),
        };
        Self::finish(config_path, config)
    }

    /// Load one specific file. A missing file is an error here.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let config = read_config(&path)?;
        Self::finish(Some(path), config)
    }

    /// Built-in defaults plus `RINGIN_*` overrides, ignoring any config file.
    pub fn with_defaults() -> ConfigResult<Self> {
        Self::finish(None, Config::default())
    }

    fn finish(config_path: Option<PathBuf>, mut config: Config) -> ConfigResult<Self> {
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(Self {
            config_path,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Write the configuration as pretty TOML, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        write_config(&self.config, path.as_ref())
    }
}

/// First existing config file among the standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let local = Some(PathBuf::from(CONFIG_FILE_NAME));

    [explicit, local, get_default_config_path()]
        .into_iter()
        .flatten()
        .find(|path| path.is_file())
}

/// Platform config directory for ringin.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ringin").map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn read_config(path: &Path) -> ConfigResult<Config> {
    let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    Ok(toml::from_str(&text)?)
}

fn write_config(config: &Config, path: &Path) -> ConfigResult<()> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(write_error)
}

fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(port) = std::env::var(ENV_PORT) {
        config.serial.port = port;
    }
    if let Ok(baud) = std::env::var(ENV_BAUD) {
        config.serial.baud_rate = baud
            .trim()
            .parse()
            .map_err(|_| ConfigError::env_parse(ENV_BAUD, format!("{baud:?} is not a baud rate")))?;
    }
    if let Ok(command) = std::env::var(ENV_PROGRAM) {
        config.program.command = command;
    }
    if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    Ok(())
}
