//! Engine-wide settings persisted as TOML.

use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use horde_core::ItemId;
use horde_system_spawning::{DEFAULT_MAX_SPAWNS, DEFAULT_SPAWN_RATE, MAX_SPAWN_CAP};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host items that still drop from entities whose definition overrides loot:
/// coins, hearts, stars and the souls of light and night.
const DEFAULT_LOOT_PASSTHROUGH: [ItemId; 8] = [58, 71, 72, 73, 74, 184, 520, 521];

/// Settings that govern spawning and loot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Players with at least this many active entities get no natural spawns.
    pub max_spawns: u32,
    /// Inverse chance of a definition spawning naturally on a given tick.
    pub spawn_rate: u32,
    /// Host items that override-loot definitions still let drop.
    pub loot_passthrough: BTreeSet<ItemId>,
    /// Seed for every random decision; a fresh seed is drawn when unset.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_spawns: DEFAULT_MAX_SPAWNS,
            spawn_rate: DEFAULT_SPAWN_RATE,
            loot_passthrough: DEFAULT_LOOT_PASSTHROUGH.into_iter().collect(),
            seed: None,
        }
    }
}

/// Failures raised while reading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to access `{}`", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration is not valid TOML for [`EngineConfig`].
    #[error("failed to parse engine configuration")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be encoded.
    #[error("failed to encode engine configuration")]
    Encode(#[from] toml::ser::Error),
    /// A value is outside its permitted range.
    #[error("invalid engine configuration: {reason}")]
    Invalid {
        /// Which value is wrong.
        reason: String,
    },
}

impl EngineConfig {
    /// Parses and validates a configuration document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration at `path`, falling back to the defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "engine configuration absent");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Encodes the configuration as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml_string()?;
        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_spawns > MAX_SPAWN_CAP {
            return Err(ConfigError::Invalid {
                reason: format!("max_spawns must not exceed {MAX_SPAWN_CAP}"),
            });
        }
        if self.spawn_rate == 0 {
            return Err(ConfigError::Invalid {
                reason: "spawn_rate must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}
