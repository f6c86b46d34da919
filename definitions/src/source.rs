//! Where raw definitions come from.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::Value;
use thiserror::Error;

/// File holding entity definitions inside a [`JsonDirectorySource`].
const ENTITIES_FILE: &str = "npcs.json";
/// File holding campaign definitions inside a [`JsonDirectorySource`].
const CAMPAIGNS_FILE: &str = "invasions.json";

/// Undecoded definition entries, kept as values so a single malformed entry
/// can be rejected without losing its siblings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawDefinitions {
    /// Entity definition entries in document order.
    pub entities: Vec<Value>,
    /// Campaign definition entries in document order.
    pub campaigns: Vec<Value>,
}

/// Failures that prevent a source from producing any definitions.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A definition file exists but could not be read or written.
    #[error("failed to access `{}`", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A definition file is not a JSON array.
    #[error("`{}` is not a JSON array of definitions", path.display())]
    Format {
        /// File that failed.
        path: PathBuf,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// Loaded definitions could not be encoded back into values.
    #[error("failed to encode definitions")]
    Encode(#[from] serde_json::Error),
}

/// Provider of raw definition entries.
pub trait DefinitionSource {
    /// Reads every entity and campaign entry.
    fn load(&self) -> Result<RawDefinitions, SourceError>;
}

/// Directory holding `npcs.json` and `invasions.json`.
///
/// A missing file contributes no entries.
#[derive(Clone, Debug)]
pub struct JsonDirectorySource {
    root: PathBuf,
}

impl JsonDirectorySource {
    /// Creates a source reading from the provided directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the source reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the provided entries back to the directory, pretty-printed.
    pub fn save(&self, definitions: &RawDefinitions) -> Result<(), SourceError> {
        fs::create_dir_all(&self.root).map_err(|source| SourceError::Io {
            path: self.root.clone(),
            source,
        })?;
        write_array(&self.root.join(ENTITIES_FILE), &definitions.entities)?;
        write_array(&self.root.join(CAMPAIGNS_FILE), &definitions.campaigns)
    }
}

impl DefinitionSource for JsonDirectorySource {
    fn load(&self) -> Result<RawDefinitions, SourceError> {
        Ok(RawDefinitions {
            entities: read_array(&self.root.join(ENTITIES_FILE))?,
            campaigns: read_array(&self.root.join(CAMPAIGNS_FILE))?,
        })
    }
}

fn read_array(path: &Path) -> Result<Vec<Value>, SourceError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "definition file absent");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(SourceError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&contents).map_err(|source| SourceError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn write_array(path: &Path, entries: &[Value]) -> Result<(), SourceError> {
    let encoded = serde_json::to_string_pretty(entries)?;
    fs::write(path, encoded).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Source serving entries held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    definitions: RawDefinitions,
}

impl InMemorySource {
    /// Creates a source serving the provided entries.
    #[must_use]
    pub fn new(definitions: RawDefinitions) -> Self {
        Self { definitions }
    }

    /// Creates a source from entity and campaign entries.
    #[must_use]
    pub fn from_values(entities: Vec<Value>, campaigns: Vec<Value>) -> Self {
        Self::new(RawDefinitions {
            entities,
            campaigns,
        })
    }

    /// Replaces the served entries, as an edit to the backing files would.
    pub fn replace(&mut self, definitions: RawDefinitions) {
        self.definitions = definitions;
    }
}

impl DefinitionSource for InMemorySource {
    fn load(&self) -> Result<RawDefinitions, SourceError> {
        Ok(self.definitions.clone())
    }
}
