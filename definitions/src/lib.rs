#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Entity and campaign definitions together with the registry that owns them.
//!
//! Definitions are parsed from a [`DefinitionSource`], validated one at a time,
//! and have their script hooks resolved through a
//! [`horde_scripting::ScriptHost`]. A malformed definition is rejected on its
//! own; its siblings still load.

mod campaign;
mod entity;
mod registry;
mod source;

use std::path::PathBuf;

use horde_core::{ArchetypeId, BuffId};
use horde_scripting::ScriptError;
use thiserror::Error;

pub use campaign::{CampaignDefinition, Wave};
pub use entity::{BaseOverride, EntityDefinition, LootEntry, LootTable, SpawnSettings};
pub use registry::{DefinitionKind, DefinitionRegistry, LoadReport, Rejection};
pub use source::{DefinitionSource, InMemorySource, JsonDirectorySource, RawDefinitions, SourceError};

/// Reasons a single definition is rejected during loading.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    /// The entry could not be decoded into a definition.
    #[error("malformed definition: {reason}")]
    Malformed {
        /// Decoder diagnostic.
        reason: String,
    },
    /// The name is empty or whitespace.
    #[error("name is blank")]
    BlankName,
    /// The name parses as a number and would be mistaken for an archetype.
    #[error("name `{name}` cannot be a number")]
    NumericName {
        /// Offending name.
        name: String,
    },
    /// Another definition of the same kind already uses the name.
    #[error("name `{name}` is already defined")]
    DuplicateName {
        /// Offending name.
        name: String,
    },
    /// The base archetype lies outside the host's archetype range.
    #[error("base type {base_type} is outside [{min}, {limit})")]
    BaseTypeOutOfRange {
        /// Offending archetype.
        base_type: ArchetypeId,
        /// Smallest accepted archetype.
        min: ArchetypeId,
        /// Exclusive upper bound of accepted archetypes.
        limit: ArchetypeId,
    },
    /// The referenced script is unknown to the script host.
    #[error("script `{}` does not exist", path.display())]
    MissingScript {
        /// Path the definition referenced.
        path: PathBuf,
    },
    /// The referenced script failed to load.
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// A buff immunity names a buff the host does not have.
    #[error("buff immunity {buff} is not a valid buff type")]
    InvalidBuff {
        /// Offending buff identifier.
        buff: BuffId,
    },
    /// A numeric override that must not be negative is negative.
    #[error("{field} must be non-negative")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A loot entry has a drop chance outside `[0, 1]`.
    #[error("loot entry `{item}` has chance {chance} outside [0, 1]")]
    LootChance {
        /// Item of the offending entry.
        item: String,
        /// Offending chance.
        chance: f64,
    },
    /// A loot entry has a minimum stack size above its maximum.
    #[error("loot entry `{item}` has stack range {min}..={max}")]
    LootStack {
        /// Item of the offending entry.
        item: String,
        /// Minimum stack size.
        min: u32,
        /// Maximum stack size.
        max: u32,
    },
    /// A spawn rate is zero.
    #[error("spawn rate must be at least 1")]
    SpawnRate,
    /// A campaign declares no waves.
    #[error("campaign has no waves")]
    NoWaves,
    /// A wave declares an invalid spawn rate.
    #[error("wave {wave} has spawn rate 0")]
    WaveSpawnRate {
        /// One-based number of the offending wave.
        wave: usize,
    },
    /// A wave's weighted entity table sums to zero.
    #[error("wave {wave} has no spawnable entries")]
    EmptyWeights {
        /// One-based number of the offending wave.
        wave: usize,
    },
}
