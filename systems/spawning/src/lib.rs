#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Natural spawning of custom definitions near players.

use horde_core::{Command, PlayerSnapshot, TileCoord, WeightTable};
use horde_definitions::{DefinitionRegistry, EntityDefinition};
use horde_scripting::{HookCall, HookDispatcher};
use rand::Rng;

/// Spawn cap applied when no configuration says otherwise.
pub const DEFAULT_MAX_SPAWNS: u32 = 5;
/// Spawn rate applied when no configuration says otherwise.
pub const DEFAULT_SPAWN_RATE: u32 = 600;
/// Largest spawn cap an administrator may configure.
pub const MAX_SPAWN_CAP: u32 = 200;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    max_spawns: u32,
    spawn_rate: u32,
}

impl Config {
    /// Creates a new configuration from a per-player spawn cap and the
    /// inverse chance of a definition spawning on a given tick.
    ///
    /// A spawn rate of zero is treated as one.
    #[must_use]
    pub const fn new(max_spawns: u32, spawn_rate: u32) -> Self {
        Self {
            max_spawns,
            spawn_rate: if spawn_rate == 0 { 1 } else { spawn_rate },
        }
    }

    /// Players with at least this many active entities get no spawns.
    #[must_use]
    pub const fn max_spawns(&self) -> u32 {
        self.max_spawns
    }

    /// Inverse chance of a definition spawning on a given tick.
    #[must_use]
    pub const fn spawn_rate(&self) -> u32 {
        self.spawn_rate
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPAWNS, DEFAULT_SPAWN_RATE)
    }
}

/// Pure system that decides which definition spawns naturally near a player.
#[derive(Debug, Default)]
pub struct Spawning {
    config: Config,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Configuration currently in effect.
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// Replaces the per-player spawn cap.
    pub fn set_max_spawns(&mut self, max_spawns: u32) {
        self.config = Config::new(max_spawns, self.config.spawn_rate);
    }

    /// Replaces the engine-wide spawn rate.
    pub fn set_spawn_rate(&mut self, spawn_rate: u32) {
        self.config = Config::new(self.config.max_spawns, spawn_rate);
    }

    /// Picks the definition to spawn on `tile` near `player`, if any.
    ///
    /// Every definition that spawns naturally rolls its own spawn rate and
    /// must be allowed by its spawn check hook. One of the surviving
    /// candidates is chosen uniformly. Commands queued by the check hooks are
    /// appended to `out`.
    pub fn choose<'r, R>(
        &self,
        player: &PlayerSnapshot,
        tile: TileCoord,
        registry: &'r DefinitionRegistry,
        dispatcher: &mut HookDispatcher,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) -> Option<&'r EntityDefinition>
    where
        R: Rng + ?Sized,
    {
        if player.active_entities >= self.config.max_spawns {
            return None;
        }

        let candidates: WeightTable<&EntityDefinition> = registry
            .entities()
            .iter()
            .filter(|definition| definition.spawning().should_spawn)
            .filter(|definition| {
                let rate = definition
                    .spawning()
                    .spawn_rate_override
                    .unwrap_or(self.config.spawn_rate)
                    .max(1);
                rng.gen_range(0..rate) == 0
            })
            .filter(|definition| {
                dispatcher.invoke_flag(
                    definition.name(),
                    definition.hooks(),
                    &HookCall::CheckSpawn { player, tile },
                    out,
                )
            })
            .map(|definition| (definition, 1))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let chosen = horde_system_selection::pick(&candidates, rng).ok().copied();
        if let Some(definition) = chosen {
            tracing::debug!(
                definition = definition.name(),
                player = %player.name,
                x = tile.x(),
                y = tile.y(),
                "natural spawn chosen"
            );
        }
        chosen
    }
}
