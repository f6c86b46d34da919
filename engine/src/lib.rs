#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Orchestration engine that drives custom entities and campaigns.
//!
//! The [`Engine`] owns the definition registry, the script dispatcher, the
//! replacement bookkeeping and the campaign state machine. The host calls
//! [`Engine::on_tick`] once per simulation tick and forwards entity
//! lifecycle notifications through the remaining `on_*` entry points. Every
//! mutation reaches the host as a [`Command`] executed through
//! [`Host::apply`].

mod admin;
mod commands;
mod config;

use std::{path::PathBuf, time::Instant};

use crossbeam_channel::{Receiver, Sender};
use horde_core::{
    Command, EntityKey, EntitySlot, EntitySnapshot, Event, Host, ItemId, MessageColor,
    PlayerSlot, TileCoord, Vec2, TILE_SIZE,
};
use horde_definitions::{
    DefinitionRegistry, DefinitionSource, EntityDefinition, LoadReport, SourceError,
};
use horde_scripting::{HookCall, HookDispatcher, ScriptHost};
use horde_system_campaign::WaveStateMachine;
use horde_system_replacement::{CustomEntities, PlayerHitTracker};
use horde_system_spawn_location::{find_clear_tile, SpawnGeometry, SpawnLocationSearch};
use horde_system_spawning::Spawning;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub use admin::{AdminHandle, AdminRequest, EngineGone};
pub use commands::{AdminCommand, CommandInputError, Issuer, MAX_SPAWN_AMOUNT};
pub use config::{ConfigError, EngineConfig};

use commands::Parsed;

/// Reply sent after a successful reload.
const RELOADED_MESSAGE: &str = "[Horde] Reloaded campaigns and entities!";
/// Tile radius searched around an administrator spawning entities by hand.
const MANUAL_SPAWN_RADIUS: i32 = 50;

/// Failures that abort a reload and leave the engine as it was.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The configuration file could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The definition source could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Explicit context replacing every process-wide manager.
pub struct Engine {
    config: EngineConfig,
    config_path: Option<PathBuf>,
    source: Box<dyn DefinitionSource>,
    scripts: Box<dyn ScriptHost>,
    registry: DefinitionRegistry,
    dispatcher: HookDispatcher,
    custom: CustomEntities,
    hits: PlayerHitTracker,
    campaign: WaveStateMachine,
    spawning: Spawning,
    rng: ChaCha8Rng,
    admin_tx: Sender<AdminRequest>,
    admin_rx: Receiver<AdminRequest>,
}

impl Engine {
    /// Creates an engine with an empty registry.
    ///
    /// Call [`Engine::reload`] to read the definitions. A configured seed
    /// makes every random decision reproducible.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        source: Box<dyn DefinitionSource>,
        scripts: Box<dyn ScriptHost>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let spawning = Spawning::new(horde_system_spawning::Config::new(
            config.max_spawns,
            config.spawn_rate,
        ));
        let (admin_tx, admin_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            config_path: None,
            source,
            scripts,
            registry: DefinitionRegistry::new(),
            dispatcher: HookDispatcher::new(),
            custom: CustomEntities::new(),
            hits: PlayerHitTracker::new(),
            campaign: WaveStateMachine::new(),
            spawning,
            rng,
            admin_tx,
            admin_rx,
        }
    }

    /// Re-reads the configuration from `path` on every reload.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Configuration currently in effect.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loaded definitions.
    #[must_use]
    pub const fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Campaign state machine.
    #[must_use]
    pub const fn campaign(&self) -> &WaveStateMachine {
        &self.campaign
    }

    /// Attachments of definitions to entity slots.
    #[must_use]
    pub const fn custom_entities(&self) -> &CustomEntities {
        &self.custom
    }

    /// Dispatcher that isolates script faults.
    #[must_use]
    pub const fn dispatcher(&self) -> &HookDispatcher {
        &self.dispatcher
    }

    /// Handle other threads use to queue reloads and campaign stops.
    #[must_use]
    pub fn admin_handle(&self) -> AdminHandle {
        AdminHandle::new(self.admin_tx.clone())
    }

    /// Replaces the natural spawn cap.
    pub fn set_max_spawns(&mut self, max_spawns: u32) {
        self.config.max_spawns = max_spawns;
        self.spawning.set_max_spawns(max_spawns);
    }

    /// Replaces the natural spawn rate.
    pub fn set_spawn_rate(&mut self, spawn_rate: u32) {
        self.config.spawn_rate = spawn_rate;
        self.spawning.set_spawn_rate(spawn_rate);
    }

    /// Re-reads the configuration file, if any, and every definition.
    ///
    /// A successful reload stops the running campaign. Attachments survive
    /// by name; entities whose definition disappeared stop resolving and are
    /// treated as plain host entities.
    pub fn reload(&mut self) -> Result<LoadReport, ReloadError> {
        let config = match &self.config_path {
            Some(path) => Some(EngineConfig::load(path)?),
            None => None,
        };
        let report = self.registry.load(&*self.source, &mut *self.scripts)?;
        let _ = self.campaign.stop();
        if let Some(config) = config {
            self.set_max_spawns(config.max_spawns);
            self.set_spawn_rate(config.spawn_rate);
            self.config = config;
        }
        Ok(report)
    }

    /// Stops the campaign and releases every script context.
    pub fn dispose(&mut self) {
        let _ = self.campaign.stop();
        self.registry.dispose(&mut *self.scripts);
        self.custom.clear();
        tracing::info!("engine disposed");
    }

    /// Runs one simulation tick.
    ///
    /// Queued admin requests are served first. The campaign then advances,
    /// dirty entities are re-applied or replaced, and finally every player is
    /// checked for collisions and offered a campaign or natural spawn.
    pub fn on_tick<H>(&mut self, host: &mut H, now: Instant, events: &mut Vec<Event>)
    where
        H: Host + ?Sized,
    {
        self.drain_admin_requests();

        let world = host.world_info();
        let players = host.player_view();
        let mut commands = Vec::new();
        self.campaign.update(
            now,
            &self.registry,
            &players,
            &world,
            &mut self.dispatcher,
            &mut commands,
        );
        self.custom.execute_all(host, &mut commands, events);

        self.custom
            .sweep(host, &self.registry, &mut self.dispatcher, events);

        let entities = host.entity_view();
        let search = SpawnLocationSearch::new(SpawnGeometry::from_world(&world));
        for player in players.iter() {
            if !player.immune {
                self.hits.clear(player.slot);
            }
            if !self.hits.is_registered(player.slot) {
                let touching = entities.iter().find_map(|entity| {
                    let definition = self.custom.resolve(entity.slot, &self.registry)?;
                    entity
                        .rect()
                        .intersects(&player.rect())
                        .then_some((entity, definition))
                });
                if let Some((entity, definition)) = touching {
                    let _ = self.dispatcher.invoke(
                        definition.name(),
                        definition.hooks(),
                        &HookCall::Collision { entity, player },
                        &mut commands,
                    );
                    let _ = self.hits.try_register(player.slot);
                    self.custom.execute_all(host, &mut commands, events);
                }
            }

            let Some(tile) = search.find(player.tile(), &players, &*host, &mut self.rng) else {
                continue;
            };

            let campaign = self
                .campaign
                .runtime()
                .and_then(|runtime| self.registry.find_campaign(runtime.campaign()));
            match campaign {
                Some(campaign) if horde_system_campaign::is_eligible(campaign, player, &world) => {
                    let view = host.entity_view();
                    let custom = &self.custom;
                    let is_alive = |key: &EntityKey| match key {
                        EntityKey::Archetype(archetype) => view.iter().any(|entity| {
                            entity.archetype == *archetype
                                && custom.definition_name(entity.slot).is_none()
                        }),
                        EntityKey::Definition(name) => view.iter().any(|entity| {
                            custom
                                .definition_name(entity.slot)
                                .is_some_and(|attached| attached.eq_ignore_ascii_case(name))
                        }),
                    };
                    let key = self.campaign.try_spawn(
                        player,
                        &self.registry,
                        &world,
                        &mut self.rng,
                        is_alive,
                        &mut commands,
                    );
                    if let Some(key) = key {
                        self.spawn_key(host, &key, tile, events);
                    }
                    self.custom.execute_all(host, &mut commands, events);
                }
                _ => {
                    let chosen = self.spawning.choose(
                        player,
                        tile,
                        &self.registry,
                        &mut self.dispatcher,
                        &mut self.rng,
                        &mut commands,
                    );
                    self.custom.execute_all(host, &mut commands, events);
                    if let Some(definition) = chosen {
                        let _ = self.custom.spawn(
                            host,
                            definition,
                            tile.spawn_position(),
                            &mut self.dispatcher,
                            events,
                        );
                    }
                }
            }
        }
    }

    /// The host placed a fresh entity into `slot` on its own initiative.
    pub fn on_entity_spawned(&mut self, slot: EntitySlot) {
        self.custom.on_spawned(slot);
    }

    /// The host reset the defaults of the entity in `slot`.
    pub fn on_defaults_set(&mut self, slot: EntitySlot, active: bool) {
        if active {
            self.custom.mark_dirty(slot);
        }
    }

    /// The entity in `slot` transformed into another archetype.
    pub fn on_transformed<H>(&mut self, host: &mut H, slot: EntitySlot, events: &mut Vec<Event>)
    where
        H: Host + ?Sized,
    {
        self.custom.mark_dirty(slot);
        let Some(entity) = host.entity(slot) else {
            return;
        };
        let Some(definition) = self.custom.resolve(slot, &self.registry) else {
            return;
        };
        let mut commands = Vec::new();
        let _ = self.dispatcher.invoke(
            definition.name(),
            definition.hooks(),
            &HookCall::Transformed { entity: &entity },
            &mut commands,
        );
        self.custom.execute_all(host, &mut commands, events);
    }

    /// The host is about to update the behaviour of the entity in `slot`.
    ///
    /// Returns `true` when the definition's script took over the update.
    pub fn on_ai_update<H>(&mut self, host: &mut H, slot: EntitySlot, events: &mut Vec<Event>) -> bool
    where
        H: Host + ?Sized,
    {
        let Some((entity, definition)) = attached(&self.custom, &self.registry, &*host, slot) else {
            return false;
        };
        let mut commands = Vec::new();
        let handled = self.dispatcher.invoke_flag(
            definition.name(),
            definition.hooks(),
            &HookCall::AiUpdate { entity: &entity },
            &mut commands,
        );
        self.custom.execute_all(host, &mut commands, events);
        handled
    }

    /// A player struck the entity in `slot`.
    ///
    /// Returns `true` when the definition's script cancelled the hit.
    #[allow(clippy::too_many_arguments)]
    pub fn on_strike<H>(
        &mut self,
        host: &mut H,
        slot: EntitySlot,
        player: PlayerSlot,
        damage: i32,
        knockback: f32,
        critical: bool,
        events: &mut Vec<Event>,
    ) -> bool
    where
        H: Host + ?Sized,
    {
        let Some((entity, definition)) = attached(&self.custom, &self.registry, &*host, slot) else {
            return false;
        };
        if definition.should_update_on_hit() {
            self.custom
                .execute(host, Command::MarkForSync { slot }, events);
        }
        let players = host.player_view();
        let Some(player) = players.get(player) else {
            return false;
        };
        let mut commands = Vec::new();
        let handled = self.dispatcher.invoke_flag(
            definition.name(),
            definition.hooks(),
            &HookCall::Strike {
                entity: &entity,
                player,
                damage,
                knockback,
                critical,
            },
            &mut commands,
        );
        self.custom.execute_all(host, &mut commands, events);
        handled
    }

    /// The entity in `slot` died; the host removes it afterwards.
    ///
    /// The kill scores for the running campaign. Custom entities also run
    /// their killed hook, roll their loot table and optionally count towards
    /// the host's kill tallies.
    pub fn on_killed<H>(&mut self, host: &mut H, slot: EntitySlot, events: &mut Vec<Event>)
    where
        H: Host + ?Sized,
    {
        let Some(entity) = host.entity(slot) else {
            return;
        };
        let definition = self.custom.resolve(slot, &self.registry);
        let key = match definition {
            Some(definition) => EntityKey::Definition(definition.name().to_owned()),
            None => EntityKey::Archetype(entity.archetype),
        };

        let players = host.player_view();
        let world = host.world_info();
        let mut commands = Vec::new();
        let _ = self
            .campaign
            .on_kill(&key, &self.registry, &players, &world, &mut commands);
        self.custom.execute_all(host, &mut commands, events);

        if let Some(definition) = definition {
            let _ = self.dispatcher.invoke(
                definition.name(),
                definition.hooks(),
                &HookCall::Killed { entity: &entity },
                &mut commands,
            );
            self.custom.execute_all(host, &mut commands, events);
            drop_loot(&mut self.custom, &mut self.rng, host, &entity, definition, events);
            if definition.loot().tally_kills {
                self.custom
                    .execute(host, Command::TallyKill { slot }, events);
            }
        }
        let _ = self.custom.detach(slot);
    }

    /// The host is about to drop `item` from the entity in `slot`.
    ///
    /// Returns `true` when the drop must be suppressed: the entity's
    /// definition overrides loot and the item is not on the pass-through
    /// list.
    #[must_use]
    pub fn on_loot_drop(&self, slot: EntitySlot, item: ItemId) -> bool {
        self.custom
            .resolve(slot, &self.registry)
            .is_some_and(|definition| {
                definition.loot().is_override && !self.config.loot_passthrough.contains(&item)
            })
    }

    /// Parses and executes a command line typed by `issuer`.
    ///
    /// Replies are sent to the issuer when it is a player and returned either
    /// way, so console callers can print them.
    pub fn run_command<H>(
        &mut self,
        host: &mut H,
        issuer: &Issuer,
        line: &str,
        events: &mut Vec<Event>,
    ) -> Result<Option<String>, CommandInputError>
    where
        H: Host + ?Sized,
    {
        let outcome = commands::parse_line(line).and_then(|parsed| match parsed {
            Parsed::Ready(command) => self.execute(host, issuer, command, events),
            Parsed::Spawn(request) => {
                if self.registry.find_entity(&request.name).is_none() {
                    return Err(CommandInputError::UnknownEntity { name: request.name });
                }
                let command = request.into_command()?;
                self.execute(host, issuer, command, events)
            }
        });

        if let Some(player) = issuer.player {
            let reply = match &outcome {
                Ok(Some(message)) => Some((message.clone(), MessageColor::SUCCESS)),
                Ok(None) => None,
                Err(error) => Some((error.to_string(), MessageColor::ERROR)),
            };
            if let Some((message, color)) = reply {
                self.custom.execute(
                    host,
                    Command::SendMessage {
                        player,
                        message,
                        color,
                    },
                    events,
                );
            }
        }
        if let Err(error) = &outcome {
            tracing::debug!(issuer = %issuer.name, line, %error, "command rejected");
        }
        outcome
    }

    /// Executes an already parsed command for `issuer`.
    ///
    /// Returns the success reply for the issuer, if the command has one.
    pub fn execute<H>(
        &mut self,
        host: &mut H,
        issuer: &Issuer,
        command: AdminCommand,
        events: &mut Vec<Event>,
    ) -> Result<Option<String>, CommandInputError>
    where
        H: Host + ?Sized,
    {
        match command {
            AdminCommand::StopInvasion => {
                if self.campaign.stop().is_none() {
                    return Err(CommandInputError::NoCampaign);
                }
                self.custom.execute(
                    host,
                    Command::Broadcast {
                        message: format!("{} stopped the current custom invasion.", issuer.name),
                        color: MessageColor::INFO,
                    },
                    events,
                );
                Ok(None)
            }
            AdminCommand::Invade { name } => {
                if self.campaign.is_active() {
                    return Err(CommandInputError::CampaignActive);
                }
                let Some(campaign) = self.registry.find_campaign(&name) else {
                    return Err(CommandInputError::UnknownCampaign { name });
                };
                let mut commands = Vec::new();
                self.campaign
                    .start(campaign, host.player_view().len(), &mut commands);
                self.custom.execute_all(host, &mut commands, events);
                Ok(None)
            }
            AdminCommand::MaxSpawns(max_spawns) => {
                self.set_max_spawns(max_spawns);
                Ok(Some(format!("Set maximum spawns to {max_spawns}.")))
            }
            AdminCommand::SpawnRate(spawn_rate) => {
                self.set_spawn_rate(spawn_rate);
                Ok(Some(format!("Set spawn rate to {spawn_rate}.")))
            }
            AdminCommand::SpawnMob { name, amount } => {
                let Some(definition) = self.registry.find_entity(&name) else {
                    return Err(CommandInputError::UnknownEntity { name });
                };
                let players = host.player_view();
                let Some(anchor) = issuer
                    .player
                    .and_then(|slot| players.get(slot))
                    .map(|player| player.tile())
                else {
                    return Err(CommandInputError::InGameOnly);
                };
                for _ in 0..amount {
                    let tile = find_clear_tile(
                        anchor,
                        MANUAL_SPAWN_RADIUS,
                        MANUAL_SPAWN_RADIUS,
                        &*host,
                        &mut self.rng,
                    );
                    let position = Vec2::new(
                        (tile.x() * TILE_SIZE) as f32,
                        (tile.y() * TILE_SIZE) as f32,
                    );
                    let _ = self.custom.spawn(
                        host,
                        definition,
                        position,
                        &mut self.dispatcher,
                        events,
                    );
                }
                Ok(Some(format!("Spawned {amount} {name}(s).")))
            }
            AdminCommand::Reload => match self.reload() {
                Ok(_) => Ok(Some(RELOADED_MESSAGE.to_owned())),
                Err(error) => Err(CommandInputError::ReloadFailed {
                    reason: error.to_string(),
                }),
            },
        }
    }

    fn drain_admin_requests(&mut self) {
        while let Ok(request) = self.admin_rx.try_recv() {
            match request {
                AdminRequest::Reload => {
                    if let Err(error) = self.reload() {
                        tracing::warn!(%error, "queued reload failed");
                    }
                }
                AdminRequest::StopCampaign => {
                    let _ = self.campaign.stop();
                }
            }
        }
    }

    fn spawn_key<H>(&mut self, host: &mut H, key: &EntityKey, tile: TileCoord, events: &mut Vec<Event>)
    where
        H: Host + ?Sized,
    {
        let position = tile.spawn_position();
        match key {
            EntityKey::Archetype(archetype) => self.custom.execute(
                host,
                Command::SpawnEntity {
                    archetype: *archetype,
                    position,
                },
                events,
            ),
            EntityKey::Definition(name) => match self.registry.find_entity(name) {
                Some(definition) => {
                    let _ = self.custom.spawn(
                        host,
                        definition,
                        position,
                        &mut self.dispatcher,
                        events,
                    );
                }
                None => tracing::warn!(definition = %name, "campaign references unknown definition"),
            },
        }
    }
}

/// Custom entity in `slot` together with its definition.
fn attached<'r, H>(
    custom: &CustomEntities,
    registry: &'r DefinitionRegistry,
    host: &H,
    slot: EntitySlot,
) -> Option<(EntitySnapshot, &'r EntityDefinition)>
where
    H: Host + ?Sized,
{
    let definition = custom.resolve(slot, registry)?;
    Some((host.entity(slot)?, definition))
}

/// Rolls every loot entry of `definition`, dropping the winners around the
/// entity. Stack sizes are drawn from `[min, max]` inclusive, so the maximum
/// can drop. Stops at the first item the host does not know.
fn drop_loot<H, R>(
    custom: &mut CustomEntities,
    rng: &mut R,
    host: &mut H,
    entity: &EntitySnapshot,
    definition: &EntityDefinition,
    events: &mut Vec<Event>,
) where
    H: Host + ?Sized,
    R: Rng + ?Sized,
{
    for entry in &definition.loot().entries {
        if rng.gen::<f64>() >= entry.chance {
            continue;
        }
        let stack = rng.gen_range(entry.min_stack_size..=entry.max_stack_size);
        let start = events.len();
        custom.execute(
            host,
            Command::DropItem {
                area: entity.rect(),
                item: entry.name.clone(),
                stack,
                prefix: entry.prefix,
            },
            events,
        );
        let rejected = events[start..]
            .iter()
            .any(|event| matches!(event, Event::ItemRejected { .. }));
        if rejected {
            tracing::warn!(
                definition = definition.name(),
                item = %entry.name,
                "loot item unknown to host"
            );
            break;
        }
    }
}
