#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave state machine that drives a running campaign.
//!
//! A campaign advances through its waves as players earn points by killing
//! entities. Once a wave's points are reached, a configured miniboss must be
//! killed before the next wave starts. The state machine only emits
//! [`Command`] values; the engine executes them and performs the spawns it
//! asks for.

use std::time::{Duration, Instant};

use horde_core::{
    CampaignProgress, Command, EntityKey, MessageColor, PlayerSnapshot, PlayerView, WorldInfo,
    SUPPRESSED_ACTIVE_ENTITIES, TILE_SIZE,
};
use horde_definitions::{CampaignDefinition, DefinitionRegistry, Wave};
use horde_scripting::{HookCall, HookDispatcher};
use rand::Rng;

/// Minimum time between two periodic progress reports.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Horizontal distance in pixels from the world spawn within which players
/// take part in spawn-only campaigns.
const SPAWN_ZONE_HALF_WIDTH: f32 = 3_000.0;

/// Coarse state of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No campaign is running.
    Idle,
    /// Players are earning points for the wave.
    WaveActive {
        /// Zero-based index of the wave.
        wave: usize,
    },
    /// The wave's points are reached and its miniboss still lives.
    MinibossGate {
        /// Zero-based index of the wave.
        wave: usize,
    },
}

/// Mutable state of the running campaign.
#[derive(Clone, Debug, PartialEq)]
pub struct CampaignRuntime {
    campaign: String,
    wave: usize,
    points: u32,
    required: u32,
    miniboss: Option<EntityKey>,
    last_progress: Option<Instant>,
}

impl CampaignRuntime {
    /// Name of the running campaign.
    #[must_use]
    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    /// Zero-based index of the current wave.
    #[must_use]
    pub const fn wave(&self) -> usize {
        self.wave
    }

    /// Points earned during the current wave.
    #[must_use]
    pub const fn points(&self) -> u32 {
        self.points
    }

    /// Points required to finish the current wave.
    #[must_use]
    pub const fn required(&self) -> u32 {
        self.required
    }

    /// Miniboss that still has to die before the wave can finish.
    #[must_use]
    pub const fn miniboss(&self) -> Option<&EntityKey> {
        self.miniboss.as_ref()
    }

    /// Progress of the current wave as shown to players.
    #[must_use]
    pub fn progress(&self) -> CampaignProgress {
        CampaignProgress {
            points: self.points,
            required: self.required,
            wave: u32::try_from(self.wave + 1).unwrap_or(u32::MAX),
        }
    }

    fn gate_closed(&self) -> bool {
        self.points >= self.required && self.miniboss.is_some()
    }

    fn is_wave_complete(&self) -> bool {
        self.points >= self.required && self.miniboss.is_none()
    }

    fn begin_wave(&mut self, wave: &Wave, scale: u32, out: &mut Vec<Command>) {
        if !wave.start_message.is_empty() {
            out.push(Command::Broadcast {
                message: wave.start_message.clone(),
                color: MessageColor::WAVE,
            });
        }
        self.points = 0;
        self.miniboss.clone_from(&wave.miniboss);
        self.required = wave.points_required.saturating_mul(scale);
        tracing::info!(
            campaign = %self.campaign,
            wave = self.wave + 1,
            required = self.required,
            "wave started"
        );
    }

    fn report_progress(
        &self,
        campaign: &CampaignDefinition,
        players: &PlayerView,
        world: &WorldInfo,
        out: &mut Vec<Command>,
    ) {
        let progress = self.progress();
        out.extend(
            players
                .iter()
                .filter(|player| is_eligible(campaign, player, world))
                .map(|player| Command::ReportProgress {
                    player: player.slot,
                    progress,
                }),
        );
    }
}

/// Owner of the single campaign that may run at a time.
#[derive(Debug, Default)]
pub struct WaveStateMachine {
    runtime: Option<CampaignRuntime>,
}

impl WaveStateMachine {
    /// Creates an idle state machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the running campaign, if any.
    #[must_use]
    pub const fn runtime(&self) -> Option<&CampaignRuntime> {
        self.runtime.as_ref()
    }

    /// Reports whether a campaign is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.runtime.is_some()
    }

    /// Coarse state of the state machine.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match &self.runtime {
            None => Phase::Idle,
            Some(runtime) if runtime.gate_closed() => Phase::MinibossGate {
                wave: runtime.wave,
            },
            Some(runtime) => Phase::WaveActive { wave: runtime.wave },
        }
    }

    /// Starts `campaign` at its first wave, replacing any running campaign.
    ///
    /// When the campaign scales by players, the wave's required points are
    /// multiplied by `active_players`.
    pub fn start(
        &mut self,
        campaign: &CampaignDefinition,
        active_players: usize,
        out: &mut Vec<Command>,
    ) {
        let Some(first) = campaign.wave(0) else {
            tracing::warn!(campaign = campaign.name(), "campaign has no waves");
            return;
        };
        let mut runtime = CampaignRuntime {
            campaign: campaign.name().to_owned(),
            wave: 0,
            points: 0,
            required: 0,
            miniboss: None,
            last_progress: None,
        };
        runtime.begin_wave(first, scale(campaign, active_players), out);
        tracing::info!(campaign = campaign.name(), "campaign started");
        self.runtime = Some(runtime);
    }

    /// Stops the running campaign, returning its final state.
    pub fn stop(&mut self) -> Option<CampaignRuntime> {
        let runtime = self.runtime.take();
        if let Some(runtime) = &runtime {
            tracing::info!(campaign = %runtime.campaign, "campaign stopped");
        }
        runtime
    }

    /// Advances the running campaign by one tick.
    ///
    /// A finished wave starts the next one, or completes the campaign after
    /// the last. Eligible players receive progress at most once per
    /// [`PROGRESS_INTERVAL`], and the campaign's update hook runs last.
    pub fn update(
        &mut self,
        now: Instant,
        registry: &DefinitionRegistry,
        players: &PlayerView,
        world: &WorldInfo,
        dispatcher: &mut HookDispatcher,
        out: &mut Vec<Command>,
    ) {
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let Some(campaign) = registry.find_campaign(&runtime.campaign) else {
            tracing::warn!(campaign = %runtime.campaign, "running campaign is no longer defined");
            self.runtime = None;
            return;
        };

        if runtime.is_wave_complete() {
            runtime.wave += 1;
            match campaign.wave(runtime.wave) {
                Some(wave) => runtime.begin_wave(wave, scale(campaign, players.len()), out),
                None => {
                    out.push(Command::Broadcast {
                        message: campaign.completed_message().to_owned(),
                        color: MessageColor::COMPLETED,
                    });
                    tracing::info!(campaign = campaign.name(), "campaign completed");
                    self.runtime = None;
                    return;
                }
            }
        }

        let due = runtime
            .last_progress
            .map_or(true, |last| now.saturating_duration_since(last) > PROGRESS_INTERVAL);
        if due {
            runtime.report_progress(campaign, players, world, out);
            runtime.last_progress = Some(now);
        }

        let _ = dispatcher.invoke(
            campaign.name(),
            campaign.hooks(),
            &HookCall::Update {
                campaign: campaign.name(),
            },
            out,
        );
    }

    /// Books the kill of an entity identified by `key`.
    ///
    /// Killing the current miniboss opens the gate. Any other kill earns the
    /// campaign's points for the key, clamped to the wave's requirement, and
    /// reports progress straight away. Returns whether the kill counted.
    pub fn on_kill(
        &mut self,
        key: &EntityKey,
        registry: &DefinitionRegistry,
        players: &PlayerView,
        world: &WorldInfo,
        out: &mut Vec<Command>,
    ) -> bool {
        let Some(runtime) = self.runtime.as_mut() else {
            return false;
        };
        let Some(campaign) = registry.find_campaign(&runtime.campaign) else {
            return false;
        };

        if runtime.miniboss.as_ref() == Some(key) {
            runtime.miniboss = None;
            tracing::info!(campaign = campaign.name(), miniboss = %key, "miniboss defeated");
            return true;
        }
        let Some(points) = campaign.points_for(key) else {
            return false;
        };
        runtime.points = runtime.points.saturating_add(points).min(runtime.required);
        runtime.report_progress(campaign, players, world, out);
        true
    }

    /// Decides what the running campaign spawns near `player`, if anything.
    ///
    /// Players outside the campaign's area, players at the wave's spawn cap
    /// and players losing the `1 / spawn rate` roll get nothing. Otherwise the
    /// player's active count is saturated so the host stops its own spawns,
    /// and the miniboss is chosen while the gate is closed unless `is_alive`
    /// reports it already roams. Without a gate a key is picked from the
    /// wave's weights.
    pub fn try_spawn<R>(
        &self,
        player: &PlayerSnapshot,
        registry: &DefinitionRegistry,
        world: &WorldInfo,
        rng: &mut R,
        is_alive: impl Fn(&EntityKey) -> bool,
        out: &mut Vec<Command>,
    ) -> Option<EntityKey>
    where
        R: Rng + ?Sized,
    {
        let runtime = self.runtime.as_ref()?;
        let campaign = registry.find_campaign(&runtime.campaign)?;
        if !is_eligible(campaign, player, world) {
            return None;
        }
        let wave = campaign.wave(runtime.wave)?;
        if player.active_entities >= wave.max_spawns || rng.gen_range(0..wave.spawn_rate.max(1)) != 0
        {
            return None;
        }

        out.push(Command::SetActiveEntityCount {
            player: player.slot,
            count: SUPPRESSED_ACTIVE_ENTITIES,
        });
        if runtime.gate_closed() {
            let miniboss = runtime.miniboss.as_ref()?;
            return (!is_alive(miniboss)).then(|| miniboss.clone());
        }
        match horde_system_selection::pick(&wave.weights, rng) {
            Ok(key) => Some(key.clone()),
            Err(error) => {
                tracing::warn!(campaign = campaign.name(), wave = runtime.wave + 1, %error, "no entity to spawn");
                None
            }
        }
    }
}

/// Reports whether `player` takes part in `campaign`.
///
/// Spawn-only campaigns are limited to players within 3000 pixels of the
/// world spawn horizontally and above the surface plus one screen height.
#[must_use]
pub fn is_eligible(campaign: &CampaignDefinition, player: &PlayerSnapshot, world: &WorldInfo) -> bool {
    if !campaign.is_at_spawn_only() {
        return true;
    }
    let spawn_x = (world.spawn_tile.x() * TILE_SIZE) as f32;
    let floor = (world.surface_row * TILE_SIZE + world.screen_height) as f32;
    spawn_x - SPAWN_ZONE_HALF_WIDTH < player.position.x
        && player.position.x < spawn_x + SPAWN_ZONE_HALF_WIDTH
        && player.position.y < floor
}

fn scale(campaign: &CampaignDefinition, active_players: usize) -> u32 {
    if campaign.scale_by_players() {
        u32::try_from(active_players).unwrap_or(u32::MAX)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use horde_core::{PlayerSlot, TileCoord, Vec2, WeightTable};

    use super::*;

    fn player_at(x: f32, y: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            slot: PlayerSlot::new(0),
            name: "scout".to_owned(),
            position: Vec2::new(x, y),
            size: Vec2::new(20.0, 42.0),
            active_entities: 0,
            immune: false,
        }
    }

    #[test]
    fn spawn_only_campaigns_fence_players_around_spawn() {
        let wave = Wave::new(10, 5, 1, WeightTable::from_entries(vec![(EntityKey::Archetype(1), 1)]));
        let campaign = CampaignDefinition::new("Siege", vec![wave]).at_spawn_only(true);
        let world = WorldInfo::new(TileCoord::new(1_000, 300), 300);

        assert!(is_eligible(&campaign, &player_at(16_000.0, 4_000.0), &world));
        assert!(is_eligible(&campaign, &player_at(13_001.0, 5_879.0), &world));
        assert!(!is_eligible(&campaign, &player_at(13_000.0, 4_000.0), &world));
        assert!(!is_eligible(&campaign, &player_at(19_000.0, 4_000.0), &world));
        assert!(!is_eligible(&campaign, &player_at(16_000.0, 5_880.0), &world));

        let open = CampaignDefinition::new("Roaming", Vec::new());
        assert!(is_eligible(&open, &player_at(0.0, 99_999.0), &world));
    }

    #[test]
    fn idle_machine_ignores_everything() {
        let mut machine = WaveStateMachine::new();
        let mut out = Vec::new();
        let registry = DefinitionRegistry::new();

        assert_eq!(machine.phase(), Phase::Idle);
        assert!(!machine.on_kill(
            &EntityKey::Archetype(1),
            &registry,
            &PlayerView::default(),
            &WorldInfo::new(TileCoord::new(0, 0), 0),
            &mut out
        ));
        assert!(machine.stop().is_none());
        assert!(out.is_empty());
    }
}
