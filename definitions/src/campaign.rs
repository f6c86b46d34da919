//! Multi-wave campaign definitions.

use std::{collections::HashMap, path::PathBuf};

use horde_core::{EntityKey, WeightTable};
use horde_scripting::{HookSet, LoadedScript, ScriptContextId, ScriptHost};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Timed event made of waves that gate spawning behind point thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignDefinition {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script_path: Option<PathBuf>,
    #[serde(default)]
    completed_message: String,
    #[serde(default)]
    point_values: HashMap<EntityKey, u32>,
    #[serde(default)]
    scale_by_players: bool,
    #[serde(default)]
    at_spawn_only: bool,
    waves: Vec<Wave>,
    #[serde(skip)]
    hooks: HookSet,
    #[serde(skip)]
    context: Option<ScriptContextId>,
}

impl CampaignDefinition {
    /// Creates a campaign from its waves with no point values.
    #[must_use]
    pub fn new(name: impl Into<String>, waves: Vec<Wave>) -> Self {
        Self {
            name: name.into(),
            script_path: None,
            completed_message: String::new(),
            point_values: HashMap::new(),
            scale_by_players: false,
            at_spawn_only: false,
            waves,
            hooks: HookSet::new(),
            context: None,
        }
    }

    /// Awards `points` for each kill of an entity matching `key`.
    #[must_use]
    pub fn with_points(mut self, key: impl Into<EntityKey>, points: u32) -> Self {
        let _ = self.point_values.insert(key.into(), points);
        self
    }

    /// Sets the message broadcast after the last wave completes.
    #[must_use]
    pub fn with_completed_message(mut self, message: impl Into<String>) -> Self {
        self.completed_message = message.into();
        self
    }

    /// Multiplies each wave's requirement by the number of active players.
    #[must_use]
    pub fn scaled_by_players(mut self, scale: bool) -> Self {
        self.scale_by_players = scale;
        self
    }

    /// Restricts campaign spawns to players near the world spawn.
    #[must_use]
    pub fn at_spawn_only(mut self, at_spawn_only: bool) -> Self {
        self.at_spawn_only = at_spawn_only;
        self
    }

    /// Sets the script exporting the campaign's update hook.
    #[must_use]
    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Unique name of the campaign.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Script referenced by the campaign, if any.
    #[must_use]
    pub fn script_path(&self) -> Option<&PathBuf> {
        self.script_path.as_ref()
    }

    /// Waves in the order they are played.
    #[must_use]
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Wave stored at the provided index.
    #[must_use]
    pub fn wave(&self, index: usize) -> Option<&Wave> {
        self.waves.get(index)
    }

    /// Points awarded for killing an entity matching `key`, if any.
    #[must_use]
    pub fn points_for(&self, key: &EntityKey) -> Option<u32> {
        self.point_values.get(key).copied()
    }

    /// Message broadcast after the last wave completes.
    #[must_use]
    pub fn completed_message(&self) -> &str {
        &self.completed_message
    }

    /// Whether wave requirements scale with the number of active players.
    #[must_use]
    pub const fn scale_by_players(&self) -> bool {
        self.scale_by_players
    }

    /// Whether only players near the world spawn receive campaign spawns.
    #[must_use]
    pub const fn is_at_spawn_only(&self) -> bool {
        self.at_spawn_only
    }

    /// Hooks resolved from the campaign's script.
    #[must_use]
    pub const fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    pub(crate) fn validate(&self, scripts: &dyn ScriptHost) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        if let Some(path) = &self.script_path {
            if !scripts.exists(path) {
                return Err(ValidationError::MissingScript { path: path.clone() });
            }
        }
        if self.waves.is_empty() {
            return Err(ValidationError::NoWaves);
        }
        for (index, wave) in self.waves.iter().enumerate() {
            let wave_number = index + 1;
            if wave.spawn_rate == 0 {
                return Err(ValidationError::WaveSpawnRate { wave: wave_number });
            }
            if wave.weights.total_weight() == 0 {
                return Err(ValidationError::EmptyWeights { wave: wave_number });
            }
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, script: LoadedScript) {
        self.hooks = script.hooks;
        self.context = Some(script.context);
    }

    pub(crate) fn dispose(&mut self, scripts: &mut dyn ScriptHost) {
        self.hooks.clear();
        if let Some(context) = self.context.take() {
            scripts.teardown(context);
        }
    }
}

/// One stage of a campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Wave {
    /// Message broadcast when the wave starts.
    #[serde(default)]
    pub start_message: String,
    /// Points needed before the wave can complete.
    pub points_required: u32,
    /// Entity whose kill is required once the points are reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miniboss: Option<EntityKey>,
    /// Active entity count at which a player stops receiving spawns.
    pub max_spawns: u32,
    /// Inverse per-tick spawn probability.
    pub spawn_rate: u32,
    /// Weighted table of what the wave spawns.
    pub weights: WeightTable<EntityKey>,
}

impl Wave {
    /// Creates a wave without a start message or miniboss.
    #[must_use]
    pub fn new(
        points_required: u32,
        max_spawns: u32,
        spawn_rate: u32,
        weights: WeightTable<EntityKey>,
    ) -> Self {
        Self {
            start_message: String::new(),
            points_required,
            miniboss: None,
            max_spawns,
            spawn_rate,
            weights,
        }
    }

    /// Sets the message broadcast when the wave starts.
    #[must_use]
    pub fn with_start_message(mut self, message: impl Into<String>) -> Self {
        self.start_message = message.into();
        self
    }

    /// Requires a kill of `miniboss` once the points are reached.
    #[must_use]
    pub fn with_miniboss(mut self, miniboss: impl Into<EntityKey>) -> Self {
        self.miniboss = Some(miniboss.into());
        self
    }
}
