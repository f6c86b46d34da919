//! Named hooks, their call payloads, and resolved hook sets.

use std::{collections::BTreeMap, fmt, sync::Arc};

use horde_core::{Command, EntitySnapshot, PlayerSnapshot, TileCoord};

use crate::ScriptError;

/// Callback resolved from a user script.
///
/// Commands pushed into the sink are only forwarded to the host when the
/// callback returns successfully.
pub type Callback =
    Arc<dyn Fn(&HookCall<'_>, &mut Vec<Command>) -> Result<HookValue, ScriptError> + Send + Sync>;

/// Simulation events a script may export a callback for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookName {
    /// Runs before the host updates the entity's behaviour; may take it over.
    AiUpdate,
    /// Decides whether a host entity is replaced by the definition.
    CheckReplace,
    /// Decides whether the definition may spawn near a player.
    CheckSpawn,
    /// Runs when the entity touches a player.
    Collision,
    /// Runs when the entity dies.
    Killed,
    /// Runs after the entity is created or replaced.
    Spawn,
    /// Runs when a player strikes the entity; may cancel the hit.
    Strike,
    /// Runs after the entity transforms into another archetype.
    Transformed,
    /// Runs once per tick while the owning campaign is active.
    Update,
}

impl HookName {
    /// Hooks an entity definition script may export.
    pub const ENTITY_HOOKS: [HookName; 8] = [
        HookName::AiUpdate,
        HookName::CheckReplace,
        HookName::CheckSpawn,
        HookName::Collision,
        HookName::Killed,
        HookName::Spawn,
        HookName::Strike,
        HookName::Transformed,
    ];

    /// Hooks a campaign script may export.
    pub const CAMPAIGN_HOOKS: [HookName; 1] = [HookName::Update];

    /// Name under which scripts export the callback.
    #[must_use]
    pub const fn export_name(self) -> &'static str {
        match self {
            Self::AiUpdate => "OnAiUpdate",
            Self::CheckReplace => "OnCheckReplace",
            Self::CheckSpawn => "OnCheckSpawn",
            Self::Collision => "OnCollision",
            Self::Killed => "OnKilled",
            Self::Spawn => "OnSpawn",
            Self::Strike => "OnStrike",
            Self::Transformed => "OnTransformed",
            Self::Update => "OnUpdate",
        }
    }

    /// Value reported when the hook is absent or faults.
    ///
    /// Boolean hooks default to `false`: not handled, not allowed.
    #[must_use]
    pub const fn default_value(self) -> HookValue {
        match self {
            Self::AiUpdate | Self::CheckReplace | Self::CheckSpawn | Self::Strike => {
                HookValue::Bool(false)
            }
            Self::Collision | Self::Killed | Self::Spawn | Self::Transformed | Self::Update => {
                HookValue::Unit
            }
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_name())
    }
}

/// Value returned by a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookValue {
    /// The callback returned nothing.
    Unit,
    /// The callback returned a flag.
    Bool(bool),
}

impl HookValue {
    /// Flag carried by the value, if any.
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unit => None,
            Self::Bool(flag) => Some(flag),
        }
    }
}

/// Arguments passed to a callback, one variant per [`HookName`].
#[derive(Clone, Copy, Debug)]
pub enum HookCall<'a> {
    /// Arguments of [`HookName::AiUpdate`].
    AiUpdate {
        /// Entity about to be updated.
        entity: &'a EntitySnapshot,
    },
    /// Arguments of [`HookName::CheckReplace`].
    CheckReplace {
        /// Host entity considered for replacement.
        entity: &'a EntitySnapshot,
    },
    /// Arguments of [`HookName::CheckSpawn`].
    CheckSpawn {
        /// Player the spawn would happen near.
        player: &'a PlayerSnapshot,
        /// Ground tile chosen for the spawn.
        tile: TileCoord,
    },
    /// Arguments of [`HookName::Collision`].
    Collision {
        /// Entity that touched the player.
        entity: &'a EntitySnapshot,
        /// Player that was touched.
        player: &'a PlayerSnapshot,
    },
    /// Arguments of [`HookName::Killed`].
    Killed {
        /// Entity that died.
        entity: &'a EntitySnapshot,
    },
    /// Arguments of [`HookName::Spawn`].
    Spawn {
        /// Entity that was created.
        entity: &'a EntitySnapshot,
    },
    /// Arguments of [`HookName::Strike`].
    Strike {
        /// Entity that was struck.
        entity: &'a EntitySnapshot,
        /// Player that struck the entity.
        player: &'a PlayerSnapshot,
        /// Damage dealt by the hit.
        damage: i32,
        /// Knockback applied by the hit.
        knockback: f32,
        /// Whether the hit was critical.
        critical: bool,
    },
    /// Arguments of [`HookName::Transformed`].
    Transformed {
        /// Entity after the transformation.
        entity: &'a EntitySnapshot,
    },
    /// Arguments of [`HookName::Update`].
    Update {
        /// Name of the running campaign.
        campaign: &'a str,
    },
}

impl HookCall<'_> {
    /// Hook this call targets.
    #[must_use]
    pub const fn hook(&self) -> HookName {
        match self {
            Self::AiUpdate { .. } => HookName::AiUpdate,
            Self::CheckReplace { .. } => HookName::CheckReplace,
            Self::CheckSpawn { .. } => HookName::CheckSpawn,
            Self::Collision { .. } => HookName::Collision,
            Self::Killed { .. } => HookName::Killed,
            Self::Spawn { .. } => HookName::Spawn,
            Self::Strike { .. } => HookName::Strike,
            Self::Transformed { .. } => HookName::Transformed,
            Self::Update { .. } => HookName::Update,
        }
    }
}

/// Callbacks resolved for a single definition.
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: BTreeMap<HookName, Callback>,
}

impl HookSet {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the callback for the provided hook, replacing any previous one.
    pub fn insert(&mut self, hook: HookName, callback: Callback) {
        let _ = self.hooks.insert(hook, callback);
    }

    /// Callback resolved for the provided hook.
    #[must_use]
    pub fn get(&self, hook: HookName) -> Option<&Callback> {
        self.hooks.get(&hook)
    }

    /// Reports whether a callback is resolved for the provided hook.
    #[must_use]
    pub fn contains(&self, hook: HookName) -> bool {
        self.hooks.contains_key(&hook)
    }

    /// Hooks with a resolved callback, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = HookName> + '_ {
        self.hooks.keys().copied()
    }

    /// Number of resolved callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Reports whether no callbacks are resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Releases every callback.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}
