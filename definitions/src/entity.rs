//! Custom entity definitions.

use std::{collections::BTreeSet, path::PathBuf};

use horde_core::{ArchetypeId, BuffId, ARCHETYPE_LIMIT, BUFF_TYPE_LIMIT, MIN_ARCHETYPE};
use horde_scripting::{HookSet, LoadedScript, ScriptContextId, ScriptHost};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// User-authored archetype layered on top of a host base archetype.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityDefinition {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script_path: Option<PathBuf>,
    base_type: ArchetypeId,
    #[serde(default)]
    base_override: BaseOverride,
    #[serde(default)]
    loot: LootTable,
    #[serde(default)]
    spawning: SpawnSettings,
    #[serde(skip)]
    hooks: HookSet,
    #[serde(skip)]
    context: Option<ScriptContextId>,
}

impl EntityDefinition {
    /// Creates a definition with no overrides, loot or spawn flags.
    #[must_use]
    pub fn new(name: impl Into<String>, base_type: ArchetypeId) -> Self {
        Self {
            name: name.into(),
            script_path: None,
            base_type,
            base_override: BaseOverride::default(),
            loot: LootTable::default(),
            spawning: SpawnSettings::default(),
            hooks: HookSet::new(),
            context: None,
        }
    }

    /// Replaces the stat overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: BaseOverride) -> Self {
        self.base_override = overrides;
        self
    }

    /// Replaces the loot table.
    #[must_use]
    pub fn with_loot(mut self, loot: LootTable) -> Self {
        self.loot = loot;
        self
    }

    /// Replaces the spawn settings.
    #[must_use]
    pub fn with_spawning(mut self, spawning: SpawnSettings) -> Self {
        self.spawning = spawning;
        self
    }

    /// Sets the script whose exports provide the definition's hooks.
    #[must_use]
    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Unique name of the definition.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host archetype the definition builds on.
    #[must_use]
    pub const fn base_type(&self) -> ArchetypeId {
        self.base_type
    }

    /// Script referenced by the definition, if any.
    #[must_use]
    pub fn script_path(&self) -> Option<&PathBuf> {
        self.script_path.as_ref()
    }

    /// Sparse stat overrides.
    #[must_use]
    pub const fn overrides(&self) -> &BaseOverride {
        &self.base_override
    }

    /// Loot dropped when an instance dies.
    #[must_use]
    pub const fn loot(&self) -> &LootTable {
        &self.loot
    }

    /// Natural spawning behaviour.
    #[must_use]
    pub const fn spawning(&self) -> &SpawnSettings {
        &self.spawning
    }

    /// Hooks resolved from the definition's script.
    #[must_use]
    pub const fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// Whether instances drift out of sync with clients and must be pushed
    /// every tick.
    #[must_use]
    pub fn should_aggressively_update(&self) -> bool {
        let overrides = &self.base_override;
        overrides.ai_style.is_some()
            || overrides.buff_immunities.is_some()
            || overrides.is_immune_to_lava.is_some()
            || overrides.has_no_collision.is_some()
            || overrides.has_no_gravity.is_some()
    }

    /// Whether instances must be pushed to clients after being struck.
    #[must_use]
    pub fn should_update_on_hit(&self) -> bool {
        let overrides = &self.base_override;
        overrides.defense.is_some()
            || overrides.is_immortal.is_some()
            || overrides.knockback_multiplier.is_some()
    }

    pub(crate) fn validate(&self, scripts: &dyn ScriptHost) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if self.base_type < MIN_ARCHETYPE || self.base_type >= ARCHETYPE_LIMIT {
            return Err(ValidationError::BaseTypeOutOfRange {
                base_type: self.base_type,
                min: MIN_ARCHETYPE,
                limit: ARCHETYPE_LIMIT,
            });
        }
        if let Some(path) = &self.script_path {
            if !scripts.exists(path) {
                return Err(ValidationError::MissingScript { path: path.clone() });
            }
        }
        self.loot.validate()?;
        if self.spawning.spawn_rate_override == Some(0) {
            return Err(ValidationError::SpawnRate);
        }
        self.base_override.validate()
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

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::BlankName);
    }
    if name.trim().parse::<ArchetypeId>().is_ok() {
        return Err(ValidationError::NumericName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// Stat overrides applied on top of the base archetype. Unset fields keep
/// the host's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BaseOverride {
    /// Behaviour routine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_style: Option<i32>,
    /// Complete set of buffs the entity is immune to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buff_immunities: Option<BTreeSet<BuffId>>,
    /// Damage reduction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defense: Option<i32>,
    /// Whether the entity passes through tiles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_no_collision: Option<bool>,
    /// Whether the entity ignores gravity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_no_gravity: Option<bool>,
    /// Whether the host treats the entity as a boss.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_boss: Option<bool>,
    /// Whether the entity ignores damage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_immortal: Option<bool>,
    /// Whether the entity is unaffected by lava.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_immune_to_lava: Option<bool>,
    /// Whether the entity is unaffected by traps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_trap_immune: Option<bool>,
    /// Knockback multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knockback_multiplier: Option<f32>,
    /// Hit points the entity starts with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<i32>,
    /// Name shown to players.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cost counted against a player's spawn budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_cost: Option<f32>,
    /// Coin value dropped on death.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
}

impl BaseOverride {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(buffs) = &self.buff_immunities {
            if let Some(&buff) = buffs
                .iter()
                .find(|&&buff| buff <= 0 || buff >= BUFF_TYPE_LIMIT)
            {
                return Err(ValidationError::InvalidBuff { buff });
            }
        }
        if self.knockback_multiplier.is_some_and(|value| value < 0.0) {
            return Err(ValidationError::Negative {
                field: "KnockbackMultiplier",
            });
        }
        if self.max_hp.is_some_and(|value| value < 0) {
            return Err(ValidationError::Negative { field: "MaxHp" });
        }
        if self.value.is_some_and(|value| value < 0.0) {
            return Err(ValidationError::Negative { field: "Value" });
        }
        Ok(())
    }
}

/// Loot rolled when an instance dies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LootTable {
    /// Whether kills count towards the host's kill tallies.
    pub tally_kills: bool,
    /// Whether the host's own drops are suppressed.
    pub is_override: bool,
    /// Entries rolled independently in order.
    pub entries: Vec<LootEntry>,
}

impl LootTable {
    fn validate(&self) -> Result<(), ValidationError> {
        self.entries.iter().try_for_each(LootEntry::validate)
    }
}

/// Single independently rolled loot drop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LootEntry {
    /// Item name or numeric identifier understood by the host.
    pub name: String,
    /// Probability in `[0, 1]` that the entry drops.
    pub chance: f64,
    /// Smallest stack dropped.
    #[serde(default = "one")]
    pub min_stack_size: u32,
    /// Largest stack dropped.
    #[serde(default = "one")]
    pub max_stack_size: u32,
    /// Item prefix applied to the drop.
    #[serde(default)]
    pub prefix: i32,
}

const fn one() -> u32 {
    1
}

impl LootEntry {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.chance) {
            return Err(ValidationError::LootChance {
                item: self.name.clone(),
                chance: self.chance,
            });
        }
        if self.min_stack_size > self.max_stack_size {
            return Err(ValidationError::LootStack {
                item: self.name.clone(),
                min: self.min_stack_size,
                max: self.max_stack_size,
            });
        }
        Ok(())
    }
}

/// Natural spawning behaviour of a definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpawnSettings {
    /// Whether the definition spawns near players on its own.
    pub should_spawn: bool,
    /// Whether the definition may take over host entities of its base type.
    pub should_replace: bool,
    /// Spawn rate used instead of the engine-wide one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_rate_override: Option<u32>,
}

#[cfg(test)]
mod tests {
    use horde_scripting::NativeScriptHost;

    use super::*;

    fn validate(definition: &EntityDefinition) -> Result<(), ValidationError> {
        definition.validate(&NativeScriptHost::new())
    }

    #[test]
    fn numeric_and_blank_names_are_rejected() {
        assert_eq!(
            validate(&EntityDefinition::new("  ", 1)),
            Err(ValidationError::BlankName)
        );
        assert!(matches!(
            validate(&EntityDefinition::new("42", 1)),
            Err(ValidationError::NumericName { .. })
        ));
        assert_eq!(validate(&EntityDefinition::new("Slime King", 1)), Ok(()));
    }

    #[test]
    fn base_type_range_is_half_open() {
        assert_eq!(validate(&EntityDefinition::new("low", MIN_ARCHETYPE)), Ok(()));
        assert!(matches!(
            validate(&EntityDefinition::new("lower", MIN_ARCHETYPE - 1)),
            Err(ValidationError::BaseTypeOutOfRange { .. })
        ));
        assert!(matches!(
            validate(&EntityDefinition::new("high", ARCHETYPE_LIMIT)),
            Err(ValidationError::BaseTypeOutOfRange { .. })
        ));
    }

    #[test]
    fn buff_immunities_must_name_real_buffs() {
        let overrides = BaseOverride {
            buff_immunities: Some([20, BUFF_TYPE_LIMIT].into_iter().collect()),
            ..BaseOverride::default()
        };
        let definition = EntityDefinition::new("warded", 1).with_overrides(overrides);
        assert_eq!(
            validate(&definition),
            Err(ValidationError::InvalidBuff {
                buff: BUFF_TYPE_LIMIT
            })
        );
    }

    #[test]
    fn loot_entries_are_checked() {
        let loot = LootTable {
            entries: vec![LootEntry {
                name: "Gel".to_owned(),
                chance: 0.5,
                min_stack_size: 4,
                max_stack_size: 2,
                prefix: 0,
            }],
            ..LootTable::default()
        };
        let definition = EntityDefinition::new("gooey", 1).with_loot(loot);
        assert!(matches!(
            validate(&definition),
            Err(ValidationError::LootStack { min: 4, max: 2, .. })
        ));
    }

    #[test]
    fn sync_flags_follow_overridden_fields() {
        let plain = EntityDefinition::new("plain", 1);
        assert!(!plain.should_aggressively_update());
        assert!(!plain.should_update_on_hit());

        let floaty = EntityDefinition::new("floaty", 1).with_overrides(BaseOverride {
            has_no_gravity: Some(false),
            defense: Some(4),
            ..BaseOverride::default()
        });
        assert!(floaty.should_aggressively_update());
        assert!(floaty.should_update_on_hit());
    }

    #[test]
    fn missing_script_is_rejected() {
        let definition = EntityDefinition::new("scripted", 1).with_script("scripts/nope.lua");
        assert!(matches!(
            validate(&definition),
            Err(ValidationError::MissingScript { .. })
        ));
    }
}
