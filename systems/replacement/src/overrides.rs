//! Sparse application of definition overrides onto host entities.

use horde_core::{Command, EntityAttributes, EntitySnapshot, Event, Host};
use horde_definitions::EntityDefinition;

/// Writes every overridden field of `definition` into `attributes`.
///
/// Fields the definition leaves unset keep their current value. Buff
/// immunities replace the existing set rather than extending it, which keeps
/// repeated application idempotent.
pub fn apply(attributes: &mut EntityAttributes, definition: &EntityDefinition) {
    let overrides = definition.overrides();
    if let Some(ai_style) = overrides.ai_style {
        attributes.ai_style = ai_style;
    }
    if let Some(buffs) = &overrides.buff_immunities {
        attributes.buff_immunities.clear();
        attributes.buff_immunities.extend(buffs.iter().copied());
    }
    if let Some(defense) = overrides.defense {
        attributes.defense = defense;
    }
    if let Some(no_collision) = overrides.has_no_collision {
        attributes.no_tile_collide = no_collision;
    }
    if let Some(no_gravity) = overrides.has_no_gravity {
        attributes.no_gravity = no_gravity;
    }
    if let Some(boss) = overrides.is_boss {
        attributes.boss = boss;
    }
    if let Some(immortal) = overrides.is_immortal {
        attributes.immortal = immortal;
    }
    if let Some(lava_immune) = overrides.is_immune_to_lava {
        attributes.lava_immune = lava_immune;
    }
    if let Some(trap_immune) = overrides.is_trap_immune {
        attributes.trap_immune = trap_immune;
    }
    if let Some(knockback) = overrides.knockback_multiplier {
        attributes.knockback_resist = knockback;
    }
    if let Some(max_hp) = overrides.max_hp {
        attributes.life = max_hp;
    }
    if let Some(name) = &overrides.name {
        attributes.display_name.clone_from(name);
    }
    if let Some(slot_cost) = overrides.slot_cost {
        attributes.slot_cost = slot_cost;
    }
    if let Some(value) = overrides.value {
        attributes.value = value;
    }
}

/// Turns a host entity into an instance of `definition`.
///
/// The entity is first retyped to the definition's base archetype when it
/// uses another one, so the overrides land on that archetype's defaults.
/// Returns `false` when the entity vanished before the overrides could be
/// written.
pub fn apply_to<H>(
    host: &mut H,
    entity: &EntitySnapshot,
    definition: &EntityDefinition,
    out_events: &mut Vec<Event>,
) -> bool
where
    H: Host + ?Sized,
{
    if entity.archetype != definition.base_type() {
        host.apply(
            Command::SetDefaults {
                slot: entity.slot,
                archetype: definition.base_type(),
            },
            out_events,
        );
    }
    let Some(mut attributes) = host.attributes(entity.slot) else {
        return false;
    };
    apply(&mut attributes, definition);
    host.apply(
        Command::SetAttributes {
            slot: entity.slot,
            attributes,
        },
        out_events,
    );
    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use horde_definitions::BaseOverride;

    use super::*;

    fn armored() -> EntityDefinition {
        EntityDefinition::new("Armored Slime", 1).with_overrides(BaseOverride {
            buff_immunities: Some(BTreeSet::from([20, 24])),
            defense: Some(12),
            has_no_collision: Some(true),
            knockback_multiplier: Some(0.25),
            max_hp: Some(400),
            name: Some("Armored Slime".to_owned()),
            ..BaseOverride::default()
        })
    }

    #[test]
    fn unset_fields_keep_host_values() {
        let mut attributes = EntityAttributes {
            ai_style: 3,
            buff_immunities: BTreeSet::from([5, 31]),
            defense: 2,
            life: 14,
            value: 25.0,
            ..EntityAttributes::default()
        };

        apply(&mut attributes, &armored());

        assert_eq!(attributes.ai_style, 3);
        assert_eq!(attributes.value, 25.0);
        assert_eq!(attributes.buff_immunities, BTreeSet::from([20, 24]));
        assert_eq!(attributes.defense, 12);
        assert!(attributes.no_tile_collide);
        assert_eq!(attributes.knockback_resist, 0.25);
        assert_eq!(attributes.life, 400);
        assert_eq!(attributes.display_name, "Armored Slime");
    }

    #[test]
    fn application_is_idempotent() {
        let definition = armored();
        let mut once = EntityAttributes {
            buff_immunities: BTreeSet::from([7]),
            ..EntityAttributes::default()
        };
        apply(&mut once, &definition);
        let mut twice = once.clone();
        apply(&mut twice, &definition);

        assert_eq!(once, twice);
    }
}
