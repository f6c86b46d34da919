//! Entity and player identities, attribute blocks, and read-only views.

use std::collections::BTreeSet;

use glam::Vec2;

use crate::{PixelRect, TileCoord};

/// Numeric archetype identifier understood by the host.
pub type ArchetypeId = i32;

/// Numeric buff identifier understood by the host.
pub type BuffId = i32;

/// Numeric item identifier understood by the host.
pub type ItemId = i32;

/// Number of entity slots the host allocates.
pub const MAX_ENTITY_SLOTS: usize = 201;

/// Number of player slots the host allocates.
pub const MAX_PLAYER_SLOTS: usize = 256;

/// Smallest archetype accepted as a definition base; negative values denote
/// special variants of regular archetypes.
pub const MIN_ARCHETYPE: ArchetypeId = -65;

/// Exclusive upper bound of the host's archetype range.
pub const ARCHETYPE_LIMIT: ArchetypeId = 580;

/// Exclusive upper bound of the host's buff identifier range.
pub const BUFF_TYPE_LIMIT: BuffId = 206;

/// Active-entity count written for a player to stop the host from spawning
/// its own ambient entities around them.
pub const SUPPRESSED_ACTIVE_ENTITIES: u32 = 1_000;

/// Stable identifier of a live host entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntitySlot(u16);

impl EntitySlot {
    /// Creates a new entity slot with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the slot.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Slot value usable as an arena index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Stable identifier of a connected player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerSlot(u8);

impl PlayerSlot {
    /// Creates a new player slot with the provided numeric value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the slot.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Slot value usable as an arena index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Mutable stat block of a host entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityAttributes {
    /// Behaviour routine the host runs for the entity.
    pub ai_style: i32,
    /// Buffs the entity cannot receive.
    pub buff_immunities: BTreeSet<BuffId>,
    /// Damage reduction applied to incoming hits.
    pub defense: i32,
    /// Whether the entity passes through tiles.
    pub no_tile_collide: bool,
    /// Whether the entity ignores gravity.
    pub no_gravity: bool,
    /// Whether the host treats the entity as a boss.
    pub boss: bool,
    /// Whether the entity ignores damage.
    pub immortal: bool,
    /// Whether the entity is unaffected by lava.
    pub lava_immune: bool,
    /// Whether the entity is unaffected by traps.
    pub trap_immune: bool,
    /// Multiplier applied to knockback received.
    pub knockback_resist: f32,
    /// Current hit points.
    pub life: i32,
    /// Name shown to players.
    pub display_name: String,
    /// Cost the entity contributes to a player's spawn budget.
    pub slot_cost: f32,
    /// Coin value dropped on death.
    pub value: f32,
}

/// Immutable representation of a single active entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Slot occupied by the entity.
    pub slot: EntitySlot,
    /// Archetype the entity currently uses.
    pub archetype: ArchetypeId,
    /// Top-left pixel position of the entity's hitbox.
    pub position: Vec2,
    /// Pixel dimensions of the entity's hitbox.
    pub size: Vec2,
}

impl EntitySnapshot {
    /// Hitbox of the entity in whole pixels.
    #[must_use]
    pub fn rect(&self) -> PixelRect {
        PixelRect::from_position_and_size(self.position, self.size)
    }
}

/// Read-only snapshot describing every active entity.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.slot);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Retrieves the snapshot stored for the provided slot.
    #[must_use]
    pub fn get(&self, slot: EntitySlot) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&slot, |snapshot| snapshot.slot)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of active entities captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view contains no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single connected player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Slot occupied by the player.
    pub slot: PlayerSlot,
    /// Name the player connected with.
    pub name: String,
    /// Top-left pixel position of the player's hitbox.
    pub position: Vec2,
    /// Pixel dimensions of the player's hitbox.
    pub size: Vec2,
    /// Spawn budget the host currently counts against the player.
    pub active_entities: u32,
    /// Whether the player is inside a post-hit immunity window.
    pub immune: bool,
}

impl PlayerSnapshot {
    /// Hitbox of the player in whole pixels.
    #[must_use]
    pub fn rect(&self) -> PixelRect {
        PixelRect::from_position_and_size(self.position, self.size)
    }

    /// Pixel position of the player's hitbox centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    /// Tile containing the player's top-left corner.
    #[must_use]
    pub fn tile(&self) -> TileCoord {
        TileCoord::containing(self.position)
    }
}

/// Read-only snapshot describing every connected player.
#[derive(Clone, Debug, Default)]
pub struct PlayerView {
    snapshots: Vec<PlayerSnapshot>,
}

impl PlayerView {
    /// Creates a new player view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PlayerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.slot);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.snapshots.iter()
    }

    /// Retrieves the snapshot stored for the provided slot.
    #[must_use]
    pub fn get(&self, slot: PlayerSlot) -> Option<&PlayerSnapshot> {
        self.snapshots
            .binary_search_by_key(&slot, |snapshot| snapshot.slot)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of connected players captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no players are connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PlayerSnapshot> {
        self.snapshots
    }
}
