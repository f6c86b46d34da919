#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Horde orchestration engine.
//!
//! This crate defines the message surface that connects the host simulation,
//! the definition registry, and the pure spawn/campaign systems. Systems read
//! immutable [`EntityView`] and [`PlayerView`] snapshots through the [`Host`]
//! capability, and express every mutation they want as a [`Command`]. The host
//! executes commands through [`Host::apply`] and answers with [`Event`] values
//! describing what actually happened.

mod entity;
mod geometry;
mod host;
mod keys;

pub use entity::{
    ArchetypeId, BuffId, EntityAttributes, EntitySlot, EntitySnapshot, EntityView, ItemId,
    PlayerSlot, PlayerSnapshot, PlayerView, ARCHETYPE_LIMIT, BUFF_TYPE_LIMIT, MAX_ENTITY_SLOTS,
    MAX_PLAYER_SLOTS, MIN_ARCHETYPE, SUPPRESSED_ACTIVE_ENTITIES,
};
pub use geometry::{PixelRect, TileCoord, TILE_SIZE};
pub use host::{Host, TileQuery, WorldInfo};
pub use keys::{EntityKey, WeightTable};

/// Vector type used for pixel-space positions and sizes.
pub use glam::Vec2;

/// Commands that express every host mutation the engine may request.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Creates a new host entity of the provided archetype.
    SpawnEntity {
        /// Archetype the host should instantiate.
        archetype: ArchetypeId,
        /// Pixel position at which the entity appears.
        position: Vec2,
    },
    /// Resets an entity to the default attributes of the provided archetype.
    SetDefaults {
        /// Slot of the entity being retyped.
        slot: EntitySlot,
        /// Archetype whose defaults should be applied.
        archetype: ArchetypeId,
    },
    /// Overwrites the attribute block of an entity.
    SetAttributes {
        /// Slot of the entity receiving the attributes.
        slot: EntitySlot,
        /// Complete attribute block to store.
        attributes: EntityAttributes,
    },
    /// Flags an entity so the host re-synchronises it with remote clients.
    MarkForSync {
        /// Slot of the entity that changed.
        slot: EntitySlot,
    },
    /// Overrides the active-entity counter the host tracks for a player.
    SetActiveEntityCount {
        /// Player whose counter is replaced.
        player: PlayerSlot,
        /// New counter value.
        count: u32,
    },
    /// Drops an item stack inside the provided area.
    DropItem {
        /// Pixel area the item is dropped within.
        area: PixelRect,
        /// Item name or numeric identifier understood by the host.
        item: String,
        /// Number of items in the dropped stack.
        stack: u32,
        /// Item prefix applied to the drop.
        prefix: i32,
    },
    /// Counts a kill of the entity towards the host's kill tallies.
    TallyKill {
        /// Slot of the killed entity.
        slot: EntitySlot,
    },
    /// Sends a message to every connected player.
    Broadcast {
        /// Text of the message.
        message: String,
        /// Colour the message is rendered with.
        color: MessageColor,
    },
    /// Sends a message to a single player.
    SendMessage {
        /// Recipient of the message.
        player: PlayerSlot,
        /// Text of the message.
        message: String,
        /// Colour the message is rendered with.
        color: MessageColor,
    },
    /// Reports campaign progress to a single player.
    ReportProgress {
        /// Recipient of the progress report.
        player: PlayerSlot,
        /// Progress values displayed to the player.
        progress: CampaignProgress,
    },
}

/// Events returned by the host after executing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a requested entity was created.
    EntitySpawned {
        /// Slot allocated to the new entity.
        slot: EntitySlot,
        /// Archetype the entity was created with.
        archetype: ArchetypeId,
    },
    /// Reports that the host could not create a requested entity.
    SpawnRejected {
        /// Archetype that was requested.
        archetype: ArchetypeId,
    },
    /// Confirms that an item stack was dropped.
    ItemDropped {
        /// Item that was dropped.
        item: String,
        /// Number of items in the stack.
        stack: u32,
    },
    /// Reports that the host did not recognise a requested item.
    ItemRejected {
        /// Item that was requested.
        item: String,
    },
}

/// Snapshot of a running campaign's progress for the current wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CampaignProgress {
    /// Points accumulated during the current wave.
    pub points: u32,
    /// Points required to complete the current wave.
    pub required: u32,
    /// One-based number of the current wave.
    pub wave: u32,
}

/// Colour applied to chat messages sent by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl MessageColor {
    /// Colour used for wave start announcements.
    pub const WAVE: Self = Self::from_rgb(175, 25, 255);
    /// Colour used for campaign completion announcements.
    pub const COMPLETED: Self = Self::from_rgb(175, 75, 225);
    /// Colour used for informational replies.
    pub const INFO: Self = Self::from_rgb(255, 255, 0);
    /// Colour used for successful command replies.
    pub const SUCCESS: Self = Self::from_rgb(0, 128, 0);
    /// Colour used for command errors.
    pub const ERROR: Self = Self::from_rgb(255, 0, 0);

    /// Creates a new message colour from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the colour.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the colour.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the colour.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}
