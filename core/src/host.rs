//! Capabilities the host simulation exposes to the engine.

use crate::{
    Command, EntityAttributes, EntitySlot, EntitySnapshot, EntityView, Event, PlayerView,
    TileCoord,
};

/// Default width of the host's on-screen spawn exclusion box in pixels.
const DEFAULT_SCREEN_WIDTH: i32 = 1_920;
/// Default height of the host's on-screen spawn exclusion box in pixels.
const DEFAULT_SCREEN_HEIGHT: i32 = 1_080;
/// Default width in tiles an entity needs free to spawn.
const DEFAULT_SPAWN_SPACE_X: i32 = 3;
/// Default height in tiles an entity needs free to spawn.
const DEFAULT_SPAWN_SPACE_Y: i32 = 3;

/// Read-only access to the host's tile grid.
pub trait TileQuery {
    /// Width and height of the world measured in tiles.
    fn dimensions(&self) -> (i32, i32);

    /// Reports whether the tile is an active solid block.
    fn is_solid(&self, tile: TileCoord) -> bool;

    /// Reports whether the tile holds lava.
    fn is_lava(&self, tile: TileCoord) -> bool;

    /// Reports whether the tile is backed by a house wall that blocks spawning.
    fn has_house_wall(&self, tile: TileCoord) -> bool;
}

/// Full capability surface of the host simulation.
///
/// Spawns requested through [`Command::SpawnEntity`] are reported back
/// through the events written by [`Host::apply`]; the host only notifies the
/// engine separately about entities it creates on its own.
pub trait Host: TileQuery {
    /// Static description of the world layout.
    fn world_info(&self) -> WorldInfo;

    /// Captures every active entity.
    fn entity_view(&self) -> EntityView;

    /// Captures every connected player.
    fn player_view(&self) -> PlayerView;

    /// Captures a single active entity.
    fn entity(&self, slot: EntitySlot) -> Option<EntitySnapshot> {
        self.entity_view().get(slot).cloned()
    }

    /// Reads the attribute block of an active entity.
    fn attributes(&self, slot: EntitySlot) -> Option<EntityAttributes>;

    /// Executes a command, appending the resulting events.
    fn apply(&mut self, command: Command, out_events: &mut Vec<Event>);
}

/// Static layout facts about the host world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldInfo {
    /// Tile at which players enter the world.
    pub spawn_tile: TileCoord,
    /// Row separating the surface from the underground.
    pub surface_row: i32,
    /// Width of the on-screen spawn exclusion box in pixels.
    pub screen_width: i32,
    /// Height of the on-screen spawn exclusion box in pixels.
    pub screen_height: i32,
    /// Width in tiles that must be free above a spawn tile.
    pub spawn_space_x: i32,
    /// Height in tiles that must be free above a spawn tile.
    pub spawn_space_y: i32,
}

impl WorldInfo {
    /// Describes a world using the host's default screen and spawn space.
    #[must_use]
    pub const fn new(spawn_tile: TileCoord, surface_row: i32) -> Self {
        Self {
            spawn_tile,
            surface_row,
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            spawn_space_x: DEFAULT_SPAWN_SPACE_X,
            spawn_space_y: DEFAULT_SPAWN_SPACE_Y,
        }
    }
}
