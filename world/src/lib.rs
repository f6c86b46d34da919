#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory reference host for the Horde engine.
//!
//! The world keeps a tile grid, fixed entity and player slot arenas, and a
//! record of everything the engine asked it to do. It implements
//! [`horde_core::Host`] so tests and the CLI can drive the engine without a
//! real game server behind it.

mod tiles;

use std::collections::{HashMap, HashSet};

use horde_core::{
    ArchetypeId, CampaignProgress, Command, EntityAttributes, EntitySlot, EntitySnapshot,
    EntityView, Event, Host, MessageColor, PixelRect, PlayerSlot, PlayerView, TileCoord,
    TileQuery, Vec2, WorldInfo, MAX_ENTITY_SLOTS, MAX_PLAYER_SLOTS,
};

pub use tiles::Tile;

use tiles::TileGrid;

/// Hitbox dimensions given to every spawned entity.
const ENTITY_SIZE: Vec2 = Vec2::new(18.0, 24.0);
/// Hitbox dimensions given to every connected player.
const PLAYER_SIZE: Vec2 = Vec2::new(20.0, 42.0);
/// Last entity slot is reserved by the host and never allocated.
const USABLE_ENTITY_SLOTS: usize = MAX_ENTITY_SLOTS - 1;
/// Items every new world knows about.
const DEFAULT_ITEMS: [&str; 6] = [
    "Gel",
    "Copper Coin",
    "Silver Coin",
    "Heart",
    "Lesser Healing Potion",
    "Wooden Arrow",
];

/// Represents the authoritative reference world.
#[derive(Debug)]
pub struct World {
    grid: TileGrid,
    info: WorldInfo,
    entities: Vec<Option<Entity>>,
    players: Vec<Option<Player>>,
    items: HashSet<String>,
    messages: Vec<SentMessage>,
    drops: Vec<ItemDrop>,
    progress: Vec<ProgressReport>,
    sync_requests: Vec<EntitySlot>,
    kill_tallies: HashMap<ArchetypeId, u32>,
}

impl World {
    /// Creates an empty world of the provided size in tiles, filled with air.
    ///
    /// The world spawn sits in the middle column on the surface row, a third
    /// of the way down.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        let grid = TileGrid::new(width, height);
        let (width, height) = grid.dimensions();
        let surface_row = height / 3;
        Self {
            grid,
            info: WorldInfo::new(TileCoord::new(width / 2, surface_row), surface_row),
            entities: vec![None; MAX_ENTITY_SLOTS],
            players: vec![None; MAX_PLAYER_SLOTS],
            items: DEFAULT_ITEMS
                .iter()
                .map(|item| item.to_ascii_lowercase())
                .collect(),
            messages: Vec::new(),
            drops: Vec::new(),
            progress: Vec::new(),
            sync_requests: Vec::new(),
            kill_tallies: HashMap::new(),
        }
    }

    /// Replaces the static world description.
    pub fn set_info(&mut self, info: WorldInfo) {
        self.info = info;
    }

    /// Stores a tile; coordinates outside the world are ignored.
    pub fn set_tile(&mut self, tile: TileCoord, value: Tile) {
        self.grid.set(tile, value);
    }

    /// Stores the same tile in every coordinate of the inclusive rectangle
    /// spanned by `from` and `to`.
    pub fn fill(&mut self, from: TileCoord, to: TileCoord, value: Tile) {
        for y in from.y().min(to.y())..=from.y().max(to.y()) {
            for x in from.x().min(to.x())..=from.x().max(to.x()) {
                self.grid.set(TileCoord::new(x, y), value);
            }
        }
    }

    /// Turns every row from `row` downwards into solid ground.
    pub fn fill_ground(&mut self, row: i32) {
        let (width, height) = self.grid.dimensions();
        if width == 0 || row >= height {
            return;
        }
        self.fill(
            TileCoord::new(0, row.max(0)),
            TileCoord::new(width - 1, height - 1),
            Tile::SOLID,
        );
    }

    /// Makes an item name known so drops of it succeed.
    pub fn register_item(&mut self, item: &str) {
        let _ = self.items.insert(item.to_ascii_lowercase());
    }

    /// Connects a player at the provided pixel position.
    ///
    /// Returns `None` when every player slot is taken.
    pub fn connect_player(&mut self, name: &str, position: Vec2) -> Option<PlayerSlot> {
        let index = self.players.iter().position(Option::is_none)?;
        let slot = PlayerSlot::new(u8::try_from(index).ok()?);
        self.players[index] = Some(Player {
            name: name.to_owned(),
            position,
            active_entities: 0,
            immune: false,
        });
        Some(slot)
    }

    /// Disconnects a player.
    pub fn disconnect_player(&mut self, slot: PlayerSlot) {
        if let Some(player) = self.players.get_mut(slot.index()) {
            *player = None;
        }
    }

    /// Moves a player to the provided pixel position.
    pub fn move_player(&mut self, slot: PlayerSlot, position: Vec2) {
        if let Some(player) = self.player_mut(slot) {
            player.position = position;
        }
    }

    /// Starts or ends a player's post-hit immunity window.
    pub fn set_player_immune(&mut self, slot: PlayerSlot, immune: bool) {
        if let Some(player) = self.player_mut(slot) {
            player.immune = immune;
        }
    }

    /// Overwrites the active-entity counter of a player, as the host does
    /// when it recounts entities near them.
    pub fn set_player_active_entities(&mut self, slot: PlayerSlot, count: u32) {
        if let Some(player) = self.player_mut(slot) {
            player.active_entities = count;
        }
    }

    /// Spawns an entity on the host's own initiative; `position` is the
    /// bottom centre of its hitbox.
    pub fn spawn_native(&mut self, archetype: ArchetypeId, position: Vec2) -> Option<EntitySlot> {
        let index = self.entities[..USABLE_ENTITY_SLOTS]
            .iter()
            .position(Option::is_none)?;
        let slot = EntitySlot::new(u16::try_from(index).ok()?);
        self.entities[index] = Some(Entity {
            archetype,
            position: Vec2::new(position.x - ENTITY_SIZE.x / 2.0, position.y - ENTITY_SIZE.y),
            size: ENTITY_SIZE,
            attributes: archetype_defaults(archetype),
        });
        Some(slot)
    }

    /// Removes an entity, returning its last snapshot.
    pub fn despawn(&mut self, slot: EntitySlot) -> Option<EntitySnapshot> {
        let entity = self.entities.get_mut(slot.index())?.take()?;
        Some(entity.snapshot(slot))
    }

    /// Moves an entity so the top-left corner of its hitbox sits at `position`.
    pub fn move_entity(&mut self, slot: EntitySlot, position: Vec2) {
        if let Some(entity) = self.entity_mut(slot) {
            entity.position = position;
        }
    }

    /// Turns an active entity into another archetype, resetting its stats.
    pub fn transform(&mut self, slot: EntitySlot, archetype: ArchetypeId) {
        if let Some(entity) = self.entity_mut(slot) {
            entity.archetype = archetype;
            entity.attributes = archetype_defaults(archetype);
        }
    }

    /// Forgets every recorded message, drop, progress report and sync request.
    pub fn clear_records(&mut self) {
        self.messages.clear();
        self.drops.clear();
        self.progress.clear();
        self.sync_requests.clear();
    }

    fn player_mut(&mut self, slot: PlayerSlot) -> Option<&mut Player> {
        self.players.get_mut(slot.index())?.as_mut()
    }

    fn entity_mut(&mut self, slot: EntitySlot) -> Option<&mut Entity> {
        self.entities.get_mut(slot.index())?.as_mut()
    }

    fn entity_ref(&self, slot: EntitySlot) -> Option<&Entity> {
        self.entities.get(slot.index())?.as_ref()
    }
}

impl TileQuery for World {
    fn dimensions(&self) -> (i32, i32) {
        self.grid.dimensions()
    }

    fn is_solid(&self, tile: TileCoord) -> bool {
        self.grid.get(tile).is_solid()
    }

    fn is_lava(&self, tile: TileCoord) -> bool {
        self.grid.get(tile).is_lava()
    }

    fn has_house_wall(&self, tile: TileCoord) -> bool {
        self.grid.get(tile).has_house_wall()
    }
}

impl Host for World {
    fn world_info(&self) -> WorldInfo {
        self.info
    }

    fn entity_view(&self) -> EntityView {
        query::entity_view(self)
    }

    fn player_view(&self) -> PlayerView {
        query::player_view(self)
    }

    fn entity(&self, slot: EntitySlot) -> Option<EntitySnapshot> {
        query::entity(self, slot)
    }

    fn attributes(&self, slot: EntitySlot) -> Option<EntityAttributes> {
        query::attributes(self, slot).cloned()
    }

    fn apply(&mut self, command: Command, out_events: &mut Vec<Event>) {
        apply(self, command, out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SpawnEntity {
            archetype,
            position,
        } => match world.spawn_native(archetype, position) {
            Some(slot) => out_events.push(Event::EntitySpawned { slot, archetype }),
            None => out_events.push(Event::SpawnRejected { archetype }),
        },
        Command::SetDefaults { slot, archetype } => world.transform(slot, archetype),
        Command::SetAttributes { slot, attributes } => {
            if let Some(entity) = world.entity_mut(slot) {
                entity.attributes = attributes;
            }
        }
        Command::MarkForSync { slot } => world.sync_requests.push(slot),
        Command::SetActiveEntityCount { player, count } => {
            world.set_player_active_entities(player, count);
        }
        Command::DropItem {
            area,
            item,
            stack,
            prefix,
        } => {
            let known = world.items.contains(&item.to_ascii_lowercase())
                || item.parse::<i32>().is_ok_and(|id| id > 0);
            if known {
                world.drops.push(ItemDrop {
                    area,
                    item: item.clone(),
                    stack,
                    prefix,
                });
                out_events.push(Event::ItemDropped { item, stack });
            } else {
                out_events.push(Event::ItemRejected { item });
            }
        }
        Command::TallyKill { slot } => {
            if let Some(archetype) = world.entity_ref(slot).map(|entity| entity.archetype) {
                *world.kill_tallies.entry(archetype).or_insert(0) += 1;
            }
        }
        Command::Broadcast { message, color } => world.messages.push(SentMessage {
            recipient: None,
            text: message,
            color,
        }),
        Command::SendMessage {
            player,
            message,
            color,
        } => world.messages.push(SentMessage {
            recipient: Some(player),
            text: message,
            color,
        }),
        Command::ReportProgress { player, progress } => {
            world.progress.push(ProgressReport { player, progress });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use horde_core::{
        ArchetypeId, EntityAttributes, EntitySlot, EntitySnapshot, EntityView, PlayerSlot,
        PlayerSnapshot, PlayerView,
    };

    use super::{ItemDrop, ProgressReport, SentMessage, World, PLAYER_SIZE};

    /// Captures every active entity in slot order.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        let snapshots = world
            .entities
            .iter()
            .enumerate()
            .filter_map(|(index, entity)| {
                let slot = EntitySlot::new(u16::try_from(index).ok()?);
                entity.as_ref().map(|entity| entity.snapshot(slot))
            })
            .collect();
        EntityView::from_snapshots(snapshots)
    }

    /// Captures every connected player in slot order.
    #[must_use]
    pub fn player_view(world: &World) -> PlayerView {
        let snapshots = world
            .players
            .iter()
            .enumerate()
            .filter_map(|(index, player)| {
                let slot = PlayerSlot::new(u8::try_from(index).ok()?);
                player.as_ref().map(|player| PlayerSnapshot {
                    slot,
                    name: player.name.clone(),
                    position: player.position,
                    size: PLAYER_SIZE,
                    active_entities: player.active_entities,
                    immune: player.immune,
                })
            })
            .collect();
        PlayerView::from_snapshots(snapshots)
    }

    /// Snapshot of a single active entity.
    #[must_use]
    pub fn entity(world: &World, slot: EntitySlot) -> Option<EntitySnapshot> {
        world.entity_ref(slot).map(|entity| entity.snapshot(slot))
    }

    /// Attribute block of an active entity.
    #[must_use]
    pub fn attributes(world: &World, slot: EntitySlot) -> Option<&EntityAttributes> {
        world.entity_ref(slot).map(|entity| &entity.attributes)
    }

    /// Number of active entities.
    #[must_use]
    pub fn entity_count(world: &World) -> usize {
        world.entities.iter().filter(|entity| entity.is_some()).count()
    }

    /// Number of active entities of the provided archetype.
    #[must_use]
    pub fn archetype_count(world: &World, archetype: ArchetypeId) -> usize {
        world
            .entities
            .iter()
            .flatten()
            .filter(|entity| entity.archetype == archetype)
            .count()
    }

    /// Active-entity counter the world tracks for a player.
    #[must_use]
    pub fn player_active_entities(world: &World, slot: PlayerSlot) -> Option<u32> {
        world
            .players
            .get(slot.index())?
            .as_ref()
            .map(|player| player.active_entities)
    }

    /// Messages sent since the records were last cleared, oldest first.
    #[must_use]
    pub fn messages(world: &World) -> &[SentMessage] {
        &world.messages
    }

    /// Item drops performed since the records were last cleared.
    #[must_use]
    pub fn drops(world: &World) -> &[ItemDrop] {
        &world.drops
    }

    /// Progress reports sent since the records were last cleared.
    #[must_use]
    pub fn progress_reports(world: &World) -> &[ProgressReport] {
        &world.progress
    }

    /// Entities flagged for client synchronisation since the records were
    /// last cleared.
    #[must_use]
    pub fn sync_requests(world: &World) -> &[EntitySlot] {
        &world.sync_requests
    }

    /// Kills tallied for the provided archetype.
    #[must_use]
    pub fn kill_tally(world: &World, archetype: ArchetypeId) -> u32 {
        world.kill_tallies.get(&archetype).copied().unwrap_or(0)
    }
}

/// Chat message recorded by the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// Player the message was addressed to, or `None` for broadcasts.
    pub recipient: Option<PlayerSlot>,
    /// Text of the message.
    pub text: String,
    /// Colour of the message.
    pub color: MessageColor,
}

/// Item stack dropped into the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemDrop {
    /// Area the item was dropped within.
    pub area: PixelRect,
    /// Item that was dropped.
    pub item: String,
    /// Number of items in the stack.
    pub stack: u32,
    /// Prefix applied to the item.
    pub prefix: i32,
}

/// Campaign progress shown to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressReport {
    /// Player the progress was shown to.
    pub player: PlayerSlot,
    /// Progress values shown.
    pub progress: CampaignProgress,
}

#[derive(Clone, Debug)]
struct Entity {
    archetype: ArchetypeId,
    position: Vec2,
    size: Vec2,
    attributes: EntityAttributes,
}

impl Entity {
    fn snapshot(&self, slot: EntitySlot) -> EntitySnapshot {
        EntitySnapshot {
            slot,
            archetype: self.archetype,
            position: self.position,
            size: self.size,
        }
    }
}

#[derive(Clone, Debug)]
struct Player {
    name: String,
    position: Vec2,
    active_entities: u32,
    immune: bool,
}

/// Stats the reference world assigns to a freshly typed entity.
fn archetype_defaults(archetype: ArchetypeId) -> EntityAttributes {
    let magnitude = i32::try_from(archetype.unsigned_abs()).unwrap_or(i32::MAX);
    EntityAttributes {
        ai_style: archetype.rem_euclid(8),
        defense: magnitude % 10,
        knockback_resist: 1.0,
        life: magnitude.saturating_mul(5).saturating_add(20),
        display_name: format!("Archetype {archetype}"),
        slot_cost: 1.0,
        value: 25.0,
        ..EntityAttributes::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_fills_lowest_free_slot_and_reports_it() {
        let mut world = World::new(40, 30);
        let mut events = Vec::new();
        let first = world.spawn_native(3, Vec2::new(100.0, 100.0));
        assert_eq!(first, Some(EntitySlot::new(0)));

        apply(
            &mut world,
            Command::SpawnEntity {
                archetype: 7,
                position: Vec2::new(168.0, 64.0),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::EntitySpawned {
                slot: EntitySlot::new(1),
                archetype: 7
            }]
        );
        let snapshot = query::entity(&world, EntitySlot::new(1)).expect("spawned");
        assert_eq!(snapshot.position, Vec2::new(159.0, 40.0));
    }

    #[test]
    fn spawns_are_rejected_when_slots_run_out() {
        let mut world = World::new(40, 30);
        for _ in 0..USABLE_ENTITY_SLOTS {
            assert!(world.spawn_native(1, Vec2::ZERO).is_some());
        }
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEntity {
                archetype: 1,
                position: Vec2::ZERO,
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::SpawnRejected { archetype: 1 }]);
        assert_eq!(query::entity_count(&world), USABLE_ENTITY_SLOTS);
    }

    #[test]
    fn set_defaults_resets_attributes() {
        let mut world = World::new(40, 30);
        let slot = world.spawn_native(2, Vec2::ZERO).expect("slot available");
        let mut events = Vec::new();
        let mut attributes = archetype_defaults(2);
        attributes.life = 999;
        apply(&mut world, Command::SetAttributes { slot, attributes }, &mut events);
        assert_eq!(query::attributes(&world, slot).map(|a| a.life), Some(999));

        apply(&mut world, Command::SetDefaults { slot, archetype: 5 }, &mut events);

        assert_eq!(query::attributes(&world, slot), Some(&archetype_defaults(5)));
        assert_eq!(query::archetype_count(&world, 5), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn unknown_items_are_rejected() {
        let mut world = World::new(40, 30);
        let mut events = Vec::new();
        let area = PixelRect::new(0, 0, 18, 24);
        for item in ["gel", "Unobtainium", "23"] {
            apply(
                &mut world,
                Command::DropItem {
                    area,
                    item: item.to_owned(),
                    stack: 2,
                    prefix: 0,
                },
                &mut events,
            );
        }
        assert_eq!(
            events,
            vec![
                Event::ItemDropped {
                    item: "gel".to_owned(),
                    stack: 2
                },
                Event::ItemRejected {
                    item: "Unobtainium".to_owned()
                },
                Event::ItemDropped {
                    item: "23".to_owned(),
                    stack: 2
                },
            ]
        );
        assert_eq!(query::drops(&world).len(), 2);
    }

    #[test]
    fn ground_fill_makes_tiles_solid() {
        let mut world = World::new(10, 10);
        world.fill_ground(7);
        assert!(!world.is_solid(TileCoord::new(3, 6)));
        assert!(world.is_solid(TileCoord::new(3, 7)));
        assert!(world.is_solid(TileCoord::new(9, 9)));
        assert_eq!(world.world_info().spawn_tile, TileCoord::new(5, 3));
    }
}
