#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded randomized search for ground tiles entities can spawn on.
//!
//! The search never places an entity inside solid tiles, lava or houses, and
//! never within sight of any connected player. Running out of attempts is an
//! ordinary outcome reported as `None`.

use horde_core::{PixelRect, PlayerSnapshot, PlayerView, TileCoord, TileQuery, WorldInfo, TILE_SIZE};
use rand::Rng;

/// Number of random tiles tried before a search gives up.
pub const SEARCH_ATTEMPTS: usize = 50;

/// Fraction of the screen, in tiles, that bounds the search around a player.
const SPAWN_RANGE_FACTOR: f64 = 0.7;
/// Fraction of the screen, in tiles, added around a player's view as pixels.
const SAFE_RANGE_FACTOR: f64 = 0.52;

/// Distances derived from the host's screen size and spawn space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnGeometry {
    range_x: i32,
    range_y: i32,
    safe_range_x: i32,
    safe_range_y: i32,
    screen_width: i32,
    screen_height: i32,
    spawn_space_x: i32,
    spawn_space_y: i32,
}

impl SpawnGeometry {
    /// Derives the search geometry from the host's world description.
    #[must_use]
    pub fn from_world(info: &WorldInfo) -> Self {
        let screen_tiles_x = f64::from(info.screen_width) / f64::from(TILE_SIZE);
        let screen_tiles_y = f64::from(info.screen_height) / f64::from(TILE_SIZE);
        Self {
            range_x: (screen_tiles_x * SPAWN_RANGE_FACTOR) as i32,
            range_y: (screen_tiles_y * SPAWN_RANGE_FACTOR) as i32,
            safe_range_x: (screen_tiles_x * SAFE_RANGE_FACTOR) as i32,
            safe_range_y: (screen_tiles_y * SAFE_RANGE_FACTOR) as i32,
            screen_width: info.screen_width,
            screen_height: info.screen_height,
            spawn_space_x: info.spawn_space_x,
            spawn_space_y: info.spawn_space_y,
        }
    }

    /// Horizontal search radius in tiles.
    #[must_use]
    pub const fn range_x(&self) -> i32 {
        self.range_x
    }

    /// Vertical search radius in tiles.
    #[must_use]
    pub const fn range_y(&self) -> i32 {
        self.range_y
    }

    /// Area around a player in which nothing may spawn: the player's screen
    /// grown by the safe range on every side.
    #[must_use]
    pub fn safe_zone(&self, player: &PlayerSnapshot) -> PixelRect {
        let center = player.center();
        let left = f64::from(center.x)
            - f64::from(self.screen_width) / 2.0
            - f64::from(self.safe_range_x);
        let top = f64::from(center.y)
            - f64::from(self.screen_height) / 2.0
            - f64::from(self.safe_range_y);
        PixelRect::new(
            left as i32,
            top as i32,
            self.screen_width + 2 * self.safe_range_x,
            self.screen_height + 2 * self.safe_range_y,
        )
    }
}

/// Finds spawn tiles near an anchor tile.
#[derive(Clone, Copy, Debug)]
pub struct SpawnLocationSearch {
    geometry: SpawnGeometry,
}

impl SpawnLocationSearch {
    /// Creates a search using the provided geometry.
    #[must_use]
    pub const fn new(geometry: SpawnGeometry) -> Self {
        Self { geometry }
    }

    /// Geometry the search was created with.
    #[must_use]
    pub const fn geometry(&self) -> &SpawnGeometry {
        &self.geometry
    }

    /// Searches the default screen-sized range around `anchor`.
    pub fn find<T, R>(
        &self,
        anchor: TileCoord,
        players: &PlayerView,
        tiles: &T,
        rng: &mut R,
    ) -> Option<TileCoord>
    where
        T: TileQuery + ?Sized,
        R: Rng + ?Sized,
    {
        self.find_within(
            anchor,
            self.geometry.range_x,
            self.geometry.range_y,
            players,
            tiles,
            rng,
        )
    }

    /// Searches `[anchor - radius, anchor + radius)` clamped to the world.
    ///
    /// Each attempt picks a random non-solid tile outside houses, drops to
    /// the first solid tile beneath it and checks that the air above is free
    /// of solid tiles and lava. The first such ground tile is returned unless
    /// its pixel square lies in any player's safe zone.
    pub fn find_within<T, R>(
        &self,
        anchor: TileCoord,
        radius_x: i32,
        radius_y: i32,
        players: &PlayerView,
        tiles: &T,
        rng: &mut R,
    ) -> Option<TileCoord>
    where
        T: TileQuery + ?Sized,
        R: Rng + ?Sized,
    {
        let (width, height) = tiles.dimensions();
        let min_x = anchor.x().saturating_sub(radius_x).max(0);
        let max_x = anchor.x().saturating_add(radius_x).min(width);
        let min_y = anchor.y().saturating_sub(radius_y).max(0);
        let max_y = anchor.y().saturating_add(radius_y).min(height);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }

        let candidate = (0..SEARCH_ATTEMPTS).find_map(|_| {
            let tile = TileCoord::new(rng.gen_range(min_x..max_x), rng.gen_range(min_y..max_y));
            self.ground_below(tile, tiles)
        })?;

        self.is_unseen(candidate, players).then_some(candidate)
    }

    /// Reports whether a spawn on `tile` stays outside every player's safe
    /// zone.
    #[must_use]
    pub fn is_unseen(&self, tile: TileCoord, players: &PlayerView) -> bool {
        let spawn = tile.pixel_rect();
        players
            .iter()
            .all(|player| !spawn.intersects(&self.geometry.safe_zone(player)))
    }

    fn ground_below<T>(&self, tile: TileCoord, tiles: &T) -> Option<TileCoord>
    where
        T: TileQuery + ?Sized,
    {
        if tiles.is_solid(tile) || tiles.has_house_wall(tile) {
            return None;
        }

        let (width, height) = tiles.dimensions();
        let ground = (tile.y()..height)
            .map(|y| TileCoord::new(tile.x(), y))
            .find(|&below| tiles.is_solid(below))?;

        let half_space = self.geometry.spawn_space_x / 2;
        let min_x = (ground.x() - half_space).max(0);
        let max_x = (ground.x() + half_space).min(width);
        let min_y = (ground.y() - self.geometry.spawn_space_y).max(0);
        let blocked = (min_x..max_x).any(|x| {
            (min_y..ground.y()).any(|y| {
                let air = TileCoord::new(x, y);
                tiles.is_solid(air) || tiles.is_lava(air)
            })
        });
        (!blocked).then_some(ground)
    }
}

/// Picks a random tile within range that is neither solid nor lava, falling
/// back to `anchor` when every attempt fails.
pub fn find_clear_tile<T, R>(
    anchor: TileCoord,
    radius_x: i32,
    radius_y: i32,
    tiles: &T,
    rng: &mut R,
) -> TileCoord
where
    T: TileQuery + ?Sized,
    R: Rng + ?Sized,
{
    let (width, height) = tiles.dimensions();
    let min_x = anchor.x().saturating_sub(radius_x).max(0);
    let max_x = anchor.x().saturating_add(radius_x).min(width - 1);
    let min_y = anchor.y().saturating_sub(radius_y).max(0);
    let max_y = anchor.y().saturating_add(radius_y).min(height - 1);
    if min_x > max_x || min_y > max_y {
        return anchor;
    }

    (0..SEARCH_ATTEMPTS)
        .map(|_| TileCoord::new(rng.gen_range(min_x..=max_x), rng.gen_range(min_y..=max_y)))
        .find(|&tile| !tiles.is_solid(tile) && !tiles.is_lava(tile))
        .unwrap_or(anchor)
}

#[cfg(test)]
mod tests {
    use horde_core::{PlayerSlot, Vec2};

    use super::*;

    fn geometry() -> SpawnGeometry {
        SpawnGeometry::from_world(&WorldInfo::new(TileCoord::new(0, 0), 0))
    }

    #[test]
    fn geometry_matches_default_screen() {
        let geometry = geometry();
        assert_eq!(geometry.range_x(), 84);
        assert_eq!(geometry.range_y(), 47);
        assert_eq!(geometry.safe_range_x, 62);
        assert_eq!(geometry.safe_range_y, 35);
    }

    #[test]
    fn safe_zone_surrounds_player_screen() {
        let player = PlayerSnapshot {
            slot: PlayerSlot::new(0),
            name: "alpha".to_owned(),
            position: Vec2::new(950.0, 519.0),
            size: Vec2::new(20.0, 42.0),
            active_entities: 0,
            immune: false,
        };
        let zone = geometry().safe_zone(&player);
        assert_eq!(zone, PixelRect::new(-62, -35, 1_920 + 124, 1_080 + 70));
    }
}
