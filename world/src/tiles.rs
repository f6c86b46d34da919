//! Dense tile storage for the reference world.

use horde_core::TileCoord;

/// Contents of a single world tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tile {
    solid: bool,
    lava: bool,
    house_wall: bool,
}

impl Tile {
    /// Empty tile with nothing behind it.
    pub const AIR: Self = Self::new(false, false, false);
    /// Active solid block.
    pub const SOLID: Self = Self::new(true, false, false);
    /// Tile filled with lava.
    pub const LAVA: Self = Self::new(false, true, false);
    /// Empty tile backed by a house wall.
    pub const HOUSE: Self = Self::new(false, false, true);

    /// Creates a tile from its individual properties.
    #[must_use]
    pub const fn new(solid: bool, lava: bool, house_wall: bool) -> Self {
        Self {
            solid,
            lava,
            house_wall,
        }
    }

    /// Whether the tile is an active solid block.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.solid
    }

    /// Whether the tile holds lava.
    #[must_use]
    pub const fn is_lava(&self) -> bool {
        self.lava
    }

    /// Whether a house wall backs the tile.
    #[must_use]
    pub const fn has_house_wall(&self) -> bool {
        self.house_wall
    }
}

/// Row-major grid of tiles.
#[derive(Clone, Debug)]
pub(crate) struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub(crate) fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tiles: vec![Tile::AIR; width as usize * height as usize],
        }
    }

    pub(crate) const fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        let inside = (0..self.width).contains(&tile.x()) && (0..self.height).contains(&tile.y());
        inside.then(|| tile.y() as usize * self.width as usize + tile.x() as usize)
    }

    /// Tile stored at the coordinate; everything outside the grid is air.
    pub(crate) fn get(&self, tile: TileCoord) -> Tile {
        self.index(tile)
            .and_then(|index| self.tiles.get(index).copied())
            .unwrap_or(Tile::AIR)
    }

    pub(crate) fn set(&mut self, tile: TileCoord, value: Tile) {
        if let Some(index) = self.index(tile) {
            self.tiles[index] = value;
        }
    }
}
