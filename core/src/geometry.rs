//! Tile and pixel geometry shared by the spawn systems.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Edge length of a single world tile measured in pixels.
pub const TILE_SIZE: i32 = 16;

/// Location of a single world tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the tile, growing to the right.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile, growing downwards.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate shifted by the provided tile offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Resolves the tile that contains the provided pixel position.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        let size = TILE_SIZE as f32;
        Self::new(
            (position.x / size).floor() as i32,
            (position.y / size).floor() as i32,
        )
    }

    /// Pixel rectangle covered by the tile.
    #[must_use]
    pub const fn pixel_rect(self) -> PixelRect {
        PixelRect::new(
            self.x * TILE_SIZE,
            self.y * TILE_SIZE,
            TILE_SIZE,
            TILE_SIZE,
        )
    }

    /// Pixel position at which entities spawned on this tile are placed.
    ///
    /// Entities are centred horizontally and stand on the tile's top edge.
    #[must_use]
    pub fn spawn_position(self) -> Vec2 {
        Vec2::new(
            (self.x * TILE_SIZE + TILE_SIZE / 2) as f32,
            (self.y * TILE_SIZE) as f32,
        )
    }
}

/// Axis-aligned rectangle measured in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl PixelRect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle by truncating a floating point position and size.
    #[must_use]
    pub fn from_position_and_size(position: Vec2, size: Vec2) -> Self {
        Self::new(
            position.x as i32,
            position.y as i32,
            size.x as i32,
            size.y as i32,
        )
    }

    /// Left edge of the rectangle.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top edge of the rectangle.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Width of the rectangle.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height of the rectangle.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Exclusive right edge of the rectangle.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge of the rectangle.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Reports whether the two rectangles overlap.
    ///
    /// Rectangles that merely share an edge do not intersect.
    #[must_use]
    pub const fn intersects(&self, other: &PixelRect) -> bool {
        other.x < self.right()
            && self.x < other.right()
            && other.y < self.bottom()
            && self.y < other.bottom()
    }
}
