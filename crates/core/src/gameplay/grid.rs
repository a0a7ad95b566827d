use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Integer tile coordinate. `y` grows northwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.saturating_add(dx.saturating_mul(distance)),
            y: self.y.saturating_add(dy.saturating_mul(distance)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    /// Maps a raw input axis pair to a single direction. Horizontal input
    /// wins, so diagonals collapse to east or west.
    pub fn from_axes(x: f32, y: f32) -> Option<Self> {
        if x > 0.0 {
            Some(Direction::East)
        } else if x < 0.0 {
            Some(Direction::West)
        } else if y > 0.0 {
            Some(Direction::North)
        } else if y < 0.0 {
            Some(Direction::South)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub u32);

/// Tile queries the consumers need from the level.
pub trait Grid {
    fn is_ground(&self, cell: GridCell) -> bool;

    fn is_wall(&self, cell: GridCell) -> bool;

    fn instrument_at(&self, cell: GridCell) -> Option<InstrumentId>;

    fn is_walkable(&self, cell: GridCell) -> bool {
        self.is_ground(cell) && !self.is_wall(cell)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TileMap {
    ground: HashSet<GridCell>,
    walls: HashSet<GridCell>,
    instruments: HashMap<GridCell, InstrumentId>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ground covering the inclusive rectangle `min..=max`.
    pub fn rectangle(min: GridCell, max: GridCell) -> Self {
        let mut map = Self::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                map.add_ground(GridCell::new(x, y));
            }
        }
        map
    }

    pub fn add_ground(&mut self, cell: GridCell) {
        self.ground.insert(cell);
    }

    pub fn add_wall(&mut self, cell: GridCell) {
        self.walls.insert(cell);
    }

    pub fn place_instrument(&mut self, cell: GridCell, id: InstrumentId) {
        self.instruments.insert(cell, id);
    }
}

impl Grid for TileMap {
    fn is_ground(&self, cell: GridCell) -> bool {
        self.ground.contains(&cell)
    }

    fn is_wall(&self, cell: GridCell) -> bool {
        self.walls.contains(&cell)
    }

    fn instrument_at(&self, cell: GridCell) -> Option<InstrumentId> {
        self.instruments.get(&cell).copied()
    }
}
