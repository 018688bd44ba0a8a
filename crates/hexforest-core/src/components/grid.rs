//! Grid substrate components: axial cell coordinates, compass directions
//! and the per-agent neighbor table.

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// One of the six ports of a cell, numbered counter-clockwise from east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    East = 0,
    NorthEast = 1,
    NorthWest = 2,
    West = 3,
    SouthWest = 4,
    SouthEast = 5,
}

impl Direction {
    /// Fixed enumeration order, EAST..SOUTHEAST.
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    /// The port on the neighbor that faces back at us.
    pub fn opposite(self) -> Self {
        self.rotate(3)
    }

    /// Rotate counter-clockwise by `steps` ports.
    pub fn rotate(self, steps: usize) -> Self {
        Self::from_index(self.index() + steps)
    }

    /// Axial coordinate offset of the neighboring cell.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::NorthEast => (0, 1),
            Direction::NorthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::SouthWest => (0, -1),
            Direction::SouthEast => (1, -1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::East => "EAST",
            Direction::NorthEast => "NORTHEAST",
            Direction::NorthWest => "NORTHWEST",
            Direction::West => "WEST",
            Direction::SouthWest => "SOUTHWEST",
            Direction::SouthEast => "SOUTHEAST",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Axial coordinates of a grid cell. Rows run east-west (constant `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hex {
    pub x: i32,
    pub y: i32,
}

impl Hex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn neighbor(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn neighbors(self) -> impl Iterator<Item = (Direction, Hex)> {
        Direction::ALL.into_iter().map(move |d| (d, self.neighbor(d)))
    }

    /// Hex distance on an unobstructed grid.
    pub fn distance(self, other: Hex) -> u32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        ((dx.abs() + dy.abs() + (dx + dy).abs()) / 2) as u32
    }
}

impl std::fmt::Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fixed grid position of an agent. Agents never move in this simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub hex: Hex,
}

/// Neighbor table indexed by direction; the substrate's `hasNeighbor` /
/// `neighbor` lookup. Built once at spawn, never serialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct Links {
    ports: [Option<Entity>; 6],
}

impl Links {
    pub fn new(ports: [Option<Entity>; 6]) -> Self {
        Self { ports }
    }

    pub fn get(&self, dir: Direction) -> Option<Entity> {
        self.ports[dir.index()]
    }

    pub fn has(&self, dir: Direction) -> bool {
        self.ports[dir.index()].is_some()
    }

    /// Occupied ports in EAST..SOUTHEAST order.
    pub fn occupied(&self) -> impl Iterator<Item = (Direction, Entity)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.get(d).map(|e| (d, e)))
    }

    pub fn degree(&self) -> usize {
        self.ports.iter().filter(|p| p.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_and_rotate() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.rotate(6), dir);
            let (dx, dy) = dir.offset();
            let (ox, oy) = dir.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        assert_eq!(Direction::SouthEast.rotate(1), Direction::East);
    }

    #[test]
    fn test_hex_distance() {
        let origin = Hex::new(0, 0);
        for (_, n) in origin.neighbors() {
            assert_eq!(origin.distance(n), 1);
        }
        assert_eq!(origin.distance(Hex::new(3, 0)), 3);
        assert_eq!(origin.distance(Hex::new(2, -2)), 2);
        assert_eq!(origin.distance(Hex::new(2, 2)), 4);
    }

    #[test]
    fn test_links_occupied_order() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let mut ports = [None; 6];
        ports[Direction::SouthEast.index()] = Some(a);
        ports[Direction::NorthEast.index()] = Some(b);
        let links = Links::new(ports);

        let dirs: Vec<_> = links.occupied().map(|(d, _)| d).collect();
        assert_eq!(dirs, vec![Direction::NorthEast, Direction::SouthEast]);
        assert_eq!(links.degree(), 2);
        assert!(!links.has(Direction::West));
    }
}
