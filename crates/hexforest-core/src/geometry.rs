//! Axis geometry of the hexagonal grid.
//!
//! The grid has three symmetry axes. Each axis groups cells into lines
//! (rows for X, south-west/north-east columns for Y, north-west/south-east
//! diagonals for Z). Layer distances measured along the three axes sum to
//! twice the hex distance, which is what the parent rule relies on.

use serde::{Deserialize, Serialize};

use crate::components::Direction::{self, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Static direction data for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisData {
    /// Co-linear neighbors; links along these cost nothing.
    pub primary: [Direction; 2],
    /// Neighbors on one side of the line, in preference order.
    pub side_a: [Direction; 2],
    /// Neighbors on the other side of the line, in preference order.
    pub side_b: [Direction; 2],
    /// The end of the line at which an agent bridges to both sides.
    pub boundary: Direction,
}

const X_AXIS: AxisData = AxisData {
    primary: [West, East],
    side_a: [NorthWest, NorthEast],
    side_b: [SouthWest, SouthEast],
    boundary: West,
};

const Y_AXIS: AxisData = AxisData {
    primary: [SouthWest, NorthEast],
    side_a: [NorthWest, West],
    side_b: [East, SouthEast],
    boundary: NorthEast,
};

const Z_AXIS: AxisData = AxisData {
    primary: [SouthEast, NorthWest],
    side_a: [SouthWest, West],
    side_b: [East, NorthEast],
    boundary: SouthEast,
};

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn data(self) -> &'static AxisData {
        match self {
            Axis::X => &X_AXIS,
            Axis::Y => &Y_AXIS,
            Axis::Z => &Z_AXIS,
        }
    }

    /// Whether `dir` runs along this axis' lines.
    pub fn is_primary(self, dir: Direction) -> bool {
        self.data().primary.contains(&dir)
    }

    /// Link cost of stepping in `dir` when layering along this axis.
    pub fn step_cost(self, dir: Direction) -> u32 {
        if self.is_primary(dir) {
            0
        } else {
            1
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_direction_primary_once() {
        for dir in Direction::ALL {
            let count = Axis::ALL.iter().filter(|a| a.is_primary(dir)).count();
            assert_eq!(count, 1, "{} should be primary on exactly one axis", dir);
        }
    }

    #[test]
    fn test_axis_partitions_ports() {
        for axis in Axis::ALL {
            let d = axis.data();
            let mut all: Vec<Direction> = d
                .primary
                .iter()
                .chain(d.side_a.iter())
                .chain(d.side_b.iter())
                .copied()
                .collect();
            all.sort();
            all.dedup();
            assert_eq!(all.len(), 6, "axis {} must cover all six ports", axis);
            assert!(axis.is_primary(d.boundary));
        }
    }

    #[test]
    fn test_primary_pairs_are_opposite() {
        for axis in Axis::ALL {
            let [a, b] = axis.data().primary;
            assert_eq!(a.opposite(), b);
        }
    }
}
