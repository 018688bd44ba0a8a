//! Grid layouts - which cells are occupied, and which of them are sources
//! or targets. A layout is plain data; `spawn_layout` turns it into agents.

use std::collections::{HashMap, HashSet, VecDeque};

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::components::{Cell, Hex, Layering, Lineage, Links, Partition, Portals, Role, Tour};
use crate::engine::ForestError;

/// One occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpec {
    pub hex: Hex,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    cells: Vec<CellSpec>,
}

impl GridLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain cells, no sources or targets.
    pub fn from_hexes(hexes: impl IntoIterator<Item = Hex>) -> Self {
        Self {
            cells: hexes
                .into_iter()
                .map(|hex| CellSpec {
                    hex,
                    role: Role::default(),
                })
                .collect(),
        }
    }

    /// Every cell within `radius` steps of the origin.
    pub fn hexagon(radius: u32) -> Self {
        let r = radius as i32;
        let origin = Hex::new(0, 0);
        Self::from_hexes(
            (-r..=r)
                .flat_map(|x| (-r..=r).map(move |y| Hex::new(x, y)))
                .filter(|hex| origin.distance(*hex) <= radius),
        )
    }

    /// `width` cells per row, `height` rows, starting at the origin.
    pub fn parallelogram(width: u32, height: u32) -> Self {
        Self::from_hexes(
            (0..width as i32).flat_map(|x| (0..height as i32).map(move |y| Hex::new(x, y))),
        )
    }

    /// Add a cell, or overwrite the role of an existing one.
    pub fn insert(&mut self, hex: Hex, role: Role) {
        match self.cells.iter_mut().find(|c| c.hex == hex) {
            Some(cell) => cell.role = role,
            None => self.cells.push(CellSpec { hex, role }),
        }
    }

    pub fn with_source(mut self, hex: Hex) -> Self {
        self.insert(hex, Role::source());
        self
    }

    pub fn with_target(mut self, hex: Hex) -> Self {
        self.insert(hex, Role::target());
        self
    }

    pub fn cells(&self) -> &[CellSpec] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellSpec] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.cells.iter().any(|c| c.hex == hex)
    }

    pub fn role(&self, hex: Hex) -> Option<Role> {
        self.cells.iter().find(|c| c.hex == hex).map(|c| c.role)
    }

    pub fn sources(&self) -> impl Iterator<Item = Hex> + '_ {
        self.cells.iter().filter(|c| c.role.source).map(|c| c.hex)
    }

    pub fn targets(&self) -> impl Iterator<Item = Hex> + '_ {
        self.cells.iter().filter(|c| c.role.target).map(|c| c.hex)
    }

    /// Number of occupied cells reachable from the first one.
    fn reachable(&self) -> usize {
        let occupied: HashSet<Hex> = self.cells.iter().map(|c| c.hex).collect();
        let Some(start) = self.cells.first().map(|c| c.hex) else {
            return 0;
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(hex) = queue.pop_front() {
            for (_, next) in hex.neighbors() {
                if occupied.contains(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len()
    }

    pub fn is_connected(&self) -> bool {
        self.reachable() == self.cells.len()
    }

    /// Whether some empty cell is enclosed by the layout.
    pub fn has_holes(&self) -> bool {
        let occupied: HashSet<Hex> = self.cells.iter().map(|c| c.hex).collect();
        let Some(first) = self.cells.first() else {
            return false;
        };
        let (mut min, mut max) = (first.hex, first.hex);
        for hex in &occupied {
            min = Hex::new(min.x.min(hex.x), min.y.min(hex.y));
            max = Hex::new(max.x.max(hex.x), max.y.max(hex.y));
        }
        // Flood the empty cells of a one-cell margin around the bounding box
        let inside = |h: &Hex| h.x >= min.x - 1 && h.x <= max.x + 1 && h.y >= min.y - 1 && h.y <= max.y + 1;
        let start = Hex::new(min.x - 1, min.y - 1);
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(hex) = queue.pop_front() {
            for (_, next) in hex.neighbors() {
                if inside(&next) && !occupied.contains(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        let box_cells = ((max.x - min.x + 3) * (max.y - min.y + 3)) as usize;
        seen.len() + occupied.len() < box_cells
    }

    /// Reject layouts the protocol cannot run on.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.cells.is_empty() {
            return Err(ForestError::EmptyLayout);
        }
        let mut seen = HashSet::new();
        for cell in &self.cells {
            if !seen.insert(cell.hex) {
                return Err(ForestError::DuplicateCell(cell.hex));
            }
        }
        if self.sources().next().is_none() {
            return Err(ForestError::NoSources);
        }
        let reached = self.reachable();
        if reached != self.cells.len() {
            return Err(ForestError::Disconnected {
                reached,
                total: self.cells.len(),
            });
        }
        Ok(())
    }
}

/// Spawn one agent per cell and wire up neighbor links.
pub fn spawn_layout(world: &mut World, layout: &GridLayout) -> HashMap<Hex, Entity> {
    let mut index = HashMap::with_capacity(layout.len());
    for cell in layout.cells() {
        let entity = world.spawn((
            Cell { hex: cell.hex },
            cell.role,
            Links::default(),
            Portals::default(),
            Partition::default(),
            Layering::for_role(cell.role),
            Lineage::default(),
            Tour::default(),
        ));
        index.insert(cell.hex, entity);
    }

    for (&hex, &entity) in &index {
        let mut ports = [None; 6];
        for (dir, next) in hex.neighbors() {
            ports[dir.index()] = index.get(&next).copied();
        }
        if let Ok(mut links) = world.get::<&mut Links>(entity) {
            *links = Links::new(ports);
        }
    }
    index
}
