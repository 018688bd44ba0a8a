//! Agent state components. One entity per agent; each component holds the
//! fields owned by one protocol phase.

use serde::{Deserialize, Serialize};

use super::grid::Direction;
use crate::geometry::Axis;

/// Construction-time flags. Never change after spawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub source: bool,
    pub target: bool,
}

impl Role {
    pub fn source() -> Self {
        Self {
            source: true,
            target: false,
        }
    }

    pub fn target() -> Self {
        Self {
            source: false,
            target: true,
        }
    }
}

/// Ordered set of at most four directions, insert-if-absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalDirs {
    slots: [Option<Direction>; 4],
}

impl PortalDirs {
    pub const CAPACITY: usize = 4;

    /// Returns true if `dir` was added.
    pub fn insert(&mut self, dir: Direction) -> bool {
        if self.contains(dir) {
            return false;
        }
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(dir);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, dir: Direction) -> bool {
        self.slots.contains(&Some(dir))
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    pub fn clear(&mut self) {
        self.slots = [None; 4];
    }
}

/// Which portal graph an agent currently holds. Scopes only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortalScope {
    #[default]
    Unbuilt,
    /// Built over every physical neighbor, before regions exist.
    Initial,
    /// Rebuilt over same-region neighbors only.
    Regional,
    /// Rebuilt over every neighbor with extra side bridges, for reconciliation.
    Global,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portals {
    pub scope: PortalScope,
    pub axes: [PortalDirs; 3],
}

impl Portals {
    pub fn dirs(&self, axis: Axis) -> &PortalDirs {
        &self.axes[axis.index()]
    }

    pub fn dirs_mut(&mut self, axis: Axis) -> &mut PortalDirs {
        &mut self.axes[axis.index()]
    }

    /// Clears all three axes at once; no axis is ever rebuilt alone.
    pub fn clear_all(&mut self) {
        for dirs in &mut self.axes {
            dirs.clear();
        }
    }
}

/// Row flooding, cut detection and region membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Row flood id of the source sharing this agent's row.
    pub portal_id: Option<u32>,
    pub signal_sent: bool,
    pub north_cut: bool,
    pub south_cut: bool,
    pub cut_done: bool,
    pub region: Option<u32>,
    pub split_visited: bool,
}

/// Per-axis layer numbers, indexed by `Axis::index`.
pub type Layers = [u32; 3];

pub fn layer_sum(layers: &Layers) -> u32 {
    layers.iter().sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layering {
    /// Regional layering, overwritten once if reconciliation re-roots.
    pub primary: Option<Layers>,
    /// Layering over the global portal graph.
    pub secondary: Option<Layers>,
    pub source_distance_calculated: bool,
    pub secondary_calculated: bool,
}

impl Layering {
    /// Sources sit at layer zero on every axis from the start.
    pub fn for_role(role: Role) -> Self {
        let origin = role.source.then_some([0; 3]);
        Self {
            primary: origin,
            secondary: origin,
            ..Self::default()
        }
    }

    pub fn primary_sum(&self) -> Option<u32> {
        self.primary.as_ref().map(layer_sum)
    }

    pub fn secondary_sum(&self) -> Option<u32> {
        self.secondary.as_ref().map(layer_sum)
    }
}

/// Spanning-forest membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub parent: Option<Direction>,
    /// Regional election finished, with or without a parent.
    pub resolved: bool,
    /// Resolved without a parent.
    pub orphaned: bool,
    pub new_parent_chosen: bool,
    pub rerooted: bool,
    /// Sources only: reconciliation wave already sent.
    pub wave_sent: bool,
}

/// Euler tour labels and pruning state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub in_edge: [Option<u32>; 6],
    pub out_edge: [Option<u32>; 6],
    pub euler_done: bool,
    pub target_used: bool,
    /// Pruning already applied.
    pub visited: bool,
}

impl Tour {
    pub fn labeled_out_edges(&self) -> usize {
        self.out_edge.iter().flatten().count()
    }

    pub fn has_live_edge(&self) -> bool {
        self.in_edge.iter().any(Option::is_some) || self.out_edge.iter().any(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_dirs_insert_if_absent() {
        let mut dirs = PortalDirs::default();
        assert!(dirs.is_empty());
        assert!(dirs.insert(Direction::West));
        assert!(!dirs.insert(Direction::West));
        assert!(dirs.insert(Direction::East));
        assert_eq!(dirs.len(), 2);
        assert_eq!(
            dirs.iter().collect::<Vec<_>>(),
            vec![Direction::West, Direction::East]
        );
    }

    #[test]
    fn test_portal_dirs_capacity() {
        let mut dirs = PortalDirs::default();
        for dir in Direction::ALL.iter().take(PortalDirs::CAPACITY) {
            assert!(dirs.insert(*dir));
        }
        assert!(!dirs.insert(Direction::SouthWest));
        assert_eq!(dirs.len(), PortalDirs::CAPACITY);
        dirs.clear();
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_layering_for_source() {
        let layering = Layering::for_role(Role::source());
        assert_eq!(layering.primary_sum(), Some(0));
        assert_eq!(layering.secondary_sum(), Some(0));

        let plain = Layering::for_role(Role::default());
        assert_eq!(plain.primary_sum(), None);
    }

    #[test]
    fn test_portal_scope_order() {
        assert!(PortalScope::Unbuilt < PortalScope::Initial);
        assert!(PortalScope::Initial < PortalScope::Regional);
        assert!(PortalScope::Regional < PortalScope::Global);
    }
}
