//! Read-only agent snapshots and their JSON export

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::barrier::Barrier;
use crate::components::{layer_sum, read, Cell, Direction, Hex, Layering, Layers, Lineage, Partition, Role, Tour};

/// What an outside observer may see of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub hex: Hex,
    pub source: bool,
    pub target: bool,
    pub region: Option<u32>,
    pub portal_id: Option<u32>,
    pub parent: Option<Direction>,
    pub in_edge: [Option<u32>; 6],
    pub out_edge: [Option<u32>; 6],
    pub layers: Option<Layers>,
    pub orphaned: bool,
    pub rerooted: bool,
}

impl AgentView {
    pub fn read(world: &World, entity: Entity) -> Option<Self> {
        let cell = read::<Cell>(world, entity)?;
        let role = read::<Role>(world, entity).unwrap_or_default();
        let partition = read::<Partition>(world, entity).unwrap_or_default();
        let layering = read::<Layering>(world, entity).unwrap_or_default();
        let lineage = read::<Lineage>(world, entity).unwrap_or_default();
        let tour = read::<Tour>(world, entity).unwrap_or_default();
        Some(Self {
            hex: cell.hex,
            source: role.source,
            target: role.target,
            region: partition.region,
            portal_id: partition.portal_id,
            parent: lineage.parent,
            in_edge: tour.in_edge,
            out_edge: tour.out_edge,
            layers: layering.primary,
            orphaned: lineage.orphaned,
            rerooted: lineage.rerooted,
        })
    }

    pub fn layer_sum(&self) -> Option<u32> {
        self.layers.as_ref().map(layer_sum)
    }

    /// Hex of the parent, if any.
    pub fn parent_hex(&self) -> Option<Hex> {
        self.parent.map(|dir| self.hex.neighbor(dir))
    }
}

/// Whole-forest snapshot, as exported to JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub seed: u64,
    pub activations: u64,
    pub settled: bool,
    pub barrier: Barrier,
    pub agents: Vec<AgentView>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn agent(&self, hex: Hex) -> Option<&AgentView> {
        self.agents.iter().find(|a| a.hex == hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ForestEngine;
    use crate::generation::GridLayout;

    #[test]
    fn test_view_of_settled_hexagon() {
        let mut engine =
            ForestEngine::from_layout(GridLayout::hexagon(1).with_source(Hex::new(0, 0)), 3).unwrap();
        engine.run(10_000).unwrap();

        let east = engine.view(Hex::new(1, 0)).unwrap();
        assert_eq!(east.parent, Some(Direction::West));
        assert_eq!(east.parent_hex(), Some(Hex::new(0, 0)));
        assert_eq!(east.layer_sum(), Some(2));
        assert_eq!(east.region, Some(1));

        let center = engine.view(Hex::new(0, 0)).unwrap();
        assert!(center.source);
        assert_eq!(center.layer_sum(), Some(0));
    }

    #[test]
    fn test_snapshot_json() {
        let mut engine =
            ForestEngine::from_layout(GridLayout::parallelogram(3, 2).with_source(Hex::new(0, 0)), 5).unwrap();
        engine.run(10_000).unwrap();
        let snapshot = engine.snapshot();
        assert!(snapshot.settled);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"parent\""));
        let back = Snapshot::from_json(&json).unwrap();
        assert_eq!(back, snapshot);
        assert!(back.agent(Hex::new(2, 1)).is_some());
    }
}
