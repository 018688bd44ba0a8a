//! Phase barrier - counters every activation consults before moving to the
//! next protocol phase.
//!
//! Each counter is bumped exactly once per agent (or per source) by the
//! guarded transition that completes its phase, so re-running a phase never
//! double counts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    pub agents: usize,
    pub sources: usize,

    next_portal_id: u32,
    next_region_id: u32,

    /// Agents holding their initial portal graph.
    pub initial_portals: usize,
    /// Sources counted on walked rows.
    pub cuts: usize,
    /// Sources holding a region id.
    pub sourced_regions: usize,
    pub regional_portals: usize,
    /// Sources that flooded their region.
    pub regional_floods: usize,
    /// Non-source agents with a regional parent or an orphan mark.
    pub parents_resolved: usize,
    pub global_portals: usize,
    pub global_floods: usize,
    /// Agents that handled a reconciliation wave.
    pub reconciled: usize,
    /// Sources that ran their Euler tour.
    pub tours: usize,
    /// Agents entered by a tour, sources included.
    pub toured: usize,
    pub pruned: usize,
}

impl Barrier {
    pub fn new(agents: usize, sources: usize) -> Self {
        Self {
            agents,
            sources,
            ..Self::default()
        }
    }

    pub fn allocate_portal_id(&mut self) -> u32 {
        self.next_portal_id += 1;
        self.next_portal_id
    }

    pub fn allocate_region_id(&mut self) -> u32 {
        self.next_region_id += 1;
        self.next_region_id
    }

    /// Number of region ids handed out so far.
    pub fn regions(&self) -> u32 {
        self.next_region_id
    }

    pub fn initial_portals_ready(&self) -> bool {
        self.initial_portals == self.agents
    }

    pub fn cuts_ready(&self) -> bool {
        self.cuts == self.sources
    }

    pub fn regions_ready(&self) -> bool {
        self.sourced_regions == self.sources
    }

    pub fn regional_portals_ready(&self) -> bool {
        self.regional_portals == self.agents
    }

    pub fn regional_layers_ready(&self) -> bool {
        self.regional_floods == self.sources
    }

    pub fn parents_ready(&self) -> bool {
        self.parents_resolved == self.agents.saturating_sub(self.sources)
    }

    pub fn global_portals_ready(&self) -> bool {
        self.global_portals == self.agents
    }

    pub fn global_layers_ready(&self) -> bool {
        self.global_floods == self.sources
    }

    pub fn reconciled_ready(&self) -> bool {
        self.reconciled == self.agents
    }

    /// Every tour ran and every toured agent pruned its dead edges.
    pub fn settled(&self) -> bool {
        self.reconciled_ready() && self.tours == self.sources && self.pruned == self.toured
    }
}
