//! Forest engine - owns the agent world and runs activations

use std::collections::HashMap;

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::barrier::Barrier;
use crate::components::*;
use crate::config::ForestConfig;
use crate::generation::{generate_layout, spawn_layout, GridLayout};
use crate::persistence::SaveError;
use crate::systems::*;
use crate::view::{AgentView, Snapshot};

/// Errors raised by the harness around the protocol. The protocol itself
/// never fails; unmet preconditions are no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    EmptyLayout,
    NoSources,
    DuplicateCell(Hex),
    UnknownCell(Hex),
    Disconnected { reached: usize, total: usize },
    /// The activation budget ran out before the forest settled.
    Stalled { activations: u64 },
    InvalidConfig(String),
    /// Saved state disagrees with its own layout.
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for ForestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForestError::EmptyLayout => write!(f, "Layout has no cells"),
            ForestError::NoSources => write!(f, "Layout has no source"),
            ForestError::DuplicateCell(hex) => write!(f, "Cell {} occupied twice", hex),
            ForestError::UnknownCell(hex) => write!(f, "No agent at {}", hex),
            ForestError::Disconnected { reached, total } => {
                write!(f, "Layout is disconnected: {} of {} cells reachable", reached, total)
            }
            ForestError::Stalled { activations } => {
                write!(f, "Forest not settled after {} activations", activations)
            }
            ForestError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            ForestError::CountMismatch { what, expected, found } => {
                write!(f, "Saved {} count is {}, layout has {}", what, found, expected)
            }
        }
    }
}

impl std::error::Error for ForestError {}

type Phase = fn(&World, Entity, &mut Barrier) -> bool;

fn build_initial(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    build_portal_graph(world, entity, PortalScope::Initial, barrier)
}

fn build_regional(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    barrier.regions_ready() && build_portal_graph(world, entity, PortalScope::Regional, barrier)
}

fn build_global(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    barrier.parents_ready() && build_portal_graph(world, entity, PortalScope::Global, barrier)
}

/// Everything an activation tries, in order. Pruning runs before the tour
/// starts so a source never prunes in the activation that toured it.
const PHASES: [Phase; 12] = [
    build_initial,
    send_signal,
    cut_portal,
    split_region,
    build_regional,
    flood_regional_layers,
    choose_parent,
    build_global,
    flood_secondary_layers,
    reconcile_wave,
    prune_dead_edges,
    start_euler_tour,
];

/// Barrier gates, for milestone logging.
const MILESTONES: [(&str, fn(&Barrier) -> bool); 10] = [
    ("initial portal graphs built", Barrier::initial_portals_ready),
    ("source rows cut", Barrier::cuts_ready),
    ("regions assigned", Barrier::regions_ready),
    ("regional portal graphs built", Barrier::regional_portals_ready),
    ("regional layers flooded", Barrier::regional_layers_ready),
    ("parents elected", Barrier::parents_ready),
    ("global portal graphs built", Barrier::global_portals_ready),
    ("global layers flooded", Barrier::global_layers_ready),
    ("reconciliation finished", Barrier::reconciled_ready),
    ("forest settled", Barrier::settled),
];

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub activations: u64,
    pub rounds: u64,
    pub regions: u32,
    pub orphans: usize,
    pub rerooted: usize,
    pub targets_reached: usize,
}

/// Main simulation engine
pub struct ForestEngine {
    /// ECS world, one entity per agent
    pub world: World,
    barrier: Barrier,
    layout: GridLayout,
    index: HashMap<Hex, Entity>,
    /// Agents in layout order
    agents: Vec<Entity>,
    rng: StdRng,
    seed: u64,
    activations: u64,
}

impl ForestEngine {
    /// Spawn one agent per cell. `seed` drives the activation order.
    pub fn from_layout(layout: GridLayout, seed: u64) -> Result<Self, ForestError> {
        layout.validate()?;
        let mut world = World::new();
        let index = spawn_layout(&mut world, &layout);
        let agents = layout.cells().iter().map(|c| index[&c.hex]).collect();
        let barrier = Barrier::new(layout.len(), layout.sources().count());

        log::info!(
            "spawned {} agents ({} sources, {} targets), seed {}",
            layout.len(),
            barrier.sources,
            layout.targets().count(),
            seed
        );
        Ok(Self {
            world,
            barrier,
            layout,
            index,
            agents,
            rng: StdRng::seed_from_u64(seed),
            seed,
            activations: 0,
        })
    }

    /// Generate a random hole-free region per `config`.
    pub fn generate(config: &ForestConfig) -> Result<Self, ForestError> {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);
        let layout = generate_layout(config, &mut rng)?;
        Self::from_layout(layout, seed)
    }

    pub(crate) fn restore(
        layout: GridLayout,
        seed: u64,
        activations: u64,
        barrier: Barrier,
    ) -> Result<Self, ForestError> {
        let mut engine = Self::from_layout(layout, seed)?;
        engine.barrier = barrier;
        engine.activations = activations;
        engine.rng = StdRng::seed_from_u64(seed.wrapping_add(activations));
        Ok(engine)
    }

    /// Run one agent's activation. Returns whether any phase made progress.
    pub fn activate(&mut self, entity: Entity) -> bool {
        let before = self.barrier.clone();
        let mut changed = false;
        for phase in PHASES {
            changed |= phase(&self.world, entity, &mut self.barrier);
        }
        self.activations += 1;

        for (name, ready) in MILESTONES {
            if ready(&self.barrier) && !ready(&before) {
                log::info!("{} after {} activations", name, self.activations);
            }
        }
        changed
    }

    pub fn activate_at(&mut self, hex: Hex) -> Result<bool, ForestError> {
        let entity = self.entity_at(hex).ok_or(ForestError::UnknownCell(hex))?;
        Ok(self.activate(entity))
    }

    /// Activate one agent chosen uniformly at random.
    pub fn step(&mut self) -> bool {
        match self.agents.choose(&mut self.rng).copied() {
            Some(entity) => self.activate(entity),
            None => false,
        }
    }

    fn shuffled(&mut self) -> Vec<Entity> {
        let mut order = self.agents.clone();
        order.shuffle(&mut self.rng);
        order
    }

    /// Activate every agent once, in shuffled order. Returns how many
    /// activations made progress.
    pub fn run_round(&mut self) -> usize {
        self.shuffled()
            .into_iter()
            .filter(|&entity| self.activate(entity))
            .count()
    }

    /// Run shuffled rounds until `done` holds, spending at most
    /// `max_activations` in total. `done` is checked after every activation,
    /// so the run stops mid-round. Returns the number of rounds started.
    pub fn run_until(
        &mut self,
        max_activations: u64,
        done: impl Fn(&Barrier) -> bool,
    ) -> Result<u64, ForestError> {
        let mut rounds = 0;
        while !done(&self.barrier) {
            for entity in self.shuffled() {
                if done(&self.barrier) {
                    break;
                }
                if self.activations >= max_activations {
                    log::warn!("activation budget of {} exhausted", max_activations);
                    return Err(ForestError::Stalled {
                        activations: self.activations,
                    });
                }
                self.activate(entity);
            }
            rounds += 1;
            log::debug!("round {} done, {} activations", rounds, self.activations);
        }
        Ok(rounds)
    }

    /// Run until settled.
    pub fn run(&mut self, max_activations: u64) -> Result<RunSummary, ForestError> {
        let rounds = self.run_until(max_activations, Barrier::settled)?;
        let summary = self.summary(rounds);
        log::info!(
            "settled in {} rounds / {} activations: {} regions, {} orphans, {} re-rooted",
            summary.rounds,
            summary.activations,
            summary.regions,
            summary.orphans,
            summary.rerooted
        );
        Ok(summary)
    }

    fn summary(&self, rounds: u64) -> RunSummary {
        let mut orphans = 0;
        let mut rerooted = 0;
        for (_, lineage) in self.world.query::<&Lineage>().iter() {
            orphans += usize::from(lineage.orphaned);
            rerooted += usize::from(lineage.rerooted);
        }
        let targets_reached = self
            .world
            .query::<(&Role, &Tour)>()
            .iter()
            .filter(|(_, (role, tour))| role.target && tour.has_live_edge())
            .count();
        RunSummary {
            activations: self.activations,
            rounds,
            regions: self.barrier.regions(),
            orphans,
            rerooted,
            targets_reached,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.barrier.settled()
    }

    pub fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Agents in layout order.
    pub fn agents(&self) -> &[Entity] {
        &self.agents
    }

    pub fn entity_at(&self, hex: Hex) -> Option<Entity> {
        self.index.get(&hex).copied()
    }

    /// Read-only view of one agent.
    pub fn view(&self, hex: Hex) -> Result<AgentView, ForestError> {
        self.entity_at(hex)
            .and_then(|entity| AgentView::read(&self.world, entity))
            .ok_or(ForestError::UnknownCell(hex))
    }

    /// Views of every agent, in layout order.
    pub fn views(&self) -> Vec<AgentView> {
        self.agents
            .iter()
            .filter_map(|&entity| AgentView::read(&self.world, entity))
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            seed: self.seed,
            activations: self.activations,
            settled: self.is_settled(),
            barrier: self.barrier.clone(),
            agents: self.views(),
        }
    }

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        crate::persistence::save_forest(writer, self)
    }

    /// Load simulation state from a reader
    pub fn load<R: std::io::Read>(reader: R) -> Result<Self, SaveError> {
        crate::persistence::load_forest(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hexagon_engine() -> ForestEngine {
        ForestEngine::from_layout(GridLayout::hexagon(1).with_source(Hex::new(0, 0)), 1).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = hexagon_engine();
        assert_eq!(engine.agent_count(), 7);
        assert_eq!(engine.barrier().sources, 1);
        assert_eq!(engine.activations(), 0);
        assert!(!engine.is_settled());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let result = ForestEngine::from_layout(GridLayout::hexagon(1), 0);
        assert!(matches!(result, Err(ForestError::NoSources)));
    }

    #[test]
    fn test_single_activation_is_local() {
        let mut engine = hexagon_engine();
        assert!(engine.activate_at(Hex::new(1, 0)).unwrap());
        assert_eq!(engine.barrier().initial_portals, 1);
        // Nothing further is ready yet
        assert!(!engine.activate_at(Hex::new(1, 0)).unwrap());
        assert_eq!(
            engine.activate_at(Hex::new(9, 9)),
            Err(ForestError::UnknownCell(Hex::new(9, 9)))
        );
    }

    #[test]
    fn test_run_settles() {
        let mut engine = hexagon_engine();
        let summary = engine.run(10_000).unwrap();
        assert!(engine.is_settled());
        assert_eq!(summary.regions, 1);
        assert_eq!(summary.orphans, 0);
        assert!(summary.activations <= 10_000);
    }

    #[test]
    fn test_stalls_on_tiny_budget() {
        let mut engine = hexagon_engine();
        let result = engine.run(3);
        assert_eq!(result, Err(ForestError::Stalled { activations: 3 }));
    }

    #[test]
    fn test_step_counts_activations() {
        let mut engine = hexagon_engine();
        for _ in 0..5 {
            engine.step();
        }
        assert_eq!(engine.activations(), 5);
    }

    #[test]
    fn test_generate_is_reproducible() {
        let config = ForestConfig {
            agents: 30,
            sources: 2,
            targets: 3,
            grid_size: 16,
            seed: Some(11),
            ..ForestConfig::default()
        };
        let a = ForestEngine::generate(&config).unwrap();
        let b = ForestEngine::generate(&config).unwrap();
        assert_eq!(a.layout(), b.layout());
        assert_eq!(a.layout().len(), 30);
        assert_eq!(a.seed(), 11);
    }
}
