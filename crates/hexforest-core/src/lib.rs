//! HexForest Core - shortest-path forests built by local agents on a hex grid
//!
//! Every agent sits on one cell of a hexagonal grid and only sees its six
//! neighbors. Activated one at a time in arbitrary order, the agents build
//! a forest of shortest paths rooted at the source agents, then trim it down
//! to the branches that reach a target.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: one per agent
//! - **Components**: per-phase agent state (Portals, Partition, Layering, ...)
//! - **Systems**: protocol phases, each guarded so re-running it is a no-op
//! - **Barrier**: engine-owned counters that gate the phase transitions
//!
//! # Example
//!
//! ```rust,no_run
//! use hexforest_core::prelude::*;
//!
//! let layout = GridLayout::hexagon(3).with_source(Hex::new(0, 0));
//! let mut engine = ForestEngine::from_layout(layout, 42).unwrap();
//! let summary = engine.run(100_000).unwrap();
//! println!("settled after {} activations", summary.activations);
//! ```

pub mod barrier;
pub mod components;
pub mod config;
pub mod engine;
pub mod generation;
pub mod geometry;
pub mod persistence;
pub mod systems;
pub mod view;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::barrier::Barrier;
    pub use crate::components::*;
    pub use crate::config::ForestConfig;
    pub use crate::engine::{ForestEngine, ForestError, RunSummary};
    pub use crate::generation::GridLayout;
    pub use crate::geometry::Axis;
    pub use crate::view::{AgentView, Snapshot};
}
