//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for binary serialization. The layout is stored as-is and
//! respawned on load; per-agent protocol state is stored by cell and
//! written back over the fresh agents. Neighbor links are rebuilt, never
//! stored.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::barrier::Barrier;
use crate::components::*;
use crate::engine::{ForestEngine, ForestError};
use crate::generation::GridLayout;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub seed: u64,
    pub activations: u64,
    pub layout: GridLayout,
    pub barrier: Barrier,
    pub agents: Vec<SavedAgent>,
}

/// Protocol state of one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAgent {
    pub hex: Hex,
    pub portals: Portals,
    pub partition: Partition,
    pub layering: Layering,
    pub lineage: Lineage,
    pub tour: Tour,
}

impl SavedAgent {
    fn read(world: &hecs::World, entity: hecs::Entity) -> Option<Self> {
        Some(Self {
            hex: read::<Cell>(world, entity)?.hex,
            portals: read(world, entity)?,
            partition: read(world, entity)?,
            layering: read(world, entity)?,
            lineage: read(world, entity)?,
            tour: read(world, entity)?,
        })
    }

    fn write(&self, world: &hecs::World, entity: hecs::Entity) {
        update::<Portals, _>(world, entity, |c| *c = self.portals);
        update::<Partition, _>(world, entity, |c| *c = self.partition);
        update::<Layering, _>(world, entity, |c| *c = self.layering);
        update::<Lineage, _>(world, entity, |c| *c = self.lineage);
        update::<Tour, _>(world, entity, |c| *c = self.tour);
    }
}

/// Save the complete simulation to a writer
pub fn save_forest<W: Write>(writer: W, engine: &ForestEngine) -> Result<(), SaveError> {
    let agents = engine
        .agents()
        .iter()
        .filter_map(|&entity| SavedAgent::read(&engine.world, entity))
        .collect();

    let save_data = SaveData {
        version: SAVE_VERSION,
        seed: engine.seed(),
        activations: engine.activations(),
        layout: engine.layout().clone(),
        barrier: engine.barrier().clone(),
        agents,
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// The barrier and agent list must describe the saved layout.
fn check_counts(save_data: &SaveData) -> Result<(), ForestError> {
    let cells = save_data.layout.len();
    let checks = [
        ("agent", cells, save_data.barrier.agents),
        ("source", save_data.layout.sources().count(), save_data.barrier.sources),
        ("saved agent", cells, save_data.agents.len()),
    ];
    for (what, expected, found) in checks {
        if expected != found {
            return Err(ForestError::CountMismatch {
                what,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Load a simulation from a reader
pub fn load_forest<R: Read>(reader: R) -> Result<ForestEngine, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    check_counts(&save_data)?;
    let engine = ForestEngine::restore(
        save_data.layout,
        save_data.seed,
        save_data.activations,
        save_data.barrier,
    )?;
    for agent in &save_data.agents {
        let entity = engine
            .entity_at(agent.hex)
            .ok_or(ForestError::UnknownCell(agent.hex))?;
        agent.write(&engine.world, entity);
    }
    Ok(engine)
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// The saved layout or agent list does not describe a valid forest.
    Layout(ForestError),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl From<ForestError> for SaveError {
    fn from(e: ForestError) -> Self {
        SaveError::Layout(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::Layout(e) => write!(f, "Invalid saved layout: {}", e),
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ForestEngine {
        let layout = GridLayout::hexagon(2)
            .with_source(Hex::new(-2, 0))
            .with_source(Hex::new(2, 0))
            .with_target(Hex::new(0, 2));
        ForestEngine::from_layout(layout, 21).unwrap()
    }

    #[test]
    fn test_save_load_settled() {
        let mut engine = engine();
        engine.run(100_000).expect("run failed");

        let mut save_buffer = Vec::new();
        engine.save(&mut save_buffer).expect("Save failed");

        let loaded = ForestEngine::load(&save_buffer[..]).expect("Load failed");
        assert!(loaded.is_settled());
        assert_eq!(loaded.activations(), engine.activations());
        assert_eq!(loaded.views(), engine.views());
    }

    #[test]
    fn test_save_midway_then_finish() {
        let mut engine = engine();
        for _ in 0..2 {
            engine.run_round();
        }
        let mut save_buffer = Vec::new();
        engine.save(&mut save_buffer).unwrap();

        let mut loaded = ForestEngine::load(&save_buffer[..]).unwrap();
        assert_eq!(loaded.barrier(), engine.barrier());
        loaded.run(100_000).unwrap();
        assert!(loaded.is_settled());
    }

    #[test]
    fn test_version_mismatch() {
        let data = SaveData {
            version: SAVE_VERSION + 1,
            seed: 0,
            activations: 0,
            layout: GridLayout::hexagon(0).with_source(Hex::new(0, 0)),
            barrier: Barrier::new(1, 1),
            agents: Vec::new(),
        };
        let bytes = bincode::serialize(&data).unwrap();
        match ForestEngine::load(&bytes[..]) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, SAVE_VERSION + 1);
            }
            other => panic!("expected version mismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_load_rejects_inconsistent_counts() {
        let mut buffer = Vec::new();
        engine().save(&mut buffer).unwrap();
        let mut data: SaveData = bincode::deserialize(&buffer).unwrap();
        data.barrier.sources = data.barrier.agents + 1;
        let bytes = bincode::serialize(&data).unwrap();
        match ForestEngine::load(&bytes[..]) {
            Err(SaveError::Layout(ForestError::CountMismatch { what, expected, found })) => {
                assert_eq!(what, "source");
                assert_eq!(expected, 2);
                assert_eq!(found, 20);
            }
            other => panic!("expected count mismatch, got {:?}", other.err()),
        }

        let mut data: SaveData = bincode::deserialize(&buffer).unwrap();
        data.agents.pop();
        let bytes = bincode::serialize(&data).unwrap();
        assert!(matches!(
            ForestEngine::load(&bytes[..]),
            Err(SaveError::Layout(ForestError::CountMismatch { what: "saved agent", .. }))
        ));
    }
}
