//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to agent entities.
//! They have no behavior - that lives in systems.

mod agent;
mod grid;

pub use agent::*;
pub use grid::*;

use hecs::{Component, Entity, World};

/// Copy a component out of the world, releasing the borrow immediately.
///
/// All agents share one archetype, so holding a borrow on one agent's
/// component while borrowing a neighbor's would conflict.
pub fn read<T: Component + Copy>(world: &World, entity: Entity) -> Option<T> {
    world.get::<&T>(entity).ok().map(|c| *c)
}

/// Apply `f` to one component of one entity. `None` if the component is missing.
pub fn update<T: Component, R>(
    world: &World,
    entity: Entity,
    f: impl FnOnce(&mut T) -> R,
) -> Option<R> {
    world.get::<&mut T>(entity).ok().map(|mut c| f(&mut *c))
}
