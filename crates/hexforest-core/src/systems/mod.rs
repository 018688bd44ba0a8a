//! Systems - protocol phases that operate on agent components
//!
//! Every system takes the activating agent plus the barrier and returns
//! whether it changed anything. Guards run first, so calling a system out
//! of order or a second time is a no-op.

mod distance;
mod parent;
mod partition;
mod portal;
mod reconcile;
mod tour;

pub use distance::*;
pub use parent::*;
pub use partition::*;
pub use portal::*;
pub use reconcile::*;
pub use tour::*;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use hecs::{Entity, World};

    use crate::barrier::Barrier;
    use crate::components::Hex;
    use crate::generation::{spawn_layout, GridLayout};

    /// A spawned layout with its own barrier, for driving systems by hand.
    pub struct Fixture {
        pub world: World,
        pub index: HashMap<Hex, Entity>,
        pub barrier: Barrier,
        order: Vec<Entity>,
    }

    impl Fixture {
        pub fn new(layout: &GridLayout) -> Self {
            let mut world = World::new();
            let index = spawn_layout(&mut world, layout);
            let mut hexes: Vec<Hex> = index.keys().copied().collect();
            hexes.sort();
            let order = hexes.iter().map(|h| index[h]).collect();
            let barrier = Barrier::new(layout.len(), layout.sources().count());
            Self {
                world,
                index,
                barrier,
                order,
            }
        }

        pub fn at(&self, x: i32, y: i32) -> Entity {
            self.index[&Hex::new(x, y)]
        }

        /// Run `system` once for every agent in hex order; returns how many
        /// agents it changed.
        pub fn each(&mut self, mut system: impl FnMut(&World, Entity, &mut Barrier) -> bool) -> usize {
            let mut changed = 0;
            for &entity in &self.order {
                if system(&self.world, entity, &mut self.barrier) {
                    changed += 1;
                }
            }
            changed
        }
    }
}
