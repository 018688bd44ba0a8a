//! Distance propagation over the portal graphs
//!
//! A source layers the agents it can reach separately along each axis with a
//! 0-1 breadth-first search: following a primary link stays on the same
//! line and costs nothing, a side link moves one line over and costs one.

use std::collections::{HashMap, VecDeque};

use hecs::{Entity, World};

use crate::barrier::Barrier;
use crate::components::{layer_sum, read, update, Layering, Layers, Role};
use crate::geometry::Axis;
use crate::systems::portal_links;

/// Which layering a flood writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerField {
    /// Regional layering over the regional portal graph.
    Primary,
    /// Global layering over the global portal graph.
    Secondary,
}

impl LayerField {
    fn get(self, layering: &Layering) -> Option<Layers> {
        match self {
            LayerField::Primary => layering.primary,
            LayerField::Secondary => layering.secondary,
        }
    }

    fn set(self, layering: &mut Layering, layers: Layers) {
        match self {
            LayerField::Primary => layering.primary = Some(layers),
            LayerField::Secondary => layering.secondary = Some(layers),
        }
    }
}

/// Layer numbers along one axis for every agent reachable from `source`.
pub fn axis_layers(world: &World, source: Entity, axis: Axis) -> HashMap<Entity, u32> {
    let mut layers = HashMap::from([(source, 0)]);
    let mut deque = VecDeque::from([(source, 0)]);

    while let Some((agent, layer)) = deque.pop_front() {
        if layers.get(&agent).is_some_and(|&best| best < layer) {
            continue;
        }
        for (dir, next) in portal_links(world, agent, axis) {
            let cost = axis.step_cost(dir);
            let candidate = layer + cost;
            if layers.get(&next).is_some_and(|&best| best <= candidate) {
                continue;
            }
            layers.insert(next, candidate);
            if cost == 0 {
                deque.push_front((next, candidate));
            } else {
                deque.push_back((next, candidate));
            }
        }
    }
    layers
}

/// Flood one source's layering into `field`. An agent takes the source's
/// vector when it has none or when the new sum is strictly smaller.
/// Returns how many agents adopted it.
pub fn flood_layers(world: &World, source: Entity, field: LayerField) -> usize {
    let [x, y, z] = Axis::ALL.map(|axis| axis_layers(world, source, axis));

    let mut adopted = 0;
    for (&agent, &layer_x) in &x {
        let (Some(&layer_y), Some(&layer_z)) = (y.get(&agent), z.get(&agent)) else {
            continue;
        };
        let candidate = [layer_x, layer_y, layer_z];
        let took = update::<Layering, _>(world, agent, |layering| {
            let better = field
                .get(layering)
                .map_or(true, |current| layer_sum(&candidate) < layer_sum(&current));
            if better {
                field.set(layering, candidate);
            }
            better
        });
        if took == Some(true) {
            adopted += 1;
        }
    }
    adopted
}

/// Regional flood, once per source, after every agent holds its regional
/// portal graph.
pub fn flood_regional_layers(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.regional_portals_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(layering) = read::<Layering>(world, entity) else {
        return false;
    };
    if !role.source || layering.source_distance_calculated {
        return false;
    }
    update::<Layering, _>(world, entity, |l| l.source_distance_calculated = true);

    let adopted = flood_layers(world, entity, LayerField::Primary);
    barrier.regional_floods += 1;
    log::debug!(
        "regional flood {}/{} reached {} agents",
        barrier.regional_floods,
        barrier.sources,
        adopted
    );
    true
}

/// Global flood into the secondary layering, once per source, after every
/// agent holds its global portal graph.
pub fn flood_secondary_layers(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.global_portals_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(layering) = read::<Layering>(world, entity) else {
        return false;
    };
    if !role.source || layering.secondary_calculated {
        return false;
    }
    update::<Layering, _>(world, entity, |l| l.secondary_calculated = true);

    let adopted = flood_layers(world, entity, LayerField::Secondary);
    barrier.global_floods += 1;
    log::debug!(
        "global flood {}/{} reached {} agents",
        barrier.global_floods,
        barrier.sources,
        adopted
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Hex, PortalScope};
    use crate::generation::GridLayout;
    use crate::systems::build_portal_graph;
    use crate::systems::testing::Fixture;

    fn globally_built(layout: &GridLayout) -> Fixture {
        let mut fx = Fixture::new(layout);
        fx.each(|w, e, b| build_portal_graph(w, e, PortalScope::Initial, b));
        fx.each(|w, e, b| build_portal_graph(w, e, PortalScope::Global, b));
        fx
    }

    #[test]
    fn test_axis_layers_count_lines() {
        let layout = GridLayout::parallelogram(4, 4);
        let fx = globally_built(&layout);
        let origin = fx.at(0, 0);

        // X layers are row distance, Y layers column distance
        let x = axis_layers(&fx.world, origin, Axis::X);
        let y = axis_layers(&fx.world, origin, Axis::Y);
        assert_eq!(x[&fx.at(3, 0)], 0);
        assert_eq!(x[&fx.at(0, 2)], 2);
        assert_eq!(y[&fx.at(0, 3)], 0);
        assert_eq!(y[&fx.at(2, 1)], 2);
    }

    #[test]
    fn test_layer_sum_is_twice_hex_distance() {
        let layout = GridLayout::hexagon(3).with_source(Hex::new(0, 0));
        let mut fx = globally_built(&layout);
        assert_eq!(fx.each(flood_secondary_layers), 1);

        for (hex, entity) in &fx.index {
            let layering = read::<Layering>(&fx.world, *entity).unwrap();
            assert_eq!(
                layering.secondary_sum(),
                Some(2 * hex.distance(Hex::new(0, 0))),
                "at {}",
                hex
            );
        }
        assert!(fx.barrier.global_layers_ready());
    }

    #[test]
    fn test_smaller_sum_wins_between_sources() {
        let layout = GridLayout::parallelogram(7, 1)
            .with_source(Hex::new(0, 0))
            .with_source(Hex::new(6, 0));
        let mut fx = globally_built(&layout);
        assert_eq!(fx.each(flood_secondary_layers), 2);

        for x in 0..7 {
            let layering = read::<Layering>(&fx.world, fx.at(x, 0)).unwrap();
            let nearest = x.min(6 - x) as u32;
            assert_eq!(layering.secondary_sum(), Some(2 * nearest), "x = {}", x);
        }
    }

    #[test]
    fn test_flood_runs_once_per_source() {
        let layout = GridLayout::hexagon(1).with_source(Hex::new(0, 0));
        let mut fx = Fixture::new(&layout);
        fx.each(|w, e, b| build_portal_graph(w, e, PortalScope::Initial, b));
        assert_eq!(fx.each(flood_secondary_layers), 0, "gated on global portals");
        fx.each(|w, e, b| build_portal_graph(w, e, PortalScope::Global, b));
        assert_eq!(fx.each(flood_secondary_layers), 1);
        assert_eq!(fx.each(flood_secondary_layers), 0);
        assert_eq!(fx.barrier.global_floods, 1);
    }

    #[test]
    fn test_source_keeps_zero_layers() {
        let layout = GridLayout::parallelogram(3, 1)
            .with_source(Hex::new(0, 0))
            .with_source(Hex::new(2, 0));
        let fx = globally_built(&layout);
        let adopted = flood_layers(&fx.world, fx.at(0, 0), LayerField::Secondary);
        // The middle agent adopts, the far source already sits at zero
        assert_eq!(adopted, 1);
        let far = read::<Layering>(&fx.world, fx.at(2, 0)).unwrap();
        assert_eq!(far.secondary, Some([0, 0, 0]));
    }
}
