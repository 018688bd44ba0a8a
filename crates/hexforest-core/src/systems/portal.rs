//! Portal graph builder - per agent, per axis, picks at most four neighbor
//! directions that link the axis' lines across gaps in the structure.
//!
//! The builder only ever writes the activating agent's own `Portals`.
//! Links are read symmetrically by the layering floods: a link exists if
//! either endpoint lists the direction to the other.

use hecs::{Entity, World};

use crate::barrier::Barrier;
use crate::components::{read, update, Direction, Links, Partition, PortalDirs, PortalScope, Portals};
use crate::geometry::Axis;

/// Build the agent's portal graph for `scope`, clearing whatever an earlier
/// scope left behind. No-op if the agent already holds this scope or a later
/// one.
pub fn build_portal_graph(
    world: &World,
    entity: Entity,
    scope: PortalScope,
    barrier: &mut Barrier,
) -> bool {
    let Some(mut portals) = read::<Portals>(world, entity) else {
        return false;
    };
    if scope == PortalScope::Unbuilt || portals.scope >= scope {
        return false;
    }
    let Some(links) = read::<Links>(world, entity) else {
        return false;
    };
    let own_region = read::<Partition>(world, entity).and_then(|p| p.region);

    let admitted = |dir: Direction| match links.get(dir) {
        None => false,
        Some(nbr) if scope == PortalScope::Regional => {
            own_region.is_some() && read::<Partition>(world, nbr).and_then(|p| p.region) == own_region
        }
        Some(_) => true,
    };

    portals.clear_all();
    for axis in Axis::ALL {
        select_directions(axis, scope, &admitted, portals.dirs_mut(axis));
    }
    portals.scope = scope;
    update::<Portals, _>(world, entity, |p| *p = portals);

    match scope {
        PortalScope::Initial => barrier.initial_portals += 1,
        PortalScope::Regional => barrier.regional_portals += 1,
        PortalScope::Global => barrier.global_portals += 1,
        PortalScope::Unbuilt => {}
    }
    true
}

/// The per-axis selection rule.
fn select_directions(
    axis: Axis,
    scope: PortalScope,
    admitted: &impl Fn(Direction) -> bool,
    dirs: &mut PortalDirs,
) {
    let data = axis.data();
    let first_admitted = |pair: [Direction; 2]| pair.into_iter().find(|d| admitted(*d));

    for dir in data.primary {
        if admitted(dir) {
            dirs.insert(dir);
        }
    }

    if admitted(data.boundary) {
        for side in [data.side_a, data.side_b] {
            // Bridge onto a line that starts right next to us
            if !admitted(side[0]) && admitted(side[1]) {
                dirs.insert(side[1]);
            }
            if scope == PortalScope::Global {
                if let Some(dir) = first_admitted(side) {
                    dirs.insert(dir);
                }
            }
        }
    } else {
        // End of our line: link it to both sides
        for side in [data.side_a, data.side_b] {
            if let Some(dir) = first_admitted(side) {
                dirs.insert(dir);
            }
        }
    }
}

/// Directions along which `entity` has a portal link on `axis`, in
/// EAST..SOUTHEAST order.
pub fn portal_links(world: &World, entity: Entity, axis: Axis) -> Vec<(Direction, Entity)> {
    let (Some(links), Some(own)) = (read::<Links>(world, entity), read::<Portals>(world, entity)) else {
        return Vec::new();
    };
    links
        .occupied()
        .filter(|&(dir, nbr)| {
            own.dirs(axis).contains(dir)
                || read::<Portals>(world, nbr)
                    .map(|p| p.dirs(axis).contains(dir.opposite()))
                    .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Hex;
    use crate::generation::{spawn_layout, GridLayout};

    fn built(layout: &GridLayout, scope: PortalScope) -> (World, std::collections::HashMap<Hex, Entity>) {
        let mut world = World::new();
        let index = spawn_layout(&mut world, layout);
        let mut barrier = Barrier::new(layout.len(), layout.sources().count());
        for &entity in index.values() {
            build_portal_graph(&world, entity, scope, &mut barrier);
        }
        (world, index)
    }

    #[test]
    fn test_row_interior_agent() {
        let layout = GridLayout::parallelogram(3, 1);
        let (world, index) = built(&layout, PortalScope::Initial);
        let middle = read::<Portals>(&world, index[&Hex::new(1, 0)]).unwrap();
        let x: Vec<_> = middle.dirs(Axis::X).iter().collect();
        assert_eq!(x, vec![Direction::West, Direction::East]);
    }

    #[test]
    fn test_line_end_bridges_both_sides() {
        // Center of a hexagon has no gap anywhere: each axis gets its primary
        // pair and, since the boundary neighbor exists, no bridges.
        let layout = GridLayout::hexagon(1);
        let (world, index) = built(&layout, PortalScope::Initial);
        let center = read::<Portals>(&world, index[&Hex::new(0, 0)]).unwrap();
        for axis in Axis::ALL {
            assert_eq!(center.dirs(axis).len(), 2, "axis {}", axis);
        }

        // The western cell has no WEST neighbor, so its row ends here. It
        // bridges to NORTHEAST (no NORTHWEST) and SOUTHEAST (no SOUTHWEST).
        let west = read::<Portals>(&world, index[&Hex::new(-1, 0)]).unwrap();
        let x: Vec<_> = west.dirs(Axis::X).iter().collect();
        assert_eq!(x, vec![Direction::East, Direction::NorthEast, Direction::SouthEast]);
    }

    #[test]
    fn test_every_connected_agent_has_portals() {
        let layout = GridLayout::hexagon(2);
        let (world, index) = built(&layout, PortalScope::Initial);
        for entity in index.values() {
            let portals = read::<Portals>(&world, *entity).unwrap();
            for axis in Axis::ALL {
                assert!(!portals.dirs(axis).is_empty());
                assert!(portals.dirs(axis).len() <= PortalDirs::CAPACITY);
            }
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let layout = GridLayout::hexagon(1);
        let (world, index) = built(&layout, PortalScope::Initial);
        let entity = index[&Hex::new(1, 0)];
        let before = read::<Portals>(&world, entity).unwrap();

        let mut barrier = Barrier::new(7, 0);
        assert!(!build_portal_graph(&world, entity, PortalScope::Initial, &mut barrier));
        assert_eq!(read::<Portals>(&world, entity).unwrap(), before);
        assert_eq!(barrier.initial_portals, 0);
    }

    #[test]
    fn test_regional_scope_filters_other_regions() {
        let layout = GridLayout::parallelogram(3, 1);
        let (world, index) = built(&layout, PortalScope::Initial);
        for (hex, entity) in &index {
            let region = if hex.x < 2 { 1 } else { 2 };
            update::<Partition, _>(&world, *entity, |p| p.region = Some(region));
        }
        let mut barrier = Barrier::new(3, 0);
        let middle = index[&Hex::new(1, 0)];
        assert!(build_portal_graph(&world, middle, PortalScope::Regional, &mut barrier));

        let portals = read::<Portals>(&world, middle).unwrap();
        assert_eq!(portals.scope, PortalScope::Regional);
        assert!(portals.dirs(Axis::X).contains(Direction::West));
        assert!(!portals.dirs(Axis::X).contains(Direction::East));
        assert_eq!(barrier.regional_portals, 1);
    }

    #[test]
    fn test_global_scope_adds_side_bridges() {
        let layout = GridLayout::hexagon(1);
        let (world, index) = built(&layout, PortalScope::Initial);
        let mut barrier = Barrier::new(7, 0);
        let east = index[&Hex::new(1, 0)];
        build_portal_graph(&world, east, PortalScope::Global, &mut barrier);

        // EAST cell: WEST neighbor exists (boundary), NORTHWEST exists.
        let portals = read::<Portals>(&world, east).unwrap();
        assert!(portals.dirs(Axis::X).contains(Direction::NorthWest));
    }

    #[test]
    fn test_links_are_symmetric() {
        let layout = GridLayout::hexagon(2);
        let (world, index) = built(&layout, PortalScope::Initial);
        for (&hex, &entity) in &index {
            for axis in Axis::ALL {
                for (dir, nbr) in portal_links(&world, entity, axis) {
                    let back = portal_links(&world, nbr, axis);
                    assert!(
                        back.iter().any(|&(d, e)| d == dir.opposite() && e == entity),
                        "link {} -> {} on {} not mirrored",
                        hex,
                        dir,
                        axis
                    );
                }
            }
        }
    }
}
