//! Parent election over the regional layering

use hecs::{Entity, World};

use crate::barrier::Barrier;
use crate::components::{read, update, Cell, Direction, Layering, Layers, Links, Lineage, Partition, Role};

/// Sum of per-axis differences between two layer vectors.
pub fn layer_delta(own: &Layers, other: &Layers) -> i64 {
    own.iter()
        .zip(other.iter())
        .map(|(&a, &b)| i64::from(a) - i64::from(b))
        .sum()
}

/// Stepping to a parent drops the layer sum by exactly two: one hex step
/// changes two of the three axes by one.
pub const PARENT_DELTA: i64 = 2;

/// First neighbor, in EAST..SOUTHEAST order, that passes `eligible` and is
/// one step closer to a source under `layers_of`.
pub fn find_parent(
    world: &World,
    entity: Entity,
    own: &Layers,
    eligible: impl Fn(Entity) -> bool,
    layers_of: impl Fn(&Layering) -> Option<Layers>,
) -> Option<Direction> {
    let links = read::<Links>(world, entity)?;
    Direction::ALL.into_iter().find(|&dir| {
        let Some(nbr) = links.get(dir) else {
            return false;
        };
        eligible(nbr)
            && read::<Layering>(world, nbr)
                .and_then(|l| layers_of(&l))
                .is_some_and(|theirs| layer_delta(own, &theirs) == PARENT_DELTA)
    })
}

/// Elect a regional parent once every regional flood has finished. Agents
/// with no region, no layers or no qualifying neighbor resolve as orphans.
pub fn choose_parent(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.regional_layers_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(lineage) = read::<Lineage>(world, entity) else {
        return false;
    };
    if role.source || lineage.resolved {
        return false;
    }

    let region = read::<Partition>(world, entity).and_then(|p| p.region);
    let own = read::<Layering>(world, entity).and_then(|l| l.primary);
    let parent = match (region, own) {
        (Some(region), Some(own)) => {
            let same_region = |nbr| read::<Partition>(world, nbr).and_then(|p| p.region) == Some(region);
            find_parent(world, entity, &own, same_region, |l| l.primary)
        }
        _ => None,
    };

    update::<Lineage, _>(world, entity, |l| {
        l.resolved = true;
        l.parent = parent;
        l.orphaned = parent.is_none();
    });
    barrier.parents_resolved += 1;

    if parent.is_none() {
        let hex = read::<Cell>(world, entity).map(|c| c.hex);
        log::warn!(
            "agent at {} has no regional parent (region {:?}, layers {:?})",
            hex.map(|h| h.to_string()).unwrap_or_default(),
            region,
            own
        );
    }
    true
}
