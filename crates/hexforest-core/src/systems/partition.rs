//! Source flooding and region partitioning
//!
//! Three steps, each gated on the previous one finishing everywhere:
//! sources mark their row with a portal id, the west end of every marked
//! row walks it to count sources and set cut flags, then each source floods
//! a region that stops at other sources' rows and never holds more than two
//! sources.

use std::collections::VecDeque;

use hecs::{Entity, World};

use crate::barrier::Barrier;
use crate::components::{read, update, Cell, Direction, Links, Partition, Portals, Role};
use crate::geometry::Axis;

/// Most sources a single region may hold.
pub const MAX_REGION_SOURCES: usize = 2;

fn hex_of(world: &World, entity: Entity) -> String {
    read::<Cell>(world, entity)
        .map(|c| c.hex.to_string())
        .unwrap_or_else(|| "?".into())
}

/// Flood a fresh portal id along the source's row.
pub fn send_signal(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.initial_portals_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(partition) = read::<Partition>(world, entity) else {
        return false;
    };
    // A source already covered by another source's row stays quiet
    if !role.source || partition.portal_id.is_some() {
        return false;
    }

    let id = barrier.allocate_portal_id();
    update::<Partition, _>(world, entity, |p| {
        p.portal_id = Some(id);
        p.signal_sent = true;
    });

    let mut marked = 1;
    let mut queue = VecDeque::from([entity]);
    while let Some(current) = queue.pop_front() {
        let (Some(portals), Some(links)) = (read::<Portals>(world, current), read::<Links>(world, current)) else {
            continue;
        };
        for dir in Axis::X.data().primary {
            if !portals.dirs(Axis::X).contains(dir) {
                continue;
            }
            let Some(next) = links.get(dir) else { continue };
            let claimed = update::<Partition, _>(world, next, |p| {
                if p.portal_id.is_none() {
                    p.portal_id = Some(id);
                    true
                } else {
                    false
                }
            });
            if claimed == Some(true) {
                marked += 1;
                queue.push_back(next);
            }
        }
    }

    log::debug!(
        "source {} marked {} agents with portal id {}",
        hex_of(world, entity),
        marked,
        id
    );
    true
}

/// Walk a marked row from its west end, setting cut flags on its sources
/// and counting them into the barrier.
pub fn cut_portal(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    let Some(partition) = read::<Partition>(world, entity) else {
        return false;
    };
    let Some(portal_id) = partition.portal_id else {
        return false;
    };
    let links = read::<Links>(world, entity).unwrap_or_default();
    if partition.cut_done || links.has(Direction::West) {
        return false;
    }

    let mut sources = 0;
    let mut current = Some(entity);
    while let Some(agent) = current {
        let Some(here) = read::<Partition>(world, agent) else { break };
        if here.portal_id != Some(portal_id) || here.cut_done {
            break;
        }
        let role = read::<Role>(world, agent).unwrap_or_default();
        let links = read::<Links>(world, agent).unwrap_or_default();
        update::<Partition, _>(world, agent, |p| {
            p.cut_done = true;
            if role.source {
                p.north_cut = !links.has(Direction::NorthWest);
                p.south_cut = !links.has(Direction::SouthWest);
            }
        });
        if role.source {
            sources += 1;
        }
        current = links.get(Direction::East);
    }

    barrier.cuts += sources;
    log::debug!(
        "row of portal {} walked from {}: {} sources, {}/{} cuts",
        portal_id,
        hex_of(world, entity),
        sources,
        barrier.cuts,
        barrier.sources
    );
    true
}

/// Whether a split message from a flood that has admitted `sources_so_far`
/// sources may claim this agent.
fn accepts(partition: &Partition, role: Role, origin: Option<u32>, sources_so_far: usize) -> bool {
    if partition.split_visited || partition.region.is_some() {
        return false;
    }
    if partition.portal_id.is_some() && partition.portal_id != origin {
        return false;
    }
    sources_so_far + usize::from(role.source) <= MAX_REGION_SOURCES
}

/// Start a region flood from a source that has no region yet.
pub fn split_region(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.cuts_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(partition) = read::<Partition>(world, entity) else {
        return false;
    };
    if !role.source || partition.region.is_some() {
        return false;
    }

    let region = barrier.allocate_region_id();
    let origin = partition.portal_id;
    let mut sources = 0;
    let mut members = 0;
    let mut queue = VecDeque::from([entity]);

    while let Some(agent) = queue.pop_front() {
        let (Some(here), Some(links)) = (read::<Partition>(world, agent), read::<Links>(world, agent)) else {
            continue;
        };
        let agent_role = read::<Role>(world, agent).unwrap_or_default();
        if !accepts(&here, agent_role, origin, sources) {
            continue;
        }
        update::<Partition, _>(world, agent, |p| {
            p.region = Some(region);
            p.split_visited = true;
        });
        sources += usize::from(agent_role.source);
        members += 1;
        queue.extend(links.occupied().map(|(_, next)| next));
    }

    barrier.sourced_regions += sources;
    log::info!(
        "region {} from source {}: {} agents, {} sources",
        region,
        hex_of(world, entity),
        members,
        sources
    );
    true
}
