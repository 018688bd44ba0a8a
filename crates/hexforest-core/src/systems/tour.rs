//! Euler tour of each source's tree, then pruning of target-free branches.
//!
//! The tour label only advances when the walker first leaves a target, so a
//! subtree without targets is entered and left under the same label. That
//! equality is what pruning looks for.

use hecs::{Entity, World};

use crate::barrier::Barrier;
use crate::components::{read, update, Cell, Direction, Links, Lineage, Role, Tour};

/// Next edge the walker takes from `agent`, searching counter-clockwise
/// from just past `arrived` (EAST first at the root).
fn next_edge(world: &World, agent: Entity, arrived: Option<Direction>) -> Option<(Direction, Entity)> {
    let links = read::<Links>(world, agent)?;
    let lineage = read::<Lineage>(world, agent)?;
    let tour = read::<Tour>(world, agent)?;
    let start = arrived.unwrap_or(Direction::SouthEast);

    (1..=6).map(|step| start.rotate(step)).find_map(|dir| {
        let next = links.get(dir)?;
        if tour.out_edge[dir.index()].is_some() {
            return None;
        }
        let is_child = read::<Lineage>(world, next).is_some_and(|l| l.parent == Some(dir.opposite()));
        (is_child || lineage.parent == Some(dir)).then_some((dir, next))
    })
}

/// Mark `agent` as toured; counts it the first time.
fn enter(world: &World, agent: Entity, barrier: &mut Barrier) {
    let first = update::<Tour, _>(world, agent, |t| !std::mem::replace(&mut t.euler_done, true));
    if first == Some(true) {
        barrier.toured += 1;
    }
}

/// Walk the source's tree once every agent is reconciled. The walk ends
/// back at the source when none of its edges is left unlabeled.
pub fn start_euler_tour(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.reconciled_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(tour) = read::<Tour>(world, entity) else {
        return false;
    };
    if !role.source || tour.euler_done {
        return false;
    }

    let mut label = 0;
    let mut labeled = 0;
    let mut current = entity;
    let mut arrived: Option<Direction> = None;
    loop {
        enter(world, current, barrier);
        if let Some(from) = arrived {
            update::<Tour, _>(world, current, |t| t.in_edge[from.index()] = Some(label));
        }
        let Some((dir, next)) = next_edge(world, current, arrived) else {
            break;
        };
        let is_target = read::<Role>(world, current).is_some_and(|r| r.target);
        update::<Tour, _>(world, current, |t| {
            if is_target && !t.target_used {
                t.target_used = true;
                label += 1;
            }
            t.out_edge[dir.index()] = Some(label);
        });
        labeled += 1;
        arrived = Some(dir.opposite());
        current = next;
    }

    barrier.tours += 1;
    let hex = read::<Cell>(world, entity).map(|c| c.hex.to_string());
    log::info!(
        "tour from {} labeled {} edges, {} targets",
        hex.unwrap_or_default(),
        labeled,
        label
    );
    true
}

/// Drop every edge the tour entered and left under the same label.
pub fn prune_dead_edges(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    let Some(tour) = read::<Tour>(world, entity) else {
        return false;
    };
    if !tour.euler_done || tour.visited {
        return false;
    }
    update::<Tour, _>(world, entity, |t| {
        t.visited = true;
        for i in 0..6 {
            if t.in_edge[i] == t.out_edge[i] {
                t.in_edge[i] = None;
                t.out_edge[i] = None;
            }
        }
    });
    barrier.pruned += 1;
    true
}
