//! Global reconciliation - sources send a wave that lets every agent swap
//! its regional parent for a globally closer one.

use std::collections::{HashSet, VecDeque};

use hecs::{Entity, World};

use crate::barrier::Barrier;
use crate::components::{read, update, Cell, Layering, Links, Lineage, Role};
use crate::systems::find_parent;

fn hex_of(world: &World, entity: Entity) -> String {
    read::<Cell>(world, entity)
        .map(|c| c.hex.to_string())
        .unwrap_or_default()
}

/// A source, or an agent that already reconciled onto its global layers.
/// Only these can adopt a re-rooting child without breaking its delta.
fn committed(world: &World, entity: Entity) -> bool {
    if read::<Role>(world, entity).is_some_and(|r| r.source) {
        return true;
    }
    let settled = read::<Lineage>(world, entity).is_some_and(|l| l.new_parent_chosen && !l.orphaned);
    settled
        && read::<Layering>(world, entity).is_some_and(|l| {
            l.primary_sum().is_some() && l.primary_sum() == l.secondary_sum()
        })
}

/// Handle one reconciliation wave. Runs once per agent; sources only count
/// themselves as reconciled.
pub fn choose_new_parent(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    let Some(lineage) = read::<Lineage>(world, entity) else {
        return false;
    };
    if lineage.new_parent_chosen {
        return false;
    }
    update::<Lineage, _>(world, entity, |l| l.new_parent_chosen = true);
    barrier.reconciled += 1;

    let role = read::<Role>(world, entity).unwrap_or_default();
    let layering = read::<Layering>(world, entity).unwrap_or_default();
    if role.source {
        return true;
    }
    let Some(secondary) = layering.secondary else {
        return true;
    };

    let regional = layering.primary_sum().unwrap_or(u32::MAX);
    let globally_closer = layering.secondary_sum().is_some_and(|sum| sum < regional);
    if !(lineage.orphaned || globally_closer) {
        return true;
    }

    match find_parent(world, entity, &secondary, |nbr| committed(world, nbr), |l| l.secondary) {
        Some(dir) => {
            update::<Lineage, _>(world, entity, |l| {
                l.parent = Some(dir);
                l.orphaned = false;
                l.rerooted = true;
            });
            update::<Layering, _>(world, entity, |l| l.primary = Some(secondary));
        }
        None if lineage.orphaned => {
            log::warn!("agent at {} stays orphaned after reconciliation", hex_of(world, entity));
        }
        None => {
            log::debug!("agent at {} keeps its regional parent", hex_of(world, entity));
        }
    }
    true
}

/// Orphan every agent whose parent is gone, orphaned, or not exactly one
/// step closer under the final layers. Repeats until nothing changes, so a
/// whole branch below a broken edge detaches.
fn detach_broken_edges(world: &World, agents: &[Entity]) -> usize {
    let mut detached = 0;
    loop {
        let mut changed = false;
        for &agent in agents {
            let Some(dir) = read::<Lineage>(world, agent).and_then(|l| l.parent) else {
                continue;
            };
            let own = read::<Layering>(world, agent).and_then(|l| l.primary_sum());
            let intact = read::<Links>(world, agent)
                .and_then(|links| links.get(dir))
                .is_some_and(|up| {
                    let rooted = read::<Role>(world, up).is_some_and(|r| r.source)
                        || read::<Lineage>(world, up).is_some_and(|l| l.parent.is_some() && !l.orphaned);
                    let theirs = read::<Layering>(world, up).and_then(|l| l.primary_sum());
                    rooted && matches!((own, theirs), (Some(a), Some(b)) if a == b + 2)
                });
            if !intact {
                update::<Lineage, _>(world, agent, |l| {
                    l.parent = None;
                    l.orphaned = true;
                });
                log::warn!("agent at {} lost its parent edge {}", hex_of(world, agent), dir);
                detached += 1;
                changed = true;
            }
        }
        if !changed {
            return detached;
        }
    }
}

/// Send the reconciliation wave from a source to every agent it can reach.
/// Agents decide in order of their global layer sum, so a parent has
/// committed before any child considers it.
pub fn reconcile_wave(world: &World, entity: Entity, barrier: &mut Barrier) -> bool {
    if !barrier.global_layers_ready() {
        return false;
    }
    let role = read::<Role>(world, entity).unwrap_or_default();
    let Some(lineage) = read::<Lineage>(world, entity) else {
        return false;
    };
    if !role.source || lineage.wave_sent {
        return false;
    }
    update::<Lineage, _>(world, entity, |l| l.wave_sent = true);

    let mut reached = Vec::new();
    let mut seen = HashSet::from([entity]);
    let mut queue = VecDeque::from([entity]);
    while let Some(agent) = queue.pop_front() {
        reached.push(agent);
        let Some(links) = read::<Links>(world, agent) else { continue };
        for (_, next) in links.occupied() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    reached.sort_by_key(|&agent| {
        read::<Layering>(world, agent)
            .and_then(|l| l.secondary_sum())
            .unwrap_or(u32::MAX)
    });

    let handled = reached
        .iter()
        .filter(|&&agent| choose_new_parent(world, agent, barrier))
        .count();
    let detached = detach_broken_edges(world, &reached);

    log::info!(
        "reconciliation wave handled by {} agents, {} detached ({}/{} reconciled)",
        handled,
        detached,
        barrier.reconciled,
        barrier.agents
    );
    true
}
