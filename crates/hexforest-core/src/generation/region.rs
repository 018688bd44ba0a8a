//! Random region generation - grows a connected, hole-free blob of cells
//! from the center of a square grid, then picks sources and targets.

use std::collections::{BTreeSet, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;

use super::layout::GridLayout;
use crate::components::{Hex, Role};
use crate::config::ForestConfig;
use crate::engine::ForestError;

/// Whether every empty neighbor of `candidate` can still reach the edge of
/// the `size` x `size` grid through empty cells once `candidate` is filled.
fn keeps_border_reachable(occupied: &HashSet<Hex>, candidate: Hex, size: i32) -> bool {
    let on_grid = |h: &Hex| h.x >= 0 && h.y >= 0 && h.x < size && h.y < size;
    let on_border = |h: &Hex| h.x == 0 || h.y == 0 || h.x == size - 1 || h.y == size - 1;
    let empty = |h: &Hex| on_grid(h) && *h != candidate && !occupied.contains(h);

    candidate.neighbors().all(|(_, start)| {
        if !empty(&start) {
            return true;
        }
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(hex) = queue.pop_front() {
            if on_border(&hex) {
                return true;
            }
            for (_, next) in hex.neighbors() {
                if empty(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    })
}

/// Grow a region of up to `agents` cells inside a `grid_size` square. Fewer
/// cells come back only if the grid runs out of room.
pub fn random_region(agents: usize, grid_size: u32, rng: &mut impl Rng) -> GridLayout {
    let size = grid_size as i32;
    let center = Hex::new(size / 2, size / 2);
    let interior = |h: &Hex| h.x > 0 && h.y > 0 && h.x < size - 1 && h.y < size - 1;

    let mut occupied = HashSet::from([center]);
    let mut order = vec![center];
    let mut candidates: BTreeSet<Hex> = center.neighbors().map(|(_, h)| h).filter(interior).collect();

    while order.len() < agents && !candidates.is_empty() {
        let pick = rng.gen_range(0..candidates.len());
        let Some(candidate) = candidates.iter().nth(pick).copied() else {
            break;
        };
        candidates.remove(&candidate);

        if !keeps_border_reachable(&occupied, candidate, size) {
            continue;
        }
        occupied.insert(candidate);
        order.push(candidate);
        for (_, next) in candidate.neighbors() {
            if interior(&next) && !occupied.contains(&next) {
                candidates.insert(next);
            }
        }
    }

    if order.len() < agents {
        log::warn!(
            "grid of size {} only fit {} of {} agents",
            grid_size,
            order.len(),
            agents
        );
    }
    order.sort();
    GridLayout::from_hexes(order)
}

/// Mark `sources` random cells as sources and `targets` further cells as
/// targets. The two sets never overlap.
pub fn assign_roles(layout: &mut GridLayout, sources: usize, targets: usize, rng: &mut impl Rng) {
    let mut picks: Vec<usize> = (0..layout.len()).collect();
    picks.shuffle(rng);
    let cells = layout.cells_mut();
    for (rank, &i) in picks.iter().take(sources + targets).enumerate() {
        cells[i].role = if rank < sources {
            Role::source()
        } else {
            Role::target()
        };
    }
}

/// Random layout per `config`: grow a region, then assign roles.
pub fn generate_layout(config: &ForestConfig, rng: &mut impl Rng) -> Result<GridLayout, ForestError> {
    config.validate()?;
    let mut layout = random_region(config.agents, config.grid_size, rng);
    if layout.len() < config.sources + config.targets {
        return Err(ForestError::InvalidConfig(format!(
            "region of {} cells cannot hold {} sources and {} targets",
            layout.len(),
            config.sources,
            config.targets
        )));
    }
    assign_roles(&mut layout, config.sources, config.targets, rng);
    layout.validate()?;
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_region_is_connected_and_hole_free() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = random_region(60, 20, &mut rng);
            assert_eq!(layout.len(), 60, "seed {}", seed);
            assert!(layout.is_connected(), "seed {}", seed);
            assert!(!layout.has_holes(), "seed {}", seed);
        }
    }

    #[test]
    fn test_random_region_is_reproducible() {
        let a = random_region(40, 16, &mut StdRng::seed_from_u64(7));
        let b = random_region(40, 16, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_grid_caps_region() {
        // Only the 3x3 interior of a 5x5 grid is usable
        let layout = random_region(100, 5, &mut StdRng::seed_from_u64(1));
        assert!(layout.len() <= 9);
        assert!(layout.is_connected());
    }

    #[test]
    fn test_assign_roles_disjoint() {
        let mut layout = GridLayout::hexagon(2);
        assign_roles(&mut layout, 3, 4, &mut StdRng::seed_from_u64(3));
        assert_eq!(layout.sources().count(), 3);
        assert_eq!(layout.targets().count(), 4);
        assert!(layout.cells().iter().all(|c| !(c.role.source && c.role.target)));
    }

    #[test]
    fn test_generate_layout_rejects_bad_config() {
        let config = ForestConfig {
            sources: 0,
            ..ForestConfig::default()
        };
        let result = generate_layout(&config, &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(ForestError::InvalidConfig(_))));
    }
}
