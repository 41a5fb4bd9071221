//! Spawn slot allocation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use uuid::Uuid;

/// A fixed spawn point: position plus facing
#[derive(Debug, Clone, Copy)]
pub struct SpawnSlot {
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub heading: f32,
}

/// Spawn slot allocation errors
#[derive(Debug, Error)]
pub enum SpawnError {
    /// More competitors than slots at match start
    #[error("{competitors} competitors exceed {slots} spawn slots")]
    OverCapacity { competitors: usize, slots: usize },

    /// No unassigned slot left for a mid-match joiner
    #[error("no unassigned spawn slot remains")]
    ArenaFull,
}

/// Fixed set of spawn slots produced at arena load
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    slots: Vec<SpawnSlot>,
}

impl ArenaLayout {
    /// Evenly spaced ring facing the arena center. The whole ring is
    /// rotated by a seed-derived offset so arrangements vary per match.
    pub fn ring(count: usize, radius: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let offset = rng.gen_range(0.0..std::f32::consts::TAU);
        let slots = (0..count)
            .map(|i| {
                let angle = offset + std::f32::consts::TAU * i as f32 / count.max(1) as f32;
                SpawnSlot {
                    x: angle.cos() * radius,
                    y: angle.sin() * radius,
                    heading: (angle + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU),
                }
            })
            .collect();
        Self { slots }
    }

    /// Explicit layout, e.g. hand-placed arena spawn points
    pub fn from_slots(slots: Vec<SpawnSlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[SpawnSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Allocates competitors onto spawn slots. Slot indices are 1-based and
/// stable for the life of the match.
#[derive(Debug)]
pub struct SpawnRegistry {
    slots: Vec<SpawnSlot>,
    occupants: Vec<Option<Uuid>>,
}

impl SpawnRegistry {
    pub fn new(layout: ArenaLayout) -> Self {
        let occupants = vec![None; layout.slots.len()];
        Self {
            slots: layout.slots,
            occupants,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    /// Fixed assignment at match start: one competitor per slot, in the
    /// order given. Returned slot indices are the 1-based assignment order.
    /// Nothing is bound on error.
    pub fn assign_fixed(&mut self, ids: &[Uuid]) -> Result<Vec<(Uuid, u8)>, SpawnError> {
        if ids.len() > self.slots.len() {
            return Err(SpawnError::OverCapacity {
                competitors: ids.len(),
                slots: self.slots.len(),
            });
        }
        let mut assigned = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            self.occupants[i] = Some(*id);
            assigned.push((*id, (i + 1) as u8));
        }
        Ok(assigned)
    }

    /// Nearest-slot assignment for a mid-match joiner: the unoccupied slot
    /// closest to the reported position, lowest index on ties.
    pub fn assign_nearest(&mut self, id: Uuid, x: f32, y: f32) -> Result<u8, SpawnError> {
        let mut best: Option<(usize, f32)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if self.occupants[i].is_some() {
                continue;
            }
            let dx = slot.x - x;
            let dy = slot.y - y;
            let dist_sq = dx * dx + dy * dy;
            let closer = match best {
                Some((_, best_dist)) => dist_sq < best_dist,
                None => true,
            };
            if closer {
                best = Some((i, dist_sq));
            }
        }
        let (index, _) = best.ok_or(SpawnError::ArenaFull)?;
        self.occupants[index] = Some(id);
        Ok((index + 1) as u8)
    }

    /// Free the slot held by a departing competitor
    pub fn release(&mut self, id: Uuid) -> Option<u8> {
        for (i, occupant) in self.occupants.iter_mut().enumerate() {
            if *occupant == Some(id) {
                *occupant = None;
                return Some((i + 1) as u8);
            }
        }
        None
    }

    /// Spawn slot for a 1-based index
    pub fn slot(&self, slot: u8) -> Option<&SpawnSlot> {
        if slot == 0 {
            return None;
        }
        self.slots.get(slot as usize - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_layout() -> ArenaLayout {
        ArenaLayout::from_slots(vec![
            SpawnSlot {
                x: 0.0,
                y: 0.0,
                heading: 0.0,
            },
            SpawnSlot {
                x: 2.0,
                y: 0.0,
                heading: 0.0,
            },
            SpawnSlot {
                x: 4.0,
                y: 0.0,
                heading: 0.0,
            },
        ])
    }

    #[test]
    fn test_ring_slots_sit_on_radius() {
        let layout = ArenaLayout::ring(4, 30.0, 42);
        assert_eq!(layout.len(), 4);
        for slot in layout.slots() {
            let dist = (slot.x * slot.x + slot.y * slot.y).sqrt();
            assert!((dist - 30.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_ring_is_deterministic_per_seed() {
        let a = ArenaLayout::ring(4, 30.0, 7);
        let b = ArenaLayout::ring(4, 30.0, 7);
        for (sa, sb) in a.slots().iter().zip(b.slots()) {
            assert_eq!(sa.x, sb.x);
            assert_eq!(sa.y, sb.y);
            assert_eq!(sa.heading, sb.heading);
        }
    }

    #[test]
    fn test_assign_fixed_binds_in_order() {
        let mut registry = SpawnRegistry::new(line_layout());
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let assigned = registry.assign_fixed(&ids).unwrap();
        assert_eq!(assigned[0], (ids[0], 1));
        assert_eq!(assigned[1], (ids[1], 2));
        assert_eq!(registry.occupied(), 2);
    }

    #[test]
    fn test_assign_fixed_over_capacity() {
        let mut registry = SpawnRegistry::new(line_layout());
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let err = registry.assign_fixed(&ids).unwrap_err();
        assert!(matches!(
            err,
            SpawnError::OverCapacity {
                competitors: 4,
                slots: 3
            }
        ));
        assert_eq!(registry.occupied(), 0);
    }

    #[test]
    fn test_assign_nearest_picks_closest_free() {
        let mut registry = SpawnRegistry::new(line_layout());
        let slot = registry.assign_nearest(Uuid::new_v4(), 3.9, 0.0).unwrap();
        assert_eq!(slot, 3);
    }

    #[test]
    fn test_assign_nearest_tie_takes_lowest_index() {
        let mut registry = SpawnRegistry::new(line_layout());
        // Equidistant between slots 1 and 2
        let slot = registry.assign_nearest(Uuid::new_v4(), 1.0, 0.0).unwrap();
        assert_eq!(slot, 1);
    }

    #[test]
    fn test_assign_nearest_skips_occupied() {
        let mut registry = SpawnRegistry::new(line_layout());
        registry.assign_nearest(Uuid::new_v4(), 0.0, 0.0).unwrap();
        let slot = registry.assign_nearest(Uuid::new_v4(), 0.0, 0.0).unwrap();
        assert_eq!(slot, 2);
    }

    #[test]
    fn test_assign_nearest_when_full() {
        let mut registry = SpawnRegistry::new(line_layout());
        for _ in 0..3 {
            registry.assign_nearest(Uuid::new_v4(), 0.0, 0.0).unwrap();
        }
        let err = registry.assign_nearest(Uuid::new_v4(), 0.0, 0.0).unwrap_err();
        assert!(matches!(err, SpawnError::ArenaFull));
    }

    #[test]
    fn test_release_frees_slot() {
        let mut registry = SpawnRegistry::new(line_layout());
        let id = Uuid::new_v4();
        registry.assign_nearest(id, 0.0, 0.0).unwrap();
        assert_eq!(registry.release(id), Some(1));
        assert_eq!(registry.release(id), None);
        let slot = registry.assign_nearest(Uuid::new_v4(), 0.0, 0.0).unwrap();
        assert_eq!(slot, 1);
    }
}
