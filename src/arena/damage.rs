//! Shell damage model - radial splash damage and impact dedup

use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Shell tuning parameters
#[derive(Debug, Clone, Copy)]
pub struct ShellParams {
    /// Damage at the detonation point
    pub max_damage: f32,
    /// Splash radius; damage reaches zero at this distance
    pub explosion_radius: f32,
    /// Peak impulse magnitude for the outward push
    pub explosion_force: f32,
}

impl Default for ShellParams {
    fn default() -> Self {
        Self {
            max_damage: 100.0,
            explosion_radius: 5.0,
            explosion_force: 1000.0,
        }
    }
}

/// Splash damage resolution for shell detonations
pub struct DamageModel;

impl DamageModel {
    /// Linear falloff factor: 1.0 at the detonation point, 0.0 from the
    /// radius outwards
    fn falloff(distance: f32, radius: f32) -> f32 {
        ((radius - distance) / radius).max(0.0)
    }

    /// Damage for a target at the given distance from the detonation point
    pub fn damage_at(distance: f32, params: &ShellParams) -> f32 {
        Self::falloff(distance, params.explosion_radius) * params.max_damage
    }

    /// Splash damage for a target position
    pub fn splash_damage(
        impact_x: f32,
        impact_y: f32,
        target_x: f32,
        target_y: f32,
        params: &ShellParams,
    ) -> f32 {
        let dx = target_x - impact_x;
        let dy = target_y - impact_y;
        let distance = (dx * dx + dy * dy).sqrt();
        Self::damage_at(distance, params)
    }

    /// Outward push for a target position, with the same falloff as damage.
    /// Zero at or beyond the radius; a target exactly on the detonation
    /// point has no push direction and gets a zero vector.
    pub fn splash_impulse(
        impact_x: f32,
        impact_y: f32,
        target_x: f32,
        target_y: f32,
        params: &ShellParams,
    ) -> (f32, f32) {
        let dx = target_x - impact_x;
        let dy = target_y - impact_y;
        let distance = (dx * dx + dy * dy).sqrt();
        let magnitude = Self::falloff(distance, params.explosion_radius) * params.explosion_force;
        if distance < f32::EPSILON || magnitude <= 0.0 {
            return (0.0, 0.0);
        }
        (dx / distance * magnitude, dy / distance * magnitude)
    }

    /// Apply damage to health, returns (new_health, destroyed)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }
}

/// Shell ids remembered for duplicate detection
const IMPACT_WINDOW: usize = 256;

/// Remembers recently processed shell ids so duplicate impact reports
/// resolve to no-ops
#[derive(Debug)]
pub struct ImpactTracker {
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    window: usize,
}

impl ImpactTracker {
    pub fn new() -> Self {
        Self::with_window(IMPACT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            window,
        }
    }

    /// True exactly once per shell id; later sightings are duplicates.
    /// Ids older than the window are retired in arrival order.
    pub fn first_sighting(&mut self, shell_id: Uuid) -> bool {
        if !self.seen.insert(shell_id) {
            return false;
        }
        self.order.push_back(shell_id);
        while self.order.len() > self.window {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ImpactTracker {
    fn default() -> Self {
        Self::new()
    }
}
