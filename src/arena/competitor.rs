//! Competitor roster state

use uuid::Uuid;

use crate::util::time::unix_millis;

use super::spawn::SpawnSlot;

/// Competitor state in a match (authoritative)
#[derive(Debug, Clone)]
pub struct Competitor {
    pub participant_id: Uuid,
    /// 1-based spawn slot, bound at match start (or on a mid-match join)
    /// and immutable afterwards
    pub slot: Option<u8>,
    /// Custom display name, if the participant provided one
    pub display_name: Option<String>,

    // Round scoring
    pub wins: u32,
    pub alive: bool,
    pub health: f32,

    // Pose; participant engines own movement, this holds the last reset pose
    pub x: f32,
    pub y: f32,
    pub heading: f32,

    pub joined_at: u64,
}

impl Competitor {
    pub fn new(
        participant_id: Uuid,
        display_name: Option<String>,
        x: f32,
        y: f32,
        starting_health: f32,
    ) -> Self {
        Self {
            participant_id,
            slot: None,
            display_name,
            wins: 0,
            alive: true,
            health: starting_health,
            x,
            y,
            heading: 0.0,
            joined_at: unix_millis(),
        }
    }

    /// Effective display identity: custom name, slot identity once bound,
    /// participant shorthand in the lobby
    pub fn identity(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        match self.slot {
            Some(slot) => format!("P{}", slot),
            None => format!("Player_{}", &self.participant_id.to_string()[..8]),
        }
    }

    /// Reset for a new round: back onto the spawn slot, alive, full health
    pub fn reset_for_round(&mut self, spot: &SpawnSlot, starting_health: f32) {
        self.x = spot.x;
        self.y = spot.y;
        self.heading = spot.heading;
        self.health = starting_health;
        self.alive = true;
    }
}

/// Join-ordered set of competitors owned by a match
#[derive(Debug, Default)]
pub struct Roster {
    competitors: Vec<Competitor>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            competitors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.competitors.iter().any(|c| c.participant_id == *id)
    }

    pub fn add(&mut self, competitor: Competitor) {
        self.competitors.push(competitor);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Competitor> {
        let index = self
            .competitors
            .iter()
            .position(|c| c.participant_id == *id)?;
        Some(self.competitors.remove(index))
    }

    pub fn get(&self, id: &Uuid) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.participant_id == *id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Competitor> {
        self.competitors
            .iter_mut()
            .find(|c| c.participant_id == *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Competitor> {
        self.competitors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Competitor> {
        self.competitors.iter_mut()
    }

    /// Competitors holding slots, ascending slot order
    pub fn in_slot_order(&self) -> Vec<&Competitor> {
        let mut slotted: Vec<&Competitor> = self
            .competitors
            .iter()
            .filter(|c| c.slot.is_some())
            .collect();
        slotted.sort_by_key(|c| c.slot);
        slotted
    }

    /// Participant ids in join order, for fixed slot assignment at start
    pub fn ids_in_join_order(&self) -> Vec<Uuid> {
        self.competitors.iter().map(|c| c.participant_id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.competitors.iter().filter(|c| c.alive).count()
    }

    /// The one-or-zero-alive predicate that ends the Playing phase
    pub fn at_most_one_alive(&self) -> bool {
        self.alive_count() <= 1
    }

    /// Record a round win for the slot holder
    pub fn record_win(&mut self, slot: u8) {
        if let Some(competitor) = self.competitors.iter_mut().find(|c| c.slot == Some(slot)) {
            competitor.wins += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitor_in_slot(slot: u8) -> Competitor {
        let mut competitor = Competitor::new(Uuid::new_v4(), None, 0.0, 0.0, 100.0);
        competitor.slot = Some(slot);
        competitor
    }

    #[test]
    fn test_identity_fallbacks() {
        let id = Uuid::new_v4();
        let mut competitor = Competitor::new(id, None, 0.0, 0.0, 100.0);
        assert_eq!(
            competitor.identity(),
            format!("Player_{}", &id.to_string()[..8])
        );

        competitor.slot = Some(3);
        assert_eq!(competitor.identity(), "P3");

        competitor.display_name = Some("Alice".to_string());
        assert_eq!(competitor.identity(), "Alice");
    }

    #[test]
    fn test_reset_for_round() {
        let mut competitor = competitor_in_slot(1);
        competitor.alive = false;
        competitor.health = 0.0;
        let spot = SpawnSlot {
            x: 5.0,
            y: -2.0,
            heading: 1.0,
        };
        competitor.reset_for_round(&spot, 100.0);
        assert!(competitor.alive);
        assert_eq!(competitor.health, 100.0);
        assert_eq!(competitor.x, 5.0);
        assert_eq!(competitor.heading, 1.0);
    }

    #[test]
    fn test_slot_order_view() {
        let mut roster = Roster::new();
        roster.add(competitor_in_slot(2));
        roster.add(competitor_in_slot(1));
        roster.add(Competitor::new(Uuid::new_v4(), None, 0.0, 0.0, 100.0));

        let ordered = roster.in_slot_order();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].slot, Some(1));
        assert_eq!(ordered[1].slot, Some(2));
    }

    #[test]
    fn test_alive_predicate() {
        let mut roster = Roster::new();
        roster.add(competitor_in_slot(1));
        roster.add(competitor_in_slot(2));
        assert!(!roster.at_most_one_alive());

        let first = roster.ids_in_join_order()[0];
        roster.get_mut(&first).unwrap().alive = false;
        assert!(roster.at_most_one_alive());
    }

    #[test]
    fn test_record_win_targets_slot_holder() {
        let mut roster = Roster::new();
        roster.add(competitor_in_slot(1));
        roster.add(competitor_in_slot(2));
        roster.record_win(2);
        roster.record_win(5); // no such slot, no effect

        assert_eq!(roster.in_slot_order()[0].wins, 0);
        assert_eq!(roster.in_slot_order()[1].wins, 1);
    }
}
