//! Phase sync cadence and assembly

use crate::ws::protocol::{ArenaEvent, CompetitorMirror, Phase, ServerMsg};

use super::competitor::Roster;

/// Decides when a phase sync leaves the match task and assembles it
pub struct Replicator {
    /// Tick counter since last sync
    ticks_since_sync: u32,
    /// Sync interval in ticks
    sync_interval: u32,
}

impl Replicator {
    pub fn new(sync_interval: u32) -> Self {
        Self {
            ticks_since_sync: 0,
            sync_interval,
        }
    }

    /// Check if it's time to send a sync
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_sync += 1;
        if self.ticks_since_sync >= self.sync_interval {
            self.ticks_since_sync = 0;
            true
        } else {
            false
        }
    }

    /// Force a sync on next check (phase transitions, kills)
    pub fn force_next(&mut self) {
        self.ticks_since_sync = self.sync_interval;
    }

    /// Build a sync message from the authority's current state
    pub fn build(
        &self,
        tick: u64,
        round: u32,
        phase: Phase,
        message: &str,
        controls_locked: bool,
        roster: &Roster,
        events: Vec<ArenaEvent>,
    ) -> ServerMsg {
        let competitors: Vec<CompetitorMirror> = roster
            .in_slot_order()
            .iter()
            .map(|c| CompetitorMirror {
                slot: c.slot.unwrap_or(0),
                display_name: c.identity(),
                wins: c.wins,
                health: c.health,
                alive: c.alive,
                x: c.x,
                y: c.y,
                heading: c.heading,
                controls_locked,
            })
            .collect();

        ServerMsg::PhaseSync {
            tick,
            round,
            phase,
            message: message.to_string(),
            competitors,
            events,
        }
    }
}
