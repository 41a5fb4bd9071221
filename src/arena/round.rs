//! Round and match outcome resolution

use super::competitor::Roster;

/// Outcome of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Winning slot, None on a draw
    pub winner: Option<u8>,
    pub is_draw: bool,
}

/// Everything one Ending settlement produces
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    /// Match winner slot once a win count reaches the threshold
    pub game_winner: Option<u8>,
    /// Banner text for mirrors; mirrors never recompute this
    pub summary: String,
}

/// Computes round/match outcomes and the summary banner
#[derive(Debug, Clone, Copy)]
pub struct RoundCoordinator {
    rounds_to_win: u32,
}

impl RoundCoordinator {
    pub fn new(rounds_to_win: u32) -> Self {
        Self { rounds_to_win }
    }

    /// Round outcome from the current alive flags. Callers invoke this once
    /// the at-most-one-alive predicate holds; with several still alive the
    /// first in slot order is reported.
    pub fn compute_round_outcome(&self, roster: &Roster) -> RoundOutcome {
        let winner = roster
            .in_slot_order()
            .iter()
            .find(|c| c.alive)
            .and_then(|c| c.slot);
        RoundOutcome {
            winner,
            is_draw: winner.is_none(),
        }
    }

    /// Match winner: the first competitor in slot order whose win count
    /// equals the threshold. Counts move by exactly 1 per round, so the
    /// equality test is deliberate.
    pub fn compute_match_outcome(&self, roster: &Roster) -> Option<u8> {
        roster
            .in_slot_order()
            .iter()
            .find(|c| c.wins == self.rounds_to_win)
            .and_then(|c| c.slot)
    }

    /// Summary banner: headline, four newlines, then one standings line per
    /// competitor in slot order. A decided match replaces the whole text.
    pub fn format_summary(
        &self,
        outcome: &RoundOutcome,
        game_winner: Option<u8>,
        roster: &Roster,
    ) -> String {
        let slotted = roster.in_slot_order();
        let identity_of = |slot: u8| {
            slotted
                .iter()
                .find(|c| c.slot == Some(slot))
                .map(|c| c.identity())
                .unwrap_or_else(|| format!("P{}", slot))
        };

        if let Some(winner) = game_winner {
            return format!("{} WINS THE GAME!", identity_of(winner));
        }

        let mut text = match outcome.winner {
            Some(winner) => format!("{} WINS THE ROUND!", identity_of(winner)),
            None => "DRAW!".to_string(),
        };
        text.push_str("\n\n\n\n");
        for competitor in &slotted {
            text.push_str(&format!("{}: {} WINS\n", competitor.identity(), competitor.wins));
        }
        text
    }

    /// Ending settlement: round outcome, the single win increment, match
    /// outcome and banner in one pass
    pub fn settle(&self, roster: &mut Roster) -> RoundReport {
        let outcome = self.compute_round_outcome(roster);
        if let Some(winner) = outcome.winner {
            roster.record_win(winner);
        }
        let game_winner = self.compute_match_outcome(roster);
        let summary = self.format_summary(&outcome, game_winner, roster);
        RoundReport {
            outcome,
            game_winner,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::competitor::Competitor;
    use uuid::Uuid;

    fn roster_of(count: u8) -> Roster {
        let mut roster = Roster::new();
        for slot in 1..=count {
            let mut competitor = Competitor::new(Uuid::new_v4(), None, 0.0, 0.0, 100.0);
            competitor.slot = Some(slot);
            roster.add(competitor);
        }
        roster
    }

    fn kill_all_but(roster: &mut Roster, survivor: Option<u8>) {
        for competitor in roster.iter_mut() {
            competitor.alive = competitor.slot == survivor;
        }
    }

    #[test]
    fn test_sole_survivor_wins_round() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(4);
        kill_all_but(&mut roster, Some(2));

        let outcome = coordinator.compute_round_outcome(&roster);
        assert_eq!(outcome.winner, Some(2));
        assert!(!outcome.is_draw);
    }

    #[test]
    fn test_no_survivor_is_a_draw() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(4);
        kill_all_but(&mut roster, None);

        let outcome = coordinator.compute_round_outcome(&roster);
        assert_eq!(outcome.winner, None);
        assert!(outcome.is_draw);
    }

    #[test]
    fn test_round_summary_exact_layout() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(4);
        kill_all_but(&mut roster, Some(2));

        let report = coordinator.settle(&mut roster);
        assert_eq!(
            report.summary,
            "P2 WINS THE ROUND!\n\n\n\nP1: 0 WINS\nP2: 1 WINS\nP3: 0 WINS\nP4: 0 WINS\n"
        );
        assert_eq!(report.game_winner, None);
    }

    #[test]
    fn test_draw_summary_layout() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(2);
        kill_all_but(&mut roster, None);

        let report = coordinator.settle(&mut roster);
        assert_eq!(report.summary, "DRAW!\n\n\n\nP1: 0 WINS\nP2: 0 WINS\n");
        assert_eq!(report.outcome.winner, None);
    }

    #[test]
    fn test_game_winner_replaces_summary() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(4);
        for competitor in roster.iter_mut() {
            if competitor.slot == Some(3) {
                competitor.wins = 4;
            }
        }
        kill_all_but(&mut roster, Some(3));

        let report = coordinator.settle(&mut roster);
        assert_eq!(report.summary, "P3 WINS THE GAME!");
        assert_eq!(report.game_winner, Some(3));
    }

    #[test]
    fn test_settle_increments_winner_only() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(3);
        kill_all_but(&mut roster, Some(1));

        coordinator.settle(&mut roster);
        let ordered = roster.in_slot_order();
        assert_eq!(ordered[0].wins, 1);
        assert_eq!(ordered[1].wins, 0);
        assert_eq!(ordered[2].wins, 0);
    }

    #[test]
    fn test_match_outcome_requires_exact_threshold() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(2);
        for competitor in roster.iter_mut() {
            if competitor.slot == Some(1) {
                // A count past the threshold does not match
                competitor.wins = 6;
            }
        }
        assert_eq!(coordinator.compute_match_outcome(&roster), None);

        for competitor in roster.iter_mut() {
            if competitor.slot == Some(2) {
                competitor.wins = 5;
            }
        }
        assert_eq!(coordinator.compute_match_outcome(&roster), Some(2));
    }

    #[test]
    fn test_match_outcome_slot_order_breaks_ties() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = roster_of(3);
        for competitor in roster.iter_mut() {
            if competitor.slot == Some(2) || competitor.slot == Some(3) {
                competitor.wins = 5;
            }
        }
        assert_eq!(coordinator.compute_match_outcome(&roster), Some(2));
    }

    #[test]
    fn test_custom_name_in_summary() {
        let coordinator = RoundCoordinator::new(5);
        let mut roster = Roster::new();
        let mut named = Competitor::new(Uuid::new_v4(), Some("Alice".to_string()), 0.0, 0.0, 100.0);
        named.slot = Some(1);
        roster.add(named);
        let mut other = Competitor::new(Uuid::new_v4(), None, 0.0, 0.0, 100.0);
        other.slot = Some(2);
        other.alive = false;
        roster.add(other);

        let report = coordinator.settle(&mut roster);
        assert_eq!(
            report.summary,
            "Alice WINS THE ROUND!\n\n\n\nAlice: 1 WINS\nP2: 0 WINS\n"
        );
    }
}
