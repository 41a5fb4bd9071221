//! WebSocket protocol message definitions
//! These are the wire types for participant-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Match phase, owned by the authoritative match task and replicated to
/// every mirror. Mirrors only ever apply replicated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Pre-round freeze: competitors reset onto spawn slots, controls locked
    Starting,
    /// Live round, controls unlocked
    Playing,
    /// Post-round settlement: winner recorded, summary displayed
    Ending,
    /// Terminal: match winner decided, session tears down
    Completed,
}

impl Phase {
    /// Position of the phase within a round, for newest-wins ordering
    pub fn order(self) -> u8 {
        match self {
            Phase::Starting => 0,
            Phase::Playing => 1,
            Phase::Ending => 2,
            Phase::Completed => 3,
        }
    }
}

/// Messages sent from participant to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Join the session roster
    Join {
        /// Optional custom display name, otherwise the slot identity (P1..) applies
        display_name: Option<String>,
        /// Reported position, used for nearest-slot assignment when joining mid-match
        x: f32,
        y: f32,
    },

    /// Start the match. Honored only from the session leader.
    StartMatch,

    /// Shell detonation observed by the owning participant's engine
    ShellImpact {
        /// Shell identity; duplicate reports for the same shell are dropped
        shell_id: Uuid,
        /// Detonation point X
        x: f32,
        /// Detonation point Y
        y: f32,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave current match
    LeaveMatch,
}

/// Messages sent from server to participant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        participant_id: Uuid,
        server_time: u64,
    },

    /// Roster confirmation after a successful join
    MatchJoined {
        match_id: Uuid,
        /// Seed for deterministic arena layout generation
        seed: u64,
        /// All competitors in the match at join time
        competitors: Vec<CompetitorInfo>,
    },

    /// Competitor joined the match
    CompetitorJoined {
        competitor: CompetitorInfo,
    },

    /// Competitor left the match
    CompetitorLeft {
        participant_id: Uuid,
        /// Slot released by the departure, if one was assigned
        slot: Option<u8>,
        reason: String,
    },

    /// Phase replication (sent at regular intervals and on transitions)
    PhaseSync {
        /// Server tick number
        tick: u64,
        /// Round counter, increments on each Starting entry
        round: u32,
        /// Authoritative phase
        phase: Phase,
        /// Banner text computed by the authority (round announcement, summary)
        message: String,
        /// All competitor states
        competitors: Vec<CompetitorMirror>,
        /// Events that occurred since last sync
        events: Vec<ArenaEvent>,
    },

    /// Match has ended
    MatchEnd {
        /// Slot of the match winner (None only on abnormal teardown)
        winner_slot: Option<u8>,
        /// Final summary text
        summary: String,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Competitor info for lobby/join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorInfo {
    pub participant_id: Uuid,
    /// 1-based spawn slot, None until the match starts
    pub slot: Option<u8>,
    pub display_name: String,
    /// Session leader holds the start authority
    pub is_leader: bool,
}

/// Competitor state in a phase sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorMirror {
    /// 1-based spawn slot
    pub slot: u8,
    pub display_name: String,
    /// Rounds won so far
    pub wins: u32,
    /// Health (0-starting_health)
    pub health: f32,
    /// Is competitor alive this round
    pub alive: bool,
    /// Position X (spawn pose after a reset)
    pub x: f32,
    /// Position Y
    pub y: f32,
    /// Heading in radians
    pub heading: f32,
    /// Control-enable signal for this competitor
    pub controls_locked: bool,
}

/// Arena events (impacts, damage, kills)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ArenaEvent {
    /// Shell detonated
    Impact {
        shell_id: Uuid,
        x: f32,
        y: f32,
    },

    /// Splash damage applied to a competitor
    Hit {
        slot: u8,
        damage: f32,
        /// Outward push for the target's engine to apply
        impulse_x: f32,
        impulse_y: f32,
    },

    /// Competitor destroyed
    Kill {
        slot: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_tag_spelling() {
        let json = serde_json::to_string(&Phase::Starting).unwrap();
        assert_eq!(json, "\"starting\"");
        let back: Phase = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(back, Phase::Completed);
    }

    #[test]
    fn test_phase_order_within_round() {
        assert!(Phase::Starting.order() < Phase::Playing.order());
        assert!(Phase::Playing.order() < Phase::Ending.order());
        assert!(Phase::Ending.order() < Phase::Completed.order());
    }

    #[test]
    fn test_client_msg_round_trip() {
        let msg = ClientMsg::ShellImpact {
            shell_id: Uuid::new_v4(),
            x: 3.0,
            y: -1.5,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"shell_impact\""));
        let back: ClientMsg = serde_json::from_str(&json).unwrap();
        match back {
            ClientMsg::ShellImpact { x, y, .. } => {
                assert_eq!(x, 3.0);
                assert_eq!(y, -1.5);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_phase_sync_tag() {
        let msg = ServerMsg::PhaseSync {
            tick: 42,
            round: 1,
            phase: Phase::Starting,
            message: "ROUND 1".into(),
            competitors: vec![],
            events: vec![],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"phase_sync\""));
        assert!(json.contains("\"phase\":\"starting\""));
    }
}
