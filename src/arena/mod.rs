//! Arena match modules

pub mod competitor;
pub mod damage;
pub mod r#match;
pub mod mirror;
pub mod replication;
pub mod round;
pub mod spawn;

pub use r#match::{ArenaMatch, MatchHandle, MatchRegistry, MatchRules};

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Participant input received from WebSocket
#[derive(Debug, Clone)]
pub struct ParticipantInput {
    pub participant_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
