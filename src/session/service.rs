//! Session service - session creation and participant bindings

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::arena::{ArenaMatch, MatchRegistry, MatchRules, ParticipantInput};
use crate::ws::protocol::ServerMsg;

/// Session resolution errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session {0}")]
    UnknownSession(Uuid),
}

/// Lifetime counters, surfaced by the health endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceStats {
    pub sessions_created: u64,
    pub matches_completed: u64,
}

/// Session service. Each session is one match task; participants attach to
/// it through the channels on its registry handle.
pub struct SessionService {
    registry: Arc<MatchRegistry>,
    /// Map of participant -> current session
    participant_sessions: DashMap<Uuid, Uuid>,
    rules: MatchRules,
    stats: Arc<Mutex<ServiceStats>>,
}

impl SessionService {
    pub fn new(registry: Arc<MatchRegistry>, rules: MatchRules) -> Self {
        Self {
            registry,
            participant_sessions: DashMap::new(),
            rules,
            stats: Arc::new(Mutex::new(ServiceStats::default())),
        }
    }

    /// Create a session: construct the match, register its handle and spawn
    /// the task. The registration is dropped when the task exits.
    pub fn create_session(&self) -> Uuid {
        let session_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (arena_match, handle) = ArenaMatch::new(session_id, seed, self.rules.clone());
        self.registry.insert(handle);
        self.stats.lock().sessions_created += 1;

        let registry = self.registry.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            arena_match.run().await;

            registry.remove(&session_id);
            stats.lock().matches_completed += 1;
            info!(match_id = %session_id, "Session removed from registry");
        });

        info!(match_id = %session_id, seed, "Session created");
        session_id
    }

    /// Attach a participant (called when WebSocket connects): resolve the
    /// session's channels and record the binding
    pub fn register_participant(
        &self,
        participant_id: Uuid,
        session_id: Uuid,
    ) -> Result<(mpsc::Sender<ParticipantInput>, broadcast::Receiver<ServerMsg>), SessionError>
    {
        let handle = self
            .registry
            .get(&session_id)
            .ok_or(SessionError::UnknownSession(session_id))?;

        self.participant_sessions.insert(participant_id, session_id);
        Ok((handle.input_tx.clone(), handle.sync_tx.subscribe()))
    }

    /// Detach a participant (called when WebSocket disconnects)
    pub fn unregister_participant(&self, participant_id: &Uuid) {
        self.participant_sessions.remove(participant_id);
        info!(participant_id = %participant_id, "Participant unregistered");
    }

    /// Connected participants across all sessions
    pub fn connected_participants(&self) -> usize {
        self.participant_sessions.len()
    }

    pub fn stats(&self) -> ServiceStats {
        *self.stats.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_requires_known_session() {
        let registry = Arc::new(MatchRegistry::new());
        let service = SessionService::new(registry, MatchRules::default());

        let err = service
            .register_participant(Uuid::new_v4(), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn test_create_then_register_and_unregister() {
        let registry = Arc::new(MatchRegistry::new());
        let service = SessionService::new(registry.clone(), MatchRules::default());

        let session_id = service.create_session();
        assert_eq!(registry.active_matches(), 1);
        assert_eq!(service.stats().sessions_created, 1);

        let participant_id = Uuid::new_v4();
        let (input_tx, _sync_rx) = service
            .register_participant(participant_id, session_id)
            .unwrap();
        assert_eq!(service.connected_participants(), 1);
        assert!(!input_tx.is_closed());

        service.unregister_participant(&participant_id);
        assert_eq!(service.connected_participants(), 0);
    }
}
