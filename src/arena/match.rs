//! Match state and authoritative phase loop

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::util::time::{
    tick_delta, unix_millis, Timer, REPLICATION_TPS, SIMULATION_TPS, TICK_DURATION_MICROS,
};
use crate::ws::protocol::{ArenaEvent, ClientMsg, CompetitorInfo, Phase, ServerMsg};

use super::competitor::{Competitor, Roster};
use super::damage::{DamageModel, ImpactTracker, ShellParams};
use super::mirror::{phase_presentation, PresentationSink};
use super::replication::Replicator;
use super::round::RoundCoordinator;
use super::spawn::{ArenaLayout, SpawnRegistry};
use super::ParticipantInput;

/// Static match tuning, fixed at construction
#[derive(Debug, Clone)]
pub struct MatchRules {
    /// Round wins needed to take the match
    pub rounds_to_win: u32,
    /// Seconds of Starting freeze before play
    pub start_delay: f32,
    /// Seconds of Ending settlement before the next round
    pub end_delay: f32,
    /// Roster cap; also the spawn slot count
    pub max_competitors: u8,
    pub starting_health: f32,
    /// Ring layout radius
    pub arena_radius: f32,
    pub shell: ShellParams,
    /// Seconds an empty, never-started session may idle before teardown
    pub lobby_timeout: f32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            rounds_to_win: 5,
            start_delay: 3.0,
            end_delay: 3.0,
            max_competitors: 4,
            starting_health: 100.0,
            arena_radius: 30.0,
            shell: ShellParams::default(),
            lobby_timeout: 300.0,
        }
    }
}

/// Match state (owned by match task)
pub struct MatchState {
    pub id: Uuid,
    pub seed: u64,
    /// None while the lobby gathers; Some once the leader starts the match
    pub phase: Option<Phase>,
    pub tick: u64,
    /// Round counter, increments on each Starting entry
    pub round: u32,
    /// Seconds left in the current Starting/Ending freeze
    pub phase_timer: f32,
    pub roster: Roster,
    pub spawns: SpawnRegistry,
    pub impacts: ImpactTracker,
    /// Match winner slot once a win count reaches the threshold
    pub game_winner: Option<u8>,
    /// Session leader, holds the start authority
    pub leader: Option<Uuid>,
    pub rules: MatchRules,
    pub created_at: u64,
}

impl MatchState {
    pub fn new(id: Uuid, seed: u64, rules: MatchRules) -> Self {
        let layout = ArenaLayout::ring(rules.max_competitors as usize, rules.arena_radius, seed);
        Self {
            id,
            seed,
            phase: None,
            tick: 0,
            round: 0,
            phase_timer: 0.0,
            roster: Roster::new(),
            spawns: SpawnRegistry::new(layout),
            impacts: ImpactTracker::new(),
            game_winner: None,
            leader: None,
            rules,
            created_at: unix_millis(),
        }
    }
}

/// The authority's presentation state. What it "shows" is exactly what
/// replicates: the banner text and control signal ride every phase sync.
#[derive(Debug, Default)]
struct BroadcastPresentation {
    message: String,
    controls_enabled: bool,
}

impl PresentationSink for BroadcastPresentation {
    fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    fn show_message(&mut self, text: &str) {
        self.message = text.to_string();
    }

    fn frame_arena(&mut self) {
        // camera rigs live on participants
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<ParticipantInput>,
    pub sync_tx: broadcast::Sender<ServerMsg>,
    pub participant_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    pub fn participant_count(&self) -> usize {
        self.participant_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_participants(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().participant_count())
            .sum()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative match
pub struct ArenaMatch {
    state: MatchState,
    coordinator: RoundCoordinator,
    presentation: BroadcastPresentation,
    input_rx: mpsc::Receiver<ParticipantInput>,
    sync_tx: broadcast::Sender<ServerMsg>,
    replicator: Replicator,
    participant_count: Arc<AtomicUsize>,
    pending_events: Vec<ArenaEvent>,
}

impl ArenaMatch {
    /// Create a new match
    pub fn new(id: Uuid, seed: u64, rules: MatchRules) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (sync_tx, _) = broadcast::channel(64);
        let participant_count = Arc::new(AtomicUsize::new(0));

        let handle = MatchHandle {
            id,
            input_tx,
            sync_tx: sync_tx.clone(),
            participant_count: participant_count.clone(),
        };

        let sync_interval = SIMULATION_TPS / REPLICATION_TPS;
        let coordinator = RoundCoordinator::new(rules.rounds_to_win);
        let arena_match = Self {
            state: MatchState::new(id, seed, rules),
            coordinator,
            presentation: BroadcastPresentation::default(),
            input_rx,
            sync_tx,
            replicator: Replicator::new(sync_interval),
            participant_count,
            pending_events: Vec::new(),
        };

        (arena_match, handle)
    }

    /// Run the authoritative phase loop
    pub async fn run(mut self) {
        info!(match_id = %self.state.id, "Session open");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let tick_ms = tick_duration.as_millis() as u64;
        let mut tick_timer = Timer::new();

        loop {
            tick_interval.tick().await;
            tick_timer.reset();

            // Drain input queue
            self.process_inputs();

            // Advance the phase machine
            self.run_tick();

            // Broadcast phase sync if due
            if self.replicator.should_send() {
                self.publish_sync();
            }

            let elapsed = tick_timer.elapsed_ms();
            if elapsed > tick_ms {
                warn!(match_id = %self.state.id, elapsed_ms = elapsed, "Slow tick");
            }

            // Terminal phase: session tears down
            if self.state.phase == Some(Phase::Completed) {
                info!(
                    match_id = %self.state.id,
                    winner_slot = ?self.state.game_winner,
                    "Match complete"
                );
                break;
            }

            // Check if all competitors disconnected
            if self.state.roster.is_empty() && self.state.phase.is_some() {
                info!(match_id = %self.state.id, "All competitors left, ending match");
                break;
            }

            // An abandoned lobby eventually closes
            if self.state.phase.is_none()
                && self.state.roster.is_empty()
                && self.lobby_expired()
            {
                info!(match_id = %self.state.id, "Lobby idle timeout, closing session");
                break;
            }
        }

        // Final message so mirrors settle on the result
        let _ = self.sync_tx.send(ServerMsg::MatchEnd {
            winner_slot: self.state.game_winner,
            summary: self.presentation.message.clone(),
        });
    }

    fn lobby_expired(&self) -> bool {
        let age_ms = unix_millis().saturating_sub(self.state.created_at);
        age_ms > (self.state.rules.lobby_timeout * 1000.0) as u64
    }

    /// Process all pending inputs from participants
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::Join { display_name, x, y } => {
                    self.handle_join(input.participant_id, display_name, x, y);
                }
                ClientMsg::StartMatch => {
                    self.handle_start(input.participant_id);
                }
                ClientMsg::ShellImpact { shell_id, x, y } => {
                    self.handle_impact(input.participant_id, shell_id, x, y);
                }
                ClientMsg::Ping { t } => {
                    let _ = self.sync_tx.send(ServerMsg::Pong { t });
                }
                ClientMsg::LeaveMatch => {
                    self.handle_leave(input.participant_id);
                }
            }
        }
    }

    /// Handle a join request
    fn handle_join(&mut self, participant_id: Uuid, display_name: Option<String>, x: f32, y: f32) {
        if self.state.roster.contains(&participant_id) {
            warn!(participant_id = %participant_id, "Competitor already in match");
            return;
        }

        if self.state.roster.len() >= self.state.rules.max_competitors as usize {
            let _ = self.sync_tx.send(ServerMsg::Error {
                code: "match_full".to_string(),
                message: "Match is full".to_string(),
            });
            return;
        }

        let mut competitor = Competitor::new(
            participant_id,
            display_name,
            x,
            y,
            self.state.rules.starting_health,
        );

        // Mid-match joiners bind the nearest free slot right away
        if self.state.phase.is_some() {
            match self.state.spawns.assign_nearest(participant_id, x, y) {
                Ok(slot) => competitor.slot = Some(slot),
                Err(err) => {
                    warn!(
                        participant_id = %participant_id,
                        error = %err,
                        "No spawn slot for mid-match joiner"
                    );
                    let _ = self.sync_tx.send(ServerMsg::Error {
                        code: "match_full".to_string(),
                        message: err.to_string(),
                    });
                    return;
                }
            }
        }

        if self.state.leader.is_none() {
            self.state.leader = Some(participant_id);
            info!(
                match_id = %self.state.id,
                participant_id = %participant_id,
                "Session leader assigned"
            );
        }

        self.state.roster.add(competitor);
        self.participant_count
            .store(self.state.roster.len(), Ordering::Relaxed);

        // Notify everyone of the new competitor
        let infos = self.roster_infos();
        if let Some(joined) = infos
            .iter()
            .find(|i| i.participant_id == participant_id)
            .cloned()
        {
            let _ = self.sync_tx.send(ServerMsg::CompetitorJoined { competitor: joined });
        }

        // Fresh roster for the joiner
        let _ = self.sync_tx.send(ServerMsg::MatchJoined {
            match_id: self.state.id,
            seed: self.state.seed,
            competitors: infos,
        });

        info!(
            match_id = %self.state.id,
            participant_id = %participant_id,
            competitor_count = self.state.roster.len(),
            "Competitor joined match"
        );
    }

    fn roster_infos(&self) -> Vec<CompetitorInfo> {
        self.state
            .roster
            .iter()
            .map(|c| CompetitorInfo {
                participant_id: c.participant_id,
                slot: c.slot,
                display_name: c.identity(),
                is_leader: self.state.leader == Some(c.participant_id),
            })
            .collect()
    }

    /// Handle a start request. Only the session leader may start, once.
    fn handle_start(&mut self, participant_id: Uuid) {
        if self.state.phase.is_some() {
            warn!(
                match_id = %self.state.id,
                participant_id = %participant_id,
                "Start requested on a running match"
            );
            let _ = self.sync_tx.send(ServerMsg::Error {
                code: "already_started".to_string(),
                message: "Match already started".to_string(),
            });
            return;
        }

        if self.state.leader != Some(participant_id) {
            warn!(
                match_id = %self.state.id,
                participant_id = %participant_id,
                "Start rejected: not the session leader"
            );
            let _ = self.sync_tx.send(ServerMsg::Error {
                code: "not_authoritative".to_string(),
                message: "Only the session leader can start the match".to_string(),
            });
            return;
        }

        // Bind every lobby competitor to a slot, in join order
        let ids = self.state.roster.ids_in_join_order();
        let assigned = match self.state.spawns.assign_fixed(&ids) {
            Ok(assigned) => assigned,
            Err(err) => {
                error!(match_id = %self.state.id, error = %err, "Slot assignment failed");
                let _ = self.sync_tx.send(ServerMsg::Error {
                    code: "over_capacity".to_string(),
                    message: err.to_string(),
                });
                return;
            }
        };
        for (id, slot) in assigned {
            if let Some(competitor) = self.state.roster.get_mut(&id) {
                competitor.slot = Some(slot);
            }
        }

        info!(
            match_id = %self.state.id,
            competitor_count = self.state.roster.len(),
            "Match started"
        );
        self.enter_starting();
    }

    /// Handle a shell impact report. Damage is decoupled from the phase
    /// machine; the report is honored in any phase once the match runs.
    fn handle_impact(&mut self, participant_id: Uuid, shell_id: Uuid, x: f32, y: f32) {
        if !self.state.roster.contains(&participant_id) {
            warn!(participant_id = %participant_id, "Impact report from outside the roster");
            let _ = self.sync_tx.send(ServerMsg::Error {
                code: "not_joined".to_string(),
                message: "Join the match before reporting impacts".to_string(),
            });
            return;
        }

        if self.state.phase.is_none() {
            warn!(participant_id = %participant_id, "Impact report before match start");
            return;
        }

        if !self.state.impacts.first_sighting(shell_id) {
            debug!(shell_id = %shell_id, "Duplicate impact report dropped");
            return;
        }

        self.pending_events.push(ArenaEvent::Impact { shell_id, x, y });

        let shell = self.state.rules.shell;
        let mut kills: Vec<u8> = Vec::new();
        for competitor in self.state.roster.iter_mut() {
            if !competitor.alive {
                continue;
            }
            let Some(slot) = competitor.slot else {
                continue;
            };
            let damage = DamageModel::splash_damage(x, y, competitor.x, competitor.y, &shell);
            if damage <= 0.0 {
                continue;
            }
            let (impulse_x, impulse_y) =
                DamageModel::splash_impulse(x, y, competitor.x, competitor.y, &shell);
            let (new_health, destroyed) = DamageModel::apply_damage(competitor.health, damage);
            competitor.health = new_health;
            self.pending_events.push(ArenaEvent::Hit {
                slot,
                damage,
                impulse_x,
                impulse_y,
            });
            if destroyed {
                competitor.alive = false;
                kills.push(slot);
            }
        }

        for slot in kills {
            debug!(match_id = %self.state.id, slot, "Competitor destroyed");
            self.pending_events.push(ArenaEvent::Kill { slot });
            self.replicator.force_next();
        }
    }

    /// Handle a leave
    fn handle_leave(&mut self, participant_id: Uuid) {
        if let Some(competitor) = self.state.roster.remove(&participant_id) {
            let slot = self.state.spawns.release(participant_id);
            self.participant_count
                .store(self.state.roster.len(), Ordering::Relaxed);

            let _ = self.sync_tx.send(ServerMsg::CompetitorLeft {
                participant_id,
                slot,
                reason: "disconnected".to_string(),
            });

            info!(
                match_id = %self.state.id,
                participant_id = %participant_id,
                "Competitor left match"
            );

            // Lobby leadership passes down the join order
            if self.state.phase.is_none() && self.state.leader == Some(participant_id) {
                self.state.leader = self.state.roster.iter().next().map(|c| c.participant_id);
                if let Some(leader) = self.state.leader {
                    info!(
                        match_id = %self.state.id,
                        participant_id = %leader,
                        "Session leader promoted"
                    );
                }
            }

            drop(competitor);
        }
    }

    /// Run a single simulation tick of the phase machine
    fn run_tick(&mut self) {
        self.state.tick += 1;

        let Some(phase) = self.state.phase else {
            // Lobby: nothing to advance
            return;
        };

        match phase {
            Phase::Starting => {
                self.state.phase_timer -= tick_delta();
                if self.state.phase_timer <= 0.0 {
                    self.enter_playing();
                }
            }
            Phase::Playing => {
                // Sole exit condition, polled every tick
                if self.state.roster.at_most_one_alive() {
                    self.enter_ending();
                }
            }
            Phase::Ending => {
                self.state.phase_timer -= tick_delta();
                if self.state.phase_timer <= 0.0 {
                    if self.state.game_winner.is_some() {
                        self.enter_completed();
                    } else {
                        self.enter_starting();
                    }
                }
            }
            Phase::Completed => {}
        }
    }

    fn enter_starting(&mut self) {
        self.state.phase = Some(Phase::Starting);
        self.state.round += 1;
        self.state.phase_timer = self.state.rules.start_delay;

        // Everyone back onto their slot, alive at full health
        let starting_health = self.state.rules.starting_health;
        for competitor in self.state.roster.iter_mut() {
            let Some(slot) = competitor.slot else {
                continue;
            };
            if let Some(spot) = self.state.spawns.slot(slot) {
                competitor.reset_for_round(spot, starting_health);
            }
        }

        phase_presentation(
            Phase::Starting,
            self.state.round,
            "",
            &mut self.presentation,
        );
        self.replicator.force_next();

        info!(match_id = %self.state.id, round = self.state.round, "Round starting");
    }

    fn enter_playing(&mut self) {
        self.state.phase = Some(Phase::Playing);
        phase_presentation(Phase::Playing, self.state.round, "", &mut self.presentation);
        self.replicator.force_next();

        info!(match_id = %self.state.id, round = self.state.round, "Round playing");
    }

    fn enter_ending(&mut self) {
        self.state.phase = Some(Phase::Ending);
        self.state.phase_timer = self.state.rules.end_delay;

        let report = self.coordinator.settle(&mut self.state.roster);
        self.state.game_winner = report.game_winner;
        phase_presentation(
            Phase::Ending,
            self.state.round,
            &report.summary,
            &mut self.presentation,
        );
        self.replicator.force_next();

        info!(
            match_id = %self.state.id,
            round = self.state.round,
            winner_slot = ?report.outcome.winner,
            is_draw = report.outcome.is_draw,
            game_winner = ?report.game_winner,
            "Round ended"
        );
    }

    fn enter_completed(&mut self) {
        self.state.phase = Some(Phase::Completed);
        let summary = self.presentation.message.clone();
        phase_presentation(
            Phase::Completed,
            self.state.round,
            &summary,
            &mut self.presentation,
        );
        self.replicator.force_next();
    }

    fn publish_sync(&mut self) {
        let Some(phase) = self.state.phase else {
            return;
        };
        let events = std::mem::take(&mut self.pending_events);
        let sync = self.replicator.build(
            self.state.tick,
            self.state.round,
            phase,
            &self.presentation.message,
            !self.presentation.controls_enabled,
            &self.state.roster,
            events,
        );
        let _ = self.sync_tx.send(sync);
    }
}
