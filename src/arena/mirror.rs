//! Mirror role: idempotent application of replicated phase values

use tracing::debug;

use crate::ws::protocol::Phase;

/// Presentation effects a phase entry triggers on a participant. Both
/// roles react to a phase through this interface: the authority drives its
/// broadcast-backed presentation, every participant drives a local one.
pub trait PresentationSink {
    /// Control-enable signal for the local competitor
    fn set_controls_enabled(&mut self, enabled: bool);
    /// Banner text (round announcement, summary); empty clears it
    fn show_message(&mut self, text: &str);
    /// Ask the camera rig to frame the arena for the new round
    fn frame_arena(&mut self);
}

/// Shared phase-entry reactions. Presentational only: outcomes arrive
/// precomputed in `message` and are never derived here.
pub fn phase_presentation<S: PresentationSink>(
    phase: Phase,
    round: u32,
    message: &str,
    sink: &mut S,
) {
    match phase {
        Phase::Starting => {
            sink.set_controls_enabled(false);
            sink.frame_arena();
            sink.show_message(&format!("ROUND {}", round));
        }
        Phase::Playing => {
            sink.set_controls_enabled(true);
            sink.show_message("");
        }
        Phase::Ending | Phase::Completed => {
            sink.set_controls_enabled(false);
            sink.show_message(message);
        }
    }
}

/// Newest-wins order over replicated (round, phase) values
fn is_newer(last: (u32, Phase), incoming: (u32, Phase)) -> bool {
    (incoming.0, incoming.1.order()) > (last.0, last.1.order())
}

/// Applied-phase memory plus the sink it drives. Replication may repeat or
/// skip values; `apply` absorbs both.
#[derive(Debug)]
pub struct Mirror<S: PresentationSink> {
    last_applied: Option<(u32, Phase)>,
    round: u32,
    sink: S,
}

impl<S: PresentationSink> Mirror<S> {
    pub fn new(sink: S) -> Self {
        Self {
            last_applied: None,
            round: 0,
            sink,
        }
    }

    /// Adopt a replicated (round, phase) value. Values equal to or older
    /// than the last applied one are dropped silently; a fresh value runs
    /// the shared presentation exactly once.
    pub fn apply(&mut self, round: u32, phase: Phase, message: &str) -> bool {
        if let Some(last) = self.last_applied {
            if !is_newer(last, (round, phase)) {
                debug!(round, ?phase, "Stale phase sync dropped");
                return false;
            }
        }
        self.round = round;
        phase_presentation(phase, round, message, &mut self.sink);
        self.last_applied = Some((round, phase));
        true
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn last_applied(&self) -> Option<(u32, Phase)> {
        self.last_applied
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
