//! Headless observer client
//!
//! Joins a running session over WebSocket and prints what a participant
//! would present: phase banners, control locks, standings and arena events.
//! Useful for watching a match from a terminal:
//!
//! ```text
//! observer ws://localhost:8080/ws?session=<id> [display-name]
//! ```

use anyhow::bail;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::warn;

use tank_arena_server::arena::mirror::{Mirror, PresentationSink};
use tank_arena_server::ws::protocol::{ArenaEvent, ClientMsg, ServerMsg};

/// Prints phase reactions to stdout instead of driving a game scene
#[derive(Default)]
struct StdoutPresentation {
    controls_enabled: bool,
}

impl PresentationSink for StdoutPresentation {
    fn set_controls_enabled(&mut self, enabled: bool) {
        if self.controls_enabled != enabled {
            println!("[controls {}]", if enabled { "unlocked" } else { "locked" });
        }
        self.controls_enabled = enabled;
    }

    fn show_message(&mut self, text: &str) {
        if !text.is_empty() {
            println!("{}", text);
        }
    }

    fn frame_arena(&mut self) {
        println!("[camera frames the arena]");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = match args.next() {
        Some(url) => url,
        None => bail!("usage: observer <ws-url> [display-name]"),
    };
    let display_name = args.next();

    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let join = ClientMsg::Join {
        display_name,
        x: 0.0,
        y: 0.0,
    };
    write.send(Message::Text(serde_json::to_string(&join)?)).await?;

    let mut mirror = Mirror::new(StdoutPresentation::default());

    while let Some(frame) = read.next().await {
        match frame? {
            Message::Text(text) => {
                let msg: ServerMsg = match serde_json::from_str(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "Unparseable server message");
                        continue;
                    }
                };

                if handle_msg(&mut mirror, msg) {
                    break;
                }
            }
            Message::Close(_) => {
                println!("[server closed the connection]");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Apply one server message to the local mirror. Returns true once the
/// match is over and the observer should exit.
fn handle_msg(mirror: &mut Mirror<StdoutPresentation>, msg: ServerMsg) -> bool {
    match msg {
        ServerMsg::Welcome { participant_id, .. } => {
            println!("[connected as {}]", participant_id);
        }

        ServerMsg::MatchJoined {
            match_id,
            competitors,
            ..
        } => {
            println!("[joined match {}]", match_id);
            for c in &competitors {
                let marker = if c.is_leader { " (leader)" } else { "" };
                println!("  {}{}", c.display_name, marker);
            }
        }

        ServerMsg::CompetitorJoined { competitor } => {
            println!("[{} joined]", competitor.display_name);
        }

        ServerMsg::CompetitorLeft {
            participant_id,
            reason,
            ..
        } => {
            println!(
                "[{} left: {}]",
                &participant_id.to_string()[..8],
                reason
            );
        }

        ServerMsg::PhaseSync {
            round,
            phase,
            message,
            competitors,
            events,
            ..
        } => {
            // A fresh phase value runs the shared presentation; stale or
            // repeated syncs print nothing
            if mirror.apply(round, phase, &message) {
                for c in &competitors {
                    println!(
                        "  P{} {} wins={} hp={:.0} {}",
                        c.slot,
                        c.display_name,
                        c.wins,
                        c.health,
                        if c.alive { "alive" } else { "out" }
                    );
                }
            }

            for event in &events {
                print_event(event);
            }
        }

        ServerMsg::MatchEnd {
            winner_slot,
            summary,
        } => {
            println!("{}", summary);
            if let Some(slot) = winner_slot {
                println!("[match over, P{} takes it]", slot);
            } else {
                println!("[match over]");
            }
            return true;
        }

        ServerMsg::Error { code, message } => {
            println!("[error {}: {}]", code, message);
        }

        ServerMsg::Pong { .. } => {}
    }

    false
}

fn print_event(event: &ArenaEvent) {
    match event {
        ArenaEvent::Impact { shell_id, x, y } => {
            println!(
                "  * shell {} detonated at ({:.1}, {:.1})",
                &shell_id.to_string()[..8],
                x,
                y
            );
        }
        ArenaEvent::Hit {
            slot,
            damage,
            ..
        } => {
            println!("  * P{} took {:.0} damage", slot, damage);
        }
        ArenaEvent::Kill { slot } => {
            println!("  * P{} destroyed", slot);
        }
    }
}
