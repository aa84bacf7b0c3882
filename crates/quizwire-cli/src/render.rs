//! Line renderer.
//!
//! Turns successive [`SessionSnapshot`]s into the lines that changed since
//! the previous one. Nothing here writes to the terminal.

use quizwire_app::SessionSnapshot;
use quizwire_client::{ChatEntry, ConnectionStatus, DeliveryStatus, RoundSnapshot, RoundState};

/// Seconds left at which the countdown of a question is shown.
const HURRY_SECONDS: u32 = 3;

/// Diffing renderer.
#[derive(Debug, Default)]
pub struct Renderer {
    last: Option<SessionSnapshot>,
}

impl Renderer {
    /// Renderer that has shown nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options of the question on screen, empty outside a question.
    pub fn options(&self) -> &[String] {
        self.last
            .as_ref()
            .and_then(|s| s.round.as_ref())
            .filter(|r| r.state == RoundState::Question)
            .and_then(|r| r.current_question.as_ref())
            .map_or(&[][..], |q| q.options.as_slice())
    }

    /// Lines describing what changed since the previous call.
    pub fn render(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut lines = Vec::new();
        let prev = self.last.as_ref();

        if prev.map(|p| p.status) != Some(snapshot.status) {
            lines.push(format!("* {}", status_label(snapshot.status)));
        }
        if snapshot.failed && !prev.is_some_and(|p| p.failed) {
            lines.push("* giving up on the broker, /connect to retry".to_string());
        }

        if let Some(last_room) = prev.and_then(|p| p.room_id.as_deref())
            && snapshot.room_id.as_deref() != Some(last_room)
        {
            lines.push(format!("* left room {last_room}"));
        }
        if let Some(room) = &snapshot.room
            && prev.and_then(|p| p.room.as_ref()) != Some(room)
        {
            let roster: Vec<String> = room
                .players
                .iter()
                .map(|p| {
                    let mark = if p.departed { " (left)" } else { "" };
                    format!("{} {}{mark}", p.name, p.score)
                })
                .collect();
            lines.push(format!(
                "# {} [{}] {:?}, {}/{} players: {}",
                room.name,
                room.code,
                room.status,
                room.players.len(),
                room.max_players,
                roster.join(", ")
            ));
        }

        if let Some(round) = &snapshot.round {
            render_round(prev.and_then(|p| p.round.as_ref()), round, &mut lines);
        }

        let seen = prev.map_or(&[][..], |p| p.messages.as_slice());
        for (i, entry) in snapshot.messages.iter().enumerate() {
            match seen.get(i) {
                None => lines.push(chat_line(entry)),
                Some(old)
                    if old.status != entry.status && entry.status == DeliveryStatus::Failed =>
                {
                    lines.push(format!("! not delivered: {}", entry.text));
                },
                Some(_) => {},
            }
        }

        if let Some(results) = &snapshot.results
            && prev.and_then(|p| p.results.as_ref()).is_none()
        {
            match results.user_rank {
                Some(rank) => lines.push(format!(
                    "= room {}: you placed {rank} of {}",
                    results.room_code,
                    results.players.len()
                )),
                None => lines.push(format!("= room {}: results are in", results.room_code)),
            }
        }

        if let Some(error) = &snapshot.last_error
            && prev.and_then(|p| p.last_error.as_ref()) != Some(error)
        {
            lines.push(format!("! {error}"));
        }

        self.last = Some(snapshot.clone());
        lines
    }
}

fn status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Disconnected => "disconnected",
        ConnectionStatus::Connecting => "connecting",
        ConnectionStatus::Connected => "connected",
    }
}

fn chat_line(entry: &ChatEntry) -> String {
    match entry.status {
        DeliveryStatus::Sending => format!("<{}> {} (sending)", entry.author_name, entry.text),
        DeliveryStatus::Failed => format!("<{}> {} (not delivered)", entry.author_name, entry.text),
        DeliveryStatus::Sent => format!("<{}> {}", entry.author_name, entry.text),
    }
}

fn render_round(prev: Option<&RoundSnapshot>, round: &RoundSnapshot, lines: &mut Vec<String>) {
    if let Some(n) = round.countdown
        && prev.and_then(|p| p.countdown) != Some(n)
    {
        lines.push(format!("~ starting in {n}"));
    }

    let question_id = round.current_question.as_ref().map(|q| q.question_id.as_str());
    let prev_question_id =
        prev.and_then(|p| p.current_question.as_ref()).map(|q| q.question_id.as_str());
    let entered = prev.map(|p| p.state) != Some(round.state) || question_id != prev_question_id;

    if entered {
        match round.state {
            RoundState::Initial => {},
            RoundState::Loading => lines.push("~ get ready".to_string()),
            RoundState::Question => {
                if let Some(q) = &round.current_question {
                    lines.push(format!(
                        "? Q{}/{} ({}s): {}",
                        q.round_number, q.total_rounds, q.time_limit, q.question
                    ));
                    for (i, option) in q.options.iter().enumerate() {
                        lines.push(format!("  {}) {option}", i + 1));
                    }
                }
            },
            RoundState::Result => match &round.selected_answer {
                Some(answer) => lines.push(format!("~ answered {answer}")),
                None => lines.push("~ time is up".to_string()),
            },
            RoundState::FinalResults => {
                lines.push("= game over".to_string());
                for (i, player) in round.leaderboard.iter().enumerate() {
                    lines.push(format!("  {}. {} {}", i + 1, player.name, player.score));
                }
            },
        }
    } else if round.state == RoundState::Question
        && round.time_left <= HURRY_SECONDS
        && prev.map(|p| p.time_left) != Some(round.time_left)
    {
        lines.push(format!("~ {}s left", round.time_left));
    }

    if let Some(correct) = round.is_correct
        && prev.and_then(|p| p.is_correct).is_none()
    {
        let answer = round.correct_answer.as_deref().unwrap_or("?");
        if correct {
            lines.push(format!("+ correct, score {}", round.score.unwrap_or(0)));
        } else {
            lines.push(format!("- wrong, the answer was {answer}"));
        }
    }

    if let Some(message) = &round.status_message
        && prev.and_then(|p| p.status_message.as_ref()) != Some(message)
    {
        lines.push(format!("~ {message}"));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quizwire_app::SessionEvent;
    use quizwire_harness::{SimWorld, fixtures};
    use quizwire_proto::topic::{PlayerFacet, RoomFacet, player_topic, room_topic};

    use super::*;

    fn in_room() -> (SimWorld, Renderer) {
        let mut world = SimWorld::new("u1");
        let mut renderer = Renderer::new();
        world.connect("token");
        world.step(SessionEvent::EnterRoom { room_id: "r1".into() });
        let players = vec![fixtures::player("u1", "Ann", 0), fixtures::player("u2", "Bob", 0)];
        let room = fixtures::room("r1", "ABC", "u1", players);
        world.publish(&room_topic("r1", RoomFacet::Quiz), &room);
        renderer.render(&world.snapshot());
        (world, renderer)
    }

    #[test]
    fn first_render_shows_status_and_roster() {
        let (world, _) = in_room();
        let lines = Renderer::new().render(&world.snapshot());
        assert_eq!(lines[0], "* connected");
        assert!(lines[1].starts_with("# "), "{lines:?}");
        assert!(lines[1].contains("[ABC]"));
        assert!(lines[1].contains("Ann 0, Bob 0"));
    }

    #[test]
    fn unchanged_snapshot_renders_nothing() {
        let (world, mut renderer) = in_room();
        assert!(renderer.render(&world.snapshot()).is_empty());
    }

    #[test]
    fn question_lists_numbered_options() {
        let (mut world, mut renderer) = in_room();
        world.publish(&room_topic("r1", RoomFacet::GameQuestion), &fixtures::question(1, 3, 10));

        let lines = renderer.render(&world.snapshot());
        assert!(lines.iter().any(|l| l.starts_with("? Q1/3 (10s)")), "{lines:?}");
        assert!(lines.contains(&"  1) A".to_string()));
        assert!(lines.contains(&"  4) D".to_string()));
        assert_eq!(renderer.options(), ["A", "B", "C", "D"]);
    }

    #[test]
    fn hurry_lines_only_near_the_end() {
        let (mut world, mut renderer) = in_room();
        world.publish(&room_topic("r1", RoomFacet::GameQuestion), &fixtures::question(1, 3, 5));
        renderer.render(&world.snapshot());

        world.advance(Duration::from_secs(1));
        assert!(renderer.render(&world.snapshot()).is_empty());
        world.advance(Duration::from_secs(1));
        assert_eq!(renderer.render(&world.snapshot()), vec!["~ 3s left".to_string()]);
    }

    #[test]
    fn answer_and_validation() {
        let (mut world, mut renderer) = in_room();
        world.publish(&room_topic("r1", RoomFacet::GameQuestion), &fixtures::question(1, 3, 10));
        renderer.render(&world.snapshot());

        world.step(SessionEvent::SubmitAnswer { option: "B".into() });
        assert_eq!(renderer.render(&world.snapshot()), vec!["~ answered B".to_string()]);
        assert!(renderer.options().is_empty());

        let validation = fixtures::validation("u1", 1, false, 0);
        world.publish(&player_topic("u1", PlayerFacet::Answer), &validation);
        let lines = renderer.render(&world.snapshot());
        assert!(lines.contains(&"- wrong, the answer was A".to_string()), "{lines:?}");
    }

    #[test]
    fn chat_lines_and_failures() {
        let (mut world, mut renderer) = in_room();
        world.publish(&room_topic("r1", RoomFacet::Chat), &fixtures::chat("m1", "u2", "hi", None));
        assert_eq!(renderer.render(&world.snapshot()), vec!["<Bob> hi".to_string()]);

        world.step(SessionEvent::SendChat { text: "yo".into() });
        assert_eq!(renderer.render(&world.snapshot()), vec!["<Ann> yo (sending)".to_string()]);

        world.advance(Duration::from_secs(11));
        let lines = renderer.render(&world.snapshot());
        assert!(lines.contains(&"! not delivered: yo".to_string()), "{lines:?}");
    }

    #[test]
    fn leaving_is_announced() {
        let (mut world, mut renderer) = in_room();
        world.step(SessionEvent::LeaveRoom);
        assert_eq!(renderer.render(&world.snapshot()), vec!["* left room r1".to_string()]);
    }
}
