//! Line-oriented terminal front end for a game session.

use std::io::Write as _;

use quiz_core::model::{ActivityRegistry, Difficulty, PlayerId, SettingsUpdate};
use services::{AppServices, GameSession, Outcome, PlayerService, SessionSnapshot, SessionStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  <answer>            answer the question (a number picks a choice)
  <enter>             next question / retry loading
  :subject <name>     switch subject
  :activity <name>    switch sub-activity
  :difficulty <level> easy | medium | hard
  :subjects           list subjects and activities
  :again              play another round of questions
  :help               show this help
  :q                  quit";

enum Flow {
    Continue,
    Quit,
}

/// The parts of a snapshot that change what is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderKey {
    status: SessionStatus,
    question: Option<String>,
    rounds_played: u32,
    error: Option<String>,
    fetching: bool,
}

impl RenderKey {
    fn of(snapshot: &SessionSnapshot) -> Self {
        Self {
            status: snapshot.status,
            question: snapshot.question.as_ref().map(|q| q.id().to_string()),
            rounds_played: snapshot.counters.rounds_played,
            error: snapshot.error.clone(),
            fetching: snapshot.is_fetching_question,
        }
    }
}

#[derive(Default)]
struct Screen {
    last: Option<RenderKey>,
    countdown: Option<u32>,
}

impl Screen {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        let key = RenderKey::of(snapshot);
        if self.last.as_ref() != Some(&key) {
            self.countdown = None;
            draw(snapshot);
            self.last = Some(key);
        }
        if snapshot.countdown != self.countdown {
            if let Some(secs) = snapshot.countdown {
                print!("\r  next question in {secs}s… ");
                let _ = std::io::stdout().flush();
            }
            self.countdown = snapshot.countdown;
        }
    }
}

fn draw(snapshot: &SessionSnapshot) {
    let round = snapshot.round();
    let target = snapshot.target_rounds;
    match snapshot.status {
        SessionStatus::NoPlayer => println!("No player selected."),
        SessionStatus::Idle => {
            if let Some(err) = &snapshot.error {
                println!("⚠ {err}");
            }
            println!("Ready. Type :again to start.");
        }
        SessionStatus::AwaitingQuestion | SessionStatus::AwaitingNextQuestion => {
            if snapshot.is_fetching_question {
                println!("\nLoading question {round}/{target}…");
            } else if let Some(err) = &snapshot.error {
                println!("⚠ Could not load the next question: {err}");
                println!("  Press Enter to try again.");
            }
        }
        SessionStatus::QuestionActive => {
            let Some(question) = &snapshot.question else {
                return;
            };
            println!();
            println!(
                "Round {round}/{target} · {} / {} ({})",
                snapshot.settings.subject(),
                snapshot.settings.sub_activity(),
                snapshot.settings.difficulty()
            );
            if snapshot.question_mismatch {
                println!(
                    "  (this one is from {} / {})",
                    question.subject(),
                    question.sub_activity()
                );
            }
            if let Some(passage) = question.passage() {
                println!("\n{passage}\n");
            }
            println!("{}", question.text());
            if let Some(choices) = question.choices() {
                for (i, choice) in choices.iter().enumerate() {
                    println!("  {}) {choice}", i + 1);
                }
            }
            if let Some(err) = &snapshot.error {
                println!("⚠ {err}");
            }
        }
        SessionStatus::AnswerPending => println!("Checking…"),
        SessionStatus::FeedbackShown => {
            if let Some(feedback) = &snapshot.feedback {
                let mark = if feedback.is_correct { "✅" } else { "❌" };
                println!("{mark} {}", feedback.message);
            }
            println!(
                "Score {} · Streak {} · Round {round}/{target}",
                snapshot.counters.score, snapshot.counters.streak
            );
            println!("Press Enter for the next question.");
        }
        SessionStatus::Completed => {
            if let Some(feedback) = &snapshot.feedback {
                let mark = if feedback.is_correct { "✅" } else { "❌" };
                println!("{mark} {}", feedback.message);
            }
            println!(
                "\n🏁 All done! Final score {} after {} rounds.",
                snapshot.counters.score, snapshot.counters.rounds_played
            );
            println!("Type :again to play again or :q to quit.");
        }
    }
}

fn print_subjects(registry: &ActivityRegistry) {
    for subject in registry.subjects() {
        let names: Vec<&str> = subject.activities.iter().map(|a| a.name.as_str()).collect();
        println!("  {}: {}", subject.name, names.join(", "));
    }
}

/// Number answers pick from the choices; anything else is sent as typed.
fn resolve_answer(snapshot: &SessionSnapshot, input: &str) -> String {
    let choices = snapshot.question.as_ref().and_then(|q| q.choices());
    match (choices, input.parse::<usize>()) {
        (Some(choices), Ok(n)) if (1..=choices.len()).contains(&n) => choices[n - 1].clone(),
        _ => input.to_string(),
    }
}

async fn change_settings(
    session: &GameSession,
    players: &PlayerService,
    update: SettingsUpdate,
) {
    match session.update_settings(&update) {
        Ok(Outcome::Applied) => {}
        Ok(_) => return,
        Err(err) => {
            println!("⚠ {err}");
            return;
        }
    }
    let snapshot = session.snapshot();
    let settings = &snapshot.settings;
    println!(
        "Next questions: {} / {} ({})",
        settings.subject(),
        settings.sub_activity(),
        settings.difficulty()
    );
    if let Some(player) = snapshot.player.clone() {
        let player = player.with_preferences(
            settings.subject(),
            settings.sub_activity(),
            settings.difficulty(),
        );
        if let Err(err) = players.save_preferences(&player).await {
            warn!(error = %err, "could not save preferences");
        }
    }
}

async fn handle_line(
    session: &GameSession,
    services: &AppServices,
    line: &str,
) -> Flow {
    let (command, rest) = line
        .split_once(' ')
        .map_or((line, ""), |(cmd, rest)| (cmd, rest.trim()));

    let result = match command {
        ":q" | ":quit" => return Flow::Quit,
        ":help" => {
            println!("{HELP}");
            return Flow::Continue;
        }
        ":subjects" => {
            print_subjects(&services.registry());
            return Flow::Continue;
        }
        ":subject" => {
            change_settings(session, &services.players(), SettingsUpdate::subject(rest)).await;
            return Flow::Continue;
        }
        ":activity" => {
            let update = SettingsUpdate {
                sub_activity: Some(rest.to_string()),
                ..SettingsUpdate::default()
            };
            change_settings(session, &services.players(), update).await;
            return Flow::Continue;
        }
        ":difficulty" => {
            match rest.parse::<Difficulty>() {
                Ok(level) => {
                    let update = SettingsUpdate {
                        difficulty: Some(level),
                        ..SettingsUpdate::default()
                    };
                    change_settings(session, &services.players(), update).await;
                }
                Err(err) => println!("⚠ {err}"),
            }
            return Flow::Continue;
        }
        ":again" => {
            if session.snapshot().status == SessionStatus::Completed {
                let _ = session.reset_session(true);
            }
            session.start_session(None).await
        }
        _ if line.starts_with(':') => {
            println!("Unknown command {command}. Type :help for the list.");
            return Flow::Continue;
        }
        "" => match session.snapshot().status {
            SessionStatus::FeedbackShown | SessionStatus::AwaitingNextQuestion => {
                session.advance().await
            }
            _ => Ok(Outcome::Ignored),
        },
        _ => {
            let snapshot = session.snapshot();
            if snapshot.status != SessionStatus::QuestionActive {
                return Flow::Continue;
            }
            let answer = resolve_answer(&snapshot, line);
            session.submit_answer(&answer).await
        }
    };

    // Failures show up in the next snapshot's `error`.
    match result {
        Ok(outcome) => debug!(?outcome, command, "action finished"),
        Err(err) => debug!(error = %err, command, "action failed"),
    }
    Flow::Continue
}

/// Play in the terminal until the player quits or stdin closes.
///
/// # Errors
///
/// Returns an error if the player cannot be loaded or stdin fails.
pub(crate) async fn run(
    services: &AppServices,
    player_id: Option<PlayerId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let players = services.players();
    let player = match player_id {
        Some(id) => players.get_player(id).await?,
        None => players
            .list_players()
            .await?
            .into_iter()
            .next()
            .ok_or("no players yet; add one with `add-player`")?,
    };

    println!("Hi {}! {HELP}", player.name());

    let session = services.new_session();
    let _ = session.select_player(player);
    let mut rx = session.subscribe();
    let mut screen = Screen::default();

    if let Err(err) = session.start_session(None).await {
        debug!(error = %err, "first question failed");
    }
    screen.render(&rx.borrow_and_update());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                screen.render(&snapshot);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Flow::Quit = handle_line(&session, services, line.trim()).await {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                screen.render(&snapshot);
            }
        }
    }

    let _ = session.reset_session(false);
    println!("Bye!");
    Ok(())
}
