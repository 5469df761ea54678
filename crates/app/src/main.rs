use std::fmt;

use quiz_core::model::{NewPlayer, PlayerId};
use services::config::parse_base_url;
use services::{AppServices, Clock, QuizConfig};
use tracing_subscriber::EnvFilter;

mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPlayerId { raw: String },
    InvalidRounds { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingFlag { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPlayerId { raw } => write!(f, "invalid player id: {raw}"),
            ArgsError::InvalidRounds { raw } => write!(f, "invalid --rounds value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--db <sqlite_url>] [--player <id>] [--rounds <n>] [--api <url>] [--offline]");
    eprintln!("  cargo run -p app -- players [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- add-player --name <name> --age <n> --grade <n> [--avatar <file>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- remove-player --id <id> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults for play:");
    eprintln!("  first player on the roster, 10 rounds, offline unless QUIZ_API_BASE_URL is set");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_API_BASE_URL, QUIZ_REQUEST_TIMEOUT_SECS, QUIZ_TARGET_ROUNDS,");
    eprintln!("  QUIZ_AUTO_ADVANCE_SECS, QUIZ_PREFETCH, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Players,
    AddPlayer,
    RemovePlayer,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "players" => Some(Self::Players),
            "add-player" => Some(Self::AddPlayer),
            "remove-player" => Some(Self::RemovePlayer),
            _ => None,
        }
    }
}

/// Flags shared by every command, plus the ones each command understands.
#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    player: Option<PlayerId>,
    rounds: Option<u32>,
    api: Option<String>,
    offline: bool,
    name: Option<String>,
    age: Option<u8>,
    grade: Option<u8>,
    avatar: Option<String>,
}

fn parse_small(flag: &'static str, value: String) -> Result<u8, ArgsError> {
    value
        .parse::<u8>()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                (Command::Play, "--player") | (Command::RemovePlayer, "--id") => {
                    let flag = if cmd == Command::Play { "--player" } else { "--id" };
                    let value = require_value(args, flag)?;
                    let id = value
                        .parse::<PlayerId>()
                        .map_err(|_| ArgsError::InvalidPlayerId { raw: value.clone() })?;
                    parsed.player = Some(id);
                }
                (Command::Play, "--rounds") => {
                    let value = require_value(args, "--rounds")?;
                    let rounds = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidRounds { raw: value })?;
                    parsed.rounds = Some(rounds);
                }
                (Command::Play, "--api") => parsed.api = Some(require_value(args, "--api")?),
                (Command::Play, "--offline") => parsed.offline = true,
                (Command::AddPlayer, "--name") => parsed.name = Some(require_value(args, "--name")?),
                (Command::AddPlayer, "--age") => {
                    parsed.age = Some(parse_small("--age", require_value(args, "--age")?)?);
                }
                (Command::AddPlayer, "--grade") => {
                    parsed.grade = Some(parse_small("--grade", require_value(args, "--grade")?)?);
                }
                (Command::AddPlayer, "--avatar") => {
                    parsed.avatar = Some(require_value(args, "--avatar")?);
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }

    /// CLI flags win over environment configuration.
    fn apply(&self, config: &mut QuizConfig) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(db_url) = &self.db_url {
            config.db_url.clone_from(db_url);
        }
        if let Some(rounds) = self.rounds {
            config.target_rounds = rounds;
        }
        if let Some(api) = &self.api {
            config.api_base_url = Some(parse_base_url("--api", api)?);
        }
        if self.offline {
            config.api_base_url = None;
        }
        Ok(())
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::Play,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(cmd, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    let mut config = QuizConfig::from_env()?;
    args.apply(&mut config)?;

    // Open + migrate SQLite at startup.
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(config, Clock::default()).await?;
    let players = services.players();

    match cmd {
        Command::Play => play::run(&services, args.player).await,
        Command::Players => {
            let roster = players.list_players().await?;
            if roster.is_empty() {
                println!("No players yet. Add one with `add-player`.");
            }
            for p in roster {
                println!(
                    "{:>3}  {:<16} age {:<2} grade {:<2} {} / {} ({})",
                    p.id(),
                    p.name(),
                    p.age(),
                    p.grade(),
                    p.preferred_subject(),
                    p.preferred_sub_activity(),
                    p.preferred_difficulty()
                );
            }
            Ok(())
        }
        Command::AddPlayer => {
            let draft = NewPlayer {
                name: args.name.ok_or(ArgsError::MissingFlag { flag: "--name" })?,
                age: args.age.ok_or(ArgsError::MissingFlag { flag: "--age" })?,
                grade: args.grade.ok_or(ArgsError::MissingFlag { flag: "--grade" })?,
                avatar: args.avatar,
            };
            let player = players.create_player(draft).await?;
            println!("Added player {} ({})", player.name(), player.id());
            Ok(())
        }
        Command::RemovePlayer => {
            let id = args.player.ok_or(ArgsError::MissingFlag { flag: "--id" })?;
            players.delete_player(id).await?;
            println!("Removed player {id}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn play_flags_override_config() {
        let args = parse(
            Command::Play,
            &["--rounds", "5", "--player", "3", "--db", "sqlite::memory:", "--offline"],
        )
        .unwrap();
        assert_eq!(args.player, Some(PlayerId::new(3)));

        let api = parse_base_url("QUIZ_API_BASE_URL", "http://localhost:8000/api").unwrap();
        let mut config = QuizConfig {
            api_base_url: Some(api),
            ..QuizConfig::default()
        };
        args.apply(&mut config).unwrap();
        assert_eq!(config.target_rounds, 5);
        assert_eq!(config.db_url, "sqlite::memory:");
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn zero_rounds_is_rejected() {
        let err = parse(Command::Play, &["--rounds", "0"]).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidRounds { .. }));
    }

    #[test]
    fn flags_are_scoped_to_their_command() {
        let err = parse(Command::Players, &["--name", "Ava"]).unwrap_err();
        assert!(matches!(err, ArgsError::UnknownArg(arg) if arg == "--name"));

        let args = parse(
            Command::AddPlayer,
            &["--name", "Ava", "--age", "8", "--grade", "3"],
        )
        .unwrap();
        assert_eq!(args.name.as_deref(), Some("Ava"));
        assert_eq!((args.age, args.grade), (Some(8), Some(3)));
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/quiz.sqlite3".to_string());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite://quiz.sqlite3?mode=rwc".to_string()),
            "sqlite://quiz.sqlite3?mode=rwc"
        );
    }
}
