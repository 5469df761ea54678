use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{Difficulty, NewPlayer, PlayerId};
use storage::repository::{NewPlayerRecord, Storage, StorageError};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    players: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPlayers { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPlayers { raw } => write!(f, "invalid --players value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite://quiz.sqlite3?mode=rwc".into());
        let mut players = std::env::var("QUIZ_SEED_PLAYERS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--players" => {
                    let value = require_value(&mut args, "--players")?;
                    players = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidPlayers { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            players,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3?mode=rwc)");
    eprintln!("  --players <n>             Number of demo players to insert (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed creation time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SEED_PLAYERS");
}

// name, age, grade, avatar, subject, activity, difficulty
const SAMPLES: [(&str, u8, u8, &str, &str, &str, Difficulty); 5] = [
    ("Ava", 7, 2, "fox.png", "Math", "Addition/Subtraction", Difficulty::Easy),
    ("Noah", 9, 4, "owl.png", "English", "Spelling", Difficulty::Medium),
    ("Mia", 8, 3, "cat.png", "Science", "Animals", Difficulty::Easy),
    ("Leo", 11, 6, "bear.png", "Math", "Fractions", Difficulty::Hard),
    ("Zoe", 10, 5, "default.png", "English", "Reading Comprehension", Difficulty::Medium),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut inserted = 0_u32;
    for (name, age, grade, avatar, subject, activity, difficulty) in
        SAMPLES.iter().take(args.players as usize)
    {
        let player = NewPlayer {
            name: (*name).to_string(),
            age: *age,
            grade: *grade,
            avatar: Some((*avatar).to_string()),
        }
        .validate(PlayerId::new(1), now)?
        .with_preferences(*subject, *activity, *difficulty);

        match storage
            .players
            .insert_player(NewPlayerRecord::from_player(&player))
            .await
        {
            Ok(_) => inserted += 1,
            Err(StorageError::Conflict) => {}
            Err(err) => return Err(err.into()),
        }
    }

    println!("Seeded {inserted} players into {}", args.db_url);

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
