use std::fmt;
use std::sync::Arc;

use lingo_core::Clock;
use lingo_core::model::{CardTypeToLearn, DeckId, QuizMode, StudyOptions, UserId};
use lingo_engine::{EngineSettings, SessionEngine, TracingEventSink};
use lingo_storage::repository::Storage;
use lingo_storage::sqlite::SqliteRepository;

mod logging;
mod seed;
mod study;

const DB_ENV: &str = "LINGO_DB_URL";
const USER_ENV: &str = "LINGO_USER_ID";
const DECK_ENV: &str = "LINGO_DECK_ID";
const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidCards { raw: String },
    InvalidCardType { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCards { raw } => {
                write!(f, "invalid --cards value: {raw} (expected a positive number)")
            }
            ArgsError::InvalidCardType { raw } => write!(
                f,
                "invalid --type value: {raw} (expected all, not_studied, learning, completed or due_for_review)"
            ),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
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

fn parse_id(flag: &'static str, raw: String) -> Result<u64, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  lingo-app seed    [--db <sqlite_url>] [--deck-id <id>]");
    eprintln!("  lingo-app study   [--db <sqlite_url>] [--user-id <id>] [--deck-id <id>]");
    eprintln!("                    [--review] [--cards <n>] [--type <kind>] [--shuffle]");
    eprintln!("                    [--include-completed] [--fresh]");
    eprintln!("  lingo-app history [--db <sqlite_url>] [--user-id <id>] [--deck-id <id>] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:lingo.sqlite3  --user-id 1  --deck-id 1  --cards 50  --type all");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_ENV}, {USER_ENV}, {DECK_ENV}, {}", logging::LOG_ENV);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Study,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "study" => Some(Self::Study),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user_id: UserId,
    deck_id: DeckId,
    mode: QuizMode,
    options: StudyOptions,
    fresh: bool,
    limit: u32,
}

impl Args {
    fn from_env() -> Self {
        let db_url = std::env::var(DB_ENV)
            .ok()
            .map_or_else(|| "sqlite://lingo.sqlite3".into(), normalize_sqlite_url);
        let user_id = std::env::var(USER_ENV)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let deck_id = std::env::var(DECK_ENV)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| DeckId::new(1), DeckId::new);

        Self {
            db_url,
            user_id,
            deck_id,
            mode: QuizMode::Learn,
            options: StudyOptions::default(),
            fresh: false,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::from_env();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--user-id" => {
                    let value = require_value(args, "--user-id")?;
                    parsed.user_id = UserId::new(parse_id("--user-id", value)?);
                }
                "--deck-id" => {
                    let value = require_value(args, "--deck-id")?;
                    parsed.deck_id = DeckId::new(parse_id("--deck-id", value)?);
                }
                "--review" => parsed.mode = QuizMode::Review,
                "--cards" => {
                    let value = require_value(args, "--cards")?;
                    let n: u32 = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidCards { raw: value.clone() })?;
                    parsed.options = parsed
                        .options
                        .with_cards_to_learn(n)
                        .map_err(|_| ArgsError::InvalidCards { raw: value })?;
                }
                "--type" => {
                    let value = require_value(args, "--type")?;
                    let kind: CardTypeToLearn = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCardType { raw: value.clone() })?;
                    parsed.options = parsed.options.with_card_type(kind);
                }
                "--shuffle" => parsed.options = parsed.options.with_shuffle_cards(true),
                "--include-completed" => {
                    parsed.options = parsed.options.with_include_completed_cards(true);
                }
                "--fresh" => parsed.fresh = true,
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    parsed.limit = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: study when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Study,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Study,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let settings = EngineSettings::default();
    let repo = SqliteRepository::connect(&parsed.db_url)
        .await?
        .with_spacing(settings.deck_spacing());
    repo.migrate().await?;
    let storage = Storage::from(repo);
    let clock = Clock::default_clock();
    tracing::debug!(db = %parsed.db_url, command = ?cmd, "storage ready");

    match cmd {
        Command::Seed => {
            let written = seed::seed_demo_deck(&storage, &clock, parsed.deck_id).await?;
            println!("Seeded {written} cards into deck {}.", parsed.deck_id);
        }
        Command::Study => {
            let engine = SessionEngine::from_storage(clock, &storage)
                .with_settings(settings)
                .with_event_sink(Arc::new(TracingEventSink));
            study::run_study(
                &engine,
                parsed.user_id,
                parsed.deck_id,
                parsed.mode,
                parsed.options,
                parsed.fresh,
            )
            .await?;
        }
        Command::History => {
            let engine = SessionEngine::from_storage(clock, &storage);
            let entries = engine
                .recent_history(parsed.user_id, parsed.deck_id, parsed.limit)
                .await?;
            study::print_history(&entries);
        }
    }
    Ok(())
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

#[tokio::main]
async fn main() {
    logging::init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn study_flags_build_options() {
        let args = parse(&[
            "--user-id", "7", "--deck-id", "3", "--review", "--cards", "5", "--type", "due",
            "--shuffle", "--fresh",
        ])
        .unwrap();

        assert_eq!(args.user_id, UserId::new(7));
        assert_eq!(args.deck_id, DeckId::new(3));
        assert_eq!(args.mode, QuizMode::Review);
        assert_eq!(args.options.cards_to_learn(), 5);
        assert_eq!(args.options.card_type(), CardTypeToLearn::DueForReview);
        assert!(args.options.shuffle_cards());
        assert!(!args.options.include_completed_cards());
        assert!(args.fresh);
    }

    #[test]
    fn zero_cards_is_rejected() {
        assert!(matches!(
            parse(&["--cards", "0"]),
            Err(ArgsError::InvalidCards { .. })
        ));
    }

    #[test]
    fn unknown_flag_and_missing_value_are_errors() {
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            parse(&["--deck-id"]),
            Err(ArgsError::MissingValue { flag: "--deck-id" })
        ));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/lingo.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/lingo.db"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
