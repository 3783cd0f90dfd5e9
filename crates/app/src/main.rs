use std::fmt;
use std::sync::Arc;

use drill_core::model::{PriorTable, ScopeMode, ScopeSpec, SettingsError, StudySettings};
use services::{Clock, SessionLoopService};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidMode { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    Settings(SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value (expected group or position): {raw}")
            }
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::Settings(err) => write!(f, "invalid settings: {err}"),
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

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug)]
struct Args {
    db_url: String,
    mode: ScopeMode,
    /// `None` studies the whole collection.
    scope: Option<String>,
    settings: StudySettings,
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    fn parse_from(
        mut args: impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("LEARN_DB_URL")
            .map_or_else(|| normalize_sqlite_url("drill.sqlite3".into()), normalize_sqlite_url);
        let mut mode = match env("LEARN_SCOPE_MODE") {
            Some(raw) => raw.parse().map_err(|_| ArgsError::InvalidMode { raw })?,
            None => ScopeMode::Position,
        };
        let mut scope = env("LEARN_SCOPE");
        let mut autosave = match env("LEARN_AUTOSAVE") {
            Some(raw) => parse_number("LEARN_AUTOSAVE", raw)?,
            None => StudySettings::DEFAULT_AUTOSAVE_EVERY,
        };
        let mut credibility_k = match env("LEARN_CREDIBILITY_K") {
            Some(raw) => parse_number("LEARN_CREDIBILITY_K", raw)?,
            None => StudySettings::DEFAULT_CREDIBILITY_K,
        };
        let mut report_size = match env("LEARN_REPORT_SIZE") {
            Some(raw) => parse_number("LEARN_REPORT_SIZE", raw)?,
            None => StudySettings::DEFAULT_REPORT_SIZE,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--mode" => {
                    let value = require_value(&mut args, "--mode")?;
                    mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                }
                "--scope" => scope = Some(require_value(&mut args, "--scope")?),
                "--autosave" => {
                    autosave = parse_number("--autosave", require_value(&mut args, "--autosave")?)?;
                }
                "--k" => credibility_k = parse_number("--k", require_value(&mut args, "--k")?)?,
                "--report" => {
                    report_size = parse_number("--report", require_value(&mut args, "--report")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let settings =
            StudySettings::new(PriorTable::default(), credibility_k, autosave, report_size)
                .map_err(ArgsError::Settings)?;

        Ok(Self {
            db_url,
            mode,
            scope,
            settings,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: ./drill.sqlite3)");
    eprintln!("  --mode <group|position>   How --scope is matched (default: position)");
    eprintln!("  --scope <ranges>          e.g. 1-7, 1,5,10-20 (default: every item)");
    eprintln!("  --autosave <n>            Save every n answers, 0 = only at the end (default: 10)");
    eprintln!("  --k <float>               Prior credibility (default: 3)");
    eprintln!("  --report <n>              Hardest items listed at the end (default: 10)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  LEARN_DB_URL, LEARN_SCOPE_MODE, LEARN_SCOPE, LEARN_AUTOSAVE, LEARN_CREDIBILITY_K, LEARN_REPORT_SIZE"
    );
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    tracing::debug!(db = %args.db_url, mode = %args.mode, "opening store");
    let storage = Storage::sqlite(&args.db_url).await?;
    let svc = SessionLoopService::new(
        Clock::default(),
        Arc::clone(&storage.items),
        args.settings,
    );

    let mut items = svc.load_collection().await?;
    if items.is_empty() {
        return Err(format!(
            "{} holds no items; import a word list with `cargo run -p storage --bin seed`",
            args.db_url
        )
        .into());
    }

    let spec = match args.scope {
        Some(raw) => ScopeSpec::parse(args.mode, &raw)?,
        None => ScopeSpec::parse(ScopeMode::Position, &format!("1-{}", items.len()))?,
    };
    let mut session = svc.start_session(&items, &spec)?;
    tracing::info!(autosave_every = svc.settings().autosave_every(), "ready");

    let report = terminal::drive(&svc, &mut items, &mut session).await?;
    terminal::print_report(&report);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
