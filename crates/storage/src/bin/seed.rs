use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use drill_core::model::{CollectionError, ItemCollection, ItemDraft};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }

    fn guess(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => {
                Delimiter::Tab
            }
            _ => Delimiter::Comma,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    file: PathBuf,
    delimiter: Option<Delimiter>,
    has_header: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFile,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidDelimiter { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFile => write!(f, "--file is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDelimiter { raw } => {
                write!(f, "invalid --delimiter value (expected tab or comma): {raw}")
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

fn parse_delimiter(raw: String) -> Result<Delimiter, ArgsError> {
    match raw.to_ascii_lowercase().as_str() {
        "tab" | "\\t" => Ok(Delimiter::Tab),
        "comma" | "," => Ok(Delimiter::Comma),
        _ => Err(ArgsError::InvalidDelimiter { raw }),
    }
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    fn parse_from(
        mut args: impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url =
            env("LEARN_DB_URL").unwrap_or_else(|| "sqlite:drill.sqlite3?mode=rwc".into());
        let mut file = env("LEARN_SEED_FILE").map(PathBuf::from);
        let mut delimiter = None;
        let mut has_header = true;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--delimiter" => {
                    let value = require_value(&mut args, "--delimiter")?;
                    delimiter = Some(parse_delimiter(value)?);
                }
                "--no-header" => has_header = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            file: file.ok_or(ArgsError::MissingFile)?,
            delimiter,
            has_header,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --file <path> [options]");
    eprintln!();
    eprintln!("Columns are read by position: prompt, answer, optional group label.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:drill.sqlite3?mode=rwc)");
    eprintln!("  --file <path>             Word list to import");
    eprintln!("  --delimiter <tab|comma>   Field separator (default: tab for .tsv/.txt, else comma)");
    eprintln!("  --no-header               Treat the first row as data");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LEARN_DB_URL, LEARN_SEED_FILE");
}

fn read_drafts(args: &Args) -> Result<Vec<ItemDraft>, csv::Error> {
    let delimiter = args.delimiter.unwrap_or_else(|| Delimiter::guess(&args.file));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(args.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&args.file)?;

    let mut drafts = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let prompt = record.get(0).unwrap_or_default();
        let answer = record.get(1).unwrap_or_default();
        if prompt.is_empty() || answer.is_empty() {
            tracing::warn!(row = line + 1, "skipping row without prompt and answer");
            continue;
        }

        let mut draft = ItemDraft::new(prompt, answer);
        if let Some(group) = record.get(2).filter(|g| !g.is_empty()) {
            draft = draft.with_group(group);
        }
        drafts.push(draft);
    }
    Ok(drafts)
}

/// Append the drafts whose (prompt, answer) pair is not stored yet.
///
/// Returns how many were added and how many were skipped.
fn merge_drafts(
    items: &mut ItemCollection,
    drafts: Vec<ItemDraft>,
) -> Result<(usize, usize), CollectionError> {
    let total = drafts.len();
    let keep: Vec<bool> = {
        let mut known: HashSet<(&str, &str)> =
            items.iter().map(|item| (item.prompt(), item.answer())).collect();
        drafts
            .iter()
            .map(|draft| known.insert((draft.prompt.as_str(), draft.answer.as_str())))
            .collect()
    };
    let fresh = drafts
        .into_iter()
        .zip(keep)
        .filter_map(|(draft, keep)| keep.then_some(draft));
    let added = items.extend(fresh)?.len();
    Ok((added, total - added))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let drafts = read_drafts(&args)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    let mut items = storage.items.load_all().await?;

    let (added, skipped) = merge_drafts(&mut items, drafts)?;
    storage.items.save_all(&items).await?;
    tracing::info!(added, skipped, total = items.len(), "seed complete");

    println!(
        "Imported {added} new items ({skipped} already present) into {}; {} items total",
        args.db_url,
        items.len()
    );

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

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::ItemId;
    use tempfile::TempDir;

    fn write_list(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn args_for(file: PathBuf) -> Args {
        Args {
            db_url: "sqlite::memory:".into(),
            file,
            delimiter: None,
            has_header: true,
        }
    }

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse_from(args.iter().map(|a| (*a).to_string()), |_| None)
    }

    #[test]
    fn delimiter_is_guessed_from_extension() {
        assert_eq!(Delimiter::guess(Path::new("words.tsv")), Delimiter::Tab);
        assert_eq!(Delimiter::guess(Path::new("words.TXT")), Delimiter::Tab);
        assert_eq!(Delimiter::guess(Path::new("words.csv")), Delimiter::Comma);
        assert_eq!(Delimiter::guess(Path::new("words")), Delimiter::Comma);
    }

    #[test]
    fn parse_delimiter_accepts_names_and_symbols() {
        assert_eq!(parse_delimiter("TAB".into()).unwrap(), Delimiter::Tab);
        assert_eq!(parse_delimiter("\\t".into()).unwrap(), Delimiter::Tab);
        assert_eq!(parse_delimiter("comma".into()).unwrap(), Delimiter::Comma);
        assert_eq!(parse_delimiter(",".into()).unwrap(), Delimiter::Comma);
        assert!(matches!(
            parse_delimiter("semicolon".into()),
            Err(ArgsError::InvalidDelimiter { .. })
        ));
    }

    #[test]
    fn flags_are_parsed() {
        let args = parse(&["--file", "list.csv", "--no-header", "--delimiter", "tab"]).unwrap();
        assert_eq!(args.file, PathBuf::from("list.csv"));
        assert!(!args.has_header);
        assert_eq!(args.delimiter, Some(Delimiter::Tab));
        assert_eq!(args.db_url, "sqlite:drill.sqlite3?mode=rwc");

        assert!(matches!(parse(&[]), Err(ArgsError::MissingFile)));
        assert!(matches!(
            parse(&["--file"]),
            Err(ArgsError::MissingValue { flag: "--file" })
        ));
    }

    #[test]
    fn file_can_come_from_environment() {
        let args = Args::parse_from(std::iter::empty(), |key| {
            (key == "LEARN_SEED_FILE").then(|| "from_env.tsv".to_string())
        })
        .unwrap();
        assert_eq!(args.file, PathBuf::from("from_env.tsv"));
        assert!(args.has_header);
    }

    #[test]
    fn rows_are_read_by_column_position() {
        let dir = TempDir::new().unwrap();
        let path = write_list(
            &dir,
            "words.csv",
            "word,meaning,day\napple,사과,day1\npear,배, \nplum,자두\n",
        );

        let drafts = read_drafts(&args_for(path)).unwrap();
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].prompt, "apple");
        assert_eq!(drafts[0].answer, "사과");
        assert_eq!(drafts[0].group.as_deref(), Some("day1"));
        assert_eq!(drafts[1].group, None);
        assert_eq!(drafts[2].group, None);
    }

    #[test]
    fn rows_without_prompt_or_answer_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_list(
            &dir,
            "words.tsv",
            "prompt\tanswer\napple\t사과\n\t배\nplum\t\nlonely\nfig\t무화과\n",
        );

        let drafts = read_drafts(&args_for(path)).unwrap();
        let prompts: Vec<&str> = drafts.iter().map(|d| d.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["apple", "fig"]);
    }

    #[test]
    fn no_header_keeps_the_first_row() {
        let dir = TempDir::new().unwrap();
        let path = write_list(&dir, "words.csv", "apple,사과\npear,배\n");

        let with_header = read_drafts(&args_for(path.clone())).unwrap();
        assert_eq!(with_header.len(), 1);

        let mut args = args_for(path);
        args.has_header = false;
        let drafts = read_drafts(&args).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].prompt, "apple");
    }

    #[test]
    fn explicit_delimiter_overrides_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_list(&dir, "words.txt", "prompt,answer\napple,사과\n");

        let mut args = args_for(path);
        args.delimiter = Some(Delimiter::Comma);
        let drafts = read_drafts(&args).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].answer, "사과");
    }

    #[test]
    fn rerun_skips_pairs_already_stored() {
        let mut items = ItemCollection::from_drafts(vec![ItemDraft::new("apple", "사과")]).unwrap();
        items.record_answer(ItemId::new(0), false, 0).unwrap();

        let drafts = vec![
            ItemDraft::new("apple", "사과"),
            ItemDraft::new("pear", "배"),
            ItemDraft::new("pear", "배"),
            ItemDraft::new("apple", "능금"),
        ];
        let (added, skipped) = merge_drafts(&mut items, drafts).unwrap();

        assert_eq!((added, skipped), (2, 2));
        assert_eq!(items.len(), 3);
        assert_eq!(items.get(ItemId::new(0)).unwrap().tries(), 1);
        assert_eq!(items.get(ItemId::new(2)).unwrap().answer(), "능금");

        let again = vec![ItemDraft::new("pear", "배")];
        assert_eq!(merge_drafts(&mut items, again).unwrap(), (0, 1));
        assert_eq!(items.len(), 3);
    }
}
