//! Line-oriented study loop on stdin/stdout.

use drill_core::model::{InitLevel, ItemCollection, ScopeMode, ScopeSpec, SessionReport};
use services::{
    Autosave, ItemStats, LastSeen, ScopeAccuracy, SessionError, SessionLoopService,
    SessionProgress, StudySession, Turn,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Rate(InitLevel),
    Reveal,
    Correct,
    Incorrect,
    Quit,
    Rescope(ScopeMode, String),
    Status,
    Groups,
    Help,
    Invalid(String),
}

/// Interpret one input line. Meaning depends on what is on screen.
pub(crate) fn parse_command(line: &str, turn: Turn) -> Command {
    let line = line.trim();
    let lower = line.to_ascii_lowercase();

    if let Some(rest) = lower.strip_prefix("r ") {
        let mut parts = rest.trim().splitn(2, char::is_whitespace);
        let mode = parts.next().unwrap_or_default();
        let ranges = parts.next().unwrap_or_default().trim();
        return match mode.parse::<ScopeMode>() {
            Ok(mode) if !ranges.is_empty() => Command::Rescope(mode, ranges.to_string()),
            _ => Command::Invalid(line.to_string()),
        };
    }

    match (lower.as_str(), turn) {
        ("q", _) => Command::Quit,
        ("s", _) => Command::Status,
        ("g", _) => Command::Groups,
        ("?" | "h", _) => Command::Help,
        ("", Turn::Present(_)) => Command::Reveal,
        ("y", Turn::Judge(_)) => Command::Correct,
        ("n", Turn::Judge(_)) => Command::Incorrect,
        (raw, Turn::Rate(_)) => raw
            .parse::<u8>()
            .ok()
            .and_then(|v| InitLevel::from_u8(v).ok())
            .map_or_else(|| Command::Invalid(line.to_string()), Command::Rate),
        _ => Command::Invalid(line.to_string()),
    }
}

#[must_use]
pub(crate) fn describe_rate(stats: &ItemStats) -> String {
    match stats.correct_rate {
        Some(rate) => format!(
            "{:.0}% ({}/{})",
            rate * 100.0,
            stats.correct,
            stats.tries
        ),
        None => "-".to_string(),
    }
}

#[must_use]
pub(crate) fn describe_last_seen(last_seen: LastSeen) -> String {
    match last_seen {
        LastSeen::Never => "first time".to_string(),
        LastSeen::JustNow => "just now".to_string(),
        LastSeen::TurnsAgo(1) => "1 item ago".to_string(),
        LastSeen::TurnsAgo(n) => format!("{n} items ago"),
    }
}

#[must_use]
pub(crate) fn status_line(progress: &SessionProgress, accuracy: ScopeAccuracy) -> String {
    let rate = accuracy
        .rate()
        .map_or_else(|| "-".to_string(), |r| format!("{:.0}%", r * 100.0));
    let mut line = format!(
        "{} ({} items) | step {} | answered {} ({} right, {} wrong) | accuracy {rate}",
        progress.scope,
        progress.scope_len,
        progress.cur_step,
        progress.asked,
        progress.correct,
        progress.incorrect()
    );
    if progress.autosaved {
        line.push_str(" | saved");
    }
    line
}

fn print_help() {
    println!("  1-4        rate a new item (1 = very familiar .. 4 = don't know)");
    println!("  <enter>    reveal the answer");
    println!("  y / n      answer was right / wrong");
    println!("  r <group|position> <ranges>   switch scope, e.g. `r group 1-3`");
    println!("  s          status    g  list groups    q  quit");
}

/// Run the session until it finishes, the learner quits, or input ends.
///
/// The collection is saved on the way out; a failed final save can be
/// retried interactively.
pub(crate) async fn drive(
    svc: &SessionLoopService,
    items: &mut ItemCollection,
    session: &mut StudySession,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!(
        "Studying {} ({} items), step {}. Type ? for help.",
        session.label(),
        session.scope().len(),
        session.cur_step()
    );

    loop {
        let turn = session.next_turn(items);
        if !render(turn, items, session) {
            break;
        }

        let Some(line) = input.next_line().await? else {
            break;
        };

        if let Err(err) = apply(parse_command(&line, turn), svc, items, session).await {
            println!("! {err}");
        }
    }

    finish_with_retry(svc, items, session, &mut input).await
}

/// Returns `false` once there is nothing left to show.
fn render(turn: Turn, items: &ItemCollection, session: &StudySession) -> bool {
    match turn {
        Turn::Finished => false,
        Turn::Rate(id) => {
            if let Some(item) = items.get(id) {
                println!();
                println!("[new] {} / {}", item.prompt(), item.answer());
                println!("How well do you know it? 1-4 >");
            }
            true
        }
        Turn::Present(id) => {
            if let Some(item) = items.get(id) {
                let stats = ItemStats::of(item, session.cur_step());
                println!();
                println!(
                    "[Q] {}    (rate {}, last seen {})",
                    item.prompt(),
                    describe_rate(&stats),
                    describe_last_seen(stats.last_seen)
                );
                println!("press enter to reveal >");
            }
            true
        }
        Turn::Judge(id) => {
            if let Some(item) = items.get(id) {
                println!("[A] {}", item.answer());
                println!("right? y/n (q = quit) >");
            }
            true
        }
    }
}

async fn apply(
    command: Command,
    svc: &SessionLoopService,
    items: &mut ItemCollection,
    session: &mut StudySession,
) -> Result<(), SessionError> {
    match command {
        Command::Rate(level) => {
            session.rate(items, level)?;
        }
        Command::Reveal => {
            session.reveal()?;
        }
        Command::Correct => judge(svc, items, session, true).await?,
        Command::Incorrect => judge(svc, items, session, false).await?,
        Command::Quit => session.quit()?,
        Command::Rescope(mode, ranges) => {
            let spec = ScopeSpec::parse(mode, &ranges)?;
            svc.rescope(session, items, &spec).await?;
            println!(
                "Studying {} ({} items), step {}.",
                session.label(),
                session.scope().len(),
                session.cur_step()
            );
        }
        Command::Status => {
            let accuracy = ScopeAccuracy::of(items, session.scope());
            println!("{}", status_line(&session.progress(), accuracy));
        }
        Command::Groups => {
            let groups: Vec<String> = items
                .group_numbers()
                .iter()
                .map(u64::to_string)
                .collect();
            if groups.is_empty() {
                println!("no group labels in this collection");
            } else {
                println!("groups: {}", groups.join(", "));
            }
        }
        Command::Help => print_help(),
        Command::Invalid(raw) => println!("? {raw:?} is not valid here (type ? for help)"),
    }
    Ok(())
}

async fn judge(
    svc: &SessionLoopService,
    items: &mut ItemCollection,
    session: &mut StudySession,
    correct: bool,
) -> Result<(), SessionError> {
    let result = svc.answer_current(session, items, correct).await?;
    match result.autosave {
        Autosave::Saved => println!("(saved after {} answers)", result.outcome.asked),
        Autosave::Failed(err) => println!("! autosave failed, still in memory: {err}"),
        Autosave::NotDue => {}
    }
    Ok(())
}

async fn finish_with_retry(
    svc: &SessionLoopService,
    items: &ItemCollection,
    session: &mut StudySession,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    loop {
        match svc.finish(session, items).await {
            Ok(report) => return Ok(report),
            Err(err) if err.is_recoverable() => {
                println!("! {err}");
                println!("retry saving? [Y/n] >");
                let answer = input.next_line().await?.unwrap_or_default();
                if answer.trim().eq_ignore_ascii_case("n") {
                    return Err(err.into());
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

pub(crate) fn print_report(report: &SessionReport) {
    println!();
    println!(
        "Session over: {} answered, {} right, {} wrong (step {}). Saved.",
        report.asked(),
        report.correct(),
        report.incorrect(),
        report.final_step()
    );
    if report.hardest().is_empty() {
        return;
    }
    println!("Hardest items:");
    for item in report.hardest() {
        println!(
            "- {} / {}: {}/{} wrong (difficulty {:.2})",
            item.prompt, item.answer, item.fails, item.tries, item.difficulty
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{ItemDraft, ItemId};

    #[test]
    fn commands_depend_on_turn() {
        let present = Turn::Present(ItemId::new(0));
        let judge = Turn::Judge(ItemId::new(0));
        let rate = Turn::Rate(ItemId::new(0));

        assert_eq!(parse_command("", present), Command::Reveal);
        assert_eq!(parse_command("y", judge), Command::Correct);
        assert_eq!(parse_command(" N ", judge), Command::Incorrect);
        assert_eq!(parse_command("3", rate), Command::Rate(InitLevel::Unsure));
        assert_eq!(parse_command("q", rate), Command::Quit);

        assert!(matches!(parse_command("y", present), Command::Invalid(_)));
        assert!(matches!(parse_command("5", rate), Command::Invalid(_)));
        assert!(matches!(parse_command("", rate), Command::Invalid(_)));
    }

    #[test]
    fn rescope_command_takes_mode_and_ranges() {
        let turn = Turn::Present(ItemId::new(0));
        assert_eq!(
            parse_command("r group 1-3, 7", turn),
            Command::Rescope(ScopeMode::Group, "1-3, 7".into())
        );
        assert_eq!(
            parse_command("R count 10", turn),
            Command::Rescope(ScopeMode::Position, "10".into())
        );
        assert!(matches!(parse_command("r group", turn), Command::Invalid(_)));
        assert!(matches!(parse_command("r words 1", turn), Command::Invalid(_)));
    }

    #[test]
    fn stats_are_described_for_humans() {
        let mut items = ItemCollection::from_drafts(vec![ItemDraft::new("a", "1")]).unwrap();
        let fresh = ItemStats::of(items.get(ItemId::new(0)).unwrap(), 0);
        assert_eq!(describe_rate(&fresh), "-");
        assert_eq!(describe_last_seen(fresh.last_seen), "first time");

        items.record_answer(ItemId::new(0), true, 0).unwrap();
        items.record_answer(ItemId::new(0), false, 1).unwrap();
        items.record_answer(ItemId::new(0), true, 2).unwrap();
        let seen = ItemStats::of(items.get(ItemId::new(0)).unwrap(), 3);
        assert_eq!(describe_rate(&seen), "67% (2/3)");
        assert_eq!(describe_last_seen(seen.last_seen), "1 item ago");
        assert_eq!(describe_last_seen(LastSeen::TurnsAgo(4)), "4 items ago");
        assert_eq!(describe_last_seen(LastSeen::JustNow), "just now");
    }

    #[test]
    fn status_line_summarises_progress() {
        let progress = SessionProgress {
            scope: "group 1-3".into(),
            scope_len: 12,
            cur_step: 40,
            asked: 4,
            correct: 3,
            autosaved: true,
            is_finished: false,
        };
        let accuracy = ScopeAccuracy {
            tries: 8,
            correct: 6,
        };
        assert_eq!(
            status_line(&progress, accuracy),
            "group 1-3 (12 items) | step 40 | answered 4 (3 right, 1 wrong) | accuracy 75% | saved"
        );
    }
}
