//! `weekplan session`: an interactive loop over one in-memory plan session.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};

use weekplan_core::render::{self, export};
use weekplan_core::{
    Completion, DayTable, GenerationInvoker, PlanSession, RuleSet, SourceDocument, lint_record,
};

use crate::config::read_rules_file;
use crate::generate_cmd::describe_diff;

const HELP: &str = "\
commands:
  doc <file>        attach a schedule image or PDF
  rules [file]      load a rule-set file (no argument restores the default)
  generate          generate the weekly plan from the document
  refine <text>     apply a natural-language change to the current plan
  day <n>           select day n (0-based)
  show              print the selected day
  lint              list format issues in the current plan
  json              print the plan as JSON
  export [file]     clipboard HTML for the selected day
  reset             discard the plan (document and rules are kept)
  status            show session state
  help              this text
  quit              leave
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Doc(PathBuf),
    Rules(Option<PathBuf>),
    Generate,
    Refine(String),
    Day(usize),
    Show,
    Lint,
    Json,
    Export(Option<PathBuf>),
    Reset,
    Status,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    let cmd = match word {
        "doc" => match arg {
            Some(path) => ReplCommand::Doc(PathBuf::from(path)),
            None => bail!("usage: doc <file>"),
        },
        "rules" => ReplCommand::Rules(arg.map(PathBuf::from)),
        "generate" | "gen" => ReplCommand::Generate,
        "refine" => match arg {
            Some(text) => ReplCommand::Refine(text),
            None => bail!("usage: refine <instruction>"),
        },
        "day" => {
            let n = arg.context("usage: day <n>")?;
            let index = n
                .parse()
                .with_context(|| format!("not a day number: {n}"))?;
            ReplCommand::Day(index)
        }
        "show" => ReplCommand::Show,
        "lint" => ReplCommand::Lint,
        "json" => ReplCommand::Json,
        "export" => ReplCommand::Export(arg.map(PathBuf::from)),
        "reset" => ReplCommand::Reset,
        "status" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => bail!("unknown command: {other} (try `help`)"),
    };
    Ok(Some(cmd))
}

/// Run one command against `session`, writing user-facing output to `out`.
///
/// Returns `false` when the loop should stop.
pub async fn execute(
    session: &mut PlanSession,
    invoker: &GenerationInvoker,
    cmd: ReplCommand,
    out: &mut impl Write,
) -> Result<bool> {
    match cmd {
        ReplCommand::Doc(path) => {
            let document = SourceDocument::from_path(&path)
                .with_context(|| format!("cannot use {}", path.display()))?;
            let summary = format!(
                "attached {} ({}, {} bytes)",
                document.display_name(),
                document.media_type(),
                document.size()
            );
            session.attach_document(document)?;
            writeln!(out, "{summary}")?;
        }
        ReplCommand::Rules(path) => {
            let rules = match &path {
                Some(path) => read_rules_file(path)?,
                None => RuleSet::default(),
            };
            session.set_rules(rules)?;
            match path {
                Some(path) => writeln!(out, "rules loaded from {}", path.display())?,
                None => writeln!(out, "default rules restored")?,
            }
        }
        ReplCommand::Generate => {
            writeln!(out, "generating...")?;
            out.flush()?;
            let completion = session.generate(invoker).await?;
            report_completion(session, &completion, out)?;
        }
        ReplCommand::Refine(instruction) => {
            writeln!(out, "refining...")?;
            out.flush()?;
            let completion = session.refine(invoker, &instruction).await?;
            write!(out, "{}", describe_diff(&completion.diff))?;
            report_completion(session, &completion, out)?;
        }
        ReplCommand::Day(index) => {
            session.select_day(index)?;
            show_selected(session, out)?;
        }
        ReplCommand::Show => show_selected(session, out)?,
        ReplCommand::Lint => write!(out, "{}", lint_record(session.record()))?,
        ReplCommand::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(session.record())?)?;
        }
        ReplCommand::Export(path) => {
            let table = DayTable::project(session.record(), session.selected_day())?;
            let html = export::clipboard_html(&table);
            match path {
                Some(path) => {
                    std::fs::write(&path, &html)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    writeln!(out, "wrote {}", path.display())?;
                }
                None => writeln!(out, "{html}")?,
            }
        }
        ReplCommand::Reset => {
            session.reset();
            writeln!(out, "plan discarded")?;
        }
        ReplCommand::Status => {
            let status = session.status();
            writeln!(out, "state: {}", status.state)?;
            match session.document() {
                Some(doc) => writeln!(out, "document: {} ({})", doc.display_name(), doc.media_type())?,
                None => writeln!(out, "document: none")?,
            }
            writeln!(
                out,
                "rules: {}",
                if status.default_rules { "default" } else { "custom" }
            )?;
            writeln!(
                out,
                "day: {} of {}",
                status.selected_day + 1,
                status.day_count
            )?;
            writeln!(out, "refinements: {}", status.refinements)?;
            if let Some(err) = status.last_error {
                writeln!(out, "last error: {}", err.message)?;
            }
        }
        ReplCommand::Help => write!(out, "{HELP}")?,
        ReplCommand::Quit => return Ok(false),
    }
    Ok(true)
}

fn report_completion(
    session: &PlanSession,
    completion: &Completion,
    out: &mut impl Write,
) -> Result<()> {
    let days: Vec<String> = session
        .record()
        .daily_plans
        .iter()
        .map(|d| format!("{} {}", d.day, d.date))
        .collect();
    writeln!(out, "plan ready: {}", days.join(", "))?;
    write!(out, "{}", completion.lint)?;
    Ok(())
}

fn show_selected(session: &PlanSession, out: &mut impl Write) -> Result<()> {
    let table = DayTable::project(session.record(), session.selected_day())?;
    write!(out, "{}", render::render_text(&table))?;
    Ok(())
}

pub async fn run_session(
    invoker: &GenerationInvoker,
    rules: RuleSet,
    document: Option<PathBuf>,
) -> Result<()> {
    let mut session = PlanSession::new();
    session.set_rules(rules)?;
    tracing::debug!(session = %session.id(), "interactive session started");

    let mut stdout = std::io::stdout();
    if let Some(path) = document {
        execute(&mut session, invoker, ReplCommand::Doc(path), &mut stdout).await?;
    }
    writeln!(stdout, "weekplan session; type `help` for commands")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "weekplan> ")?;
        stdout.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match execute(&mut session, invoker, cmd, &mut stdout).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
    }
    Ok(())
}
