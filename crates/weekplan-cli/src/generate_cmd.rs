//! `weekplan generate`: one-shot generation with optional refinements.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;

use weekplan_core::render::{self, export};
use weekplan_core::{
    DayTable, GenerationInvoker, PlanSession, RecordDiff, RuleSet, SourceDocument,
    WeeklyPlanRecord,
};

/// Output format for a generated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The full record as pretty JSON.
    Json,
    /// Day tables as plain text.
    Text,
    /// Clipboard HTML for word processors.
    Html,
}

pub struct GenerateArgs {
    pub document: PathBuf,
    pub refinements: Vec<String>,
    pub output: Option<PathBuf>,
    pub day: Option<usize>,
    pub format: OutputFormat,
}

pub async fn run_generate(
    invoker: &GenerationInvoker,
    rules: RuleSet,
    args: GenerateArgs,
) -> Result<()> {
    let document = SourceDocument::from_path(&args.document)
        .with_context(|| format!("cannot use {}", args.document.display()))?;
    tracing::info!(
        document = %document.display_name(),
        media_type = %document.media_type(),
        size = document.size(),
        "generating weekly plan"
    );

    let mut session = PlanSession::new();
    session.set_rules(rules)?;
    session.attach_document(document)?;

    let completion = session
        .generate(invoker)
        .await
        .context("initial generation failed")?;
    eprint!("{}", completion.lint);

    for (i, instruction) in args.refinements.iter().enumerate() {
        let completion = session
            .refine(invoker, instruction)
            .await
            .with_context(|| format!("refinement {} failed", i + 1))?;
        eprintln!("refinement {}: {}", i + 1, describe_diff(&completion.diff).trim_end());
        eprint!("{}", completion.lint);
    }

    let rendered = render_output(session.record(), args.format, args.day)?;
    write_output(args.output.as_deref(), &rendered)
}

/// Render `record` in `format`, either one day or all of them.
pub fn render_output(
    record: &WeeklyPlanRecord,
    format: OutputFormat,
    day: Option<usize>,
) -> Result<String> {
    if let Some(index) = day {
        if index >= record.daily_plans.len() {
            bail!(
                "day {index} is out of range; the plan has {} day(s)",
                record.daily_plans.len()
            );
        }
    }
    let days: Vec<usize> = match day {
        Some(index) => vec![index],
        None => (0..record.daily_plans.len()).collect(),
    };

    let out = match format {
        OutputFormat::Json => {
            let mut json = match day {
                Some(index) => serde_json::to_string_pretty(&record.daily_plans[index])?,
                None => serde_json::to_string_pretty(record)?,
            };
            json.push('\n');
            json
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (n, index) in days.into_iter().enumerate() {
                if n > 0 {
                    out.push_str("\n\n");
                }
                out.push_str(&render::render_text(&DayTable::project(record, index)?));
            }
            out
        }
        OutputFormat::Html => {
            let mut out = String::new();
            for index in days {
                out.push_str(&export::clipboard_html(&DayTable::project(record, index)?));
                out.push('\n');
            }
            out
        }
    };
    Ok(out)
}

/// One-paragraph summary of what a refinement changed.
pub fn describe_diff(diff: &RecordDiff) -> String {
    if diff.is_empty() {
        return "no sections changed\n".to_string();
    }
    let mut out = String::new();
    if diff.weekly_info_changed {
        out.push_str("weekly info changed\n");
    }
    if diff.day_count_changed {
        out.push_str("number of days changed\n");
    }
    for day in &diff.days {
        let mut parts: Vec<&str> = day.segments.iter().map(|s| s.wire_key()).collect();
        if day.header_changed {
            parts.insert(0, "header");
        }
        let _ = writeln!(out, "{} (day {}): {}", day.day, day.index, parts.join(", "));
    }
    out
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}
