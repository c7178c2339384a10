//! Format linter for generated plans.
//!
//! The schema only constrains structure. The micro-format conventions that
//! the prompt asks for (★▲◎ reflections, numbered lists, named areas, the
//! four life-activity phases, terse items, consistent dates) are checked
//! here after the fact. The linter reports; it never rejects a record.

mod dates;

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::record::{DAY_LABELS, DailyPlan, SegmentKind, WeeklyPlanRecord};

/// Reflection markers in their required order.
pub const REFLECTION_MARKERS: [char; 3] = ['★', '▲', '◎'];

/// Named sub-phases every life activity must mention.
pub const LIFE_PHASES: [&str; 5] = ["午餐活动", "如厕", "盥洗", "散步活动", "午睡活动"];

/// Longest acceptable activity item, in characters.
pub const MAX_ITEM_CHARS: usize = 80;

/// What is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    MissingMarker { marker: char },
    DuplicateMarker { marker: char },
    MarkersOutOfOrder,
    MissingLineBreak { marker: char },
    Unnumbered,
    NumberingGap { expected: usize, found: usize },
    TooFewAreas { found: usize },
    MissingLifePhase { phase: String },
    VerboseItem { item: usize, chars: usize },
    DayOutOfOrder { expected: String, found: String },
    UnparseableRange { text: String },
    UnparseableDate { text: String },
    DateOutOfRange { date: String },
    WeekdayMismatch { date: String },
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMarker { marker } => write!(f, "reflection is missing {marker}"),
            Self::DuplicateMarker { marker } => write!(f, "reflection repeats {marker}"),
            Self::MarkersOutOfOrder => write!(f, "reflection markers are not in ★▲◎ order"),
            Self::MissingLineBreak { marker } => write!(f, "no line break before {marker}"),
            Self::Unnumbered => write!(f, "list is not numbered"),
            Self::NumberingGap { expected, found } => {
                write!(f, "list item numbered {found}, expected {expected}")
            }
            Self::TooFewAreas { found } => write!(f, "names {found} area(s), expected at least 2"),
            Self::MissingLifePhase { phase } => write!(f, "does not mention {phase}"),
            Self::VerboseItem { item, chars } => {
                write!(f, "item {item} is {chars} characters (limit {MAX_ITEM_CHARS})")
            }
            Self::DayOutOfOrder { expected, found } => {
                write!(f, "day label {found:?}, expected {expected:?}")
            }
            Self::UnparseableRange { text } => write!(f, "date range {text:?} is not parseable"),
            Self::UnparseableDate { text } => write!(f, "date {text:?} is not parseable"),
            Self::DateOutOfRange { date } => write!(f, "date {date} is outside the date range"),
            Self::WeekdayMismatch { date } => write!(f, "date {date} does not fall on this weekday"),
        }
    }
}

/// One finding, located by day, segment and field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatIssue {
    /// Index into `dailyPlans`; `None` for header-level issues.
    pub day: Option<usize>,
    pub segment: Option<SegmentKind>,
    pub field: &'static str,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for FormatIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.day, self.segment) {
            (Some(day), Some(segment)) => write!(f, "day {day} {segment}.{}: ", self.field)?,
            (Some(day), None) => write!(f, "day {day} {}: ", self.field)?,
            (None, _) => write!(f, "weeklyInfo.{}: ", self.field)?,
        }
        write!(f, "{}", self.kind)
    }
}

/// All findings for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub issues: Vec<FormatIssue>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Findings for one day.
    pub fn for_day(&self, day: usize) -> impl Iterator<Item = &FormatIssue> {
        self.issues.iter().filter(move |i| i.day == Some(day))
    }
}

impl fmt::Display for LintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "no format issues");
        }
        writeln!(f, "{} format issue(s):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

/// Lint a whole record.
pub fn lint_record(record: &WeeklyPlanRecord) -> LintReport {
    let mut issues = Vec::new();

    let range = dates::parse_range(&record.weekly_info.date_range);
    if range.is_none() {
        issues.push(FormatIssue {
            day: None,
            segment: None,
            field: "dateRange",
            kind: IssueKind::UnparseableRange {
                text: record.weekly_info.date_range.clone(),
            },
        });
    }

    for (index, day) in record.daily_plans.iter().enumerate() {
        lint_day_header(index, day, range, &mut issues);
        lint_day_segments(index, day, &mut issues);
    }

    LintReport { issues }
}

fn lint_day_header(
    index: usize,
    day: &DailyPlan,
    range: Option<(chrono::NaiveDate, chrono::NaiveDate)>,
    out: &mut Vec<FormatIssue>,
) {
    let mut push = |field: &'static str, kind: IssueKind| {
        out.push(FormatIssue {
            day: Some(index),
            segment: None,
            field,
            kind,
        })
    };

    if let Some(expected) = DAY_LABELS.get(index) {
        if day.day.trim() != *expected {
            push(
                "day",
                IssueKind::DayOutOfOrder {
                    expected: expected.to_string(),
                    found: day.day.clone(),
                },
            );
        }
    }

    let Some(date) = dates::parse_date(&day.date) else {
        push(
            "date",
            IssueKind::UnparseableDate {
                text: day.date.clone(),
            },
        );
        return;
    };

    if let Some((start, end)) = range {
        if date < start || date > end {
            push(
                "date",
                IssueKind::DateOutOfRange {
                    date: day.date.clone(),
                },
            );
        }
    }

    if let Some(weekday) = dates::weekday_for_label(&day.day) {
        use chrono::Datelike;
        if date.weekday() != weekday {
            push(
                "date",
                IssueKind::WeekdayMismatch {
                    date: day.date.clone(),
                },
            );
        }
    }
}

fn lint_day_segments(index: usize, day: &DailyPlan, out: &mut Vec<FormatIssue>) {
    for view in day.segments() {
        let mut push = |field: &'static str, kind: IssueKind| {
            out.push(FormatIssue {
                day: Some(index),
                segment: Some(view.kind),
                field,
                kind,
            })
        };

        let body_field = body_field(view.kind);
        for kind in check_reflection(view.reflection) {
            push("reflection", kind);
        }
        for kind in check_numbering(view.body) {
            push(body_field, kind);
        }
        if let Some(observation) = view.observation {
            for kind in check_numbering(observation) {
                push("observation", kind);
            }
        }
        for kind in check_item_length(view.body) {
            push(body_field, kind);
        }

        match view.kind {
            SegmentKind::AreaPlay => {
                let found = count_areas(view.body);
                if found < 2 {
                    push(body_field, IssueKind::TooFewAreas { found });
                }
            }
            SegmentKind::LifeActivity => {
                for phase in LIFE_PHASES {
                    if !view.body.contains(phase) {
                        push(
                            body_field,
                            IssueKind::MissingLifePhase {
                                phase: phase.to_string(),
                            },
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

fn body_field(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::MorningExercise | SegmentKind::AreaPlay => "activity",
        SegmentKind::CollectiveActivity => "process",
        _ => "content",
    }
}

/// Check the ★▲◎ convention: each marker once, in order, each clause after
/// the first on its own line.
fn check_reflection(text: &str) -> Vec<IssueKind> {
    let mut issues = Vec::new();
    let mut positions = Vec::new();

    for marker in REFLECTION_MARKERS {
        let found: Vec<usize> = text.match_indices(marker).map(|(pos, _)| pos).collect();
        match found.as_slice() {
            [] => issues.push(IssueKind::MissingMarker { marker }),
            [pos] => positions.push((marker, *pos)),
            [first, ..] => {
                issues.push(IssueKind::DuplicateMarker { marker });
                positions.push((marker, *first));
            }
        }
    }

    if positions.windows(2).any(|w| w[0].1 > w[1].1) {
        issues.push(IssueKind::MarkersOutOfOrder);
        return issues;
    }

    for &(marker, pos) in positions.iter().skip(1) {
        let before = text[..pos].trim_end_matches([' ', '\t']);
        if !before.ends_with('\n') {
            issues.push(IssueKind::MissingLineBreak { marker });
        }
    }
    issues
}

/// Leading list number of a line ("1." / "1、" / "1．"), if any.
fn item_number(line: &str) -> Option<usize> {
    let line = line.trim_start();
    let digits_end = line.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let rest = &line[digits_end..];
    if rest.starts_with(['.', '、', '．']) {
        line[..digits_end].parse().ok()
    } else {
        None
    }
}

/// Check that numbered lines count up from 1. Lines without a number are
/// treated as continuations of the previous item.
fn check_numbering(text: &str) -> Vec<IssueKind> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(first) = lines.next() else {
        return Vec::new();
    };
    if item_number(first).is_none() {
        return vec![IssueKind::Unnumbered];
    }

    let mut issues = Vec::new();
    let mut expected = 1;
    for found in std::iter::once(first).chain(lines).filter_map(item_number) {
        if found != expected {
            issues.push(IssueKind::NumberingGap { expected, found });
        }
        expected = found + 1;
    }
    issues
}

fn check_item_length(text: &str) -> Vec<IssueKind> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .filter_map(|(i, line)| {
            let chars = line.trim().chars().count();
            (chars > MAX_ITEM_CHARS).then_some(IssueKind::VerboseItem { item: i + 1, chars })
        })
        .collect()
}

/// Count distinct area names: item prefixes before '：' or ':' that end in 区.
fn count_areas(text: &str) -> usize {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let line = match item_number(line) {
                Some(_) => line
                    .trim_start_matches(|c: char| c.is_ascii_digit())
                    .trim_start_matches(['.', '、', '．'])
                    .trim_start(),
                None => line,
            };
            let (name, _) = line.split_once(['：', ':'])?;
            let name = name.trim();
            name.ends_with('区').then_some(name)
        })
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::placeholder_record;

    #[test]
    fn placeholder_only_flags_dismissal_reflection() {
        let report = lint_record(&placeholder_record());
        assert_eq!(report.len(), 1, "{report}");
        let issue = &report.issues[0];
        assert_eq!(issue.segment, Some(SegmentKind::Dismissal));
        assert_eq!(issue.kind, IssueKind::MissingMarker { marker: '▲' });
    }

    #[test]
    fn reflection_checks() {
        assert!(check_reflection("★好\n▲差\n◎改").is_empty());
        assert!(check_reflection("★好\n▲差\n◎改\n").is_empty());
        assert_eq!(
            check_reflection("★好 ▲差\n◎改"),
            vec![IssueKind::MissingLineBreak { marker: '▲' }]
        );
        assert_eq!(
            check_reflection("▲差\n★好\n◎改"),
            vec![IssueKind::MarkersOutOfOrder]
        );
        assert!(check_reflection("★好\n★又好\n▲差\n◎改")
            .contains(&IssueKind::DuplicateMarker { marker: '★' }));
        assert_eq!(check_reflection("").len(), 3);
    }

    #[test]
    fn numbering_checks() {
        assert!(check_numbering("1. a\n2. b\n3. c").is_empty());
        assert!(check_numbering("1、a\n  续写\n2、b").is_empty());
        assert_eq!(check_numbering("自由活动"), vec![IssueKind::Unnumbered]);
        assert_eq!(
            check_numbering("1. a\n3. c"),
            vec![IssueKind::NumberingGap { expected: 2, found: 3 }]
        );
        assert!(check_numbering("").is_empty());
    }

    #[test]
    fn area_counting() {
        assert_eq!(count_areas("1. 美工区：拼贴\n2. 建构区：搭建\n3. 重点指导：纹理"), 2);
        assert_eq!(count_areas("1. 美工区：拼贴\n2. 美工区：剪纸"), 1);
        assert_eq!(count_areas("1. 阅读区:绘本"), 1);
        assert_eq!(count_areas("自由游戏"), 0);
    }

    #[test]
    fn area_play_with_one_area_is_flagged() {
        let mut record = placeholder_record();
        record.daily_plans[0].area_play.activity = "1. 美工区：树叶拼贴。\n2. 重点指导：创作。".to_string();
        let report = lint_record(&record);
        assert!(report
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::TooFewAreas { found: 1 }));
    }

    #[test]
    fn abbreviated_life_activity_is_flagged() {
        let mut record = placeholder_record();
        record.daily_plans[0].life_activity.content = "1. 午餐。\n2. 午睡活动：安静入睡。".to_string();
        let report = lint_record(&record);
        let missing: Vec<&IssueKind> = report
            .issues
            .iter()
            .filter(|i| i.segment == Some(SegmentKind::LifeActivity))
            .map(|i| &i.kind)
            .collect();
        assert_eq!(missing.len(), 4);
    }

    #[test]
    fn verbose_items_are_flagged() {
        let long = "很".repeat(MAX_ITEM_CHARS + 1);
        assert_eq!(
            check_item_length(&format!("1. 短\n2. {long}")),
            vec![IssueKind::VerboseItem {
                item: 2,
                chars: MAX_ITEM_CHARS + 4
            }]
        );
    }

    #[test]
    fn date_checks() {
        let mut record = placeholder_record();
        record.daily_plans[0].date = "2025.10.20".to_string();
        let kinds: Vec<IssueKind> = lint_record(&record)
            .issues
            .into_iter()
            .filter(|i| i.field == "date")
            .map(|i| i.kind)
            .collect();
        assert!(kinds.contains(&IssueKind::DateOutOfRange {
            date: "2025.10.20".to_string()
        }));

        record.daily_plans[0].date = "2025.10.14".to_string();
        let report = lint_record(&record);
        assert!(report.issues.iter().any(|i| matches!(i.kind, IssueKind::WeekdayMismatch { .. })));

        record.daily_plans[0].date = "本周一".to_string();
        record.weekly_info.date_range = "第七周".to_string();
        let report = lint_record(&record);
        assert!(report.issues.iter().any(|i| i.day.is_none() && i.field == "dateRange"));
        assert!(report.issues.iter().any(|i| matches!(i.kind, IssueKind::UnparseableDate { .. })));
    }

    #[test]
    fn day_order_is_checked() {
        let mut record = placeholder_record();
        record.daily_plans[0].day = "周二".to_string();
        let report = lint_record(&record);
        assert!(report.issues.iter().any(|i| i.kind
            == IssueKind::DayOutOfOrder {
                expected: "周一".to_string(),
                found: "周二".to_string()
            }));
    }

    #[test]
    fn report_display_and_serialization() {
        let report = lint_record(&placeholder_record());
        let text = report.to_string();
        assert!(text.starts_with("1 format issue(s):"));
        assert!(text.contains("day 0 dismissal.reflection: reflection is missing ▲"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["kind"], "missing_marker");
        assert_eq!(json["issues"][0]["segment"], "dismissal");
        assert_eq!(LintReport::default().to_string(), "no format issues\n");
    }
}
