//! Day table projection and plain-text rendering.
//!
//! A [`DayTable`] is the printable form of one daily plan: a header block
//! and seven fixed rows, one per time block. Renderers (text here, HTML in
//! [`export`]) work from the table rather than the record, so every output
//! shows exactly the same cells.

pub mod export;

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::PlanError;
use crate::record::{DailyPlan, SegmentKind, WeeklyInfo, WeeklyPlanRecord};

/// Document title printed above every day table.
pub const TABLE_TITLE: &str = "一日活动计划";

/// Caption of the reflection column.
pub const REFLECTION_CAPTION: &str = "（★亮点▲不足之处◎改进措施）";

/// Fixed observation note shown for the collective activity.
pub const COLLECTIVE_OBSERVATION: &str = "重点观察幼儿在集体活动中的互动与专注度。";

/// Header block of a day table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayHeader {
    pub day: String,
    pub date: String,
    pub class_str: String,
    pub theme: String,
    pub teachers: String,
}

/// A run of text in a cell, optionally introduced by a bold heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub heading: Option<String>,
    pub body: String,
}

impl Block {
    fn plain(body: &str) -> Self {
        Self {
            heading: None,
            body: body.to_string(),
        }
    }

    fn headed(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: Some(heading.into()),
            body: body.into(),
        }
    }
}

/// One time-block row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRow {
    pub kind: SegmentKind,
    pub label_zh: &'static str,
    pub label_en: &'static str,
    pub time_block: &'static str,
    /// 活动安排 column.
    pub arrangement: Vec<Block>,
    /// 观察要点 column.
    pub observation: String,
    /// The observation is the fixed note rather than generated text.
    pub observation_is_note: bool,
    /// 反思 column.
    pub reflection: String,
}

/// Printable projection of one daily plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTable {
    pub header: DayHeader,
    pub rows: Vec<DayRow>,
}

impl DayTable {
    /// Project day `index` of `record`.
    pub fn project(record: &WeeklyPlanRecord, index: usize) -> Result<Self, PlanError> {
        let day = record.daily_plans.get(index).ok_or_else(|| {
            PlanError::Validation(format!(
                "day {index} is out of range (plan has {} day(s))",
                record.daily_plans.len()
            ))
        })?;
        Ok(Self::from_day(&record.weekly_info, day))
    }

    pub fn from_day(info: &WeeklyInfo, day: &DailyPlan) -> Self {
        let header = DayHeader {
            day: day.day.clone(),
            date: day.date.clone(),
            class_str: info.class_str.clone(),
            theme: info.theme.clone(),
            teachers: info.teachers.clone(),
        };
        let rows = SegmentKind::ALL.into_iter().map(|kind| row(day, kind)).collect();
        Self { header, rows }
    }
}

fn row(day: &DailyPlan, kind: SegmentKind) -> DayRow {
    let view = day.segment(kind);
    let arrangement = match kind {
        SegmentKind::CollectiveActivity => {
            let ca = &day.collective_activity;
            vec![
                Block::headed(ca.title.as_str(), ""),
                Block::headed("活动目标：", ca.goals.join("\n")),
                Block::headed("活动准备：", ca.prep.as_str()),
                Block::headed("活动过程：", ca.process.as_str()),
            ]
        }
        _ => match view.title {
            Some(title) => vec![Block::headed(title, view.body)],
            None => vec![Block::plain(view.body)],
        },
    };

    DayRow {
        kind,
        label_zh: kind.label_zh(),
        label_en: kind.label_en(),
        time_block: kind.time_block(),
        arrangement,
        observation: view
            .observation
            .unwrap_or(COLLECTIVE_OBSERVATION)
            .to_string(),
        observation_is_note: view.observation.is_none(),
        reflection: view.reflection.to_string(),
    }
}

/// Render a day table for a terminal.
pub fn render_text(table: &DayTable) -> String {
    let h = &table.header;
    let mut out = String::new();
    let _ = writeln!(out, "{TABLE_TITLE}  {} {}", h.day, h.date);
    let _ = writeln!(out, "班级：{}  主题：{}  教师：{}", h.class_str, h.theme, h.teachers);

    for row in &table.rows {
        out.push('\n');
        let _ = writeln!(
            out,
            "[{}] {} / {}",
            row.time_block, row.label_zh, row.label_en
        );
        out.push_str("  活动安排：\n");
        for block in &row.arrangement {
            if let Some(heading) = &block.heading {
                push_indented(&mut out, heading);
            }
            push_indented(&mut out, &block.body);
        }
        out.push_str("  观察要点：\n");
        push_indented(&mut out, &row.observation);
        let _ = writeln!(out, "  反思{REFLECTION_CAPTION}：");
        push_indented(&mut out, &row.reflection);
    }
    out
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        out.push_str("    ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::placeholder_record;

    #[test]
    fn projects_seven_rows_in_order() {
        let table = DayTable::project(&placeholder_record(), 0).unwrap();
        assert_eq!(table.rows.len(), 7);
        assert_eq!(table.rows[0].time_block, "7:45-8:40");
        assert_eq!(table.rows[6].label_zh, "离园活动");
        assert_eq!(table.header.class_str, "中（2）班");
        assert_eq!(table.header.date, "2025.10.13");
    }

    #[test]
    fn collective_cell_is_composed() {
        let table = DayTable::project(&placeholder_record(), 0).unwrap();
        let row = &table.rows[2];
        assert_eq!(row.kind, SegmentKind::CollectiveActivity);
        let headings: Vec<&str> = row
            .arrangement
            .iter()
            .filter_map(|b| b.heading.as_deref())
            .collect();
        assert_eq!(
            headings,
            vec!["科学活动《秋叶变变变》", "活动目标：", "活动准备：", "活动过程："]
        );
        assert_eq!(row.arrangement[1].body.lines().count(), 3);
        assert_eq!(row.observation, COLLECTIVE_OBSERVATION);
        assert!(row.observation_is_note);
    }

    #[test]
    fn titled_rows_lead_with_title() {
        let table = DayTable::project(&placeholder_record(), 0).unwrap();
        let game = &table.rows[3];
        assert_eq!(game.arrangement.len(), 1);
        assert_eq!(
            game.arrangement[0].heading.as_deref(),
            Some("角色游戏：美味秋日小铺")
        );
        assert!(table.rows[0].arrangement[0].heading.is_none());
    }

    #[test]
    fn out_of_range_day_is_validation_error() {
        let err = DayTable::project(&placeholder_record(), 1).unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[test]
    fn text_rendering_contains_every_row() {
        let table = DayTable::project(&placeholder_record(), 0).unwrap();
        let text = render_text(&table);
        assert!(text.starts_with("一日活动计划  周一 2025.10.13"));
        for kind in SegmentKind::ALL {
            assert!(text.contains(kind.label_en()), "missing {kind}");
        }
        assert!(text.contains("    1. 自主签到：选择运动手环。"));
        assert!(text.contains("◎家长群同步通知任务。"));
    }
}
