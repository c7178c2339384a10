//! HTML export for pasting a day table into a word processor.
//!
//! Word processors drop stylesheets on paste, so every element carries its
//! own inline style. Line breaks become `<br>` for the same reason.

use std::fmt::Write as _;

use super::{Block, DayRow, DayTable, REFLECTION_CAPTION, TABLE_TITLE};

const FONT: &str = "font-family: 'SimSun', 'Songti SC', serif;";
const BORDER: &str = "border: 1px solid black;";
const TABLE: &str = "width: 100%; border-collapse: collapse; border: 1px solid black;";

/// Escape text for HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape and turn line breaks into `<br>`.
fn multiline(text: &str) -> String {
    text.trim_end()
        .lines()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn cell(style: &str, content: &str) -> String {
    format!("<td style=\"{BORDER} {style}\">{content}</td>")
}

fn arrangement_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push_str("<br>");
        }
        if let Some(heading) = &block.heading {
            let _ = write!(out, "<strong>{}</strong>", escape_html(heading));
            if !block.body.trim().is_empty() {
                out.push_str("<br>");
            }
        }
        out.push_str(&multiline(&block.body));
    }
    out
}

fn row_html(row: &DayRow) -> String {
    let label = format!(
        "{}<br>{}",
        escape_html(row.time_block),
        escape_html(row.label_zh)
    );
    let observation_style = if row.observation_is_note {
        "padding: 10px; vertical-align: top; font-style: italic;"
    } else {
        "padding: 10px; vertical-align: top;"
    };
    format!(
        "<tr>{}{}{}{}</tr>",
        cell(
            "padding: 15px; width: 15%; text-align: center; vertical-align: middle;",
            &label
        ),
        cell(
            "padding: 10px; width: 35%; vertical-align: top;",
            &arrangement_html(&row.arrangement)
        ),
        cell(
            &format!("{observation_style} width: 25%;"),
            &multiline(&row.observation)
        ),
        cell(
            "padding: 10px; width: 25%; vertical-align: top;",
            &multiline(&row.reflection)
        ),
    )
}

/// Self-contained HTML for one day table, ready for the clipboard.
pub fn clipboard_html(table: &DayTable) -> String {
    let h = &table.header;
    let head = "padding: 8px; text-align: center; font-weight: bold;";
    let value = "padding: 8px; text-align: center;";

    let mut out = String::with_capacity(8192);
    let _ = write!(out, "<div style=\"{FONT} width: 100%;\">");
    let _ = write!(out, "<table style=\"{TABLE}\">");
    let _ = write!(
        out,
        "<tr><th colspan=\"4\" style=\"{BORDER} padding: 12px; font-size: 24px; font-weight: bold; text-align: center;\">{TABLE_TITLE}</th></tr>"
    );
    let _ = write!(
        out,
        "<tr>{}{}{}{}</tr>",
        cell(&format!("{head} width: 15%;"), "时间"),
        cell(
            &format!("{value} width: 35%;"),
            &escape_html(&format!("{} {}", h.day, h.date))
        ),
        cell(&format!("{head} width: 15%;"), "班级"),
        cell(&format!("{value} width: 35%;"), &escape_html(&h.class_str)),
    );
    let _ = write!(
        out,
        "<tr>{}{}{}{}</tr>",
        cell(head, "主题"),
        cell(value, &escape_html(&h.theme)),
        cell(head, "教师"),
        cell(value, &escape_html(&h.teachers)),
    );
    let _ = write!(
        out,
        "<tr style=\"background-color: #f3f4f6;\">{}{}{}{}</tr>",
        cell(head, "时间与主要环节"),
        cell(head, "活动安排"),
        cell(head, "观察要点"),
        cell(
            head,
            &format!(
                "反思<br><span style=\"font-size: 12px; font-weight: normal;\">{REFLECTION_CAPTION}</span>"
            )
        ),
    );
    for row in &table.rows {
        out.push_str(&row_html(row));
    }
    out.push_str("</table></div>");
    out
}
