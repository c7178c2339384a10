//! Lenient parsing of the free-text dates found on classroom schedules.

use chrono::{Datelike, NaiveDate, Weekday};

const FORMATS: [&str; 4] = ["%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"];

const RANGE_SEPARATORS: [char; 6] = ['-', '—', '–', '~', '～', '至'];

/// Parse one date in any of the accepted formats.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse a "start - end" range. The end may omit the year
/// (`2025.10.13-10.17`), in which case the start's year is used.
pub(crate) fn parse_range(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    let text = text.trim();
    // Separators can also appear inside a date ("2025-10-13"), so try every
    // candidate split point and keep the first that parses on both sides.
    text.char_indices()
        .filter(|(_, c)| RANGE_SEPARATORS.contains(c))
        .find_map(|(pos, c)| {
            let (left, right) = (&text[..pos], &text[pos + c.len_utf8()..]);
            let start = parse_date(left)?;
            let end = parse_date(right)
                .or_else(|| parse_date(&format!("{}.{}", start.year(), right.trim())))?;
            (start <= end).then_some((start, end))
        })
}

/// Weekday a day label names, if it is one of 周一..周日.
pub(crate) fn weekday_for_label(label: &str) -> Option<Weekday> {
    let weekday = match label.trim() {
        "周一" | "星期一" => Weekday::Mon,
        "周二" | "星期二" => Weekday::Tue,
        "周三" | "星期三" => Weekday::Wed,
        "周四" | "星期四" => Weekday::Thu,
        "周五" | "星期五" => Weekday::Fri,
        "周六" | "星期六" => Weekday::Sat,
        "周日" | "星期日" | "星期天" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}
