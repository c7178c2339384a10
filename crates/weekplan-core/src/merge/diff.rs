//! Section fingerprints and record comparison.
//!
//! Refinement is supposed to leave untargeted sections byte-identical. The
//! session compares the old and new record section by section after every
//! refinement and reports what changed, so drift is visible instead of
//! silently accepted.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::record::{DailyPlan, SegmentKind, WeeklyPlanRecord};

/// Changes found in one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayDiff {
    pub index: usize,
    pub day: String,
    /// The day label or date changed.
    pub header_changed: bool,
    pub segments: Vec<SegmentKind>,
}

/// Section-level comparison of two records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordDiff {
    /// Any `weeklyInfo` field changed.
    pub weekly_info_changed: bool,
    /// Days present in only one of the two records.
    pub day_count_changed: bool,
    pub days: Vec<DayDiff>,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        !self.weekly_info_changed && !self.day_count_changed && self.days.is_empty()
    }

    /// Number of changed segments across all days.
    pub fn changed_segments(&self) -> usize {
        self.days.iter().map(|d| d.segments.len()).sum()
    }

    /// Indices of days with any change.
    pub fn changed_days(&self) -> Vec<usize> {
        self.days.iter().map(|d| d.index).collect()
    }
}

/// SHA-256 of the canonical JSON encoding of `value`, hex-encoded.
fn digest<T: Serialize + ?Sized>(value: &T) -> String {
    // Struct field order is fixed, so the encoding is canonical.
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// Fingerprint of a whole record.
pub fn fingerprint(record: &WeeklyPlanRecord) -> String {
    digest(record)
}

fn segment_digest(day: &DailyPlan, kind: SegmentKind) -> String {
    match kind {
        SegmentKind::MorningExercise => digest(&day.morning_exercise),
        SegmentKind::AreaPlay => digest(&day.area_play),
        SegmentKind::CollectiveActivity => digest(&day.collective_activity),
        SegmentKind::GameActivity => digest(&day.game_activity),
        SegmentKind::LifeActivity => digest(&day.life_activity),
        SegmentKind::OutdoorActivity => digest(&day.outdoor_activity),
        SegmentKind::Dismissal => digest(&day.dismissal),
    }
}

/// Compare two records section by section. Days are matched by position.
pub fn diff_records(before: &WeeklyPlanRecord, after: &WeeklyPlanRecord) -> RecordDiff {
    let days = before
        .daily_plans
        .iter()
        .zip(&after.daily_plans)
        .enumerate()
        .filter_map(|(index, (old, new))| {
            let header_changed = old.day != new.day || old.date != new.date;
            let segments: Vec<SegmentKind> = SegmentKind::ALL
                .into_iter()
                .filter(|&kind| segment_digest(old, kind) != segment_digest(new, kind))
                .collect();
            if header_changed || !segments.is_empty() {
                Some(DayDiff {
                    index,
                    day: new.day.clone(),
                    header_changed,
                    segments,
                })
            } else {
                None
            }
        })
        .collect();

    RecordDiff {
        weekly_info_changed: digest(&before.weekly_info) != digest(&after.weekly_info),
        day_count_changed: before.daily_plans.len() != after.daily_plans.len(),
        days,
    }
}
