//! Weekly plan record types.
//!
//! These types map one-to-one onto the structured payload the generative
//! backend returns and are (de)serialized via `serde` with the backend's
//! camelCase field names.

mod placeholder;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use placeholder::placeholder_record;

/// Number of daily plans in a generated week (Monday to Friday).
pub const DAYS_PER_WEEK: usize = 5;

/// Number of goals in a collective activity.
pub const GOALS_PER_ACTIVITY: usize = 3;

/// Day labels in their fixed order.
pub const DAY_LABELS: [&str; DAYS_PER_WEEK] = ["周一", "周二", "周三", "周四", "周五"];

/// Root aggregate: header information plus the daily plans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlanRecord {
    pub weekly_info: WeeklyInfo,
    pub daily_plans: Vec<DailyPlan>,
}

/// Header fields, copied verbatim from the source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyInfo {
    pub date_range: String,
    pub theme: String,
    pub class_str: String,
    pub teachers: String,
}

/// One day's full schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub day: String,
    pub date: String,
    pub morning_exercise: RoutineSegment,
    pub area_play: RoutineSegment,
    pub collective_activity: CollectiveActivity,
    pub game_activity: TitledSegment,
    pub life_activity: ContentSegment,
    pub outdoor_activity: TitledSegment,
    pub dismissal: ContentSegment,
}

/// Morning exercise and area play.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineSegment {
    pub activity: String,
    pub observation: String,
    pub reflection: String,
}

/// The teacher-led collective activity of the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectiveActivity {
    pub title: String,
    pub goals: Vec<String>,
    pub prep: String,
    pub process: String,
    pub reflection: String,
}

/// Game and outdoor activity: a named activity with content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitledSegment {
    pub title: String,
    pub content: String,
    pub observation: String,
    pub reflection: String,
}

/// Life activity and dismissal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentSegment {
    pub content: String,
    pub observation: String,
    pub reflection: String,
}

// ---------------------------------------------------------------------------
// Segment kinds
// ---------------------------------------------------------------------------

/// The seven fixed time blocks of a day, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    MorningExercise,
    AreaPlay,
    CollectiveActivity,
    GameActivity,
    LifeActivity,
    OutdoorActivity,
    Dismissal,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 7] = [
        Self::MorningExercise,
        Self::AreaPlay,
        Self::CollectiveActivity,
        Self::GameActivity,
        Self::LifeActivity,
        Self::OutdoorActivity,
        Self::Dismissal,
    ];

    /// Field name in the structured payload.
    pub fn wire_key(self) -> &'static str {
        match self {
            Self::MorningExercise => "morningExercise",
            Self::AreaPlay => "areaPlay",
            Self::CollectiveActivity => "collectiveActivity",
            Self::GameActivity => "gameActivity",
            Self::LifeActivity => "lifeActivity",
            Self::OutdoorActivity => "outdoorActivity",
            Self::Dismissal => "dismissal",
        }
    }

    pub fn label_zh(self) -> &'static str {
        match self {
            Self::MorningExercise => "体锻活动",
            Self::AreaPlay => "区域游戏（融自主点心）",
            Self::CollectiveActivity => "集体活动",
            Self::GameActivity => "游戏活动",
            Self::LifeActivity => "生活活动",
            Self::OutdoorActivity => "游戏活动",
            Self::Dismissal => "离园活动",
        }
    }

    pub fn label_en(self) -> &'static str {
        match self {
            Self::MorningExercise => "Morning Exercise",
            Self::AreaPlay => "Area Play (with self-serve snack)",
            Self::CollectiveActivity => "Collective Activity",
            Self::GameActivity => "Game Activity",
            Self::LifeActivity => "Life Activity",
            Self::OutdoorActivity => "Outdoor Activity",
            Self::Dismissal => "Dismissal",
        }
    }

    /// Fixed time block, as printed on the classroom schedule.
    pub fn time_block(self) -> &'static str {
        match self {
            Self::MorningExercise => "7:45-8:40",
            Self::AreaPlay => "08:40-09:50",
            Self::CollectiveActivity => "9:50-10:20",
            Self::GameActivity => "10:20-11:10",
            Self::LifeActivity => "11:10-14:40",
            Self::OutdoorActivity => "14:40-16:00",
            Self::Dismissal => "16:00-16:10",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

/// Uniform read-only view of a segment's text fields.
///
/// `body` is the activity / content / process field, whichever the segment
/// carries; `title` is present for titled segments only.
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a> {
    pub kind: SegmentKind,
    pub title: Option<&'a str>,
    pub body: &'a str,
    pub observation: Option<&'a str>,
    pub reflection: &'a str,
}

impl DailyPlan {
    /// View one segment through the uniform [`SegmentView`].
    pub fn segment(&self, kind: SegmentKind) -> SegmentView<'_> {
        match kind {
            SegmentKind::MorningExercise => routine_view(kind, &self.morning_exercise),
            SegmentKind::AreaPlay => routine_view(kind, &self.area_play),
            SegmentKind::CollectiveActivity => SegmentView {
                kind,
                title: Some(&self.collective_activity.title),
                body: &self.collective_activity.process,
                observation: None,
                reflection: &self.collective_activity.reflection,
            },
            SegmentKind::GameActivity => titled_view(kind, &self.game_activity),
            SegmentKind::LifeActivity => content_view(kind, &self.life_activity),
            SegmentKind::OutdoorActivity => titled_view(kind, &self.outdoor_activity),
            SegmentKind::Dismissal => content_view(kind, &self.dismissal),
        }
    }

    /// All seven segments in display order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentView<'_>> {
        SegmentKind::ALL.into_iter().map(|kind| self.segment(kind))
    }
}

fn routine_view(kind: SegmentKind, s: &RoutineSegment) -> SegmentView<'_> {
    SegmentView {
        kind,
        title: None,
        body: &s.activity,
        observation: Some(&s.observation),
        reflection: &s.reflection,
    }
}

fn titled_view(kind: SegmentKind, s: &TitledSegment) -> SegmentView<'_> {
    SegmentView {
        kind,
        title: Some(&s.title),
        body: &s.content,
        observation: Some(&s.observation),
        reflection: &s.reflection,
    }
}

fn content_view(kind: SegmentKind, s: &ContentSegment) -> SegmentView<'_> {
    SegmentView {
        kind,
        title: None,
        body: &s.content,
        observation: Some(&s.observation),
        reflection: &s.reflection,
    }
}
