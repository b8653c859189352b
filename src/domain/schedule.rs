//! Fixed hourly focus/break segmentation.
//!
//! Every hour splits into `[0,25)` focus, `[25,30)` break, `[30,55)` focus
//! and `[55,60)` break, with the last break spilling into the next hour's
//! `:00`. All boundaries truncate seconds and sub-seconds to zero.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;

const BREAK_MINUTE_EARLY: u32 = 25;
const BREAK_MINUTE_EARLY_END: u32 = 30;
const BREAK_MINUTE_LATE: u32 = 55;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    Focus,
    Break,
}

impl SegmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Break => "break",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub mode: SegmentMode,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

fn at_minute(now: NaiveDateTime, minute: u32) -> NaiveDateTime {
    now.date()
        .and_hms_opt(now.hour(), minute, 0)
        .expect("minute below 60 always forms a valid time")
}

/// Classifies an instant into its segment. An instant exactly on `:25:00`
/// or `:55:00` already belongs to the break.
pub fn segment_info(now: NaiveDateTime) -> Segment {
    let minute = now.minute();

    if minute >= BREAK_MINUTE_LATE {
        return Segment {
            mode: SegmentMode::Break,
            start: at_minute(now, BREAK_MINUTE_LATE),
            end: at_minute(now, 0) + Duration::hours(1),
        };
    }

    if minute >= BREAK_MINUTE_EARLY && minute < BREAK_MINUTE_EARLY_END {
        return Segment {
            mode: SegmentMode::Break,
            start: at_minute(now, BREAK_MINUTE_EARLY),
            end: at_minute(now, BREAK_MINUTE_EARLY_END),
        };
    }

    if minute < BREAK_MINUTE_EARLY {
        return Segment {
            mode: SegmentMode::Focus,
            start: at_minute(now, 0),
            end: at_minute(now, BREAK_MINUTE_EARLY),
        };
    }

    Segment {
        mode: SegmentMode::Focus,
        start: at_minute(now, BREAK_MINUTE_EARLY_END),
        end: at_minute(now, BREAK_MINUTE_LATE),
    }
}

/// Bounds of the break a trigger at `now` announces: the late break when the
/// minute has reached `:55`, else the `:25` break of the current hour.
pub fn break_window(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    if now.minute() >= BREAK_MINUTE_LATE {
        (
            at_minute(now, BREAK_MINUTE_LATE),
            at_minute(now, 0) + Duration::hours(1),
        )
    } else {
        (
            at_minute(now, BREAK_MINUTE_EARLY),
            at_minute(now, BREAK_MINUTE_EARLY_END),
        )
    }
}

pub fn next_break_start(now: NaiveDateTime) -> NaiveDateTime {
    let minute = now.minute();
    if minute < BREAK_MINUTE_EARLY {
        at_minute(now, BREAK_MINUTE_EARLY)
    } else if minute < BREAK_MINUTE_LATE {
        at_minute(now, BREAK_MINUTE_LATE)
    } else {
        at_minute(now, BREAK_MINUTE_EARLY) + Duration::hours(1)
    }
}

pub fn remaining_ms(now: NaiveDateTime, segment: &Segment) -> i64 {
    (segment.end - now).num_milliseconds()
}

/// Elapsed share of the segment as a percentage, clamped to `0..=100`.
pub fn progress_percent(now: NaiveDateTime, segment: &Segment) -> f64 {
    let duration = (segment.end - segment.start).num_milliseconds();
    if duration <= 0 {
        return 0.0;
    }
    let elapsed = (now - segment.start).num_milliseconds();
    (elapsed as f64 / duration as f64 * 100.0).clamp(0.0, 100.0)
}

/// `"MM:SS"`, clamped to non-negative. Minutes widen past two digits for
/// durations above an hour rather than wrapping.
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// `"HH:MM"` on the 24-hour clock.
pub fn format_time(instant: NaiveDateTime) -> String {
    format!("{:02}:{:02}", instant.hour(), instant.minute())
}
