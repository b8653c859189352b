//! Break-trigger detection and challenge selection.
//!
//! The watch loop polls once per second; a trigger must fire exactly once
//! per eligible calendar minute, so firings are deduplicated by a composite
//! calendar key rather than by elapsed time.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::Rng;

pub const TRIGGER_MINUTES: [u32; 2] = [25, 55];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerKey {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

impl TriggerKey {
    pub fn from_instant(now: NaiveDateTime) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BreakTriggerDetector {
    last_fired: Option<TriggerKey>,
}

impl BreakTriggerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per eligible minute, no matter how often
    /// the same instant's minute is observed.
    pub fn observe(&mut self, now: NaiveDateTime) -> bool {
        if !TRIGGER_MINUTES.contains(&now.minute()) {
            return false;
        }
        let key = TriggerKey::from_instant(now);
        if self.last_fired == Some(key) {
            return false;
        }
        self.last_fired = Some(key);
        true
    }
}

/// Uniform pick over the non-blank challenges; `None` when the pool has no
/// usable entry.
pub fn pick_challenge<R: Rng>(challenges: &[String], rng: &mut R) -> Option<String> {
    let pool: Vec<&String> = challenges
        .iter()
        .filter(|challenge| !challenge.trim().is_empty())
        .collect();
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.gen_range(0..pool.len())].clone())
}
