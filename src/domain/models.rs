use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_DRAFT_TITLE: &str = "Untitled";
pub const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const DAYS_PER_WEEK: u8 = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LightMode {
    Light,
    Dark,
}

impl Default for LightMode {
    fn default() -> Self {
        Self::Light
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Success,
    Info,
    Warning,
    Error,
}

impl Default for AlertSeverity {
    fn default() -> Self {
        Self::Success
    }
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Transient banner state. Persisted with the rest of the document, but
/// `open` is forced back to `false` when the document is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertState {
    pub open: bool,
    pub text: String,
    pub severity: AlertSeverity,
    pub hide: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AlertState {
    fn default() -> Self {
        Self {
            open: false,
            text: String::new(),
            severity: AlertSeverity::Success,
            hide: true,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftsState {
    pub active_id: Option<String>,
    pub items: Vec<DraftItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DraftsState {
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn active_item(&self) -> Option<&DraftItem> {
        let id = self.active_id.as_deref()?;
        self.items.iter().find(|item| item.id == id)
    }

    /// Active id invariant: a referenced id must exist; otherwise fall back
    /// to the first item, or `None` when there are no items.
    pub fn resolve_active_id(&self, requested: Option<&str>) -> Option<String> {
        match requested {
            Some(id) if self.contains(id) => Some(id.to_string()),
            _ => self.items.first().map(|item| item.id.clone()),
        }
    }
}

/// Week entries are stored as raw JSON and validated lazily by
/// [`WeekRitualData::from_value`] at each read, never at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RitualsState {
    pub active_week: Option<String>,
    pub weeks: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RitualItem {
    pub id: String,
    pub title: String,
}

/// Typed view over one week's ritual entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekRitualData {
    pub items: Vec<RitualItem>,
    pub checks: BTreeMap<String, BTreeMap<u8, bool>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WeekRitualData {
    /// Lenient parse of a stored week entry: keep each field only when it
    /// has the expected container shape, else use the empty default.
    pub fn from_value(value: &Value) -> Self {
        let Some(base) = value.as_object() else {
            return Self::default();
        };

        let items = base
            .get("items")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let record = entry.as_object()?;
                        let id = record.get("id").and_then(Value::as_str)?;
                        let title = record
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        Some(RitualItem {
                            id: id.to_string(),
                            title: title.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let checks = base
            .get("checks")
            .and_then(Value::as_object)
            .map(|rows| {
                rows.iter()
                    .filter_map(|(item_id, row)| {
                        let row = row.as_object()?;
                        let days = row
                            .iter()
                            .filter_map(|(day, checked)| {
                                let day =
                                    day.parse::<u8>().ok().filter(|day| *day < DAYS_PER_WEEK)?;
                                Some((day, checked.as_bool().unwrap_or(false)))
                            })
                            .collect();
                        Some((item_id.clone(), days))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let extra = base
            .iter()
            .filter(|(key, _)| key.as_str() != "items" && key.as_str() != "checks")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            items,
            checks,
            extra,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    pub fn is_checked(&self, item_id: &str, day: u8) -> bool {
        self.checks
            .get(item_id)
            .and_then(|row| row.get(&day))
            .copied()
            .unwrap_or(false)
    }

    /// Per-weekday completion percentage, rounded, zero when no items exist.
    pub fn day_scores(&self) -> [u32; 7] {
        let total = self.items.len() as u32;
        let mut scores = [0u32; 7];
        if total == 0 {
            return scores;
        }
        for (day, score) in scores.iter_mut().enumerate() {
            let completed = self
                .items
                .iter()
                .filter(|item| self.is_checked(&item.id, day as u8))
                .count() as u32;
            *score = (f64::from(completed * 100) / f64::from(total)).round() as u32;
        }
        scores
    }

    /// Completion percentage over the whole week grid.
    pub fn week_score(&self) -> u32 {
        let total = self.items.len() as u32 * u32::from(DAYS_PER_WEEK);
        if total == 0 {
            return 0;
        }
        let completed = self
            .items
            .iter()
            .map(|item| {
                (0..DAYS_PER_WEEK)
                    .filter(|day| self.is_checked(&item.id, *day))
                    .count() as u32
            })
            .sum::<u32>();
        (f64::from(completed * 100) / f64::from(total)).round() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroPrefs {
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    pub challenges: Vec<String>,
    pub active_challenge: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PomodoroPrefs {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            notifications_enabled: false,
            challenges: Vec::new(),
            active_challenge: String::new(),
            extra: Map::new(),
        }
    }
}

/// All user data. `todos` values and `rituals.weeks` entries are kept as raw
/// JSON; only their container shape is guaranteed after normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlData {
    pub todos: Map<String, Value>,
    pub drafts: DraftsState,
    pub rituals: RitualsState,
    pub pomodoro: PomodoroPrefs,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole persisted document. Unknown top-level keys survive in `extra`
/// so foreign exports round-trip untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub data: ControlData,
    pub light_mode: LightMode,
    pub alert: AlertState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControlState {
    pub fn week_todo(&self, week: &str) -> Option<String> {
        self.data
            .todos
            .get(week)
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
    }

    /// Saved TODO weeks, most recent first.
    pub fn todo_weeks(&self) -> Vec<String> {
        let mut weeks: Vec<String> = self.data.todos.keys().cloned().collect();
        weeks.sort_by(|a, b| b.cmp(a));
        weeks
    }

    pub fn ritual_week(&self, week: &str) -> WeekRitualData {
        self.data
            .rituals
            .weeks
            .get(week)
            .map(WeekRitualData::from_value)
            .unwrap_or_default()
    }
}
