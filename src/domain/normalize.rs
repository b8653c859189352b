//! Coerces arbitrary JSON into the canonical [`ControlState`] document.
//!
//! Total and silent: malformed shapes degrade to defaults, never to errors.
//! This is the entire recovery strategy for corrupt or foreign documents.
//! Unknown keys are deliberately passed through at every merge level so
//! exports written by newer versions survive a round-trip.

use crate::domain::models::{
    AlertSeverity, AlertState, ControlData, ControlState, DraftItem, DraftsState, LightMode,
    PomodoroPrefs, RitualsState, DEFAULT_DRAFT_TITLE,
};
use serde_json::{Map, Value};

/// Builds a canonical document from any JSON value. Never fails; anything
/// that is not a JSON object becomes the default document.
pub fn normalize_control(raw: Value) -> ControlState {
    let Some(base) = raw.as_object() else {
        return ControlState::default();
    };

    let data = normalize_data(base.get("data"));
    let light_mode = match base.get("lightMode").and_then(Value::as_str) {
        Some("dark") => LightMode::Dark,
        _ => LightMode::Light,
    };
    let alert = normalize_alert(base.get("alert"));
    let extra = passthrough(base, &["data", "lightMode", "alert"]);

    ControlState {
        data,
        light_mode,
        alert,
        extra,
    }
}

/// Re-applies the normalization rules to an already-typed document. Used by
/// the single mutation path after every update.
pub fn renormalize(state: &ControlState) -> ControlState {
    normalize_control(serde_json::to_value(state).unwrap_or(Value::Null))
}

fn normalize_data(raw: Option<&Value>) -> ControlData {
    let Some(base) = raw.and_then(Value::as_object) else {
        return ControlData::default();
    };

    let todos = base
        .get("todos")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let drafts = normalize_drafts(base.get("drafts"));
    let rituals = normalize_rituals(base.get("rituals"));
    let pomodoro = normalize_pomodoro(base.get("pomodoro"));
    let extra = passthrough(base, &["todos", "drafts", "rituals", "pomodoro"]);

    ControlData {
        todos,
        drafts,
        rituals,
        pomodoro,
        extra,
    }
}

fn normalize_drafts(raw: Option<&Value>) -> DraftsState {
    let Some(base) = raw.and_then(Value::as_object) else {
        return DraftsState::default();
    };

    // Items are rebuilt field by field, which drops unknown item keys.
    let items: Vec<DraftItem> = base
        .get("items")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let record = entry.as_object()?;
                    let id = record.get("id").and_then(Value::as_str)?;
                    Some(DraftItem {
                        id: id.to_string(),
                        title: record
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or(DEFAULT_DRAFT_TITLE)
                            .to_string(),
                        content: record
                            .get("content")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let requested = base.get("activeId").and_then(Value::as_str);
    let extra = passthrough(base, &["activeId", "items"]);

    let mut drafts = DraftsState {
        active_id: None,
        items,
        extra,
    };
    drafts.active_id = drafts.resolve_active_id(requested);
    drafts
}

fn normalize_rituals(raw: Option<&Value>) -> RitualsState {
    let Some(base) = raw.and_then(Value::as_object) else {
        return RitualsState::default();
    };

    // Week entries stay raw here; each consumer re-validates them lazily.
    RitualsState {
        active_week: base
            .get("activeWeek")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        weeks: base
            .get("weeks")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        extra: passthrough(base, &["activeWeek", "weeks"]),
    }
}

fn normalize_pomodoro(raw: Option<&Value>) -> PomodoroPrefs {
    let Some(base) = raw.and_then(Value::as_object) else {
        return PomodoroPrefs::default();
    };

    let defaults = PomodoroPrefs::default();
    PomodoroPrefs {
        sound_enabled: base
            .get("soundEnabled")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.sound_enabled),
        notifications_enabled: base
            .get("notificationsEnabled")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.notifications_enabled),
        challenges: base
            .get("challenges")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or(defaults.challenges),
        active_challenge: base
            .get("activeChallenge")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        extra: passthrough(
            base,
            &[
                "soundEnabled",
                "notificationsEnabled",
                "challenges",
                "activeChallenge",
            ],
        ),
    }
}

fn normalize_alert(raw: Option<&Value>) -> AlertState {
    let Some(base) = raw.and_then(Value::as_object) else {
        return AlertState::default();
    };

    let defaults = AlertState::default();
    AlertState {
        open: base
            .get("open")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.open),
        text: base
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        severity: base
            .get("severity")
            .and_then(|value| serde_json::from_value::<AlertSeverity>(value.clone()).ok())
            .unwrap_or(defaults.severity),
        hide: base
            .get("hide")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.hide),
        extra: passthrough(base, &["open", "text", "severity", "hide"]),
    }
}

fn passthrough(base: &Map<String, Value>, known: &[&str]) -> Map<String, Value> {
    base.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
