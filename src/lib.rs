//! Citadel: a single-document personal management backend. Weekly TODO
//! notes, drafts, ritual tracking and an hourly focus/break clock, all
//! persisted as one JSON file.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    active_draft_impl, add_challenge_impl, add_ritual_impl, clear_week_todo_impl, create_draft_impl,
    delete_draft_impl, dismiss_alert_impl, edit_draft_impl, export_state_impl, import_state_impl,
    list_drafts_impl, list_todo_weeks_impl, overview_impl, pomodoro_status_impl,
    remove_challenge_impl, remove_ritual_impl, rename_draft_impl, rename_ritual_impl,
    ritual_week_impl, select_draft_impl, select_ritual_week_impl, set_active_challenge_impl,
    set_light_mode_impl, set_notifications_enabled_impl, set_sound_enabled_impl,
    set_week_todo_impl, show_alert_impl, test_bell_impl, toggle_ritual_check_impl,
    update_challenge_impl, week_todo_impl, AppState, NowProvider, OverviewResponse,
    PomodoroStatusResponse, TestBellOutcome, FALLBACK_TEST_CHALLENGE,
};
pub use application::watch::{run_watch, BreakAlert, BreakWatcher};
pub use domain::models::{
    AlertSeverity, AlertState, ControlData, ControlState, DraftItem, DraftsState, LightMode,
    PomodoroPrefs, RitualItem, RitualsState, WeekRitualData, DAY_LABELS,
};
pub use domain::normalize::normalize_control;
pub use domain::schedule::{
    break_window, format_duration, format_time, next_break_start, segment_info, Segment,
    SegmentMode,
};
pub use domain::trigger::{pick_challenge, BreakTriggerDetector};
pub use domain::week::{parse_week_key, week_key};
pub use infrastructure::bell::{Bell, SystemBell};
pub use infrastructure::error::InfraError;
pub use infrastructure::logging::init_logging;
pub use infrastructure::notifier::{DesktopNotifier, Notifier, PermissionState};
pub use infrastructure::storage::EXPORT_FILE_NAME;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
