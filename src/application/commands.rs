use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::models::{
    AlertSeverity, ControlState, DraftItem, DraftsState, LightMode, RitualItem, WeekRitualData,
    DAYS_PER_WEEK,
};
use crate::domain::normalize::renormalize;
use crate::domain::schedule::{
    format_duration, format_time, next_break_start, progress_percent, remaining_ms, segment_info,
};
use crate::domain::trigger::pick_challenge;
use crate::domain::week::{parse_week_key, week_key};
use crate::infrastructure::bell::{Bell, SystemBell};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::{DesktopNotifier, Notifier, PermissionState};
use crate::infrastructure::storage::{import_document, load_or_default, write_document};
use chrono::{Duration, Local, NaiveDateTime, Utc};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const FALLBACK_TEST_CHALLENGE: &str = "Stand up and stretch";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub type NowProvider = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Owner of the control document. Every mutation funnels through
/// [`update_document`], which re-normalizes the whole document and persists
/// it best-effort, so there is exactly one writer and one write path.
pub struct AppState {
    document_path: PathBuf,
    logs_dir: PathBuf,
    document: Mutex<ControlState>,
    notifier: Arc<dyn Notifier>,
    bell: Arc<dyn Bell>,
    rng: Mutex<SmallRng>,
    now_provider: NowProvider,
}

impl AppState {
    pub fn new(workspace_root: &Path) -> Result<Self, InfraError> {
        Self::with_capabilities(workspace_root, Arc::new(DesktopNotifier), Arc::new(SystemBell))
    }

    pub fn with_capabilities(
        workspace_root: &Path,
        notifier: Arc<dyn Notifier>,
        bell: Arc<dyn Bell>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let document = load_or_default(&bootstrap.document_path);

        Ok(Self {
            document_path: bootstrap.document_path,
            logs_dir: bootstrap.logs_dir,
            document: Mutex::new(document),
            notifier,
            bell,
            rng: Mutex::new(SmallRng::from_entropy()),
            now_provider: Arc::new(|| Local::now().naive_local()),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn with_rng(self, rng: SmallRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            ..self
        }
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.now_provider)()
    }

    pub fn current_week_key(&self) -> String {
        week_key(self.now().date())
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn bell(&self) -> &dyn Bell {
        self.bell.as_ref()
    }

    pub fn snapshot(&self) -> Result<ControlState, InfraError> {
        Ok(lock_document(self)?.clone())
    }

    pub fn pick_challenge(&self, challenges: &[String]) -> Result<Option<String>, InfraError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| InfraError::InvalidDocument("rng lock poisoned".to_string()))?;
        Ok(pick_challenge(challenges, &mut *rng))
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        log::error!("command={command} status=error message={error}");
        error.to_string()
    }
}

fn lock_document(state: &AppState) -> Result<MutexGuard<'_, ControlState>, InfraError> {
    state
        .document
        .lock()
        .map_err(|_| InfraError::InvalidDocument("document lock poisoned".to_string()))
}

/// The single mutation path: snapshot, mutate, re-normalize, persist. A
/// failed write is logged and swallowed so no mutation ever blocks on disk;
/// the document file simply lags until the next successful write.
fn update_document<F>(state: &AppState, mutate: F) -> Result<ControlState, InfraError>
where
    F: FnOnce(&mut ControlState),
{
    let mut guard = lock_document(state)?;
    let mut next = guard.clone();
    mutate(&mut next);
    let next = renormalize(&next);
    if let Err(error) = write_document(&state.document_path, &next) {
        log::warn!(
            "command=persist status=swallowed path={} message={error}",
            state.document_path.display()
        );
    }
    *guard = next.clone();
    Ok(next)
}

pub fn show_alert_impl(
    state: &AppState,
    severity: AlertSeverity,
    text: String,
    hide: bool,
) -> Result<ControlState, InfraError> {
    update_document(state, |control| {
        control.alert.open = true;
        control.alert.severity = severity;
        control.alert.text = text;
        control.alert.hide = hide;
    })
}

pub fn dismiss_alert_impl(state: &AppState) -> Result<ControlState, InfraError> {
    update_document(state, |control| control.alert.open = false)
}

pub fn set_light_mode_impl(state: &AppState, mode: LightMode) -> Result<ControlState, InfraError> {
    update_document(state, |control| control.light_mode = mode)
}

// --- Weekly TODO -----------------------------------------------------------

pub fn set_week_todo_impl(
    state: &AppState,
    week: &str,
    text: &str,
) -> Result<ControlState, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    let text = text.to_string();
    update_document(state, move |control| {
        if text.trim().is_empty() {
            control.data.todos.remove(&week);
        } else {
            control.data.todos.insert(week, Value::String(text));
        }
    })
}

pub fn clear_week_todo_impl(state: &AppState, week: &str) -> Result<ControlState, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    update_document(state, move |control| {
        control.data.todos.remove(&week);
    })
}

pub fn week_todo_impl(state: &AppState, week: &str) -> Result<Option<String>, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    Ok(lock_document(state)?.week_todo(&week))
}

pub fn list_todo_weeks_impl(state: &AppState) -> Result<Vec<String>, InfraError> {
    Ok(lock_document(state)?.todo_weeks())
}

// --- Drafts ----------------------------------------------------------------

fn resolve_draft_id(drafts: &DraftsState, id: Option<&str>) -> Result<String, InfraError> {
    let id = match id {
        Some(id) => id.to_string(),
        None => drafts
            .active_id
            .clone()
            .ok_or_else(|| InfraError::InvalidInput("no active draft".to_string()))?,
    };
    if !drafts.contains(&id) {
        return Err(InfraError::InvalidInput(format!("no draft with id `{id}`")));
    }
    Ok(id)
}

pub fn create_draft_impl(state: &AppState) -> Result<DraftItem, InfraError> {
    let id = next_id("draft");
    let created_id = id.clone();
    let next = update_document(state, move |control| {
        let drafts = &mut control.data.drafts;
        let title = format!("Draft {}", drafts.items.len() + 1);
        drafts.items.push(DraftItem {
            id: id.clone(),
            title,
            content: String::new(),
        });
        drafts.active_id = Some(id);
    })?;
    next.data
        .drafts
        .items
        .iter()
        .find(|item| item.id == created_id)
        .cloned()
        .ok_or_else(|| InfraError::InvalidDocument("created draft missing".to_string()))
}

/// Deletes a draft (the active one when `id` is `None`). When the active
/// draft goes away, selection moves to the item now occupying its slot,
/// else the previous one, else nothing.
pub fn delete_draft_impl(state: &AppState, id: Option<&str>) -> Result<ControlState, InfraError> {
    let target = {
        let guard = lock_document(state)?;
        resolve_draft_id(&guard.data.drafts, id)?
    };
    update_document(state, move |control| {
        let drafts = &mut control.data.drafts;
        let Some(index) = drafts.items.iter().position(|item| item.id == target) else {
            return;
        };
        let was_active = drafts.active_id.as_deref() == Some(target.as_str());
        drafts.items.remove(index);
        if was_active {
            drafts.active_id = drafts
                .items
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|prev| drafts.items.get(prev)))
                .map(|item| item.id.clone());
        }
    })
}

pub fn select_draft_impl(state: &AppState, id: &str) -> Result<DraftItem, InfraError> {
    let target = {
        let guard = lock_document(state)?;
        resolve_draft_id(&guard.data.drafts, Some(id))?
    };
    let next = update_document(state, {
        let target = target.clone();
        move |control| control.data.drafts.active_id = Some(target)
    })?;
    next.data
        .drafts
        .items
        .iter()
        .find(|item| item.id == target)
        .cloned()
        .ok_or_else(|| InfraError::InvalidDocument("selected draft missing".to_string()))
}

pub fn rename_draft_impl(
    state: &AppState,
    id: Option<&str>,
    title: &str,
) -> Result<DraftItem, InfraError> {
    edit_draft_field(state, id, |item| item.title = title.to_string())
}

pub fn edit_draft_impl(
    state: &AppState,
    id: Option<&str>,
    content: &str,
) -> Result<DraftItem, InfraError> {
    edit_draft_field(state, id, |item| item.content = content.to_string())
}

fn edit_draft_field<F>(
    state: &AppState,
    id: Option<&str>,
    apply: F,
) -> Result<DraftItem, InfraError>
where
    F: FnOnce(&mut DraftItem),
{
    let target = {
        let guard = lock_document(state)?;
        resolve_draft_id(&guard.data.drafts, id)?
    };
    let next = update_document(state, {
        let target = target.clone();
        move |control| {
            if let Some(item) = control
                .data
                .drafts
                .items
                .iter_mut()
                .find(|item| item.id == target)
            {
                apply(item);
            }
        }
    })?;
    next.data
        .drafts
        .items
        .iter()
        .find(|item| item.id == target)
        .cloned()
        .ok_or_else(|| InfraError::InvalidDocument("edited draft missing".to_string()))
}

pub fn list_drafts_impl(state: &AppState) -> Result<DraftsState, InfraError> {
    Ok(lock_document(state)?.data.drafts.clone())
}

pub fn active_draft_impl(state: &AppState) -> Result<Option<DraftItem>, InfraError> {
    Ok(lock_document(state)?.data.drafts.active_item().cloned())
}

// --- Rituals ---------------------------------------------------------------

/// Writes one week's grid back and makes that week the active one; every
/// ritual mutation also activates the week it touches.
fn write_ritual_week(control: &mut ControlState, week: &str, data: &WeekRitualData) {
    control.data.rituals.active_week = Some(week.to_string());
    control
        .data
        .rituals
        .weeks
        .insert(week.to_string(), data.to_value());
}

pub fn select_ritual_week_impl(
    state: &AppState,
    week: &str,
) -> Result<WeekRitualData, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    let next = update_document(state, {
        let week = week.clone();
        move |control| {
            let data = control.ritual_week(&week);
            write_ritual_week(control, &week, &data);
        }
    })?;
    Ok(next.ritual_week(&week))
}

pub fn add_ritual_impl(state: &AppState, week: &str) -> Result<RitualItem, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    let id = next_id("ritual");
    let created_id = id.clone();
    let next = update_document(state, {
        let week = week.clone();
        move |control| {
            let mut data = control.ritual_week(&week);
            let title = format!("Ritual {}", data.items.len() + 1);
            data.items.push(RitualItem { id, title });
            write_ritual_week(control, &week, &data);
        }
    })?;
    next.ritual_week(&week)
        .items
        .iter()
        .find(|item| item.id == created_id)
        .cloned()
        .ok_or_else(|| InfraError::InvalidDocument("created ritual missing".to_string()))
}

pub fn remove_ritual_impl(
    state: &AppState,
    week: &str,
    id: &str,
) -> Result<WeekRitualData, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    require_ritual(state, &week, id)?;
    let next = update_document(state, {
        let week = week.clone();
        let id = id.to_string();
        move |control| {
            let mut data = control.ritual_week(&week);
            data.items.retain(|item| item.id != id);
            data.checks.remove(&id);
            write_ritual_week(control, &week, &data);
        }
    })?;
    Ok(next.ritual_week(&week))
}

pub fn rename_ritual_impl(
    state: &AppState,
    week: &str,
    id: &str,
    title: &str,
) -> Result<RitualItem, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    require_ritual(state, &week, id)?;
    let next = update_document(state, {
        let week = week.clone();
        let id = id.to_string();
        let title = title.to_string();
        move |control| {
            let mut data = control.ritual_week(&week);
            if let Some(item) = data.items.iter_mut().find(|item| item.id == id) {
                item.title = title;
            }
            write_ritual_week(control, &week, &data);
        }
    })?;
    next.ritual_week(&week)
        .items
        .iter()
        .find(|item| item.id == id)
        .cloned()
        .ok_or_else(|| InfraError::InvalidDocument("renamed ritual missing".to_string()))
}

/// Flips one checkbox and returns its new value.
pub fn toggle_ritual_check_impl(
    state: &AppState,
    week: &str,
    id: &str,
    day: u8,
) -> Result<bool, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    if day >= DAYS_PER_WEEK {
        return Err(InfraError::InvalidInput(format!(
            "day must be 0-6 (Monday first), got {day}"
        )));
    }
    require_ritual(state, &week, id)?;
    let next = update_document(state, {
        let week = week.clone();
        let id = id.to_string();
        move |control| {
            let mut data = control.ritual_week(&week);
            let current = data.is_checked(&id, day);
            data.checks.entry(id).or_default().insert(day, !current);
            write_ritual_week(control, &week, &data);
        }
    })?;
    Ok(next.ritual_week(&week).is_checked(id, day))
}

pub fn ritual_week_impl(state: &AppState, week: &str) -> Result<WeekRitualData, InfraError> {
    let week = parse_week_key(week).map_err(InfraError::InvalidInput)?;
    Ok(lock_document(state)?.ritual_week(&week))
}

fn require_ritual(state: &AppState, week: &str, id: &str) -> Result<(), InfraError> {
    let guard = lock_document(state)?;
    if !guard
        .ritual_week(week)
        .items
        .iter()
        .any(|item| item.id == id)
    {
        return Err(InfraError::InvalidInput(format!(
            "no ritual with id `{id}` in week {week}"
        )));
    }
    Ok(())
}

// --- Pomodoro preferences --------------------------------------------------

pub fn set_sound_enabled_impl(state: &AppState, enabled: bool) -> Result<ControlState, InfraError> {
    update_document(state, move |control| {
        control.data.pomodoro.sound_enabled = enabled;
    })
}

/// Turning notifications on walks the permission flow and reports the
/// effective setting; turning them off never asks anything.
pub fn set_notifications_enabled_impl(state: &AppState, enabled: bool) -> Result<bool, InfraError> {
    if !enabled {
        update_document(state, |control| {
            control.data.pomodoro.notifications_enabled = false;
        })?;
        return Ok(false);
    }

    match state.notifier().request_permission() {
        PermissionState::Granted => {
            update_document(state, |control| {
                control.data.pomodoro.notifications_enabled = true;
            })?;
            show_alert_impl(
                state,
                AlertSeverity::Success,
                "Notifications enabled.".to_string(),
                true,
            )?;
            Ok(true)
        }
        PermissionState::Denied | PermissionState::Default => {
            update_document(state, |control| {
                control.data.pomodoro.notifications_enabled = false;
            })?;
            show_alert_impl(
                state,
                AlertSeverity::Warning,
                "Notifications blocked.".to_string(),
                true,
            )?;
            Ok(false)
        }
    }
}

/// Records the challenge chosen at a break trigger.
pub fn set_active_challenge_impl(
    state: &AppState,
    challenge: String,
) -> Result<ControlState, InfraError> {
    update_document(state, move |control| {
        control.data.pomodoro.active_challenge = challenge;
    })
}

pub fn add_challenge_impl(state: &AppState, text: &str) -> Result<Vec<String>, InfraError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InfraError::InvalidInput(
            "challenge must not be empty".to_string(),
        ));
    }
    let challenge = trimmed.to_string();
    let next = update_document(state, move |control| {
        control.data.pomodoro.challenges.push(challenge);
    })?;
    Ok(next.data.pomodoro.challenges)
}

pub fn update_challenge_impl(
    state: &AppState,
    index: usize,
    text: &str,
) -> Result<Vec<String>, InfraError> {
    require_challenge_index(state, index)?;
    let text = text.to_string();
    let next = update_document(state, move |control| {
        if let Some(slot) = control.data.pomodoro.challenges.get_mut(index) {
            *slot = text;
        }
    })?;
    Ok(next.data.pomodoro.challenges)
}

pub fn remove_challenge_impl(state: &AppState, index: usize) -> Result<Vec<String>, InfraError> {
    require_challenge_index(state, index)?;
    let next = update_document(state, move |control| {
        control.data.pomodoro.challenges.remove(index);
    })?;
    Ok(next.data.pomodoro.challenges)
}

fn require_challenge_index(state: &AppState, index: usize) -> Result<(), InfraError> {
    let count = lock_document(state)?.data.pomodoro.challenges.len();
    if index >= count {
        return Err(InfraError::InvalidInput(format!(
            "challenge index {index} out of range ({count} configured)"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TestBellOutcome {
    pub challenge: String,
    pub rang: bool,
    pub notified: bool,
}

/// Dry run of the break alert: same sound/notification plumbing, but the
/// picked challenge is only reported, never written into the document.
pub fn test_bell_impl(state: &AppState) -> Result<TestBellOutcome, InfraError> {
    let prefs = lock_document(state)?.data.pomodoro.clone();
    let challenge = state
        .pick_challenge(&prefs.challenges)?
        .unwrap_or_else(|| FALLBACK_TEST_CHALLENGE.to_string());

    let rang = prefs.sound_enabled;
    if rang {
        state.bell().ring();
    }

    let mut notified = false;
    if prefs.notifications_enabled {
        match state.notifier().request_permission() {
            PermissionState::Granted => {
                let back_at = state.now() + Duration::minutes(5);
                let body = format!("Try: {challenge}. Back at {}.", format_time(back_at));
                match state.notifier().notify("Test break", &body) {
                    Ok(()) => notified = true,
                    Err(error) => {
                        log::warn!("command=test_bell status=degraded message={error}");
                        show_alert_impl(
                            state,
                            AlertSeverity::Warning,
                            "Notifications blocked.".to_string(),
                            true,
                        )?;
                    }
                }
            }
            PermissionState::Denied | PermissionState::Default => {
                show_alert_impl(
                    state,
                    AlertSeverity::Warning,
                    "Notifications blocked.".to_string(),
                    true,
                )?;
            }
        }
    }

    show_alert_impl(
        state,
        AlertSeverity::Info,
        format!("Test bell: {challenge}"),
        true,
    )?;

    Ok(TestBellOutcome {
        challenge,
        rang,
        notified,
    })
}

// --- Status and overview ---------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PomodoroStatusResponse {
    pub clock: String,
    pub mode: String,
    pub segment_start: String,
    pub segment_end: String,
    pub remaining: String,
    pub progress_percent: u8,
    pub next_break: String,
    pub active_challenge: String,
}

pub fn pomodoro_status_impl(state: &AppState) -> Result<PomodoroStatusResponse, InfraError> {
    let now = state.now();
    let segment = segment_info(now);
    let active_challenge = lock_document(state)?.data.pomodoro.active_challenge.clone();

    Ok(PomodoroStatusResponse {
        clock: format_time(now),
        mode: segment.mode.as_str().to_string(),
        segment_start: format_time(segment.start),
        segment_end: format_time(segment.end),
        remaining: format_duration(remaining_ms(now, &segment)),
        progress_percent: progress_percent(now, &segment).round() as u8,
        next_break: format_time(next_break_start(now)),
        active_challenge,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverviewResponse {
    pub todo_week_count: usize,
    pub draft_count: usize,
    pub ritual_week: Option<String>,
    pub ritual_week_score: u32,
    pub mode: String,
    pub remaining: String,
}

pub fn overview_impl(state: &AppState) -> Result<OverviewResponse, InfraError> {
    let now = state.now();
    let segment = segment_info(now);
    let control = lock_document(state)?;

    let ritual_week = control.data.rituals.active_week.clone();
    let ritual_week_score = ritual_week
        .as_deref()
        .map(|week| control.ritual_week(week).week_score())
        .unwrap_or(0);

    Ok(OverviewResponse {
        todo_week_count: control.data.todos.len(),
        draft_count: control.data.drafts.items.len(),
        ritual_week,
        ritual_week_score,
        mode: segment.mode.as_str().to_string(),
        remaining: format_duration(remaining_ms(now, &segment)),
    })
}

// --- Import / export -------------------------------------------------------

pub fn export_state_impl(state: &AppState, path: &Path) -> Result<PathBuf, InfraError> {
    let snapshot = state.snapshot()?;
    write_document(path, &snapshot)?;
    Ok(path.to_path_buf())
}

/// Replaces the whole document from a file. A file that does not hold a
/// JSON object is rejected: the current state stays, an error alert is
/// raised, and the error propagates to the caller.
pub fn import_state_impl(state: &AppState, path: &Path) -> Result<ControlState, InfraError> {
    match import_document(path) {
        Ok(imported) => update_document(state, move |control| {
            *control = imported;
            control.alert.open = true;
            control.alert.severity = AlertSeverity::Success;
            control.alert.text = "State imported.".to_string();
            control.alert.hide = true;
        }),
        Err(error) => {
            show_alert_impl(
                state,
                AlertSeverity::Error,
                "Invalid JSON file.".to_string(),
                true,
            )?;
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;

    struct FakeNotifier {
        permission: PermissionState,
        fail_delivery: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeNotifier {
        fn granted() -> Self {
            Self {
                permission: PermissionState::Granted,
                fail_delivery: false,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn denied() -> Self {
            Self {
                permission: PermissionState::Denied,
                fail_delivery: false,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                permission: PermissionState::Granted,
                fail_delivery: true,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    impl Notifier for FakeNotifier {
        fn request_permission(&self) -> PermissionState {
            self.permission
        }

        fn notify(&self, title: &str, body: &str) -> Result<(), InfraError> {
            if self.fail_delivery {
                return Err(InfraError::Notification("bus unavailable".to_string()));
            }
            self.sent
                .lock()
                .expect("sent lock")
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBell {
        rings: AtomicUsize,
    }

    impl FakeBell {
        fn count(&self) -> usize {
            self.rings.load(Ordering::SeqCst)
        }
    }

    impl Bell for FakeBell {
        fn ring(&self) {
            self.rings.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 16)
            .expect("valid fixed date")
            .and_hms_opt(9, 10, 0)
            .expect("valid fixed time")
    }

    struct Harness {
        workspace: tempfile::TempDir,
        state: AppState,
        notifier: Arc<FakeNotifier>,
        bell: Arc<FakeBell>,
    }

    fn harness_with_notifier(notifier: FakeNotifier) -> Harness {
        let workspace = tempfile::tempdir().expect("create temp dir");
        let notifier = Arc::new(notifier);
        let bell = Arc::new(FakeBell::default());
        let state = AppState::with_capabilities(
            workspace.path(),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&bell) as Arc<dyn Bell>,
        )
        .expect("build app state")
        .with_now_provider(Arc::new(fixed_now))
        .with_rng(SmallRng::seed_from_u64(7));
        Harness {
            workspace,
            state,
            notifier,
            bell,
        }
    }

    fn harness() -> Harness {
        harness_with_notifier(FakeNotifier::granted())
    }

    #[test]
    fn todo_text_is_stored_per_week_and_blank_clears() {
        let h = harness();
        set_week_todo_impl(&h.state, "2026-W08", "buy flowers").expect("set todo");
        set_week_todo_impl(&h.state, "2026-W07", "older note").expect("set todo");
        assert_eq!(
            week_todo_impl(&h.state, "2026-W08").expect("read todo"),
            Some("buy flowers".to_string())
        );
        assert_eq!(
            list_todo_weeks_impl(&h.state).expect("list weeks"),
            vec!["2026-W08".to_string(), "2026-W07".to_string()]
        );

        set_week_todo_impl(&h.state, "2026-W08", "   ").expect("blank clears");
        assert_eq!(week_todo_impl(&h.state, "2026-W08").expect("read todo"), None);
        assert!(!h
            .state
            .snapshot()
            .expect("snapshot")
            .data
            .todos
            .contains_key("2026-W08"));

        clear_week_todo_impl(&h.state, "2026-W07").expect("clear todo");
        assert!(list_todo_weeks_impl(&h.state).expect("list weeks").is_empty());
    }

    #[test]
    fn todo_rejects_malformed_week_keys() {
        let h = harness();
        assert!(matches!(
            set_week_todo_impl(&h.state, "not-a-week", "x"),
            Err(InfraError::InvalidInput(_))
        ));
    }

    #[test]
    fn created_drafts_are_numbered_and_become_active() {
        let h = harness();
        let first = create_draft_impl(&h.state).expect("create draft");
        let second = create_draft_impl(&h.state).expect("create draft");
        assert_eq!(first.title, "Draft 1");
        assert_eq!(second.title, "Draft 2");

        let drafts = list_drafts_impl(&h.state).expect("list drafts");
        assert_eq!(drafts.items.len(), 2);
        assert_eq!(drafts.active_id, Some(second.id.clone()));
    }

    #[test]
    fn deleting_the_active_draft_moves_selection_to_its_slot() {
        let h = harness();
        let first = create_draft_impl(&h.state).expect("create draft");
        let second = create_draft_impl(&h.state).expect("create draft");
        let third = create_draft_impl(&h.state).expect("create draft");

        select_draft_impl(&h.state, &second.id).expect("select middle");
        let next = delete_draft_impl(&h.state, None).expect("delete active");
        // The item that slid into the deleted slot becomes active.
        assert_eq!(next.data.drafts.active_id, Some(third.id.clone()));

        let next = delete_draft_impl(&h.state, Some(&third.id)).expect("delete active");
        assert_eq!(next.data.drafts.active_id, Some(first.id.clone()));

        let next = delete_draft_impl(&h.state, Some(&first.id)).expect("delete last");
        assert_eq!(next.data.drafts.active_id, None);
        assert!(next.data.drafts.items.is_empty());
    }

    #[test]
    fn deleting_an_inactive_draft_keeps_the_selection() {
        let h = harness();
        let first = create_draft_impl(&h.state).expect("create draft");
        let second = create_draft_impl(&h.state).expect("create draft");

        let next = delete_draft_impl(&h.state, Some(&first.id)).expect("delete inactive");
        assert_eq!(next.data.drafts.active_id, Some(second.id));
    }

    #[test]
    fn active_draft_follows_selection() {
        let h = harness();
        assert_eq!(active_draft_impl(&h.state).expect("no drafts"), None);

        let first = create_draft_impl(&h.state).expect("create draft");
        let second = create_draft_impl(&h.state).expect("create draft");
        assert_eq!(
            active_draft_impl(&h.state)
                .expect("active draft")
                .map(|item| item.id),
            Some(second.id)
        );

        select_draft_impl(&h.state, &first.id).expect("select first");
        assert_eq!(
            active_draft_impl(&h.state)
                .expect("active draft")
                .map(|item| item.id),
            Some(first.id)
        );
    }

    #[test]
    fn draft_edits_apply_to_the_targeted_item() {
        let h = harness();
        let draft = create_draft_impl(&h.state).expect("create draft");
        rename_draft_impl(&h.state, Some(&draft.id), "Meeting notes").expect("rename");
        let edited = edit_draft_impl(&h.state, None, "agenda: everything").expect("edit active");
        assert_eq!(edited.title, "Meeting notes");
        assert_eq!(edited.content, "agenda: everything");

        assert!(matches!(
            rename_draft_impl(&h.state, Some("missing"), "x"),
            Err(InfraError::InvalidInput(_))
        ));
    }

    #[test]
    fn ritual_flow_add_toggle_score_remove() {
        let h = harness();
        let week = "2026-W08";
        let first = add_ritual_impl(&h.state, week).expect("add ritual");
        let second = add_ritual_impl(&h.state, week).expect("add ritual");
        assert_eq!(first.title, "Ritual 1");
        assert_eq!(second.title, "Ritual 2");

        assert!(toggle_ritual_check_impl(&h.state, week, &first.id, 0).expect("toggle on"));
        assert!(toggle_ritual_check_impl(&h.state, week, &second.id, 0).expect("toggle on"));
        assert!(toggle_ritual_check_impl(&h.state, week, &first.id, 1).expect("toggle on"));
        assert!(!toggle_ritual_check_impl(&h.state, week, &first.id, 1).expect("toggle off"));

        let data = ritual_week_impl(&h.state, week).expect("week view");
        assert_eq!(data.day_scores()[0], 100);
        assert_eq!(data.day_scores()[1], 0);
        // 2 of 14 cells checked.
        assert_eq!(data.week_score(), 14);

        let data = remove_ritual_impl(&h.state, week, &first.id).expect("remove ritual");
        assert_eq!(data.items.len(), 1);
        assert!(!data.checks.contains_key(&first.id));

        let control = h.state.snapshot().expect("snapshot");
        assert_eq!(control.data.rituals.active_week, Some(week.to_string()));
    }

    #[test]
    fn ritual_guards_reject_bad_targets() {
        let h = harness();
        let week = "2026-W08";
        let ritual = add_ritual_impl(&h.state, week).expect("add ritual");
        assert!(matches!(
            toggle_ritual_check_impl(&h.state, week, &ritual.id, 7),
            Err(InfraError::InvalidInput(_))
        ));
        assert!(matches!(
            toggle_ritual_check_impl(&h.state, week, "missing", 0),
            Err(InfraError::InvalidInput(_))
        ));
        assert!(matches!(
            rename_ritual_impl(&h.state, week, "missing", "x"),
            Err(InfraError::InvalidInput(_))
        ));
    }

    #[test]
    fn selecting_a_ritual_week_activates_it_without_inventing_items() {
        let h = harness();
        let data = select_ritual_week_impl(&h.state, "2026-W09").expect("select week");
        assert!(data.items.is_empty());
        let control = h.state.snapshot().expect("snapshot");
        assert_eq!(
            control.data.rituals.active_week,
            Some("2026-W09".to_string())
        );
        assert!(control.data.rituals.weeks.contains_key("2026-W09"));
    }

    #[test]
    fn notification_toggle_follows_the_permission_flow() {
        let h = harness();
        assert!(set_notifications_enabled_impl(&h.state, true).expect("enable"));
        let control = h.state.snapshot().expect("snapshot");
        assert!(control.data.pomodoro.notifications_enabled);
        assert_eq!(control.alert.severity, AlertSeverity::Success);
        assert!(control.alert.open);

        assert!(!set_notifications_enabled_impl(&h.state, false).expect("disable"));
        assert!(
            !h.state
                .snapshot()
                .expect("snapshot")
                .data
                .pomodoro
                .notifications_enabled
        );
    }

    #[test]
    fn denied_permission_leaves_notifications_off_with_a_warning() {
        let h = harness_with_notifier(FakeNotifier::denied());
        assert!(!set_notifications_enabled_impl(&h.state, true).expect("enable attempt"));
        let control = h.state.snapshot().expect("snapshot");
        assert!(!control.data.pomodoro.notifications_enabled);
        assert_eq!(control.alert.severity, AlertSeverity::Warning);
        assert_eq!(control.alert.text, "Notifications blocked.");
    }

    #[test]
    fn challenge_list_edits_are_bounded() {
        let h = harness();
        add_challenge_impl(&h.state, "  stretch  ").expect("add");
        add_challenge_impl(&h.state, "water").expect("add");
        assert!(matches!(
            add_challenge_impl(&h.state, "   "),
            Err(InfraError::InvalidInput(_))
        ));

        let challenges =
            update_challenge_impl(&h.state, 1, "drink water").expect("update in range");
        assert_eq!(challenges, vec!["stretch", "drink water"]);
        assert!(matches!(
            update_challenge_impl(&h.state, 5, "x"),
            Err(InfraError::InvalidInput(_))
        ));

        let challenges = remove_challenge_impl(&h.state, 0).expect("remove");
        assert_eq!(challenges, vec!["drink water"]);
        assert!(matches!(
            remove_challenge_impl(&h.state, 3),
            Err(InfraError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bell_uses_the_fallback_challenge_and_prefs() {
        let h = harness();
        set_notifications_enabled_impl(&h.state, true).expect("enable notifications");
        let outcome = test_bell_impl(&h.state).expect("test bell");
        assert_eq!(outcome.challenge, FALLBACK_TEST_CHALLENGE);
        assert!(outcome.rang);
        assert!(outcome.notified);
        assert_eq!(h.bell.count(), 1);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Test break");
        // 09:10 fixed clock plus five minutes.
        assert_eq!(
            sent[0].1,
            format!("Try: {FALLBACK_TEST_CHALLENGE}. Back at 09:15.")
        );

        let control = h.state.snapshot().expect("snapshot");
        assert_eq!(
            control.alert.text,
            format!("Test bell: {FALLBACK_TEST_CHALLENGE}")
        );
        // A test run never commits a challenge to the document.
        assert_eq!(control.data.pomodoro.active_challenge, "");
    }

    #[test]
    fn failed_delivery_degrades_to_a_warning() {
        let h = harness_with_notifier(FakeNotifier::failing());
        set_notifications_enabled_impl(&h.state, true).expect("enable notifications");

        let outcome = test_bell_impl(&h.state).expect("test bell");
        assert!(!outcome.notified);
        assert!(h.notifier.sent().is_empty());
        // The final info alert overwrites the warning, so only the outcome
        // records the degradation; the document itself stays consistent.
        let control = h.state.snapshot().expect("snapshot");
        assert!(control.data.pomodoro.notifications_enabled);
    }

    #[test]
    fn test_bell_respects_disabled_sound() {
        let h = harness();
        set_sound_enabled_impl(&h.state, false).expect("disable sound");
        let outcome = test_bell_impl(&h.state).expect("test bell");
        assert!(!outcome.rang);
        assert!(!outcome.notified);
        assert_eq!(h.bell.count(), 0);
    }

    #[test]
    fn status_reflects_the_fixed_clock() {
        let h = harness();
        let status = pomodoro_status_impl(&h.state).expect("status");
        assert_eq!(status.clock, "09:10");
        assert_eq!(status.mode, "focus");
        assert_eq!(status.segment_start, "09:00");
        assert_eq!(status.segment_end, "09:25");
        assert_eq!(status.remaining, "15:00");
        assert_eq!(status.progress_percent, 40);
        assert_eq!(status.next_break, "09:25");
    }

    #[test]
    fn overview_counts_sections() {
        let h = harness();
        set_week_todo_impl(&h.state, "2026-W08", "notes").expect("set todo");
        create_draft_impl(&h.state).expect("create draft");
        let ritual = add_ritual_impl(&h.state, "2026-W08").expect("add ritual");
        toggle_ritual_check_impl(&h.state, "2026-W08", &ritual.id, 0).expect("toggle");

        let overview = overview_impl(&h.state).expect("overview");
        assert_eq!(overview.todo_week_count, 1);
        assert_eq!(overview.draft_count, 1);
        assert_eq!(overview.ritual_week, Some("2026-W08".to_string()));
        assert_eq!(overview.ritual_week_score, 14);
        assert_eq!(overview.mode, "focus");
    }

    #[test]
    fn import_failure_keeps_state_and_raises_an_error_alert() {
        let h = harness();
        set_week_todo_impl(&h.state, "2026-W08", "precious").expect("set todo");

        let bad = h.workspace.path().join("bad.json");
        std::fs::write(&bad, "42").expect("write import file");
        assert!(import_state_impl(&h.state, &bad).is_err());

        let control = h.state.snapshot().expect("snapshot");
        assert_eq!(
            control.week_todo("2026-W08"),
            Some("precious".to_string())
        );
        assert_eq!(control.alert.severity, AlertSeverity::Error);
        assert_eq!(control.alert.text, "Invalid JSON file.");
    }

    #[test]
    fn import_replaces_the_document_and_confirms() {
        let h = harness();
        set_week_todo_impl(&h.state, "2026-W08", "old state").expect("set todo");

        let file = h.workspace.path().join("incoming.json");
        std::fs::write(
            &file,
            r#"{"lightMode": "dark", "data": {"todos": {"2026-W01": "replacement"}}}"#,
        )
        .expect("write import file");

        let control = import_state_impl(&h.state, &file).expect("import");
        assert_eq!(control.light_mode, LightMode::Dark);
        assert_eq!(control.week_todo("2026-W08"), None);
        assert_eq!(
            control.week_todo("2026-W01"),
            Some("replacement".to_string())
        );
        assert_eq!(control.alert.text, "State imported.");
        assert_eq!(control.alert.severity, AlertSeverity::Success);
    }

    #[test]
    fn export_round_trips_through_import() {
        let h = harness();
        set_week_todo_impl(&h.state, "2026-W08", "exported").expect("set todo");
        set_light_mode_impl(&h.state, LightMode::Dark).expect("set mode");

        let file = h.workspace.path().join("out.json");
        export_state_impl(&h.state, &file).expect("export");

        let imported = import_document(&file).expect("re-import");
        assert_eq!(imported.week_todo("2026-W08"), Some("exported".to_string()));
        assert_eq!(imported.light_mode, LightMode::Dark);
    }

    #[test]
    fn mutations_are_persisted_to_the_document_file() {
        let h = harness();
        set_week_todo_impl(&h.state, "2026-W08", "durable").expect("set todo");

        let reloaded = load_or_default(h.state.document_path());
        assert_eq!(reloaded.week_todo("2026-W08"), Some("durable".to_string()));
    }

    #[test]
    fn current_week_key_tracks_the_injected_clock() {
        let h = harness();
        assert_eq!(h.state.current_week_key(), "2026-W08");
    }
}
