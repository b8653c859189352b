//! Once-per-second watch service driving break alerts.
//!
//! Polling is deliberately dumb: every tick re-reads the clock and asks the
//! detector whether this minute deserves a firing. All delivery decisions
//! (sound, notification, banner) are made from the preferences captured at
//! fire time.

use crate::application::commands::{set_active_challenge_impl, show_alert_impl, AppState};
use crate::domain::models::AlertSeverity;
use crate::domain::schedule::{break_window, format_time};
use crate::domain::trigger::BreakTriggerDetector;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::PermissionState;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub struct BreakAlert {
    pub challenge: Option<String>,
    pub break_end: NaiveDateTime,
    pub message: String,
}

#[derive(Default)]
pub struct BreakWatcher {
    detector: BreakTriggerDetector,
}

impl BreakWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// One poll step. Returns the alert that was raised when this instant
    /// crossed a trigger minute, `None` otherwise.
    pub fn poll(
        &mut self,
        state: &AppState,
        now: NaiveDateTime,
    ) -> Result<Option<BreakAlert>, InfraError> {
        if !self.detector.observe(now) {
            return Ok(None);
        }
        Ok(Some(fire_break_trigger(state, now)?))
    }
}

/// Everything that happens at :25 and :55: pick a challenge, store it,
/// ring, notify, and raise the banner alert.
fn fire_break_trigger(state: &AppState, now: NaiveDateTime) -> Result<BreakAlert, InfraError> {
    let prefs = state.snapshot()?.data.pomodoro;
    let challenge = state.pick_challenge(&prefs.challenges)?;
    let stored = challenge.clone().unwrap_or_default();

    set_active_challenge_impl(state, stored)?;

    if prefs.sound_enabled {
        state.bell().ring();
    }

    let (_, break_end) = break_window(now);

    if prefs.notifications_enabled
        && state.notifier().request_permission() == PermissionState::Granted
    {
        let body = match &challenge {
            Some(challenge) => format!(
                "Stop for five minutes. Back at {}. Challenge: {challenge}",
                format_time(break_end)
            ),
            None => format!("Stop for five minutes. Back at {}.", format_time(break_end)),
        };
        if let Err(error) = state.notifier().notify("Break time", &body) {
            log::warn!("command=break_trigger status=degraded message={error}");
        }
    }

    let message = match &challenge {
        Some(challenge) => format!("Break time: {challenge}"),
        None => "Break time. Take five.".to_string(),
    };
    show_alert_impl(state, AlertSeverity::Info, message.clone(), true)?;

    log::info!(
        "command=break_trigger status=fired at={} challenge={}",
        format_time(now),
        challenge.as_deref().unwrap_or("-")
    );

    Ok(BreakAlert {
        challenge,
        break_end,
        message,
    })
}

/// Runs the polling loop until the shutdown channel flips, handing every
/// raised alert to `on_alert`. The interval is held only for the lifetime
/// of this future, which is the whole teardown story for the watch service.
pub async fn run_watch<F>(
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
    mut on_alert: F,
) -> Result<(), InfraError>
where
    F: FnMut(&BreakAlert),
{
    let mut watcher = BreakWatcher::new();
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = state.now();
                if let Some(alert) = watcher.poll(&state, now)? {
                    on_alert(&alert);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{
        add_challenge_impl, set_notifications_enabled_impl, set_sound_enabled_impl,
    };
    use crate::infrastructure::bell::Bell;
    use crate::infrastructure::error::InfraError;
    use crate::infrastructure::notifier::Notifier;
    use chrono::NaiveDate;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingNotifier {
        permission: PermissionState,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        fn new(permission: PermissionState) -> Self {
            Self {
                permission,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn request_permission(&self) -> PermissionState {
            self.permission
        }

        fn notify(&self, title: &str, body: &str) -> Result<(), InfraError> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingBell {
        rings: AtomicUsize,
    }

    impl Bell for CountingBell {
        fn ring(&self) {
            self.rings.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn instant(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 16)
            .expect("valid fixed date")
            .and_hms_opt(hour, minute, second)
            .expect("valid fixed time")
    }

    struct Harness {
        _workspace: tempfile::TempDir,
        state: AppState,
        notifier: Arc<RecordingNotifier>,
        bell: Arc<CountingBell>,
    }

    fn harness() -> Harness {
        let workspace = tempfile::tempdir().expect("create temp dir");
        let notifier = Arc::new(RecordingNotifier::new(PermissionState::Granted));
        let bell = Arc::new(CountingBell::default());
        let state = AppState::with_capabilities(
            workspace.path(),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&bell) as Arc<dyn Bell>,
        )
        .expect("build app state")
        .with_rng(SmallRng::seed_from_u64(11));
        Harness {
            _workspace: workspace,
            state,
            notifier,
            bell,
        }
    }

    #[test]
    fn polling_fires_once_per_trigger_minute() {
        let h = harness();
        let mut watcher = BreakWatcher::new();

        assert!(watcher
            .poll(&h.state, instant(9, 24, 59))
            .expect("poll")
            .is_none());
        assert!(watcher
            .poll(&h.state, instant(9, 25, 0))
            .expect("poll")
            .is_some());
        for second in 1..5 {
            assert!(watcher
                .poll(&h.state, instant(9, 25, second))
                .expect("poll")
                .is_none());
        }
        assert!(watcher
            .poll(&h.state, instant(9, 55, 0))
            .expect("poll")
            .is_some());
        assert_eq!(h.bell.rings.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn firing_stores_a_challenge_and_notifies_with_the_break_end() {
        let h = harness();
        add_challenge_impl(&h.state, "walk the stairs").expect("add challenge");
        set_notifications_enabled_impl(&h.state, true).expect("enable notifications");

        let mut watcher = BreakWatcher::new();
        let alert = watcher
            .poll(&h.state, instant(9, 55, 0))
            .expect("poll")
            .expect("alert fired");

        assert_eq!(alert.challenge, Some("walk the stairs".to_string()));
        assert_eq!(alert.break_end, instant(10, 0, 0));
        assert_eq!(alert.message, "Break time: walk the stairs");

        let control = h.state.snapshot().expect("snapshot");
        assert_eq!(
            control.data.pomodoro.active_challenge,
            "walk the stairs"
        );
        assert_eq!(control.alert.severity, AlertSeverity::Info);
        assert_eq!(control.alert.text, "Break time: walk the stairs");
        assert!(control.alert.open);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Break time");
        assert_eq!(
            sent[0].1,
            "Stop for five minutes. Back at 10:00. Challenge: walk the stairs"
        );
    }

    #[test]
    fn empty_pool_fires_without_a_challenge() {
        let h = harness();
        let mut watcher = BreakWatcher::new();
        let alert = watcher
            .poll(&h.state, instant(9, 25, 0))
            .expect("poll")
            .expect("alert fired");

        assert_eq!(alert.challenge, None);
        assert_eq!(alert.message, "Break time. Take five.");
        assert_eq!(
            h.state
                .snapshot()
                .expect("snapshot")
                .data
                .pomodoro
                .active_challenge,
            ""
        );
    }

    #[test]
    fn disabled_sound_and_notifications_stay_quiet() {
        let h = harness();
        set_sound_enabled_impl(&h.state, false).expect("disable sound");

        let mut watcher = BreakWatcher::new();
        watcher
            .poll(&h.state, instant(9, 25, 0))
            .expect("poll")
            .expect("alert fired");

        assert_eq!(h.bell.rings.load(Ordering::SeqCst), 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn run_watch_stops_on_shutdown() {
        let h = harness();
        let state = Arc::new(h.state);
        let (sender, receiver) = watch::channel(false);

        let task = tokio::spawn(run_watch(Arc::clone(&state), receiver, |_| {}));
        sender.send(true).expect("signal shutdown");
        task.await
            .expect("join watch task")
            .expect("watch loop exits cleanly");
    }
}
