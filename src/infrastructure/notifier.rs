//! Platform notification capability. The application only depends on the
//! [`Notifier`] port; the desktop adapter sits behind it so headless runs
//! and tests can swap in their own.

use crate::infrastructure::error::InfraError;
use notify_rust::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Default,
}

pub trait Notifier: Send + Sync {
    fn request_permission(&self) -> PermissionState;
    fn notify(&self, title: &str, body: &str) -> Result<(), InfraError>;
}

/// Desktop adapter over the session notification daemon. Permission is a
/// browser concept; the desktop bus either delivers or errors, so requests
/// always report granted and failures surface through `notify`.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), InfraError> {
        Notification::new()
            .summary(title)
            .body(body)
            .appname("citadel")
            .icon("alarm-clock")
            .show()
            .map(|_| ())
            .map_err(|error| InfraError::Notification(error.to_string()))
    }
}
