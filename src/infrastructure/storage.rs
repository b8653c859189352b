//! Persistence of the control document as a single pretty-printed JSON
//! file. Loading never fails outward: anything unreadable degrades to the
//! default document, which is the contract the rest of the system leans on.

use crate::domain::models::ControlState;
use crate::domain::normalize::normalize_control;
use crate::infrastructure::error::InfraError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const CONTROL_JSON: &str = "control.json";

/// Default file name for exports.
pub const EXPORT_FILE_NAME: &str = "pms-control.json";

pub fn document_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONTROL_JSON)
}

pub fn read_document(path: &Path) -> Result<Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_document(path: &Path, state: &ControlState) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(state)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

/// Writes a default document when none exists yet, so a first run starts
/// from a valid file.
pub fn ensure_default_document(path: &Path) -> Result<(), InfraError> {
    if !path.exists() {
        write_document(path, &ControlState::default())?;
    }
    Ok(())
}

/// Best-effort load: a missing file is expected on first run, any other
/// failure is logged and the default document is used. The alert banner is
/// always closed after a load.
pub fn load_or_default(path: &Path) -> ControlState {
    let mut control = match read_document(path) {
        Ok(value) => normalize_control(value),
        Err(InfraError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
            ControlState::default()
        }
        Err(error) => {
            log::warn!(
                "discarding unreadable document at {}: {error}",
                path.display()
            );
            ControlState::default()
        }
    };
    control.alert.open = false;
    control
}

/// Reads a user-selected file as a replacement document. Only a JSON object
/// is accepted; everything else is rejected so the caller can keep the
/// current state.
pub fn import_document(path: &Path) -> Result<ControlState, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&raw)?;
    if !parsed.is_object() {
        return Err(InfraError::InvalidDocument(
            "imported JSON must be an object".to_string(),
        ));
    }
    Ok(normalize_control(parsed))
}
