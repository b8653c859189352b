use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{document_path, ensure_default_document};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub document_path: PathBuf,
    pub logs_dir: PathBuf,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");

    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    let document_path = document_path(&state_dir);
    ensure_default_document(&document_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        document_path,
        logs_dir,
    })
}
