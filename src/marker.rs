use crate::config::MARKER_FILE_NAME;
use crate::error::{InstallError, Result};
use crate::types::InstallationMarker;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn marker_path(version_dir: &Path) -> PathBuf {
    version_dir.join(MARKER_FILE_NAME)
}

/// Read the marker of a version directory. A missing, unreadable or corrupt
/// marker all mean "not installed".
pub fn read_marker(version_dir: &Path) -> Option<InstallationMarker> {
    let path = marker_path(version_dir);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(marker) => Some(marker),
        Err(e) => {
            tracing::warn!("Ignoring corrupt marker {}: {}", path.display(), e);
            None
        }
    }
}

pub fn write_marker(version_dir: &Path, marker: &InstallationMarker) -> Result<()> {
    let path = marker_path(version_dir);
    let content = serde_json::to_string_pretty(marker)
        .map_err(|e| InstallError::Io {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
    fs::write(&path, content).map_err(InstallError::io(&path))?;
    Ok(())
}
