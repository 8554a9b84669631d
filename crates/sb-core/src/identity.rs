//! Local identity file
//!
//! A single line holding the user id, used to recognise the same CLI user
//! across restarts.

use std::path::Path;

use tracing::info;

use crate::Result;

/// Read the stored identity, minting and persisting a new one if needed
pub fn load_or_create(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let id = content.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, &id)?;
    info!("Created new identity at {}", path.display());
    Ok(id)
}
