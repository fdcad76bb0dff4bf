// Cached signed-in profile.
// The backend owns authentication; all we keep locally is the last
// signed-in actor, so a restart resumes the session without another
// sign-in round-trip. Cleared on logout.

use anyhow::{anyhow, Result};
use log::info;
use once_cell::sync::OnceCell;
use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;

use crate::models::Actor;

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("telechat");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn save_profile(actor: &Actor) -> Result<()> {
    let path = get_profile_path()?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, actor)?;

    info!("Profile cached for {}", actor.id);
    Ok(())
}

pub fn load_profile() -> Result<Option<Actor>> {
    let path = get_profile_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let path_str = path.display().to_string();

    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let actor: Actor = serde_json::from_str(&contents)?;
    info!("Loaded cached profile for {} from {}", actor.id, path_str);

    Ok(Some(actor))
}

pub fn clear_profile() -> Result<()> {
    let path = get_profile_path()?;
    if path.exists() {
        fs::remove_file(path)?;
        info!("Cached profile cleared");
    }
    Ok(())
}

static PROFILE_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Point profile storage somewhere else (tests, sandboxed runs). First call
/// wins for the remainder of the process.
pub fn set_profile_path_override(path: PathBuf) {
    let _ = PROFILE_PATH_OVERRIDE.set(path);
}

fn get_profile_path() -> Result<PathBuf> {
    if let Some(path) = PROFILE_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("profile.json"))
}
