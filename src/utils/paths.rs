use crate::config::LogFormat;
use crate::error::{ConfigSource, Error, Result};
use crate::utils::env::Environment;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "gpt-clip";
const CONFIG_FILE: &str = "config.json";
const LOG_STEM: &str = "gpt-clip";

/// `$XDG_CONFIG_HOME`, falling back to `~/.config` on every platform.
pub fn get_config_home(env: &Environment) -> Result<PathBuf> {
    if let Some(xdg) = env.get_non_empty("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        Error::validation("config path", ConfigSource::Default, "could not find home directory")
    })?;
    Ok(home.join(".config"))
}

pub fn get_app_dir(env: &Environment) -> Result<PathBuf> {
    Ok(get_config_home(env)?.join(APP_DIR))
}

pub fn get_config_path(env: &Environment) -> Result<PathBuf> {
    Ok(get_app_dir(env)?.join(CONFIG_FILE))
}

/// The session log lives next to whichever config file is in use.
pub fn get_log_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

pub fn get_log_file_name(format: LogFormat) -> String {
    format!("{}.{}", LOG_STEM, format.extension())
}

pub fn ensure_parent_exists(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
