use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::env::Environment;
use crate::utils::paths::get_config_path;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gpt-clip", version)]
#[command(
    about = "Send clipboard content to a chat completion API and copy the reply back",
    long_about = None
)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Path to config JSON file (default: ~/.config/gpt-clip/config.json)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the model
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Override the system prompt
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Override the temperature (0.0-2.0)
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub temperature: Option<f64>,

    /// Disable logging for this run
    #[arg(long)]
    pub no_log: bool,

    /// Write a default config file if none exists, then exit
    #[arg(long)]
    pub init_config: bool,

    /// Print version
    #[allow(dead_code)]
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    /// Settings given on the command line. `--no-log` is the only way to
    /// touch `log_enabled` from here.
    pub fn overrides(&self) -> PartialConfig {
        PartialConfig {
            system_prompt: self.prompt.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            log_enabled: self.no_log.then_some(false),
            ..Default::default()
        }
    }

    pub fn config_path(&self, env: &Environment) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => get_config_path(env),
        }
    }
}
