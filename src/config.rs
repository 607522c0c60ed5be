use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{ConfigSource, Error, Result};
use crate::utils::env::Environment;
use crate::utils::paths::ensure_parent_exists;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

const ENV_SYSTEM_PROMPT: &str = "GPTCLIP_SYSTEM_PROMPT";
const ENV_MODEL: &str = "GPTCLIP_MODEL";
const ENV_TEMPERATURE: &str = "GPTCLIP_TEMPERATURE";
const ENV_LOG_ENABLED: &str = "GPTCLIP_LOG_ENABLED";
const ENV_LOG_RETENTION_DAYS: &str = "GPTCLIP_LOG_RETENTION_DAYS";
const ENV_LOG_FORMAT: &str = "GPTCLIP_LOG_FORMAT";
const ENV_API_STYLE: &str = "GPTCLIP_API_STYLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Markdown,
    Plain,
}

impl LogFormat {
    pub fn extension(self) -> &'static str {
        match self {
            LogFormat::Markdown => "md",
            LogFormat::Plain => "log",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" => Ok(LogFormat::Markdown),
            "plain" => Ok(LogFormat::Plain),
            other => Err(format!("unknown log format '{other}' (expected markdown or plain)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Markdown => f.write_str("markdown"),
            LogFormat::Plain => f.write_str("plain"),
        }
    }
}

/// Which generation of the completion API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    /// Same as `Chat`
    #[default]
    Auto,
    Chat,
    Legacy,
}

impl FromStr for ApiStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ApiStyle::Auto),
            "chat" => Ok(ApiStyle::Chat),
            "legacy" => Ok(ApiStyle::Legacy),
            other => Err(format!("unknown api style '{other}' (expected auto, chat or legacy)")),
        }
    }
}

/// Settings for one run, resolved once and passed to whoever needs them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub log_enabled: bool,
    pub log_retention_days: u32,
    pub log_format: LogFormat,
    pub api_style: ApiStyle,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            log_enabled: true,
            log_retention_days: 30,
            log_format: LogFormat::Markdown,
            api_style: ApiStyle::Auto,
        }
    }
}

/// Values one source defines. Anything left `None` falls through to the
/// next source. Values are only range-checked once they win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig {
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub log_enabled: Option<bool>,
    pub log_retention_days: Option<i64>,
    pub log_format: Option<String>,
    pub api_style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    pub source: ConfigSource,
    pub values: PartialConfig,
}

impl ConfigLayer {
    pub fn cli(values: PartialConfig) -> Self {
        Self {
            source: ConfigSource::Cli,
            values,
        }
    }

    pub fn from_env(env: &Environment) -> Result<Self> {
        let src = ConfigSource::Env;
        let values = PartialConfig {
            system_prompt: env.get(ENV_SYSTEM_PROMPT).map(str::to_string),
            model: env.get(ENV_MODEL).map(str::to_string),
            temperature: env
                .get(ENV_TEMPERATURE)
                .map(|v| parse_float("temperature", v, src))
                .transpose()?,
            log_enabled: env
                .get(ENV_LOG_ENABLED)
                .map(|v| parse_bool("log_enabled", v, src))
                .transpose()?,
            log_retention_days: env
                .get(ENV_LOG_RETENTION_DAYS)
                .map(|v| parse_int("log_retention_days", v, src))
                .transpose()?,
            log_format: env.get(ENV_LOG_FORMAT).map(str::to_string),
            api_style: env.get(ENV_API_STYLE).map(str::to_string),
        };
        Ok(Self { source: src, values })
    }

    /// Load the JSON config file. A missing file yields `None`.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using lower layers");
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let values = parse_config_json(&content).map_err(|err| match err {
            JsonLayerError::Parse(message) => Error::ConfigParse {
                path: path.to_path_buf(),
                message,
            },
            JsonLayerError::Invalid(err) => err,
        })?;

        Ok(Some(Self {
            source: ConfigSource::File,
            values,
        }))
    }
}

enum JsonLayerError {
    Parse(String),
    Invalid(Error),
}

/// On-disk shape of `config.json`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    system_prompt: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    log_enabled: Option<bool>,
    log_retention_days: Option<i64>,
    log_format: Option<String>,
    api_style: Option<String>,
}

const FILE_FIELDS: [&str; 7] = [
    "system_prompt",
    "model",
    "temperature",
    "log_enabled",
    "log_retention_days",
    "log_format",
    "api_style",
];

impl From<FileConfig> for PartialConfig {
    fn from(file: FileConfig) -> Self {
        Self {
            system_prompt: file.system_prompt,
            model: file.model,
            temperature: file.temperature,
            log_enabled: file.log_enabled,
            log_retention_days: file.log_retention_days,
            log_format: file.log_format,
            api_style: file.api_style,
        }
    }
}

fn parse_config_json(content: &str) -> std::result::Result<PartialConfig, JsonLayerError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| JsonLayerError::Parse(e.to_string()))?;
    let Value::Object(map) = &value else {
        return Err(JsonLayerError::Parse("expected a JSON object".to_string()));
    };

    let file = FileConfig::deserialize(&value).map_err(|err| {
        JsonLayerError::Invalid(Error::validation(
            mistyped_field(map),
            ConfigSource::File,
            err.to_string(),
        ))
    })?;
    Ok(file.into())
}

/// The first known key whose value alone fails to deserialize.
fn mistyped_field(map: &Map<String, Value>) -> &'static str {
    FILE_FIELDS
        .iter()
        .copied()
        .find(|key| {
            map.get(*key).is_some_and(|value| {
                let single = Map::from_iter([(key.to_string(), value.clone())]);
                FileConfig::deserialize(&Value::Object(single)).is_err()
            })
        })
        .unwrap_or("config file")
}

fn parse_float(field: &'static str, raw: &str, src: ConfigSource) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::validation(field, src, format!("'{raw}' is not a number")))
}

fn parse_int(field: &'static str, raw: &str, src: ConfigSource) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::validation(field, src, format!("'{raw}' is not an integer")))
}

fn parse_bool(field: &'static str, raw: &str, src: ConfigSource) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::validation(
            field,
            src,
            format!("'{raw}' is not a boolean"),
        )),
    }
}

fn pick<T>(
    layers: &[ConfigLayer],
    get: impl Fn(&PartialConfig) -> Option<T>,
) -> Option<(T, ConfigSource)> {
    layers
        .iter()
        .find_map(|layer| get(&layer.values).map(|v| (v, layer.source)))
}

fn non_empty(field: &'static str, value: String, src: ConfigSource) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, src, "must not be empty"));
    }
    Ok(value)
}

fn temperature_in_range(value: f64, src: ConfigSource) -> Result<f64> {
    if !value.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&value) {
        return Err(Error::validation(
            "temperature",
            src,
            format!("{value} is outside {MIN_TEMPERATURE:.1}-{MAX_TEMPERATURE:.1}"),
        ));
    }
    Ok(value)
}

fn retention_days(value: i64, src: ConfigSource) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::validation("log_retention_days", src, "must be a non-negative integer"))
}

/// Merge layers (highest priority first) over the built-in defaults.
pub fn resolve(layers: &[ConfigLayer]) -> Result<EffectiveConfig> {
    let defaults = EffectiveConfig::default();

    let system_prompt = match pick(layers, |p| p.system_prompt.clone()) {
        Some((v, src)) => non_empty("system_prompt", v, src)?,
        None => defaults.system_prompt,
    };

    let model = match pick(layers, |p| p.model.clone()) {
        Some((v, src)) => non_empty("model", v.trim().to_string(), src)?,
        None => defaults.model,
    };

    let temperature = match pick(layers, |p| p.temperature) {
        Some((v, src)) => temperature_in_range(v, src)?,
        None => defaults.temperature,
    };

    let log_enabled = pick(layers, |p| p.log_enabled)
        .map(|(v, _)| v)
        .unwrap_or(defaults.log_enabled);

    let log_retention_days = match pick(layers, |p| p.log_retention_days) {
        Some((v, src)) => retention_days(v, src)?,
        None => defaults.log_retention_days,
    };

    let log_format = match pick(layers, |p| p.log_format.clone()) {
        Some((v, src)) => v
            .parse::<LogFormat>()
            .map_err(|reason| Error::validation("log_format", src, reason))?,
        None => defaults.log_format,
    };

    let api_style = match pick(layers, |p| p.api_style.clone()) {
        Some((v, src)) => v
            .parse::<ApiStyle>()
            .map_err(|reason| Error::validation("api_style", src, reason))?,
        None => defaults.api_style,
    };

    Ok(EffectiveConfig {
        system_prompt,
        model,
        temperature,
        log_enabled,
        log_retention_days,
        log_format,
        api_style,
    })
}

/// Build the effective configuration from command-line overrides, the
/// environment and the config file at `config_path`.
pub fn resolve_config(
    cli: PartialConfig,
    env: &Environment,
    config_path: &Path,
) -> Result<EffectiveConfig> {
    let mut layers = vec![ConfigLayer::cli(cli), ConfigLayer::from_env(env)?];
    if let Some(file) = ConfigLayer::from_file(config_path)? {
        layers.push(file);
    }

    let config = resolve(&layers)?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

/// Write the default configuration to `path` unless a file is already there.
/// Returns whether a file was written.
pub fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    ensure_parent_exists(path)?;
    let content = serde_json::to_string_pretty(&EffectiveConfig::default())?;
    fs::write(path, content + "\n")?;
    Ok(true)
}
