use crate::cli::RunArgs;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use stressburst::{EngineConfig, HttpMethod, MAX_CONCURRENCY};
use url::Url;

pub const DEFAULT_CONCURRENCY: u32 = 5;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub load: LoadSettings,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub url: Option<String>,
    pub method: Option<String>,
    pub body: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde::option")]
    pub connect_timeout: Option<Duration>,
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoadSettings {
    pub concurrency: Option<u32>,
    #[serde(default, with = "humantime_serde::option")]
    pub flush_interval: Option<Duration>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub url: String,
    pub method: HttpMethod,
    pub body: String,
    pub concurrency: u32,
    pub engine: EngineConfig,
}

pub fn load_config(path: &Path) -> Result<TomlConfig, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    let content = interpolate_env_vars(&content)?;

    toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
}

/// Expands `${VAR}` and `${VAR:-default}` references. Comment lines are
/// left untouched.
fn interpolate_env_vars(content: &str) -> Result<String, String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| format!("Invalid interpolation pattern: {}", e))?;
    let mut result = String::with_capacity(content.len());

    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut expanded = line.to_string();
        for cap in re.captures_iter(line) {
            let (Some(full_match), Some(var_expr)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = resolve_var(var_expr.as_str())?;
            expanded = expanded.replace(full_match.as_str(), &value);
        }
        result.push_str(&expanded);
    }

    Ok(result)
}

fn resolve_var(var_expr: &str) -> Result<String, String> {
    let (var_name, default) = match var_expr.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (var_expr, None),
    };

    match std::env::var(var_name) {
        Ok(v) => Ok(v),
        Err(_) => match default {
            Some(d) => Ok(d.to_string()),
            None => Err(format!("Environment variable '{}' not set", var_name)),
        },
    }
}

/// Combines CLI arguments with an optional config file; CLI values win.
pub fn merge_config(args: &RunArgs, toml: Option<TomlConfig>) -> Result<LoadConfig, String> {
    let toml = toml.unwrap_or_default();
    let defaults = EngineConfig::default();

    let url = args
        .url
        .clone()
        .or(toml.target.url)
        .ok_or("URL is required. Provide via argument or config file.")?;
    validate_url(&url)?;

    let method: HttpMethod = args
        .method
        .as_deref()
        .or(toml.target.method.as_deref())
        .unwrap_or("GET")
        .parse()?;

    let body = match &args.body_file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read body file '{}': {}", path.display(), e))?,
        None => args.body.clone().or(toml.target.body).unwrap_or_default(),
    };

    let concurrency = args
        .concurrency
        .or(toml.load.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
        return Err(format!(
            "Concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, concurrency
        ));
    }

    let flush_interval = toml.load.flush_interval.unwrap_or(defaults.flush_interval);
    if flush_interval.is_zero() {
        return Err("flush_interval must be greater than zero".to_string());
    }

    let engine = EngineConfig {
        timeout: args
            .timeout
            .or(toml.target.timeout)
            .unwrap_or(defaults.timeout),
        connect_timeout: args
            .connect_timeout
            .or(toml.target.connect_timeout)
            .unwrap_or(defaults.connect_timeout),
        insecure: args.insecure || toml.target.insecure,
        flush_interval,
    };

    Ok(LoadConfig {
        url,
        method,
        body,
        concurrency,
        engine,
    })
}

fn validate_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid URL '{}': {}", url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "Unsupported URL scheme '{}' (expected http or https)",
            scheme
        )),
    }
}
