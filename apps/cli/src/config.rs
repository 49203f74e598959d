use std::time::Duration;

use thiserror::Error;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Invalid {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sam_url: String,
    pub wsm_url: String,
    pub access_token: String,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub invite_requires_admin: bool,
    pub spend_profile: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let sam_url = base_url(&var, "TERRA_SAM_URL")?;
        let wsm_url = base_url(&var, "TERRA_WSM_URL")?;
        let access_token =
            var("TERRA_ACCESS_TOKEN").ok_or(ConfigError::Missing("TERRA_ACCESS_TOKEN"))?;

        let timeout_ms = match var("TERRA_REQUEST_TIMEOUT_MS") {
            None => DEFAULT_REQUEST_TIMEOUT_MS,
            Some(value) => match value.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TERRA_REQUEST_TIMEOUT_MS",
                        value,
                        reason: "expected a positive number of milliseconds",
                    })
                }
            },
        };

        let log_format = match var("TERRA_LOG_FORMAT") {
            None => LogFormat::Text,
            Some(value) if value.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(value) => {
                return Err(ConfigError::Invalid {
                    name: "TERRA_LOG_FORMAT",
                    value,
                    reason: "expected text or json",
                })
            }
        };

        let invite_requires_admin = match var("TERRA_SAM_INVITE_REQUIRES_ADMIN") {
            None => false,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "TERRA_SAM_INVITE_REQUIRES_ADMIN",
                value,
                reason: "expected true or false",
            })?,
        };

        Ok(Self {
            sam_url,
            wsm_url,
            access_token,
            request_timeout: Duration::from_millis(timeout_ms),
            log_format,
            invite_requires_admin,
            spend_profile: var("TERRA_WSM_SPEND_PROFILE"),
        })
    }
}

fn base_url<F>(var: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let value = var(name).ok_or(ConfigError::Missing(name))?;
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected an http(s) URL",
        });
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
