use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConfigError;

pub const GRAFANA_URL: &str = "GRAFANA_URL";

pub const GRAFANA_API_KEY: &str = "GRAFANA_API_KEY";

pub const GRAFANA_TIMEOUT_SECS: &str = "GRAFANA_TIMEOUT_SECS";

pub const GRAFANA_MAX_RETRIES: &str = "GRAFANA_MAX_RETRIES";

pub const DASHBOARD_UID: &str = "DASHBOARD_UID";

const DEFAULT_URL: &str = "http://localhost:3000";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_MAX_RETRIES: usize = 3;

pub fn get_default_url() -> String {
    DEFAULT_URL.to_string()
}

pub fn get_default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

pub fn get_default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

/// Read a variable that must be present and non-empty
pub fn require_var(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Parse an optional variable; present but unparsable is an error
pub fn parse_var<T>(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(name)
        .map(|value| {
            value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                key: name.to_string(),
                message: err.to_string(),
            })
        })
        .transpose()
}
