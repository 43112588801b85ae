use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::trace;

use crate::error::ConfigError;
use crate::model::datasource::ZABBIX_DATASOURCE_TYPE;
use crate::util::{
    GRAFANA_API_KEY, GRAFANA_MAX_RETRIES, GRAFANA_TIMEOUT_SECS, GRAFANA_URL, parse_var, require_var,
};

/// Settings read from the optional TOML file
///
/// Unknown keys are rejected, so an `api_key` entry fails to load; the key
/// only comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "crate::util::get_default_url")]
    pub grafana_url: String,
    #[serde(default = "crate::util::get_default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "crate::util::get_default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_zabbix_datasource_type")]
    pub zabbix_datasource_type: String,
}

fn default_zabbix_datasource_type() -> String {
    ZABBIX_DATASOURCE_TYPE.to_string()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            grafana_url: crate::util::get_default_url(),
            timeout_secs: crate::util::get_default_timeout_secs(),
            max_retries: crate::util::get_default_max_retries(),
            zabbix_datasource_type: default_zabbix_datasource_type(),
        }
    }
}

impl FileConfig {
    /// Load from `path`, else from the default location if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).or_else(default_config_path);

        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let file_error = |message: String| ConfigError::File {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(&path).map_err(|err| file_error(err.to_string()))?;
        toml::from_str(&content).map_err(|err| file_error(err.to_string()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("grafana-provisioner/config.toml");
    path.exists().then_some(path)
}

/// Settings of one provisioning process
#[derive(Clone)]
pub struct ProvisionerConfig {
    pub grafana_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub zabbix_datasource_type: String,
}

impl std::fmt::Debug for ProvisionerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionerConfig")
            .field("grafana_url", &self.grafana_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("zabbix_datasource_type", &self.zabbix_datasource_type)
            .finish()
    }
}

impl ProvisionerConfig {
    /// Layer the process environment over the file settings
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = FileConfig::load(path)?;
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Layer variables from `lookup` over the file settings
    pub fn resolve(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = require_var(&lookup, GRAFANA_API_KEY)?;

        let grafana_url = lookup(GRAFANA_URL)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(file.grafana_url);
        if !grafana_url.starts_with("http://") && !grafana_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: GRAFANA_URL.to_string(),
                message: format!("'{grafana_url}' is not an http(s) URL"),
            });
        }

        let config = Self {
            grafana_url,
            api_key,
            timeout_secs: parse_var(&lookup, GRAFANA_TIMEOUT_SECS)?.unwrap_or(file.timeout_secs),
            max_retries: parse_var(&lookup, GRAFANA_MAX_RETRIES)?.unwrap_or(file.max_retries),
            zabbix_datasource_type: file.zabbix_datasource_type,
        };
        trace!("resolved config: {config:?}");
        Ok(config)
    }
}
