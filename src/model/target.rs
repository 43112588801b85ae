//! Datasource query targets

use serde::Deserialize;
use serde_json::{Value, json};

use super::ToDocument;
use super::zabbix::ZabbixTarget;

/// A query against one datasource
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Prometheus(PrometheusTarget),
    Zabbix(ZabbixTarget),
}

impl Target {
    /// Reference id other parts of a panel or rule address this query by
    pub fn ref_id(&self) -> &str {
        match self {
            Target::Prometheus(target) => &target.ref_id,
            Target::Zabbix(target) => &target.ref_id,
        }
    }
}

impl From<PrometheusTarget> for Target {
    fn from(target: PrometheusTarget) -> Self {
        Target::Prometheus(target)
    }
}

impl From<ZabbixTarget> for Target {
    fn from(target: ZabbixTarget) -> Self {
        Target::Zabbix(target)
    }
}

impl ToDocument for Target {
    fn to_document(&self) -> Value {
        match self {
            Target::Prometheus(target) => target.to_document(),
            Target::Zabbix(target) => target.to_document(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrometheusTarget {
    pub expression: String,
    #[serde(default = "default_ref_id")]
    pub ref_id: String,
    #[serde(default)]
    pub legend_format: String,
    #[serde(default)]
    pub interval: String,
}

fn default_ref_id() -> String {
    "A".to_string()
}

impl PrometheusTarget {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ref_id: default_ref_id(),
            legend_format: String::new(),
            interval: String::new(),
        }
    }
}

impl ToDocument for PrometheusTarget {
    fn to_document(&self) -> Value {
        json!({
            "expr": self.expression,
            "format": "time_series",
            "interval": self.interval,
            "intervalFactor": 2,
            "intervalMs": 1000,
            "legendFormat": self.legend_format,
            "maxDataPoints": 43200,
            "refId": self.ref_id,
            "step": 2
        })
    }
}
