//! Query targets for the Grafana-Zabbix datasource plugin
//!
//! The plugin switches between query modes; each mode reads a different
//! subset of the target's fields and the remaining mode-specific fields must
//! not be sent at all.

use serde::Deserialize;
use serde_json::{Value, json};

use super::ToDocument;

/// Query mode of a Zabbix target, sent as its integer code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Metrics,
    Services,
    Text,
}

impl QueryMode {
    pub fn code(self) -> u8 {
        match self {
            QueryMode::Metrics => 0,
            QueryMode::Services => 1,
            QueryMode::Text => 2,
        }
    }
}

/// Availability figure reported for an IT service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaProperty {
    #[default]
    Status,
    Sla,
    OkTime,
    ProblemTime,
    DownTime,
}

impl ToDocument for SlaProperty {
    fn to_document(&self) -> Value {
        let (name, property) = match self {
            SlaProperty::Status => ("Status", "status"),
            SlaProperty::Sla => ("SLA", "sla"),
            SlaProperty::OkTime => ("OK time", "okTime"),
            SlaProperty::ProblemTime => ("Problem time", "problemTime"),
            SlaProperty::DownTime => ("Down time", "downtimeTime"),
        };
        json!({ "name": name, "property": property })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ZabbixTargetOptions {
    pub show_disabled_items: bool,
}

/// A Zabbix query
///
/// `application`, `group`, `host` and `item` are filters (regular expressions
/// allowed); `functions` are passed through to the plugin as given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZabbixTarget {
    pub application: String,
    pub expr: String,
    pub functions: Vec<Value>,
    pub group: String,
    pub host: String,
    pub interval_factor: u32,
    pub item: String,
    pub it_service: String,
    pub mode: QueryMode,
    pub options: ZabbixTargetOptions,
    pub ref_id: String,
    pub sla_property: SlaProperty,
    pub text_filter: String,
    pub use_capture_groups: bool,
    pub result_format: String,
}

impl Default for ZabbixTarget {
    fn default() -> Self {
        Self {
            application: String::new(),
            expr: String::new(),
            functions: Vec::new(),
            group: String::new(),
            host: String::new(),
            interval_factor: 2,
            item: String::new(),
            it_service: String::new(),
            mode: QueryMode::Metrics,
            options: ZabbixTargetOptions::default(),
            ref_id: "A".to_string(),
            sla_property: SlaProperty::Status,
            text_filter: String::new(),
            use_capture_groups: false,
            result_format: String::new(),
        }
    }
}

impl ZabbixTarget {
    /// Metrics query for an item of a host in a group
    pub fn metrics(group: impl Into<String>, host: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            host: host.into(),
            item: item.into(),
            ..Self::default()
        }
    }
}

fn filter(value: &str) -> Value {
    json!({ "filter": value })
}

impl ToDocument for ZabbixTarget {
    fn to_document(&self) -> Value {
        let mut doc = json!({
            "application": filter(&self.application),
            "expr": self.expr,
            "functions": self.functions,
            "group": filter(&self.group),
            "host": filter(&self.host),
            "intervalFactor": self.interval_factor,
            "item": filter(&self.item),
            "mode": self.mode.code(),
            "options": { "showDisabledItems": self.options.show_disabled_items },
            "refId": self.ref_id,
            "resultFormat": self.result_format,
        });

        match self.mode {
            QueryMode::Services => {
                doc["slaProperty"] = self.sla_property.to_document();
                doc["itservice"] = json!({ "name": self.it_service });
            }
            QueryMode::Text => {
                doc["textFilter"] = json!(self.text_filter);
                doc["useCaptureGroups"] = json!(self.use_capture_groups);
            }
            QueryMode::Metrics => {}
        }

        doc
    }
}
