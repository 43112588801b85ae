//! Typed resources and their canonical JSON documents
//!
//! Every resource renders itself with [`ToDocument`]. Rendering is a pure
//! function of the resource's fields and never fails; all invariants are
//! checked when the resource is built.
//!
//! Types without invariants keep public fields, implement `Default` and can
//! be read from a plan file. Types with invariants (dashboards, alert rules,
//! conditions, routes) are only constructible through validating
//! constructors.

pub mod alert;
pub mod dashboard;
pub mod datasource;
pub mod mapping;
pub mod panel;
pub mod policy;
pub mod target;
pub mod transform;
pub mod zabbix;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ValidationError;

pub use alert::{AlertCondition, AlertRule, AlertRuleBuilder, Evaluator, EvaluatorType, Operator, Reducer};
pub use dashboard::{DashboardDocument, DashboardWrapper};
pub use datasource::{ContactPoint, Datasource, Folder};
pub use mapping::ValueMapping;
pub use panel::{Panel, RowPanel, StatPanel, TablePanel};
pub use policy::{NotificationPolicyRoute, PolicyTree};
pub use target::{PrometheusTarget, Target};
pub use transform::{TableOverride, Transformation, TransformationField};
pub use zabbix::{QueryMode, SlaProperty, ZabbixTarget};

/// A resource that renders to a JSON document for the remote API
pub trait ToDocument {
    fn to_document(&self) -> Value;
}

impl<T: ToDocument> ToDocument for [T] {
    fn to_document(&self) -> Value {
        Value::Array(self.iter().map(ToDocument::to_document).collect())
    }
}

impl<T: ToDocument> ToDocument for Vec<T> {
    fn to_document(&self) -> Value {
        self.as_slice().to_document()
    }
}

impl<T: ToDocument> ToDocument for Option<T> {
    fn to_document(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToDocument::to_document)
    }
}

/// Render a document with sorted keys and two-space indentation
///
/// Identical input yields byte-identical output, which keeps re-publishing
/// idempotent and generated files diffable.
pub fn to_canonical_json(document: &Value) -> String {
    let mut document = document.clone();
    document.sort_all_objects();
    format!("{document:#}")
}

/// Position of a panel on the dashboard grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridPos {
    pub h: u32,
    pub w: u32,
    pub x: u32,
    pub y: u32,
}

impl ToDocument for GridPos {
    fn to_document(&self) -> Value {
        json!({ "h": self.h, "w": self.w, "x": self.x, "y": self.y })
    }
}

/// Reference to a configured datasource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataSourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
}

impl ToDocument for DataSourceRef {
    fn to_document(&self) -> Value {
        json!({ "type": self.kind, "uid": self.uid })
    }
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}
