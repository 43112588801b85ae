//! Table field overrides and data transformations

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::ToDocument;

/// Override a single field property for fields matching a matcher
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableOverride {
    pub matcher_id: String,
    pub matcher_options: String,
    pub property_id: String,
    pub property_value: Value,
}

impl TableOverride {
    /// Override a property of the field with the given name
    pub fn by_name(field: impl Into<String>, property_id: impl Into<String>, value: Value) -> Self {
        Self {
            matcher_id: "byName".to_string(),
            matcher_options: field.into(),
            property_id: property_id.into(),
            property_value: value,
        }
    }
}

impl ToDocument for TableOverride {
    fn to_document(&self) -> Value {
        json!({
            "matcher": { "id": self.matcher_id, "options": self.matcher_options },
            "properties": [ { "id": self.property_id, "value": self.property_value } ]
        })
    }
}

/// What a group-by transformation does with a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupByOperation {
    GroupBy,
    Aggregate,
}

impl GroupByOperation {
    fn as_str(self) -> &'static str {
        match self {
            GroupByOperation::GroupBy => "groupby",
            GroupByOperation::Aggregate => "aggregate",
        }
    }
}

/// Per-field settings of a group-by transformation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformationField {
    pub name: String,
    #[serde(default)]
    pub operation: Option<GroupByOperation>,
    #[serde(default)]
    pub aggregations: Vec<String>,
}

impl TransformationField {
    pub fn group_by(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation: Some(GroupByOperation::GroupBy),
            aggregations: Vec::new(),
        }
    }

    pub fn aggregate<I, S>(name: impl Into<String>, aggregations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            operation: Some(GroupByOperation::Aggregate),
            aggregations: aggregations.into_iter().map(Into::into).collect(),
        }
    }
}

impl ToDocument for TransformationField {
    fn to_document(&self) -> Value {
        let mut doc = json!({ "aggregations": self.aggregations });
        if let Some(operation) = self.operation {
            doc["operation"] = json!(operation.as_str());
        }
        doc
    }
}

/// A data transformation applied to a panel's query results
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "id")]
pub enum Transformation {
    #[serde(rename = "groupBy")]
    GroupBy { fields: Vec<TransformationField> },

    /// Rename fields, old name to new name
    #[serde(rename = "organize")]
    Organize {
        #[serde(default)]
        rename: BTreeMap<String, String>,
    },
}

impl ToDocument for Transformation {
    fn to_document(&self) -> Value {
        match self {
            Transformation::GroupBy { fields } => {
                let fields: Map<String, Value> = fields
                    .iter()
                    .map(|field| (field.name.clone(), field.to_document()))
                    .collect();
                json!({ "id": "groupBy", "options": { "fields": fields } })
            }
            Transformation::Organize { rename } => json!({
                "id": "organize",
                "options": {
                    "excludeByName": {},
                    "indexByName": {},
                    "renameByName": rename
                }
            }),
        }
    }
}
