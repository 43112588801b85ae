//! Value mappings of stat panels

use serde::Deserialize;
use serde_json::{Value, json};

use super::ToDocument;

/// A rule translating a field value into display text and color
///
/// All variants render into the same `mappings` list, distinguished by the
/// `type` discriminator. `index` orders the rules in the remote UI; `None`
/// leaves them unordered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueMapping {
    /// Exact match on a value
    Value {
        value: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        color: String,
        #[serde(default)]
        index: Option<u32>,
    },

    /// Inclusive numeric range
    Range {
        from: i64,
        to: i64,
        #[serde(default)]
        text: String,
        #[serde(default)]
        color: String,
        #[serde(default)]
        index: Option<u32>,
    },

    /// Special values such as `null`, `nan` or `empty`
    Special {
        #[serde(rename = "match")]
        match_value: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        color: String,
        #[serde(default)]
        index: Option<u32>,
    },
}

impl ValueMapping {
    pub fn value(value: impl Into<String>, text: impl Into<String>, color: impl Into<String>) -> Self {
        ValueMapping::Value {
            value: value.into(),
            text: text.into(),
            color: color.into(),
            index: None,
        }
    }

    pub fn range(from: i64, to: i64, text: impl Into<String>, color: impl Into<String>) -> Self {
        ValueMapping::Range {
            from,
            to,
            text: text.into(),
            color: color.into(),
            index: None,
        }
    }

    pub fn special(
        match_value: impl Into<String>,
        text: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        ValueMapping::Special {
            match_value: match_value.into(),
            text: text.into(),
            color: color.into(),
            index: None,
        }
    }

    /// Set the ordering index
    pub fn with_index(mut self, new_index: u32) -> Self {
        match &mut self {
            ValueMapping::Value { index, .. }
            | ValueMapping::Range { index, .. }
            | ValueMapping::Special { index, .. } => *index = Some(new_index),
        }
        self
    }
}

fn mapping_result(text: &str, color: &str, index: Option<u32>) -> Value {
    json!({ "text": text, "color": color, "index": index })
}

impl ToDocument for ValueMapping {
    fn to_document(&self) -> Value {
        match self {
            ValueMapping::Value {
                value,
                text,
                color,
                index,
            } => {
                let mut options = serde_json::Map::new();
                options.insert(value.clone(), mapping_result(text, color, *index));
                json!({ "type": "value", "options": options })
            }
            ValueMapping::Range {
                from,
                to,
                text,
                color,
                index,
            } => json!({
                "type": "range",
                "options": {
                    "from": from,
                    "to": to,
                    "result": mapping_result(text, color, *index)
                }
            }),
            ValueMapping::Special {
                match_value,
                text,
                color,
                index,
            } => json!({
                "type": "special",
                "options": {
                    "match": match_value,
                    "result": mapping_result(text, color, *index)
                }
            }),
        }
    }
}
