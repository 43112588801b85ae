//! Dashboard panels
//!
//! A dashboard holds a tree of panels: rows group child panels, every other
//! panel is a leaf. Each variant renders an object whose `type` field names
//! the visualization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::mapping::ValueMapping;
use super::target::Target;
use super::transform::{TableOverride, Transformation};
use super::{DataSourceRef, GridPos, ToDocument};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Panel {
    Row(RowPanel),
    Stat(StatPanel),
    Table(TablePanel),
}

impl Panel {
    /// Largest explicit id in this panel's subtree
    pub(crate) fn max_id(&self) -> u64 {
        match self {
            Panel::Row(row) => row
                .panels
                .iter()
                .map(Panel::max_id)
                .chain(row.id.map(u64::from))
                .max()
                .unwrap_or(0),
            Panel::Stat(stat) => stat.common.id.map_or(0, u64::from),
            Panel::Table(table) => table.common.id.map_or(0, u64::from),
        }
    }

    /// Render, giving panels without an explicit id the next free one
    ///
    /// Assigned ids are counted in `u64`, above every explicit `u32` id.
    pub(crate) fn render(&self, next_id: &mut u64) -> Value {
        let mut assign = |explicit: Option<u32>| {
            explicit.map(u64::from).unwrap_or_else(|| {
                let id = *next_id;
                *next_id += 1;
                id
            })
        };

        match self {
            Panel::Row(row) => {
                let id = assign(row.id);
                let children: Vec<Value> = row.panels.iter().map(|p| p.render(next_id)).collect();
                json!({
                    "id": id,
                    "collapsed": row.collapsed,
                    "gridPos": row.grid_pos.to_document(),
                    "panels": children,
                    "title": row.title,
                    "type": "row"
                })
            }
            Panel::Stat(stat) => {
                let id = assign(stat.common.id);
                stat.render(id)
            }
            Panel::Table(table) => {
                let id = assign(table.common.id);
                table.render(id)
            }
        }
    }
}

impl ToDocument for Panel {
    fn to_document(&self) -> Value {
        let mut next_id = self.max_id() + 1;
        self.render(&mut next_id)
    }
}

impl From<RowPanel> for Panel {
    fn from(panel: RowPanel) -> Self {
        Panel::Row(panel)
    }
}

impl From<StatPanel> for Panel {
    fn from(panel: StatPanel) -> Self {
        Panel::Stat(panel)
    }
}

impl From<TablePanel> for Panel {
    fn from(panel: TablePanel) -> Self {
        Panel::Table(panel)
    }
}

/// Fields shared by every leaf panel
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PanelCommon {
    pub id: Option<u32>,
    pub title: String,
    pub description: String,
    pub datasource: Option<DataSourceRef>,
    pub grid_pos: Option<GridPos>,
    pub targets: Vec<Target>,
    pub transparent: bool,
    pub transformations: Vec<Transformation>,
}

impl PanelCommon {
    fn document(&self, id: u64, kind: &str) -> Map<String, Value> {
        let doc = json!({
            "id": id,
            "type": kind,
            "title": self.title,
            "description": self.description,
            "datasource": self.datasource.to_document(),
            "gridPos": self.grid_pos.to_document(),
            "targets": self.targets.to_document(),
            "transparent": self.transparent,
            "transformations": self.transformations.to_document(),
        });
        match doc {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Collapsible group of panels
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RowPanel {
    pub title: String,
    pub collapsed: bool,
    pub panels: Vec<Panel>,
    pub grid_pos: Option<GridPos>,
    pub id: Option<u32>,
}

impl RowPanel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_panel(mut self, panel: impl Into<Panel>) -> Self {
        self.panels.push(panel.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Value,
    Background,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    #[default]
    Area,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    #[default]
    Auto,
    Value,
    ValueAndName,
    Name,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JustifyMode {
    #[default]
    Auto,
    Center,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

/// Single-value display reduced from a series
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatPanel {
    #[serde(flatten)]
    pub common: PanelCommon,
    pub color_mode: ColorMode,
    pub graph_mode: GraphMode,
    pub text_mode: TextMode,
    pub justify_mode: JustifyMode,
    pub orientation: Orientation,
    pub reduce_calc: String,
    pub reduce_fields: String,
    pub decimals: Option<u32>,
    pub unit: String,
    pub no_value: Option<String>,
    pub color: Value,
    pub mappings: Vec<ValueMapping>,
    pub overrides: Vec<TableOverride>,
}

impl Default for StatPanel {
    fn default() -> Self {
        Self {
            common: PanelCommon::default(),
            color_mode: ColorMode::Value,
            graph_mode: GraphMode::Area,
            text_mode: TextMode::Auto,
            justify_mode: JustifyMode::Auto,
            orientation: Orientation::Auto,
            reduce_calc: "mean".to_string(),
            reduce_fields: String::new(),
            decimals: None,
            unit: "none".to_string(),
            no_value: None,
            color: json!({ "mode": "fixed", "fixedColor": "rgb(151, 31, 193)" }),
            mappings: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

impl StatPanel {
    pub fn new(title: impl Into<String>) -> Self {
        let mut panel = Self::default();
        panel.common.title = title.into();
        panel
    }

    pub fn with_target(mut self, target: impl Into<Target>) -> Self {
        self.common.targets.push(target.into());
        self
    }

    pub fn with_mapping(mut self, mapping: ValueMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    fn render(&self, id: u64) -> Value {
        let mut doc = self.common.document(id, "stat");
        doc.insert(
            "fieldConfig".to_string(),
            json!({
                "defaults": {
                    "custom": {},
                    "decimals": self.decimals,
                    "mappings": self.mappings.to_document(),
                    "unit": self.unit,
                    "noValue": self.no_value,
                    "color": self.color
                },
                "overrides": self.overrides.to_document()
            }),
        );
        // reduceOptions.values is always false: one computed value, not one per row
        doc.insert(
            "options".to_string(),
            json!({
                "textMode": self.text_mode,
                "colorMode": self.color_mode,
                "graphMode": self.graph_mode,
                "justifyMode": self.justify_mode,
                "orientation": self.orientation,
                "reduceOptions": {
                    "calcs": [self.reduce_calc],
                    "fields": self.reduce_fields,
                    "values": false
                }
            }),
        );
        Value::Object(doc)
    }
}

/// Tabular view, usually combined with transformations and overrides
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TablePanel {
    #[serde(flatten)]
    pub common: PanelCommon,
    pub unit: String,
    pub show_header: bool,
    pub overrides: Vec<TableOverride>,
}

impl Default for TablePanel {
    fn default() -> Self {
        Self {
            common: PanelCommon::default(),
            unit: "none".to_string(),
            show_header: true,
            overrides: Vec::new(),
        }
    }
}

impl TablePanel {
    pub fn new(title: impl Into<String>) -> Self {
        let mut panel = Self::default();
        panel.common.title = title.into();
        panel
    }

    fn render(&self, id: u64) -> Value {
        let mut doc = self.common.document(id, "table");
        doc.insert(
            "fieldConfig".to_string(),
            json!({
                "defaults": {
                    "custom": { "align": "auto" },
                    "mappings": [],
                    "unit": self.unit
                },
                "overrides": self.overrides.to_document()
            }),
        );
        doc.insert(
            "options".to_string(),
            json!({ "showHeader": self.show_header }),
        );
        Value::Object(doc)
    }
}
