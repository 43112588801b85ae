//! Alert rules and their classic conditions
//!
//! A rule is evaluated by the remote rule engine in two fixed stages: stage
//! `A` runs the query against the datasource over the last five minutes,
//! stage `B` applies the classic conditions to A's output. Only the query and
//! the conditions vary between rules.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::target::Target;
use super::{ToDocument, require_non_empty};
use crate::error::ValidationError;
use crate::identifier::RuleUid;

/// Maximum length of a rendered rule title, id prefix included
pub const MAX_TITLE_LENGTH: usize = 190;

/// Lookback of the query stage in seconds
const QUERY_LOOKBACK_SECS: u64 = 300;

/// Datasource uid the remote uses for server-side expressions
const EXPRESSION_DATASOURCE_UID: &str = "-100";

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[smhd]$").expect("duration pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorType {
    Gt,
    Lt,
    WithinRange,
    OutsideRange,
    NoValue,
}

/// Threshold test applied to the reduced value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Evaluator {
    #[serde(rename = "type")]
    pub kind: EvaluatorType,
    #[serde(default)]
    pub params: Vec<f64>,
}

impl Evaluator {
    pub fn greater_than(value: f64) -> Self {
        Self {
            kind: EvaluatorType::Gt,
            params: vec![value],
        }
    }

    pub fn lower_than(value: f64) -> Self {
        Self {
            kind: EvaluatorType::Lt,
            params: vec![value],
        }
    }

    pub fn within_range(low: f64, high: f64) -> Self {
        Self {
            kind: EvaluatorType::WithinRange,
            params: vec![low, high],
        }
    }

    pub fn outside_range(low: f64, high: f64) -> Self {
        Self {
            kind: EvaluatorType::OutsideRange,
            params: vec![low, high],
        }
    }

    pub fn no_value() -> Self {
        Self {
            kind: EvaluatorType::NoValue,
            params: Vec::new(),
        }
    }
}

impl ToDocument for Evaluator {
    fn to_document(&self) -> Value {
        json!({ "type": self.kind, "params": self.params })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    #[default]
    Avg,
    Min,
    Max,
    Sum,
    Count,
    Last,
    Median,
    Diff,
    CountNonNull,
    PercentDiff,
}

/// One classic condition over a query target
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCondition {
    ref_id: String,
    evaluator: Evaluator,
    operator: Operator,
    reducer: Reducer,
}

impl AlertCondition {
    /// Build a condition; the target must carry a reference id
    pub fn new(
        target: &Target,
        evaluator: Evaluator,
        operator: Operator,
        reducer: Reducer,
    ) -> Result<Self, ValidationError> {
        let ref_id = target.ref_id();
        if ref_id.trim().is_empty() {
            return Err(ValidationError::InvalidTarget(
                "target has no reference id".to_string(),
            ));
        }
        Ok(Self {
            ref_id: ref_id.to_string(),
            evaluator,
            operator,
            reducer,
        })
    }

    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }
}

impl ToDocument for AlertCondition {
    fn to_document(&self) -> Value {
        json!({
            "evaluator": self.evaluator.to_document(),
            "operator": { "type": self.operator },
            "query": { "params": [self.ref_id] },
            "reducer": { "type": self.reducer }
        })
    }
}

/// A server-evaluated alert rule
///
/// The rule's uid is assigned on first access when none was given and stays
/// fixed afterwards. Routes and dashboards refer to the rule by that uid.
/// Cloning assigns the uid first, so a clone always names the same rule.
#[derive(Debug, Clone)]
pub struct AlertRule {
    uid: RuleUid,
    title: String,
    folder_uid: String,
    datasource_uid: String,
    message: String,
    dashboard_uid: Option<String>,
    panel_id: Option<String>,
    for_interval: String,
    target: Target,
    conditions: Vec<AlertCondition>,
    openshift_url: Option<String>,
    kibana_url: Option<String>,
    fix_guide_url: Option<String>,
}

impl AlertRule {
    pub fn builder(
        title: impl Into<String>,
        folder_uid: impl Into<String>,
        datasource_uid: impl Into<String>,
        target: impl Into<Target>,
    ) -> AlertRuleBuilder {
        AlertRuleBuilder {
            uid: None,
            title: title.into(),
            folder_uid: folder_uid.into(),
            datasource_uid: datasource_uid.into(),
            message: String::new(),
            dashboard_uid: None,
            panel_id: None,
            for_interval: "5m".to_string(),
            target: target.into(),
            conditions: Vec::new(),
            openshift_url: None,
            kibana_url: None,
            fix_guide_url: None,
        }
    }

    /// The rule's uid, generated and stored on first call if absent
    pub fn uid(&self) -> &str {
        self.uid.get_or_assign()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn folder_uid(&self) -> &str {
        &self.folder_uid
    }

    pub fn dashboard_uid(&self) -> Option<&str> {
        self.dashboard_uid.as_deref()
    }

    /// Title as sent to the remote: `[uid] title`, cut to the maximum length
    ///
    /// Uids are at most [`crate::identifier::MAX_UID_LENGTH`] characters, so cutting from the
    /// end only ever drops characters of the title itself.
    pub fn rendered_title(&self) -> String {
        format!("[{}] {}", self.uid(), self.title)
            .chars()
            .take(MAX_TITLE_LENGTH)
            .collect()
    }

    fn annotations(&self) -> Value {
        let mut annotations = json!({ "message": self.message });
        if let Some(dashboard_uid) = &self.dashboard_uid {
            annotations["__dashboardUid__"] = json!(dashboard_uid);
        }
        if let Some(panel_id) = &self.panel_id {
            annotations["__panelId__"] = json!(panel_id);
        }
        let links = [
            ("openshift_url", &self.openshift_url),
            ("kibana_url", &self.kibana_url),
            ("fix_guide_url", &self.fix_guide_url),
        ];
        for (key, value) in links {
            if let Some(value) = value {
                annotations[key] = json!(value);
            }
        }
        annotations
    }

    fn labels(&self) -> Value {
        let mut labels = json!({ "rule_uid": self.uid() });
        if let Some(dashboard_uid) = &self.dashboard_uid {
            labels["dashboard_uid"] = json!(dashboard_uid);
        }
        labels
    }
}

impl ToDocument for AlertRule {
    fn to_document(&self) -> Value {
        json!({
            "uid": self.uid(),
            "orgID": 1,
            "folderUID": self.folder_uid,
            "ruleGroup": format!("group-{}", self.folder_uid),
            "title": self.rendered_title(),
            "condition": "B",
            "data": [
                {
                    "refId": "A",
                    "queryType": "",
                    "relativeTimeRange": { "from": QUERY_LOOKBACK_SECS, "to": 0 },
                    "datasourceUid": self.datasource_uid,
                    "model": self.target.to_document()
                },
                {
                    "refId": "B",
                    "queryType": "",
                    "relativeTimeRange": { "from": 0, "to": 0 },
                    "datasourceUid": EXPRESSION_DATASOURCE_UID,
                    "model": {
                        "conditions": self.conditions.to_document(),
                        "expression": "A",
                        "intervalMs": 1000,
                        "maxDataPoints": 43200,
                        "refId": "B",
                        "type": "classic_conditions"
                    }
                }
            ],
            "noDataState": "Alerting",
            "execErrState": "Alerting",
            "for": self.for_interval,
            "annotations": self.annotations(),
            "labels": self.labels()
        })
    }
}

/// Collects the fields of an [`AlertRule`] and validates them in `build`
#[derive(Debug, Clone)]
pub struct AlertRuleBuilder {
    uid: Option<String>,
    title: String,
    folder_uid: String,
    datasource_uid: String,
    message: String,
    dashboard_uid: Option<String>,
    panel_id: Option<String>,
    for_interval: String,
    target: Target,
    conditions: Vec<AlertCondition>,
    openshift_url: Option<String>,
    kibana_url: Option<String>,
    fix_guide_url: Option<String>,
}

impl AlertRuleBuilder {
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Back-reference to the panel the rule belongs to (annotation only)
    pub fn dashboard(mut self, dashboard_uid: impl Into<String>, panel_id: Option<String>) -> Self {
        self.dashboard_uid = Some(dashboard_uid.into());
        self.panel_id = panel_id;
        self
    }

    pub fn for_interval(mut self, for_interval: impl Into<String>) -> Self {
        self.for_interval = for_interval.into();
        self
    }

    pub fn condition(mut self, condition: AlertCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(mut self, conditions: impl IntoIterator<Item = AlertCondition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn openshift_url(mut self, url: Option<String>) -> Self {
        self.openshift_url = url;
        self
    }

    pub fn kibana_url(mut self, url: Option<String>) -> Self {
        self.kibana_url = url;
        self
    }

    pub fn fix_guide_url(mut self, url: Option<String>) -> Self {
        self.fix_guide_url = url;
        self
    }

    pub fn build(self) -> Result<AlertRule, ValidationError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("folderUid", &self.folder_uid)?;
        require_non_empty("datasourceUid", &self.datasource_uid)?;
        if self.conditions.is_empty() {
            return Err(ValidationError::EmptyField("conditions"));
        }
        if self.target.ref_id().trim().is_empty() {
            return Err(ValidationError::InvalidTarget(
                "target has no reference id".to_string(),
            ));
        }
        if !DURATION.is_match(&self.for_interval) {
            return Err(ValidationError::InvalidDuration(self.for_interval));
        }
        if let Some(dashboard_uid) = &self.dashboard_uid {
            require_non_empty("dashboardUid", dashboard_uid)?;
        }
        let uid = match self.uid {
            Some(uid) => RuleUid::explicit(uid)?,
            None => RuleUid::unassigned(),
        };

        Ok(AlertRule {
            uid,
            title: self.title,
            folder_uid: self.folder_uid,
            datasource_uid: self.datasource_uid,
            message: self.message,
            dashboard_uid: self.dashboard_uid,
            panel_id: self.panel_id,
            for_interval: self.for_interval,
            target: self.target,
            conditions: self.conditions,
            openshift_url: self.openshift_url,
            kibana_url: self.kibana_url,
            fix_guide_url: self.fix_guide_url,
        })
    }
}
