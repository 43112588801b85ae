//! Notification policy routes and the policy tree
//!
//! The remote stores all routes in one document. A route points at its
//! alert rule and dashboard only through its `object_matchers`; nothing on
//! the remote keeps those references valid.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ToDocument, require_non_empty};
use crate::error::ValidationError;

pub const RULE_UID_LABEL: &str = "rule_uid";
pub const DASHBOARD_UID_LABEL: &str = "dashboard_uid";

/// Routes alerts of one rule on one dashboard to a receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPolicyRoute {
    receiver: String,
    rule_uid: String,
    dashboard_uid: String,
}

impl NotificationPolicyRoute {
    pub fn new(
        receiver: impl Into<String>,
        rule_uid: impl Into<String>,
        dashboard_uid: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let route = Self {
            receiver: receiver.into(),
            rule_uid: rule_uid.into(),
            dashboard_uid: dashboard_uid.into(),
        };
        require_non_empty("receiver", &route.receiver)?;
        require_non_empty("rule_uid", &route.rule_uid)?;
        require_non_empty("dashboard_uid", &route.dashboard_uid)?;
        Ok(route)
    }

    pub fn rule_uid(&self) -> &str {
        &self.rule_uid
    }

    pub fn dashboard_uid(&self) -> &str {
        &self.dashboard_uid
    }
}

impl ToDocument for NotificationPolicyRoute {
    fn to_document(&self) -> Value {
        json!({
            "receiver": self.receiver,
            "object_matchers": [
                [RULE_UID_LABEL, "=", self.rule_uid],
                [DASHBOARD_UID_LABEL, "=", self.dashboard_uid]
            ]
        })
    }
}

/// Value of the first matcher on `label` in a raw route
pub fn matcher_value<'a>(route: &'a Value, label: &str) -> Option<&'a str> {
    route
        .get("object_matchers")?
        .as_array()?
        .iter()
        .filter_map(Value::as_array)
        .find(|matcher| matcher.first().and_then(Value::as_str) == Some(label))
        .and_then(|matcher| matcher.get(2))
        .and_then(Value::as_str)
}

/// The singleton notification policy document
///
/// Routes are kept as raw JSON so routes written by other tools survive a
/// read-modify-write unchanged, as does every other top-level key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PolicyTree {
    #[serde(default)]
    pub routes: Vec<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl PolicyTree {
    /// Receiver of the tree's root policy, the fallback for unmatched alerts
    pub fn root_receiver(&self) -> Option<&str> {
        self.rest
            .get("receiver")
            .and_then(Value::as_str)
            .filter(|receiver| !receiver.trim().is_empty())
    }

    pub fn append(&mut self, routes: &[NotificationPolicyRoute]) {
        self.routes.extend(routes.iter().map(ToDocument::to_document));
    }

    /// Remove the routes of a dashboard and return the rule uids they named
    ///
    /// Routes without a `rule_uid` matcher are removed as well; they have no
    /// rule to clean up.
    pub fn remove_dashboard_routes(&mut self, dashboard_uid: &str) -> Vec<String> {
        let (removed, kept): (Vec<Value>, Vec<Value>) = std::mem::take(&mut self.routes)
            .into_iter()
            .partition(|route| matcher_value(route, DASHBOARD_UID_LABEL) == Some(dashboard_uid));
        self.routes = kept;

        removed
            .iter()
            .filter_map(|route| matcher_value(route, RULE_UID_LABEL))
            .map(str::to_string)
            .collect()
    }
}

impl ToDocument for PolicyTree {
    fn to_document(&self) -> Value {
        let mut doc = self.rest.clone();
        doc.insert("routes".to_string(), Value::Array(self.routes.clone()));
        Value::Object(doc)
    }
}
