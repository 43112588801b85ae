//! Provisioning plans read from JSON files
//!
//! A plan names one dashboard and the alert rules that watch its panels.
//! Identifiers that only exist remotely (folder by title, default Zabbix
//! datasource, the dashboard uid the remote assigns) are resolved when the
//! plan is provisioned.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::error::ValidationError;
use crate::model::{
    AlertCondition, AlertRule, DashboardDocument, DashboardWrapper, Evaluator, Operator, Panel,
    Reducer, Target, ToDocument,
};

/// Stand-in for identifiers only known once the plan is provisioned
const UNRESOLVED: &str = "unresolved";

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningPlan {
    #[serde(default)]
    pub folder_uid: Option<String>,
    #[serde(default)]
    pub folder_title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    pub dashboard: DashboardPlan,
    #[serde(default)]
    pub alerts: Vec<AlertPlan>,
}

fn default_overwrite() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardPlan {
    pub title: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub panels: Vec<Panel>,
}

impl DashboardPlan {
    pub fn build(&self) -> Result<DashboardDocument, ValidationError> {
        let mut dashboard = DashboardDocument::new(&self.title)?
            .with_tags(&self.tags)
            .with_panels(self.panels.iter().cloned());
        if let Some(uid) = &self.uid {
            dashboard = dashboard.with_uid(uid)?;
        }
        if let Some(refresh) = &self.refresh {
            dashboard = dashboard.with_refresh(refresh);
        }
        Ok(dashboard)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionPlan {
    pub evaluator: Evaluator,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub reducer: Reducer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertPlan {
    pub title: String,
    #[serde(default)]
    pub uid: Option<String>,
    /// Falls back to the first Zabbix datasource when absent
    #[serde(default)]
    pub datasource_uid: Option<String>,
    pub target: Target,
    pub conditions: Vec<ConditionPlan>,
    #[serde(rename = "for", default = "default_for")]
    pub for_interval: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub panel_id: Option<String>,
    /// Contact point to route this rule's alerts to, the root policy's
    /// receiver when absent
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub openshift_url: Option<String>,
    #[serde(default)]
    pub kibana_url: Option<String>,
    #[serde(default)]
    pub fix_guide_url: Option<String>,
}

fn default_for() -> String {
    "5m".to_string()
}

impl AlertPlan {
    pub fn conditions(&self) -> Result<Vec<AlertCondition>, ValidationError> {
        self.conditions
            .iter()
            .map(|c| AlertCondition::new(&self.target, c.evaluator.clone(), c.operator, c.reducer))
            .collect()
    }

    pub fn build(
        &self,
        folder_uid: &str,
        datasource_uid: &str,
        dashboard_uid: Option<&str>,
    ) -> Result<AlertRule, ValidationError> {
        let mut builder = AlertRule::builder(&self.title, folder_uid, datasource_uid, self.target.clone())
            .conditions(self.conditions()?)
            .message(&self.message)
            .for_interval(&self.for_interval)
            .openshift_url(self.openshift_url.clone())
            .kibana_url(self.kibana_url.clone())
            .fix_guide_url(self.fix_guide_url.clone());
        if let Some(uid) = &self.uid {
            builder = builder.uid(uid);
        }
        if let Some(dashboard_uid) = dashboard_uid {
            builder = builder.dashboard(dashboard_uid, self.panel_id.clone());
        }
        builder.build()
    }
}

impl ProvisioningPlan {
    /// Check everything that can be checked without the remote
    pub fn validate(&self) -> Result<(), ValidationError> {
        let folder_uid = self.folder_placeholder()?;
        self.dashboard.build()?;
        for alert in &self.alerts {
            let datasource_uid = alert.datasource_uid.as_deref().unwrap_or(UNRESOLVED);
            alert.build(folder_uid, datasource_uid, Some(UNRESOLVED))?;
            if let Some(receiver) = &alert.receiver
                && receiver.trim().is_empty()
            {
                return Err(ValidationError::EmptyField("receiver"));
            }
        }
        Ok(())
    }

    fn folder_placeholder(&self) -> Result<&str, ValidationError> {
        fn given(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.trim().is_empty())
        }
        match (given(&self.folder_uid), given(&self.folder_title)) {
            (Some(uid), _) => Ok(uid),
            (None, Some(_)) => Ok(UNRESOLVED),
            (None, None) => Err(ValidationError::MissingFolder),
        }
    }

    pub fn wrapper(&self, folder_uid: &str) -> Result<DashboardWrapper, ValidationError> {
        Ok(DashboardWrapper::new(self.dashboard.build()?, folder_uid)?
            .with_overwrite(self.overwrite)
            .with_message(&self.message))
    }

    /// Documents this plan would send, keyed by file name, without contacting the remote
    ///
    /// Offline rendering needs a folder uid and an explicit datasource uid on
    /// every alert. Alerts only reference the dashboard when its uid is fixed.
    pub fn render_documents(&self) -> Result<Vec<(String, Value)>, ValidationError> {
        let folder_uid = self
            .folder_uid
            .as_deref()
            .ok_or(ValidationError::MissingFolder)?;

        let mut documents = vec![("dashboard.json".to_string(), self.wrapper(folder_uid)?.to_document())];
        for alert in &self.alerts {
            let datasource_uid = alert
                .datasource_uid
                .as_deref()
                .ok_or(ValidationError::EmptyField("datasource_uid"))?;
            let rule = alert.build(folder_uid, datasource_uid, self.dashboard.uid.as_deref())?;
            documents.push((format!("alert-{}.json", rule.uid()), rule.to_document()));
        }
        Ok(documents)
    }
}

pub fn read_plan_file(path: &Path) -> anyhow::Result<ProvisioningPlan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file: {}", path.display()))?;
    let plan: ProvisioningPlan = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse plan file: {}", path.display()))?;
    plan.validate()
        .with_context(|| format!("invalid plan file: {}", path.display()))?;
    trace!("loaded plan: {plan:?}");
    Ok(plan)
}
