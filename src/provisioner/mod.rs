//! Provisioning orchestration
//!
//! Composes the typed client operations into the two workflows of this
//! crate: publishing a plan (dashboard, alert rules, notification routes) and
//! the cascade delete in [`cascade`].
//!
//! Neither workflow is atomic. A failed step aborts the remaining steps and
//! is reported with the action that failed; the remote keeps whatever was
//! written before.

pub mod cascade;

use tracing::{debug, info, instrument, warn};

use crate::error::{ProvisioningError, ProvisioningResult, ValidationError};
use crate::grafana::{DashboardSaved, GrafanaClient};
use crate::model::{AlertRule, DashboardWrapper, NotificationPolicyRoute};
use crate::plan::ProvisioningPlan;
use crate::remote::RemoteApi;

pub use cascade::{CascadeDelete, CascadeState};

/// Outcome of provisioning one plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub dashboard_uid: String,
    pub dashboard_url: String,
    pub rule_uids: Vec<String>,
    pub route_count: usize,
}

pub struct Provisioner<A> {
    client: GrafanaClient<A>,
}

impl<A: RemoteApi> Provisioner<A> {
    pub fn new(client: GrafanaClient<A>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GrafanaClient<A> {
        &self.client
    }

    pub async fn publish_dashboard(&self, wrapper: &DashboardWrapper) -> ProvisioningResult<DashboardSaved> {
        self.client.save_dashboard(wrapper).await
    }

    /// Register a rule under its own uid and return that uid
    pub async fn register_alert_rule(&self, rule: &AlertRule) -> ProvisioningResult<String> {
        self.client.add_alert_rule(rule).await
    }

    pub async fn link_routes(&self, routes: &[NotificationPolicyRoute]) -> ProvisioningResult<()> {
        self.client.add_notification_policy_routes(routes).await
    }

    /// Cascade-delete a dashboard from scratch
    pub async fn delete_dashboard_cascade(&self, dashboard_uid: &str) -> ProvisioningResult<()> {
        CascadeDelete::new(dashboard_uid)
            .run(&self.client, |_| {})
            .await
    }

    async fn resolve_folder(&self, plan: &ProvisioningPlan) -> ProvisioningResult<String> {
        if let Some(uid) = plan.folder_uid.as_deref().filter(|uid| !uid.trim().is_empty()) {
            return Ok(uid.to_string());
        }
        let Some(title) = plan.folder_title.as_deref() else {
            return Err(ValidationError::MissingFolder.into());
        };

        let folders = self.client.find_folders().await?;
        folders
            .into_iter()
            .find(|folder| folder.title == title)
            .map(|folder| folder.uid)
            .ok_or_else(|| ProvisioningError::Rejected {
                action: format!("resolve folder '{title}'"),
                status: 404,
                body: "no folder with this title".to_string(),
            })
    }

    /// Datasource uid per alert, in plan order
    async fn resolve_datasources(&self, plan: &ProvisioningPlan) -> ProvisioningResult<Vec<String>> {
        let mut default_uid: Option<String> = None;
        let mut resolved = Vec::with_capacity(plan.alerts.len());

        for alert in &plan.alerts {
            if let Some(uid) = &alert.datasource_uid {
                resolved.push(uid.clone());
                continue;
            }
            if default_uid.is_none() {
                let zabbix = self.client.find_zabbix_datasources().await?;
                let first = zabbix.into_iter().next().ok_or_else(|| ProvisioningError::Rejected {
                    action: format!("resolve datasource for alert '{}'", alert.title),
                    status: 404,
                    body: "no Zabbix datasource configured".to_string(),
                })?;
                info!("using Zabbix datasource '{}' ({})", first.name, first.uid);
                default_uid = Some(first.uid);
            }
            resolved.extend(default_uid.clone());
        }
        Ok(resolved)
    }

    /// Receiver per alert, in plan order
    ///
    /// Alerts without one fall back to the policy tree's root receiver, so
    /// every registered rule gets a route the cascade delete can find.
    async fn resolve_receivers(&self, plan: &ProvisioningPlan) -> ProvisioningResult<Vec<String>> {
        let mut root: Option<String> = None;
        let mut resolved = Vec::with_capacity(plan.alerts.len());

        for alert in &plan.alerts {
            if let Some(receiver) = &alert.receiver {
                resolved.push(receiver.clone());
                continue;
            }
            if root.is_none() {
                let tree = self.client.get_notification_policies().await?;
                let receiver = tree.root_receiver().ok_or_else(|| ProvisioningError::Rejected {
                    action: format!("resolve receiver for alert '{}'", alert.title),
                    status: 404,
                    body: "notification policy tree has no root receiver".to_string(),
                })?;
                debug!("alerts without a receiver route to '{receiver}'");
                root = Some(receiver.to_string());
            }
            resolved.extend(root.clone());
        }
        Ok(resolved)
    }

    /// Register a rule and link its route, removing the rule again when the
    /// route cannot be linked
    async fn register_and_link(
        &self,
        rule: &AlertRule,
        receiver: &str,
        dashboard_uid: &str,
    ) -> ProvisioningResult<String> {
        let uid = self.register_alert_rule(rule).await?;
        let route = NotificationPolicyRoute::new(receiver, &uid, dashboard_uid)?;

        if let Err(err) = self.link_routes(std::slice::from_ref(&route)).await {
            warn!("linking route for alert rule {uid} failed, removing the rule");
            if let Err(cleanup) = self.client.delete_alert_rule(&uid).await {
                warn!("alert rule {uid} is left without a route: {cleanup}");
            }
            return Err(err);
        }
        Ok(uid)
    }

    /// Publish a plan: dashboard first, then each alert rule with its route
    ///
    /// Every lookup happens before the first write, so a plan that cannot be
    /// resolved leaves the remote untouched. A rule is only kept once its
    /// route is linked.
    #[instrument(skip(self, plan), fields(dashboard = %plan.dashboard.title))]
    pub async fn provision(&self, plan: &ProvisioningPlan) -> ProvisioningResult<ProvisionReport> {
        let folder_uid = self.resolve_folder(plan).await?;
        let datasource_uids = self.resolve_datasources(plan).await?;
        let receivers = self.resolve_receivers(plan).await?;
        let wrapper = plan.wrapper(&folder_uid)?;

        let saved = self.publish_dashboard(&wrapper).await?;

        let mut rule_uids = Vec::with_capacity(plan.alerts.len());
        for ((alert, datasource_uid), receiver) in plan.alerts.iter().zip(&datasource_uids).zip(&receivers) {
            let rule = alert.build(&folder_uid, datasource_uid, Some(&saved.uid))?;
            rule_uids.push(self.register_and_link(&rule, receiver, &saved.uid).await?);
        }

        info!(
            "provisioned dashboard {} with {} alert rule(s)",
            saved.uid,
            rule_uids.len()
        );
        Ok(ProvisionReport {
            dashboard_uid: saved.uid,
            dashboard_url: saved.url,
            route_count: rule_uids.len(),
            rule_uids,
        })
    }
}
