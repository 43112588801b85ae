//! Typed resource operations on top of a [`RemoteApi`]
//!
//! Every outbound body is rendered with [`to_canonical_json`], so two calls
//! with equal resources send byte-identical requests.

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::model::datasource::ZABBIX_DATASOURCE_TYPE;
use crate::model::{
    AlertRule, ContactPoint, DashboardWrapper, Datasource, Folder, NotificationPolicyRoute,
    PolicyTree, ToDocument, to_canonical_json,
};
use crate::remote::{RemoteApi, paths};

/// The remote's answer to a dashboard save
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardSaved {
    pub uid: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<u64>,
}

pub struct GrafanaClient<A> {
    api: A,
    zabbix_datasource_type: String,
    /// Serializes read-modify-writes of the policy tree within this process
    policy_lock: Mutex<()>,
}

impl<A: RemoteApi> GrafanaClient<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            zabbix_datasource_type: ZABBIX_DATASOURCE_TYPE.to_string(),
            policy_lock: Mutex::new(()),
        }
    }

    pub fn with_zabbix_datasource_type(mut self, kind: impl Into<String>) -> Self {
        self.zabbix_datasource_type = kind.into();
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    #[instrument(skip(self, wrapper), fields(title = %wrapper.dashboard().title()))]
    pub async fn save_dashboard(&self, wrapper: &DashboardWrapper) -> ProvisioningResult<DashboardSaved> {
        let action = format!("save dashboard '{}'", wrapper.dashboard().title());
        let body = to_canonical_json(&wrapper.to_document());

        let saved: DashboardSaved = self
            .api
            .post(paths::DASHBOARDS_DB, body)
            .await?
            .require_success(&action)?
            .json(&action)?;

        info!("saved dashboard {} (version {:?})", saved.uid, saved.version);
        Ok(saved)
    }

    /// Delete a dashboard; an absent dashboard counts as deleted
    #[instrument(skip(self))]
    pub async fn delete_dashboard(&self, uid: &str) -> ProvisioningResult<()> {
        let response = self
            .api
            .delete(&format!("{}/{uid}", paths::DASHBOARDS_BY_UID))
            .await?;

        if response.is_not_found() {
            debug!("dashboard {uid} already absent");
            return Ok(());
        }
        response.require_success(&format!("delete dashboard {uid}"))?;
        info!("deleted dashboard {uid}");
        Ok(())
    }

    pub async fn find_datasources(&self) -> ProvisioningResult<Vec<Datasource>> {
        let action = "list datasources";
        self.api
            .get(paths::DATASOURCES)
            .await?
            .require_success(action)?
            .json(action)
    }

    /// Datasources of the configured Zabbix plugin type, in listing order
    pub async fn find_zabbix_datasources(&self) -> ProvisioningResult<Vec<Datasource>> {
        let datasources = self.find_datasources().await?;
        Ok(datasources
            .into_iter()
            .filter(|datasource| datasource.is_kind(&self.zabbix_datasource_type))
            .collect())
    }

    /// Register an alert rule and return its uid
    ///
    /// The uid is assigned before the request is built. A duplicate uid is
    /// left to the remote to reject. When the response is lost in transit,
    /// the rule is looked up by uid and counts as registered if present.
    #[instrument(skip(self, rule), fields(title = %rule.title()))]
    pub async fn add_alert_rule(&self, rule: &AlertRule) -> ProvisioningResult<String> {
        let uid = rule.uid().to_string();
        let action = format!("register alert rule {uid}");
        let body = to_canonical_json(&rule.to_document());

        match self.api.post(paths::ALERT_RULES, body).await {
            Ok(response) => {
                response.require_success(&action)?;
            }
            Err(err @ ProvisioningError::Transient { .. }) => {
                if !self.alert_rule_exists(&uid).await? {
                    return Err(err);
                }
                warn!("response to {action} was lost, the rule exists");
            }
            Err(err) => return Err(err),
        }

        info!("registered alert rule {uid}");
        Ok(uid)
    }

    pub async fn alert_rule_exists(&self, uid: &str) -> ProvisioningResult<bool> {
        let response = self.api.get(&format!("{}/{uid}", paths::ALERT_RULES)).await?;
        if response.is_not_found() {
            return Ok(false);
        }
        response.require_success(&format!("look up alert rule {uid}"))?;
        Ok(true)
    }

    /// Delete an alert rule; an absent rule counts as deleted
    #[instrument(skip(self))]
    pub async fn delete_alert_rule(&self, uid: &str) -> ProvisioningResult<()> {
        let response = self
            .api
            .delete(&format!("{}/{uid}", paths::ALERT_RULES))
            .await?;

        if response.is_not_found() {
            debug!("alert rule {uid} already absent");
            return Ok(());
        }
        response.require_success(&format!("delete alert rule {uid}"))?;
        info!("deleted alert rule {uid}");
        Ok(())
    }

    pub async fn get_notification_policies(&self) -> ProvisioningResult<PolicyTree> {
        let action = "read notification policies";
        self.api
            .get(paths::POLICIES)
            .await?
            .require_success(action)?
            .json(action)
    }

    pub async fn save_notification_policies(&self, tree: &PolicyTree) -> ProvisioningResult<()> {
        let body = to_canonical_json(&tree.to_document());
        self.api
            .put(paths::POLICIES, body)
            .await?
            .require_success("save notification policies")?;
        debug!("saved notification policies with {} route(s)", tree.routes.len());
        Ok(())
    }

    /// Append routes to the policy tree in one read-modify-write
    #[instrument(skip(self, routes), fields(count = routes.len()))]
    pub async fn add_notification_policy_routes(
        &self,
        routes: &[NotificationPolicyRoute],
    ) -> ProvisioningResult<()> {
        if routes.is_empty() {
            return Ok(());
        }
        let _guard = self.policy_lock.lock().await;

        let mut tree = self.get_notification_policies().await?;
        tree.append(routes);
        self.save_notification_policies(&tree).await?;

        info!("linked {} notification route(s)", routes.len());
        Ok(())
    }

    /// Remove every route of a dashboard and return the rule uids they named
    ///
    /// The tree is only written back when at least one route matched.
    #[instrument(skip(self))]
    pub async fn remove_dashboard_routes(&self, dashboard_uid: &str) -> ProvisioningResult<Vec<String>> {
        let _guard = self.policy_lock.lock().await;

        let mut tree = self.get_notification_policies().await?;
        let before = tree.routes.len();
        let rule_uids = tree.remove_dashboard_routes(dashboard_uid);
        let removed = before - tree.routes.len();

        if removed == 0 {
            debug!("no notification routes reference dashboard {dashboard_uid}");
            return Ok(rule_uids);
        }
        if rule_uids.len() < removed {
            warn!(
                "{} route(s) of dashboard {dashboard_uid} name no alert rule",
                removed - rule_uids.len()
            );
        }

        self.save_notification_policies(&tree).await?;
        info!("removed {removed} notification route(s) of dashboard {dashboard_uid}");
        Ok(rule_uids)
    }

    pub async fn find_folders(&self) -> ProvisioningResult<Vec<Folder>> {
        let action = "list folders";
        self.api
            .get(paths::FOLDERS)
            .await?
            .require_success(action)?
            .json(action)
    }

    pub async fn find_contact_points(&self) -> ProvisioningResult<Vec<ContactPoint>> {
        let action = "list contact points";
        self.api
            .get(paths::CONTACT_POINTS)
            .await?
            .require_success(action)?
            .json(action)
    }
}
