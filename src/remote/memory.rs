//! In-memory implementation of [`RemoteApi`]
//!
//! Emulates the remote collections this crate touches:
//! - dashboards keyed by uid, saved through `api/dashboards/db`
//! - alert rules keyed by uid
//! - the singleton notification policy tree
//! - read-only listings of datasources, folders and contact points
//!
//! Every request is recorded in a call log, and failures can be injected per
//! method and path prefix. Useful for:
//! - Testing the orchestration without a server
//! - Dry runs that show which calls a provisioning run would make
//!
//! ## Limitations
//!
//! - **No persistence**: state is lost when the value is dropped
//! - **No auth**: requests are never rejected for credentials

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{Method, RemoteApi, RemoteResponse, paths};
use crate::error::ProvisioningResult;
use crate::identifier::generate_uid;

/// One request received by [`MemoryApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    method: Method,
    path_prefix: String,
    status: u16,
}

#[derive(Debug)]
struct MemoryState {
    dashboards: BTreeMap<String, Value>,
    alert_rules: BTreeMap<String, Value>,
    policy_tree: Value,
    datasources: Vec<Value>,
    folders: Vec<Value>,
    contact_points: Vec<Value>,
    calls: Vec<RecordedCall>,
    failures: Vec<InjectedFailure>,
    next_dashboard_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            dashboards: BTreeMap::new(),
            alert_rules: BTreeMap::new(),
            policy_tree: json!({ "receiver": "grafana-default-email", "routes": [] }),
            datasources: Vec::new(),
            folders: Vec::new(),
            contact_points: Vec::new(),
            calls: Vec::new(),
            failures: Vec::new(),
            next_dashboard_id: 1,
        }
    }
}

/// In-memory remote
///
/// State sits behind a mutex so the API can be shared through `&self` like
/// the HTTP implementation.
#[derive(Debug, Default)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_datasource(self, datasource: Value) -> Self {
        self.state().datasources.push(datasource);
        self
    }

    pub fn with_folder(self, uid: &str, title: &str) -> Self {
        self.state().folders.push(json!({ "uid": uid, "title": title }));
        self
    }

    pub fn with_contact_point(self, name: &str, kind: &str) -> Self {
        self.state()
            .contact_points
            .push(json!({ "uid": generate_uid(), "name": name, "type": kind }));
        self
    }

    pub fn with_dashboard(self, uid: &str, dashboard: Value) -> Self {
        self.state().dashboards.insert(uid.to_string(), dashboard);
        self
    }

    pub fn with_alert_rule(self, uid: &str, rule: Value) -> Self {
        self.state().alert_rules.insert(uid.to_string(), rule);
        self
    }

    pub fn with_policy_tree(self, tree: Value) -> Self {
        self.state().policy_tree = tree;
        self
    }

    /// Answer every request matching `method` and `path_prefix` with `status`
    pub fn fail_on(&self, method: Method, path_prefix: &str, status: u16) {
        self.state().failures.push(InjectedFailure {
            method,
            path_prefix: path_prefix.to_string(),
            status,
        });
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn dashboard(&self, uid: &str) -> Option<Value> {
        self.state().dashboards.get(uid).cloned()
    }

    pub fn alert_rule(&self, uid: &str) -> Option<Value> {
        self.state().alert_rules.get(uid).cloned()
    }

    pub fn alert_rule_uids(&self) -> Vec<String> {
        self.state().alert_rules.keys().cloned().collect()
    }

    pub fn policy_tree(&self) -> Value {
        self.state().policy_tree.clone()
    }

    fn handle(&self, method: Method, path: &str, body: Option<String>) -> RemoteResponse {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.clone(),
        });

        let injected = state
            .failures
            .iter()
            .find(|failure| failure.method == method && path.starts_with(&failure.path_prefix))
            .map(|failure| failure.status);
        if let Some(status) = injected {
            debug!("{method} {path}: injected status {status}");
            return RemoteResponse::new(status, json!({ "message": "injected failure" }).to_string());
        }

        let body = body.as_deref().map(serde_json::from_str::<Value>);
        let body = match body {
            Some(Ok(value)) => Some(value),
            Some(Err(err)) => {
                return RemoteResponse::new(400, json!({ "message": err.to_string() }).to_string());
            }
            None => None,
        };

        let dashboard_uid = path
            .strip_prefix(paths::DASHBOARDS_BY_UID)
            .and_then(|rest| rest.strip_prefix('/'));
        let rule_uid = path
            .strip_prefix(paths::ALERT_RULES)
            .and_then(|rest| rest.strip_prefix('/'));

        let response = match (method, body) {
            (Method::Post, Some(body)) if path == paths::DASHBOARDS_DB => {
                state.save_dashboard(body)
            }
            (Method::Delete, None) if dashboard_uid.is_some() => {
                state.delete_dashboard(dashboard_uid.unwrap_or_default())
            }
            (Method::Post, Some(body)) if path == paths::ALERT_RULES => state.add_alert_rule(body),
            (Method::Get, None) if rule_uid.is_some() => {
                match state.alert_rules.get(rule_uid.unwrap_or_default()) {
                    Some(rule) => RemoteResponse::new(200, rule.to_string()),
                    None => not_found("alert rule not found"),
                }
            }
            (Method::Delete, None) if rule_uid.is_some() => {
                match state.alert_rules.remove(rule_uid.unwrap_or_default()) {
                    Some(_) => RemoteResponse::new(204, ""),
                    None => not_found("alert rule not found"),
                }
            }
            (Method::Get, None) if path == paths::POLICIES => {
                RemoteResponse::new(200, state.policy_tree.to_string())
            }
            (Method::Put, Some(body)) if path == paths::POLICIES => {
                state.policy_tree = body;
                RemoteResponse::new(202, json!({ "message": "policies updated" }).to_string())
            }
            (Method::Get, None) if path == paths::DATASOURCES => {
                RemoteResponse::new(200, Value::Array(state.datasources.clone()).to_string())
            }
            (Method::Get, None) if path == paths::FOLDERS => {
                RemoteResponse::new(200, Value::Array(state.folders.clone()).to_string())
            }
            (Method::Get, None) if path == paths::CONTACT_POINTS => {
                RemoteResponse::new(200, Value::Array(state.contact_points.clone()).to_string())
            }
            _ => not_found("not found"),
        };

        debug!("{method} {path}: {}", response.status);
        response
    }
}

impl MemoryState {
    fn save_dashboard(&mut self, body: Value) -> RemoteResponse {
        let Some(dashboard) = body.get("dashboard").cloned() else {
            return RemoteResponse::new(400, json!({ "message": "dashboard missing" }).to_string());
        };
        let overwrite = body.get("overwrite").and_then(Value::as_bool).unwrap_or(false);
        let uid = dashboard
            .get("uid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(generate_uid);

        let (id, version) = match self.dashboards.get(&uid) {
            Some(_) if !overwrite => {
                return RemoteResponse::new(
                    412,
                    json!({ "message": "A dashboard with the same uid already exists", "status": "name-exists" })
                        .to_string(),
                );
            }
            Some(existing) => (
                existing.get("id").and_then(Value::as_u64).unwrap_or(0),
                existing.get("version").and_then(Value::as_u64).unwrap_or(0) + 1,
            ),
            None => {
                let id = self.next_dashboard_id;
                self.next_dashboard_id += 1;
                (id, 1)
            }
        };

        let mut stored = dashboard;
        if let Some(object) = stored.as_object_mut() {
            object.insert("uid".to_string(), json!(uid));
            object.insert("id".to_string(), json!(id));
            object.insert("version".to_string(), json!(version));
        }
        let slug = stored
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
            .replace(' ', "-");
        self.dashboards.insert(uid.clone(), stored);

        RemoteResponse::new(
            200,
            json!({
                "id": id,
                "uid": uid,
                "url": format!("/d/{uid}/{slug}"),
                "status": "success",
                "version": version,
                "slug": slug
            })
            .to_string(),
        )
    }

    fn delete_dashboard(&mut self, uid: &str) -> RemoteResponse {
        match self.dashboards.remove(uid) {
            Some(dashboard) => {
                let title = dashboard.get("title").and_then(Value::as_str).unwrap_or_default();
                RemoteResponse::new(
                    200,
                    json!({ "title": title, "message": format!("Dashboard {title} deleted") }).to_string(),
                )
            }
            None => not_found("Dashboard not found"),
        }
    }

    fn add_alert_rule(&mut self, body: Value) -> RemoteResponse {
        let Some(uid) = body.get("uid").and_then(Value::as_str).map(str::to_string) else {
            return RemoteResponse::new(400, json!({ "message": "uid missing" }).to_string());
        };
        if self.alert_rules.contains_key(&uid) {
            return RemoteResponse::new(
                409,
                json!({ "message": format!("alert rule {uid} already exists") }).to_string(),
            );
        }
        self.alert_rules.insert(uid, body.clone());
        RemoteResponse::new(201, body.to_string())
    }
}

fn not_found(message: &str) -> RemoteResponse {
    RemoteResponse::new(404, json!({ "message": message }).to_string())
}

#[async_trait]
impl RemoteApi for MemoryApi {
    async fn get(&self, path: &str) -> ProvisioningResult<RemoteResponse> {
        Ok(self.handle(Method::Get, path, None))
    }

    async fn post(&self, path: &str, body: String) -> ProvisioningResult<RemoteResponse> {
        Ok(self.handle(Method::Post, path, Some(body)))
    }

    async fn put(&self, path: &str, body: String) -> ProvisioningResult<RemoteResponse> {
        Ok(self.handle(Method::Put, path, Some(body)))
    }

    async fn delete(&self, path: &str) -> ProvisioningResult<RemoteResponse> {
        Ok(self.handle(Method::Delete, path, None))
    }
}
