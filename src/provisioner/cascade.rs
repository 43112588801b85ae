//! Cascade delete of a dashboard with its alert rules and routes
//!
//! The remote has no transactions and no referential integrity, so the
//! delete runs as a state machine:
//!
//! ```text
//! RoutesPending → RoutesRemoved{rule_uids} → RulesPending{remaining}
//!     → RulesRemoved → DashboardPending → Done
//! ```
//!
//! The state serializes to JSON. A run interrupted at any point resumes from
//! the stored state, and a run started from scratch after a completed one
//! finds nothing to remove and succeeds.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::grafana::GrafanaClient;
use crate::remote::RemoteApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CascadeState {
    RoutesPending,
    RoutesRemoved { rule_uids: Vec<String> },
    RulesPending { remaining: Vec<String> },
    RulesRemoved,
    DashboardPending,
    Done,
}

impl fmt::Display for CascadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeState::RoutesPending => write!(f, "routes pending"),
            CascadeState::RoutesRemoved { rule_uids } => {
                write!(f, "routes removed ({} rule(s))", rule_uids.len())
            }
            CascadeState::RulesPending { remaining } => {
                write!(f, "rules pending ({} remaining)", remaining.len())
            }
            CascadeState::RulesRemoved => write!(f, "rules removed"),
            CascadeState::DashboardPending => write!(f, "dashboard pending"),
            CascadeState::Done => write!(f, "done"),
        }
    }
}

/// Progress of one cascade delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeDelete {
    dashboard_uid: String,
    state: CascadeState,
    updated_at: DateTime<Utc>,
}

impl CascadeDelete {
    pub fn new(dashboard_uid: impl Into<String>) -> Self {
        Self {
            dashboard_uid: dashboard_uid.into(),
            state: CascadeState::RoutesPending,
            updated_at: Utc::now(),
        }
    }

    pub fn dashboard_uid(&self) -> &str {
        &self.dashboard_uid
    }

    pub fn state(&self) -> &CascadeState {
        &self.state
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_done(&self) -> bool {
        self.state == CascadeState::Done
    }

    fn transition(&mut self, next: CascadeState) {
        info!("cascade {}: {} -> {next}", self.dashboard_uid, self.state);
        self.state = next;
        self.updated_at = Utc::now();
    }

    /// Advance by one state
    ///
    /// On error the state either stays where it was or, for a partial rule
    /// delete, keeps only the rules that still have to go.
    pub async fn step<A: RemoteApi>(&mut self, client: &GrafanaClient<A>) -> ProvisioningResult<()> {
        match self.state.clone() {
            CascadeState::RoutesPending => {
                let rule_uids = client.remove_dashboard_routes(&self.dashboard_uid).await?;
                self.transition(CascadeState::RoutesRemoved { rule_uids });
            }
            CascadeState::RoutesRemoved { rule_uids } => {
                self.transition(CascadeState::RulesPending { remaining: rule_uids });
            }
            CascadeState::RulesPending { remaining } => {
                let mut failed = Vec::new();
                for uid in remaining {
                    if let Err(err) = client.delete_alert_rule(&uid).await {
                        warn!("failed to delete alert rule {uid}: {err}");
                        failed.push((uid, err.to_string()));
                    }
                }

                if !failed.is_empty() {
                    let remaining: Vec<String> = failed.iter().map(|(uid, _)| uid.clone()).collect();
                    self.transition(CascadeState::RulesPending { remaining });
                    return Err(ProvisioningError::PartialCascade { failed });
                }
                self.transition(CascadeState::RulesRemoved);
            }
            CascadeState::RulesRemoved => {
                self.transition(CascadeState::DashboardPending);
            }
            CascadeState::DashboardPending => {
                client.delete_dashboard(&self.dashboard_uid).await?;
                self.transition(CascadeState::Done);
            }
            CascadeState::Done => {}
        }
        Ok(())
    }

    /// Step until done, calling `checkpoint` after every step, failed ones included
    #[instrument(skip(self, client, checkpoint), fields(dashboard = %self.dashboard_uid))]
    pub async fn run<A, F>(&mut self, client: &GrafanaClient<A>, mut checkpoint: F) -> ProvisioningResult<()>
    where
        A: RemoteApi,
        F: FnMut(&CascadeDelete),
    {
        while !self.is_done() {
            let result = self.step(client).await;
            checkpoint(self);
            result?;
        }
        Ok(())
    }

    /// Load a journal; a missing file yields `None`
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read journal: {}", path.display()))?;
        let cascade = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse journal: {}", path.display()))?;
        Ok(Some(cascade))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write journal: {}", path.display()))
    }
}
