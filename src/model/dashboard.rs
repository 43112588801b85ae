//! Dashboards and the publish envelope

use serde_json::{Value, json};

use super::panel::Panel;
use super::{ToDocument, require_non_empty};
use crate::error::ValidationError;

/// Schema version the rendered dashboards target
const SCHEMA_VERSION: u32 = 37;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardDocument {
    title: String,
    uid: Option<String>,
    tags: Vec<String>,
    timezone: String,
    refresh: String,
    time_from: String,
    time_to: String,
    editable: bool,
    panels: Vec<Panel>,
}

impl DashboardDocument {
    pub fn new(title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        require_non_empty("title", &title)?;
        Ok(Self {
            title,
            uid: None,
            tags: Vec::new(),
            timezone: "browser".to_string(),
            refresh: "1m".to_string(),
            time_from: "now-6h".to_string(),
            time_to: "now".to_string(),
            editable: true,
            panels: Vec::new(),
        })
    }

    /// Pin the dashboard uid instead of letting the remote assign one
    pub fn with_uid(mut self, uid: impl Into<String>) -> Result<Self, ValidationError> {
        let uid = uid.into();
        crate::identifier::validate_uid(&uid)?;
        self.uid = Some(uid);
        Ok(self)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = refresh.into();
        self
    }

    pub fn with_time_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.time_from = from.into();
        self.time_to = to.into();
        self
    }

    pub fn with_panel(mut self, panel: impl Into<Panel>) -> Self {
        self.panels.push(panel.into());
        self
    }

    pub fn with_panels(mut self, panels: impl IntoIterator<Item = Panel>) -> Self {
        self.panels.extend(panels);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }
}

impl ToDocument for DashboardDocument {
    fn to_document(&self) -> Value {
        let mut next_id = self.panels.iter().map(Panel::max_id).max().unwrap_or(0) + 1;
        let panels: Vec<Value> = self.panels.iter().map(|p| p.render(&mut next_id)).collect();

        json!({
            "title": self.title,
            "uid": self.uid,
            "tags": self.tags,
            "timezone": self.timezone,
            "refresh": self.refresh,
            "time": { "from": self.time_from, "to": self.time_to },
            "editable": self.editable,
            "schemaVersion": SCHEMA_VERSION,
            "version": 0,
            "panels": panels
        })
    }
}

/// A dashboard together with its publish options
///
/// This is the body of a publish call. `overwrite` defaults to true, so a
/// publish replaces any same-named dashboard in the folder.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardWrapper {
    dashboard: DashboardDocument,
    folder_uid: String,
    overwrite: bool,
    message: String,
}

impl DashboardWrapper {
    pub fn new(
        dashboard: DashboardDocument,
        folder_uid: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let folder_uid = folder_uid.into();
        require_non_empty("folderUid", &folder_uid)?;
        Ok(Self {
            dashboard,
            folder_uid,
            overwrite: true,
            message: String::new(),
        })
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn dashboard(&self) -> &DashboardDocument {
        &self.dashboard
    }

    pub fn folder_uid(&self) -> &str {
        &self.folder_uid
    }
}

impl ToDocument for DashboardWrapper {
    fn to_document(&self) -> Value {
        json!({
            "dashboard": self.dashboard.to_document(),
            "overwrite": self.overwrite,
            "message": self.message,
            "folderUid": self.folder_uid
        })
    }
}
