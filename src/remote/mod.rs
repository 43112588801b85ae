//! Boundary to the remote platform's HTTP API
//!
//! The orchestration code only sees [`RemoteApi`]: plain requests against
//! paths relative to the API root, answered with a status and a body.
//!
//! ## Implementations
//!
//! - **HTTP** ([`http::HttpApi`]): bearer-authenticated reqwest client with a
//!   request timeout and bounded retries for transient failures
//! - **In-memory** ([`memory::MemoryApi`]): emulates the collections this crate
//!   uses, for tests and dry runs

pub mod backoff;
pub mod http;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{ProvisioningError, ProvisioningResult};

pub use http::HttpApi;
pub use memory::{MemoryApi, RecordedCall};

/// Paths of the remote collections
pub mod paths {
    pub const DASHBOARDS_DB: &str = "api/dashboards/db";
    pub const DASHBOARDS_BY_UID: &str = "api/dashboards/uid";
    pub const ALERT_RULES: &str = "api/v1/provisioning/alert-rules";
    pub const POLICIES: &str = "api/v1/provisioning/policies";
    pub const DATASOURCES: &str = "api/datasources";
    pub const FOLDERS: &str = "api/folders";
    pub const CONTACT_POINTS: &str = "api/v1/provisioning/contact-points";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Whether repeating the request leaves the remote as a single one would
    pub fn is_idempotent(self) -> bool {
        !matches!(self, Method::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Turn a non-success status into [`ProvisioningError::Rejected`]
    pub fn require_success(self, action: &str) -> ProvisioningResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ProvisioningError::Rejected {
            action: action.to_string(),
            status: self.status,
            body: self.body,
        })
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self, action: &str) -> ProvisioningResult<T> {
        serde_json::from_str(&self.body).map_err(|err| ProvisioningError::Decode {
            action: action.to_string(),
            message: err.to_string(),
        })
    }
}

/// A request/response boundary to the remote platform
///
/// Implementations must be `Send + Sync`; they authenticate every request
/// themselves. An `Err` means no response was obtained at all; any response,
/// whatever its status, is returned as `Ok`.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn get(&self, path: &str) -> ProvisioningResult<RemoteResponse>;

    async fn post(&self, path: &str, body: String) -> ProvisioningResult<RemoteResponse>;

    async fn put(&self, path: &str, body: String) -> ProvisioningResult<RemoteResponse>;

    async fn delete(&self, path: &str) -> ProvisioningResult<RemoteResponse>;
}
