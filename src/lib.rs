pub mod config;
pub mod error;
pub mod grafana;
pub mod identifier;
pub mod model;
pub mod plan;
pub mod provisioner;
pub mod remote;
pub mod util;

pub use error::{ConfigError, ProvisioningError, ProvisioningResult, ValidationError};
pub use grafana::{DashboardSaved, GrafanaClient};
pub use provisioner::{CascadeDelete, CascadeState, ProvisionReport, Provisioner};
