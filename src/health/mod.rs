// ============================================================================
// Health reporting
// ============================================================================
//
// Component-level status shared by the publisher, the monitor actor and the
// /health endpoint.
//
// ============================================================================

mod monitor;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use monitor::{GetSystemHealth, HealthMonitorActor, SystemHealth, UpdateHealth};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
            details: None,
        }
    }
}
