use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check payload.
///
/// `status` is `healthy` or `unhealthy`; `database` is `connected` or `disconnected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthRes {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".into(),
            database: "connected".into(),
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".into(),
            database: "disconnected".into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
