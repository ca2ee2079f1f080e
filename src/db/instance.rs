use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::docker::ContainerRecord;
use crate::error::{AppError, Result};

use super::engine::EngineKind;

/// Caller input for one create operation
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub kind: String,
    pub username: String,
    pub password: String,
    pub dbname: String,
}

impl ProvisionRequest {
    /// Every field is required and must be non-empty
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("type", &self.kind),
            ("username", &self.username),
            ("password", &self.password),
            ("dbname", &self.dbname),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(AppError::InvalidRequest(*field)),
            None => Ok(()),
        }
    }
}

/// Result of a successful create
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDatabase {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EngineKind,
    /// `None` when the runtime had not published the port at inspect time
    pub connection_string: Option<String>,
    pub host_port: Option<u16>,
    pub volume_name: String,
    pub created_at: DateTime<Utc>,
}

/// One row of the list operation, mirrored from the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
}

impl From<ContainerRecord> for DatabaseSummary {
    fn from(record: ContainerRecord) -> Self {
        Self {
            name: record.names.into_iter().next().unwrap_or_default(),
            id: record.id,
            image: record.image,
            state: record.state,
            status: record.status,
        }
    }
}
