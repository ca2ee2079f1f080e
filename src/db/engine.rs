use serde::Serialize;
use std::fmt;

use crate::error::{AppError, Result};

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    Mysql,
    Mongo,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mongo => "mongo",
        }
    }

    /// URI scheme used in connection strings
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::Mysql => "mysql",
            Self::Mongo => "mongodb",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type EnvBuilder = fn(&str, &str, &str) -> Vec<(&'static str, String)>;

/// Static description of how to run one engine in a container
pub struct EngineDescriptor {
    pub kind: EngineKind,
    pub image: &'static str,
    pub internal_port: u16,
    pub volume_mount_path: &'static str,
    env_builder: EnvBuilder,
}

impl fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("kind", &self.kind)
            .field("image", &self.image)
            .field("internal_port", &self.internal_port)
            .field("volume_mount_path", &self.volume_mount_path)
            .finish_non_exhaustive()
    }
}

impl EngineDescriptor {
    /// Bootstrap environment as `KEY=VALUE` strings, in a fixed order
    pub fn build_env(&self, username: &str, password: &str, dbname: &str) -> Vec<String> {
        (self.env_builder)(username, password, dbname)
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    /// Runtime port key, e.g. `5432/tcp`
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.internal_port)
    }
}

fn postgres_env(username: &str, password: &str, dbname: &str) -> Vec<(&'static str, String)> {
    vec![
        ("POSTGRES_USER", username.to_string()),
        ("POSTGRES_PASSWORD", password.to_string()),
        ("POSTGRES_DB", dbname.to_string()),
    ]
}

fn mysql_env(username: &str, password: &str, dbname: &str) -> Vec<(&'static str, String)> {
    vec![
        ("MYSQL_ROOT_PASSWORD", password.to_string()),
        ("MYSQL_DATABASE", dbname.to_string()),
        ("MYSQL_USER", username.to_string()),
        ("MYSQL_PASSWORD", password.to_string()),
    ]
}

// The root user is created against the admin database, so dbname is unused.
fn mongo_env(username: &str, password: &str, _dbname: &str) -> Vec<(&'static str, String)> {
    vec![
        ("MONGO_INITDB_ROOT_USERNAME", username.to_string()),
        ("MONGO_INITDB_ROOT_PASSWORD", password.to_string()),
    ]
}

static ENGINES: [EngineDescriptor; 3] = [
    EngineDescriptor {
        kind: EngineKind::Postgres,
        image: "postgres:15",
        internal_port: 5432,
        volume_mount_path: "/var/lib/postgresql/data",
        env_builder: postgres_env,
    },
    EngineDescriptor {
        kind: EngineKind::Mysql,
        image: "mysql:8",
        internal_port: 3306,
        volume_mount_path: "/var/lib/mysql",
        env_builder: mysql_env,
    },
    EngineDescriptor {
        kind: EngineKind::Mongo,
        image: "mongo:6",
        internal_port: 27017,
        volume_mount_path: "/data/db",
        env_builder: mongo_env,
    },
];

/// Look up an engine by its exact (case-sensitive) name
pub fn get_engine(name: &str) -> Result<&'static EngineDescriptor> {
    ENGINES
        .iter()
        .find(|engine| engine.kind.as_str() == name)
        .ok_or_else(|| AppError::UnsupportedKind(name.to_string()))
}

pub fn supported_engines() -> &'static [EngineDescriptor] {
    &ENGINES
}
