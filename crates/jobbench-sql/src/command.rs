//! Overlay command vocabulary.
//!
//! The overlay is driven through three custom commands on the key-value
//! server: `DEL <db>`, `CREATE_DB <db>` and `EXEC <db> <sql>`. Module
//! commands are namespaced by a prefix (RediSQL uses `REDISQL.`); `DEL` is
//! the server's own key deletion and is never prefixed.

use std::fmt;

/// Module prefix used by RediSQL.
pub const DEFAULT_COMMAND_PREFIX: &str = "REDISQL.";

/// A command sent over the overlay's custom-command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    /// Remove the logical database key.
    DropDatabase { database: String },
    /// Create an empty logical database.
    CreateDatabase { database: String },
    /// Execute one SQL statement against a database.
    Exec { database: String, sql: String },
}

impl OverlayCommand {
    pub fn drop_database(database: impl Into<String>) -> Self {
        Self::DropDatabase {
            database: database.into(),
        }
    }

    pub fn create_database(database: impl Into<String>) -> Self {
        Self::CreateDatabase {
            database: database.into(),
        }
    }

    pub fn exec(database: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Exec {
            database: database.into(),
            sql: sql.into(),
        }
    }

    /// Command name with the module prefix applied where it belongs.
    pub fn name(&self, prefix: &str) -> String {
        match self {
            Self::DropDatabase { .. } => "DEL".to_string(),
            Self::CreateDatabase { .. } => format!("{}CREATE_DB", prefix),
            Self::Exec { .. } => format!("{}EXEC", prefix),
        }
    }

    /// Positional arguments, in wire order.
    pub fn args(&self) -> Vec<&str> {
        match self {
            Self::DropDatabase { database } | Self::CreateDatabase { database } => {
                vec![database.as_str()]
            }
            Self::Exec { database, sql } => vec![database.as_str(), sql.as_str()],
        }
    }

    pub fn database(&self) -> &str {
        match self {
            Self::DropDatabase { database }
            | Self::CreateDatabase { database }
            | Self::Exec { database, .. } => database,
        }
    }

    /// SQL text for `Exec`, `None` otherwise.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Exec { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

impl fmt::Display for OverlayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name(""))?;
        for arg in self.args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
