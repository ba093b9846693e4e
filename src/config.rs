//! Environment-driven configuration

use crate::session::DEFAULT_SESSION_TTL;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;

/// Where USSD sessions live between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionBackend {
    #[default]
    Sqlite,
    Memory,
    Redis,
}

impl SessionBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

impl fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
            Self::Redis => "redis",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    pub session_backend: SessionBackend,
    pub redis_url: Option<String>,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("EXPENSES_DB_PATH").unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.expenses-ussd/expenses.db")
        });

        let port = lookup("EXPENSES_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let session_backend = lookup("EXPENSES_SESSION_BACKEND")
            .and_then(|b| SessionBackend::parse(&b))
            .unwrap_or_default();

        let session_ttl = lookup("EXPENSES_SESSION_TTL_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_SESSION_TTL, Duration::from_secs);

        Self {
            db_path,
            port,
            session_backend,
            redis_url: lookup("EXPENSES_REDIS_URL").filter(|u| !u.trim().is_empty()),
            session_ttl,
        }
    }
}
