//! Server configuration.
//!
//! Every flag has an environment variable fallback so the service can be
//! configured without a wrapper script.

use clap::{Parser, ValueEnum};
use reconcile_core::DbOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Deployment mode; controls how much error detail reaches callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether 500 responses may carry the underlying error text.
    pub fn exposes_error_details(self) -> bool {
        self == Self::Development
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "reconcile-server",
    version,
    about = "Contact identity reconciliation HTTP service"
)]
pub struct ServerConfig {
    /// SQLite database file; created and migrated on first start.
    #[arg(long, env = "RECONCILE_DB_PATH", default_value = "reconcile.sqlite3")]
    pub db_path: PathBuf,

    #[arg(long, env = "RECONCILE_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// trace|debug|info|warn|error. Defaults to the build-mode level.
    #[arg(long, env = "RECONCILE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long, env = "RECONCILE_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Maximum wait for the database write lock per request.
    #[arg(long, env = "RECONCILE_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    #[arg(
        long,
        env = "RECONCILE_ENV",
        value_enum,
        default_value_t = Environment::Production
    )]
    pub environment: Environment,
}

impl ServerConfig {
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    pub fn log_level(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| reconcile_core::default_log_level().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Environment, ServerConfig};
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn explicit_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "reconcile-server",
            "--db-path",
            "/tmp/contacts.db",
            "--bind",
            "0.0.0.0:8080",
            "--busy-timeout-ms",
            "250",
            "--environment",
            "development",
            "--log-level",
            "warn",
        ])
        .unwrap();

        assert_eq!(config.db_path.to_str(), Some("/tmp/contacts.db"));
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.db_options().busy_timeout, Duration::from_millis(250));
        assert_eq!(config.environment, Environment::Development);
        assert!(config.environment.exposes_error_details());
        assert_eq!(config.log_level(), "warn");
    }

    #[test]
    fn invalid_environment_is_rejected() {
        let result =
            ServerConfig::try_parse_from(["reconcile-server", "--environment", "staging"]);
        assert!(result.is_err());
    }

    #[test]
    fn production_hides_error_details() {
        assert!(!Environment::Production.exposes_error_details());
        assert_eq!(Environment::Production.as_str(), "production");
    }
}
