//! Operator CLI for the contact store.
//!
//! # Responsibility
//! - Resolve a fragment or inspect an identity without running the server.
//! - Print consolidated identities as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reconcile_core::db::open_db;
use reconcile_core::{
    init_logging, resolve_in_transaction, ContactId, IdentityService, SqliteContactRepository,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reconcile", version, about = "Contact identity reconciliation tools")]
struct Cli {
    #[arg(long, env = "RECONCILE_DB_PATH", default_value = "reconcile.sqlite3")]
    db_path: PathBuf,

    /// Log level for stderr output.
    #[arg(long, env = "RECONCILE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a fragment, creating or merging records as needed.
    Identify {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
    },
    /// Show the identity containing a contact id. Read-only.
    Cluster { contact_id: i64 },
    /// Print core linkage and version.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("reconcile_core ping={}", reconcile_core::ping());
        println!("reconcile_core version={}", reconcile_core::core_version());
        return Ok(());
    }

    init_logging(&cli.log_level, None).map_err(anyhow::Error::msg)?;
    let mut conn = open_db(&cli.db_path)
        .with_context(|| format!("failed to open database `{}`", cli.db_path.display()))?;

    let identity = match cli.command {
        Command::Identify {
            email,
            phone_number,
        } => resolve_in_transaction(&mut conn, email.as_deref(), phone_number.as_deref())?,
        Command::Cluster { contact_id } => {
            let repo = SqliteContactRepository::try_new(&conn)?;
            match IdentityService::new(repo).identity_of(ContactId(contact_id))? {
                Some(identity) => identity,
                None => bail!("contact {contact_id} not found"),
            }
        }
        Command::Version => return Ok(()),
    };

    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn identify_accepts_either_field() {
        let cli = Cli::try_parse_from(["reconcile", "identify", "--phone-number", "123"]).unwrap();
        match cli.command {
            Command::Identify {
                email,
                phone_number,
            } => {
                assert_eq!(email, None);
                assert_eq!(phone_number.as_deref(), Some("123"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cluster_requires_numeric_id() {
        assert!(Cli::try_parse_from(["reconcile", "cluster", "abc"]).is_err());
        let cli = Cli::try_parse_from(["reconcile", "--db-path", "x.db", "cluster", "7"]).unwrap();
        assert!(matches!(cli.command, Command::Cluster { contact_id: 7 }));
        assert_eq!(cli.db_path.to_str(), Some("x.db"));
    }
}
