//! Centralized application configuration.
//!
//! Combines environment variables (`RETAINX_*`) and CLI arguments; flags win
//! over the environment. The clap-facing enums live here so the domain
//! modules stay free of CLI concerns.

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use std::env;
use std::path::PathBuf;

use crate::adapters::BackendKind;
use crate::policy::{Action, RetentionTier};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum BackendArg {
    Aws,
    Azure,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Aws => BackendKind::Aws,
            BackendArg::Azure => BackendKind::Azure,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ActionArg {
    Archive,
    Restore,
    Delete,
    /// Upload a single local file instead of sweeping.
    Upload,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DataTypeArg {
    RealTime,
    Reference,
    Archival,
}

impl From<DataTypeArg> for RetentionTier {
    fn from(arg: DataTypeArg) -> Self {
        match arg {
            DataTypeArg::RealTime => RetentionTier::RealTime,
            DataTypeArg::Reference => RetentionTier::Reference,
            DataTypeArg::Archival => RetentionTier::Archival,
        }
    }
}

/// What the process should do once wired up.
#[derive(Debug, Clone)]
pub enum RunCommand {
    Sweep {
        action: Action,
        data_type: RetentionTier,
    },
    Upload {
        source: PathBuf,
        key: String,
    },
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Retention tiering and archival sweeps for object storage")]
pub struct Args {
    /// Storage backend to run against
    #[arg(long, value_enum)]
    pub backend: BackendArg,

    /// Lifecycle action to perform
    #[arg(long, value_enum)]
    pub action: ActionArg,

    /// Retention band the action applies to (required for sweeps)
    #[arg(long, value_enum)]
    pub data_type: Option<DataTypeArg>,

    /// Local file to upload (required for --action upload)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Object key for the uploaded file (required for --action upload)
    #[arg(long)]
    pub key: Option<String>,

    /// Exit non-zero when any operation fails. Without this flag a partial
    /// sweep still exits zero; the summary carries the failure details.
    #[arg(long)]
    pub strict: bool,

    /// Ledger CSV path (overrides RETAINX_LEDGER_PATH)
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Directory holding secret JSON files (overrides RETAINX_SECRETS_DIR)
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,

    /// Secret to resolve for backend credentials (overrides RETAINX_SECRET_NAME)
    #[arg(long)]
    pub secret_name: Option<String>,

    /// Region or vault hint for the secrets provider (overrides RETAINX_LOCATION)
    #[arg(long)]
    pub location: Option<String>,

    /// Directory for local object payloads (overrides RETAINX_STORE_DIR)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Database URL (overrides RETAINX_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,
}

#[derive(Debug)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub command: RunCommand,
    pub strict: bool,
    pub ledger_path: PathBuf,
    pub secrets_dir: PathBuf,
    pub secret_name: String,
    pub location: String,
    pub store_dir: PathBuf,
    pub database_url: String,
}

impl AppConfig {
    /// Parse environment variables + CLI args into an AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        let command = match args.action {
            ActionArg::Upload => {
                let (Some(source), Some(key)) = (args.source, args.key) else {
                    bail!("--source and --key are required for --action upload");
                };
                RunCommand::Upload { source, key }
            }
            sweep => {
                let Some(data_type) = args.data_type else {
                    bail!("--data-type is required for sweep actions");
                };
                let action = match sweep {
                    ActionArg::Archive => Action::Archive,
                    ActionArg::Restore => Action::Restore,
                    ActionArg::Delete => Action::Delete,
                    ActionArg::Upload => unreachable!("handled above"),
                };
                RunCommand::Sweep {
                    action,
                    data_type: data_type.into(),
                }
            }
        };

        // --- Environment fallback ---
        let env_ledger =
            env::var("RETAINX_LEDGER_PATH").unwrap_or_else(|_| "./data/tracker.csv".into());
        let env_secrets = env::var("RETAINX_SECRETS_DIR").unwrap_or_else(|_| "./secrets".into());
        let env_secret_name =
            env::var("RETAINX_SECRET_NAME").unwrap_or_else(|_| "archival-credentials".into());
        let env_location = env::var("RETAINX_LOCATION").unwrap_or_else(|_| "default".into());
        let env_store = env::var("RETAINX_STORE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("RETAINX_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/retainx.db".into());

        // --- Merge ---
        Ok(Self {
            backend: args.backend.into(),
            command,
            strict: args.strict,
            ledger_path: args.ledger.unwrap_or_else(|| env_ledger.into()),
            secrets_dir: args.secrets_dir.unwrap_or_else(|| env_secrets.into()),
            secret_name: args.secret_name.unwrap_or(env_secret_name),
            location: args.location.unwrap_or(env_location),
            store_dir: args.store_dir.unwrap_or_else(|| env_store.into()),
            database_url: args.database_url.unwrap_or(env_db),
        })
    }
}
