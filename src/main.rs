use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, path::Path, sync::Arc};
use tracing_subscriber::EnvFilter;

mod adapters;
mod config;
mod errors;
mod ledger;
mod models;
mod orchestrator;
mod policy;
mod secrets;
mod store;

use adapters::BackendKind;
use config::RunCommand;
use ledger::TraceLedger;
use orchestrator::ArchivalOrchestrator;
use secrets::FileSecretsProvider;
use store::{ObjectStore, local::LocalStore};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::info!("Starting retainx with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    let db_path_obj = Path::new(db_path);
    if let Some(parent) = db_path_obj.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    // SQLite will not create the file itself; make sure it exists.
    if !db_path_obj.exists() {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(db_path)?;
    }

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?,
    );

    // --- Wire the store, ledger, and orchestrator ---
    let default_class = match cfg.backend {
        BackendKind::Aws => "STANDARD",
        BackendKind::Azure => "Hot",
    };
    let store: Arc<dyn ObjectStore> =
        Arc::new(LocalStore::init(db, &cfg.store_dir, default_class).await?);
    let ledger = Arc::new(TraceLedger::open(&cfg.ledger_path)?);
    let provider = FileSecretsProvider::new(&cfg.secrets_dir);

    let orchestrator = ArchivalOrchestrator::new(
        cfg.backend,
        &provider,
        &cfg.secret_name,
        &cfg.location,
        store,
        Arc::clone(&ledger),
    )
    .await?;

    // Stop the sweep between objects on Ctrl-C.
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current object");
            cancel.cancel();
        }
    });

    // --- Run ---
    let summary = match &cfg.command {
        RunCommand::Sweep { action, data_type } => orchestrator.run(*action, *data_type).await,
        RunCommand::Upload { source, key } => orchestrator.upload_file(source, key).await,
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    tracing::info!("Audit trail written to {}", ledger.path().display());

    if cfg.strict && summary.failed > 0 {
        tracing::error!("{} operations failed", summary.failed);
        std::process::exit(1);
    }

    Ok(())
}
