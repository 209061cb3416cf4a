//! Acervo Bulk Import
//!
//! Loads catalogue entries into the repository:
//! 1. Reads the built-in entry list, or a JSON file given as first argument
//! 2. Resolves projects, subprojects and lookups by name
//! 3. Creates every record in one transaction, attributed to `import.principal`

mod data;
mod errors;
mod processor;

use acervo_common::{auth::Principal, config::AppConfig, db::DbPool, metrics, VERSION};
use processor::Importer;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }

    info!("Starting Acervo Import v{}", VERSION);
    metrics::register_metrics();

    let entries = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!(path = %path.display(), "Reading entries from file");
            data::load_file(&path)?
        }
        None => data::builtin()?,
    };
    info!(entries = entries.len(), "Entries loaded");

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        db.migrate().await?;
    }

    let importer = Importer::new(db, Principal::system(config.import.principal.clone()));

    match importer.run(&entries).await {
        Ok(report) => {
            for entry in report.incomplete() {
                warn!(
                    record_id = entry.record_id,
                    title = %entry.title,
                    skipped_authors = ?entry.skipped_authors,
                    skipped_tags = ?entry.skipped_tags,
                    "Imported with missing authors or tags"
                );
            }
            info!(created = report.created, "Import finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Import rolled back; nothing was written");
            Err(e.into())
        }
    }
}
