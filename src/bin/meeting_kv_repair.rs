//! meeting-kv-repair: index maintenance
//!
//! Repairs secondary indexes left inconsistent by interrupted writes:
//! removes index entries that no longer agree with their entity, then
//! rewrites the entries of every entity so none is missing from lookups.
//!
//! ## Usage
//! ```text
//! meeting-kv-repair [CONFIG_FILE]
//! ```
//!
//! ## Configuration
//! - MEETING_KV_CONFIG: Path to a YAML config file (optional)
//! - MEETING_KV__STORAGE__NATS__URL etc.: per-field overrides
//! - MEETING_KV_LOG: tracing filter (default: info)

use tracing::{error, info, warn};

use meeting_kv::config::Config;
use meeting_kv::entities::Repositories;
use meeting_kv::repository::{PruneReport, RepositoryError};
use meeting_kv::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    let repos = Repositories::init(&config.storage).await?;

    let mut failures = 0;

    let mut total = PruneReport::default();
    for (entity_type, result) in repos.prune_stale_indices().await {
        match result {
            Ok(report) => {
                info!(
                    %entity_type,
                    scanned = report.scanned,
                    removed = report.removed,
                    failed = report.failed,
                    "Pruned"
                );
                total.merge(report);
            }
            // no bucket configured for this entity type
            Err(RepositoryError::Unavailable(msg)) => warn!(%entity_type, %msg, "Skipped"),
            Err(e) => {
                error!(%entity_type, error = %e, "Prune failed");
                failures += 1;
            }
        }
    }

    let mut reindexed = 0;
    for (entity_type, result) in repos.reindex_all().await {
        match result {
            Ok(count) => reindexed += count,
            Err(RepositoryError::Unavailable(_)) => {}
            Err(e) => {
                error!(%entity_type, error = %e, "Reindex failed");
                failures += 1;
            }
        }
    }

    info!(
        scanned = total.scanned,
        removed = total.removed,
        failed = total.failed,
        reindexed,
        "meeting-kv-repair finished"
    );

    if failures > 0 {
        return Err(format!("{} entity types could not be repaired", failures).into());
    }
    Ok(())
}
