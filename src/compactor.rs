use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;

/// Background task that rewrites the WAL as a snapshot once enough appends
/// have piled up since the last compaction.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        compact_if_due(&engine, threshold).await;
    }
}

/// One compactor pass. Returns true if the WAL was rewritten.
pub async fn compact_if_due(engine: &Engine, threshold: u64) -> bool {
    let appends = match engine.appends_since_compact().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("compactor: {e}");
            return false;
        }
    };
    if appends < threshold {
        return false;
    }
    match engine.compact().await {
        Ok(()) => {
            info!("compacted WAL after {appends} appends");
            true
        }
        Err(e) => {
            tracing::error!("WAL compaction failed: {e}");
            false
        }
    }
}
