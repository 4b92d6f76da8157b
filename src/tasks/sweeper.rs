//! Expiry Sweeper Task
//!
//! Background task that periodically removes idle memory-tier entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{ShardPool, StatsRecorder};
use crate::error::{CacheError, Result};

/// Handle to a running sweeper task.
///
/// Dropping the handle also stops the task: the loop exits once its stop
/// channel closes.
#[derive(Debug)]
pub struct Sweeper {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.handle.await {
            warn!("Expiry sweeper ended abnormally: {}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns a task that every `max_cache_seconds` removes entries idle for
/// longer than `max_cache_seconds`.
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let sweeper = spawn_sweeper(pool.clone(), stats.clone(), 60)?;
/// // Later, when the cache is closed:
/// sweeper.stop().await;
/// ```
pub fn spawn_sweeper<V>(
    pool: Arc<ShardPool<V>>,
    stats: Arc<StatsRecorder>,
    max_cache_seconds: u64,
) -> Result<Sweeper>
where
    V: Clone + Send + Sync + 'static,
{
    if max_cache_seconds == 0 {
        return Err(CacheError::InvalidConfig(
            "sweep interval must be positive".to_string(),
        ));
    }
    let runtime = Handle::try_current().map_err(|err| {
        CacheError::Runtime(format!("expiry sweeper needs a tokio runtime: {}", err))
    })?;

    let interval = Duration::from_secs(max_cache_seconds);
    let (stop, mut stop_rx) = watch::channel(false);

    let handle = runtime.spawn(async move {
        info!(
            "Starting expiry sweeper with interval of {} seconds",
            max_cache_seconds
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop_rx.changed() => break,
            }

            let removed = pool.remove_expired(max_cache_seconds);
            stats.record_expired(removed);

            if removed > 0 {
                info!("Expiry sweep: removed {} idle entries", removed);
            } else {
                debug!("Expiry sweep: no idle entries found");
            }
        }

        info!("Expiry sweeper stopped");
    });

    Ok(Sweeper { stop, handle })
}
