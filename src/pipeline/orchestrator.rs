//! Batch orchestration: run every work item through the converter with
//! bounded concurrency, then restore index order.
//!
//! ## Dispatch
//!
//! Items are spawned onto the tokio runtime in ascending index order, with
//! `pacing_delay` between successive spawns. The dispatch loop takes a
//! permit from a [`Semaphore`] sized to `max_workers` before each spawn and
//! moves it into the task, so at most `max_workers` calls are in flight and
//! items start in index order whatever the pacing.
//!
//! Spawned tasks are aborted if the batch is abandoned early, either by a
//! pool error or by the caller dropping the future.
//!
//! ## Collection
//!
//! Join handles are drained through [`FuturesUnordered`], i.e. in
//! completion order. Completion order is meaningless to the document, so
//! the collected results are sorted by [`ItemResult::ordering_key`] before
//! they are returned.
//!
//! A batch of one skips the pool entirely and awaits the converter on the
//! caller's task.

use crate::config::ConversionConfig;
use crate::error::SnapTexError;
use crate::output::ItemResult;
use crate::pipeline::item::ItemConverter;
use crate::pipeline::source::WorkItem;
use crate::progress::ProgressCallback;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(1500);

/// Runs a batch of work items through an [`ItemConverter`].
pub struct BatchOrchestrator {
    converter: Arc<ItemConverter>,
    max_workers: usize,
    pacing_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(converter: Arc<ItemConverter>) -> Self {
        Self {
            converter,
            max_workers: DEFAULT_MAX_WORKERS,
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }

    /// Orchestrator with pool size and pacing taken from `config`.
    pub fn from_config(converter: Arc<ItemConverter>, config: &ConversionConfig) -> Self {
        Self::new(converter)
            .with_max_workers(config.max_workers)
            .with_pacing_delay(config.pacing_delay)
    }

    /// Pool capacity; values below 1 are raised to 1.
    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n.max(1);
        self
    }

    /// Delay between successive submissions. `Duration::ZERO` disables it.
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    /// Convert every item and return one result per item, sorted by index.
    ///
    /// Item failures never fail the batch; they come back as placeholder
    /// results.
    ///
    /// # Errors
    /// [`SnapTexError::WorkerPool`] when a task is cancelled or the
    /// semaphore is closed underneath it.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ItemResult>, SnapTexError> {
        let mut items = items;
        let results = match items.len() {
            0 => return Ok(Vec::new()),
            1 => {
                let item = items.remove(0);
                vec![self.run_single(item, progress).await]
            }
            _ => self.run_parallel(items, progress).await?,
        };

        if let Some(cb) = progress {
            cb.on_progress(1.0);
        }
        Ok(results)
    }

    async fn run_single(&self, item: WorkItem, progress: Option<&ProgressCallback>) -> ItemResult {
        debug!("Single item: converting on the calling task");
        if let Some(cb) = progress {
            cb.on_item_start(item.index(), 1);
        }

        let start = Instant::now();
        let result = match AssertUnwindSafe(self.converter.convert(&item))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!("Converter panicked on {}: {}", item.path().display(), msg);
                ItemResult::failure(
                    &item,
                    format!("worker panicked: {msg}"),
                    start.elapsed().as_millis() as u64,
                )
            }
        };

        report_item(progress, &result, 1);
        result
    }

    async fn run_parallel(
        &self,
        items: Vec<WorkItem>,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ItemResult>, SnapTexError> {
        let total = items.len();
        let start = Instant::now();
        info!(
            "Dispatching {} items to {} workers ({:?} pacing)",
            total, self.max_workers, self.pacing_delay
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut pending = FuturesUnordered::new();
        let mut spawned = AbortOnDrop::default();

        for (n, item) in items.into_iter().enumerate() {
            if n > 0 && !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| SnapTexError::WorkerPool(format!("semaphore closed: {e}")))?;

            let converter = Arc::clone(&self.converter);
            let task_progress = progress.cloned();
            let task_item = item.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                if let Some(ref cb) = task_progress {
                    cb.on_item_start(task_item.index(), total);
                }
                let result = converter.convert(&task_item).await;
                report_item(task_progress.as_ref(), &result, total);
                result
            });
            spawned.0.push(handle.abort_handle());

            pending.push(async move { (item, handle.await) });
        }
        debug!("All {} items submitted after {:?}", total, start.elapsed());

        let mut results = Vec::with_capacity(total);
        while let Some((item, joined)) = pending.next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) if e.is_panic() => {
                    let msg = panic_message(e.into_panic().as_ref());
                    warn!("Worker panicked on {}: {}", item.path().display(), msg);
                    let result = ItemResult::failure(&item, format!("worker panicked: {msg}"), 0);
                    report_item(progress, &result, total);
                    results.push(result);
                }
                Err(e) => {
                    return Err(SnapTexError::WorkerPool(format!(
                        "task for item {} did not complete: {e}",
                        item.index()
                    )));
                }
            }
        }

        if results.len() > 1 {
            results.sort_by_key(ItemResult::ordering_key);
        }

        let failed = results.iter().filter(|r| !r.ok).count();
        info!(
            "Batch finished: {}/{} items converted in {:?}",
            total - failed,
            total,
            start.elapsed()
        );
        Ok(results)
    }
}

/// Aborts every registered task when dropped. Finished tasks ignore it.
#[derive(Default)]
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn report_item(progress: Option<&ProgressCallback>, result: &ItemResult, total: usize) {
    let Some(cb) = progress else {
        return;
    };
    match &result.error {
        None => cb.on_item_complete(result.index, total, result.content.len()),
        Some(e) => cb.on_item_error(result.index, total, e),
    }
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
