//! Per-item conversion: one [`WorkItem`] in, one [`ItemResult`] out.
//!
//! The converter absorbs every generation error into a placeholder result,
//! so a single bad page never costs the rest of the batch.

use crate::generator::LatexGenerator;
use crate::output::ItemResult;
use crate::pipeline::source::WorkItem;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs the generator on a single work item.
pub struct ItemConverter {
    generator: Arc<dyn LatexGenerator>,
}

impl ItemConverter {
    pub fn new(generator: Arc<dyn LatexGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Convert `item`, calling the generator exactly once.
    ///
    /// Never fails: an error becomes a result with `ok == false` and a
    /// comment placeholder as content.
    pub async fn convert(&self, item: &WorkItem) -> ItemResult {
        let start = Instant::now();
        debug!(
            "{} #{}: converting {}",
            item.kind(),
            item.index(),
            item.path().display()
        );

        let outcome = self.generator.generate(item.path()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(latex) => ItemResult::success(item, latex, duration_ms),
            Err(e) => {
                warn!("Error processing {}: {}", item.path().display(), e);
                ItemResult::failure(item, e.to_string(), duration_ms)
            }
        }
    }
}
