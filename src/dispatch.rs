//! Windowed, bounded-concurrency dispatch of analysis requests.
//!
//! The ordered batch is cut into windows of `concurrency` items. All requests
//! of a window are polled concurrently on the calling task and the whole
//! window must settle before the next one is launched, so at most
//! `concurrency` requests are ever in flight and results come back in
//! submission order no matter how they complete inside a window.
//!
//! Every item yields exactly one [`CanonicalResult`]; a failed request
//! becomes an error row and never halts the batch.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::client::AnalysisClient;
use crate::models::{BatchItem, CanonicalResult, ItemState};
use crate::normalize::normalize;
use crate::progress::{BatchEvent, BatchProgressReporter};

/// Default window size.
pub const DEFAULT_CONCURRENCY: usize = 3;

pub struct DispatchScheduler<'a> {
    client: &'a dyn AnalysisClient,
    reporter: &'a dyn BatchProgressReporter,
    concurrency: usize,
}

impl<'a> DispatchScheduler<'a> {
    /// A concurrency of zero is treated as one.
    pub fn new(
        client: &'a dyn AnalysisClient,
        reporter: &'a dyn BatchProgressReporter,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            reporter,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every item once. Items are expected to be `Queued`; the returned
    /// results line up index-for-index with `items`.
    pub async fn run(&self, items: &mut [BatchItem]) -> Vec<CanonicalResult> {
        let total = items.len();
        let windows = total.div_ceil(self.concurrency);
        let completed = AtomicUsize::new(0);
        let mut results = Vec::with_capacity(total);

        self.reporter.report(BatchEvent::Started { total, windows });
        info!(total, windows, concurrency = self.concurrency, "dispatching batch");

        for (w, window) in items.chunks_mut(self.concurrency).enumerate() {
            let base = w * self.concurrency;
            info!(window = w + 1, windows, size = window.len(), "starting window");
            self.reporter.report(BatchEvent::WindowStarted {
                window: w + 1,
                windows,
                size: window.len(),
            });

            let settled = join_all(
                window
                    .iter_mut()
                    .enumerate()
                    .map(|(i, item)| self.process(base + i, item, total, &completed)),
            )
            .await;
            results.extend(settled);
        }

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(total, successful = total - failed, failed, "batch drained");
        self.reporter.report(BatchEvent::Completed {
            total,
            successful: total - failed,
            failed,
        });
        results
    }

    async fn process(
        &self,
        index: usize,
        item: &mut BatchItem,
        total: usize,
        completed: &AtomicUsize,
    ) -> CanonicalResult {
        let label = item.file.logical_path.clone();
        item.advance(ItemState::Processing);
        debug!(index, path = %label, "processing");
        self.reporter.report(BatchEvent::ItemStarted {
            index,
            label: label.clone(),
        });

        let (result, state, message) = match self.client.analyze(&item.file).await {
            Ok(raw) => (normalize(&raw, &label), ItemState::Completed, None),
            Err(e) => {
                warn!(path = %label, error = %e, "analysis failed");
                let message = e.row_message();
                (
                    CanonicalResult::failed(&label, e.category(), message.clone()),
                    ItemState::Failed,
                    Some(message),
                )
            }
        };
        item.advance(state);

        self.reporter.report(BatchEvent::ItemSettled {
            index,
            label,
            state,
            message,
        });
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.reporter.report(BatchEvent::Progress {
            completed: done,
            total,
        });
        result
    }
}
