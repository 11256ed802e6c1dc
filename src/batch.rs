//! The owned batch aggregate.
//!
//! A [`Batch`] owns the working file set and the results of its last run and
//! moves from `Collecting` to `Drained` once a run finishes. [`Batch::reset`]
//! returns it to an empty `Collecting` state. A run holds the batch mutably,
//! so files cannot change underneath it; a run that is dropped before it
//! drains leaves the batch `Collecting` with no results.

use anyhow::{bail, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::client::AnalysisClient;
use crate::dispatch::DispatchScheduler;
use crate::fileset::VirtualFileSet;
use crate::models::{BatchItem, CanonicalResult};
use crate::progress::BatchProgressReporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Collecting,
    Drained,
}

/// Total / success / error counters. Every item counts exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchCounts {
    pub fn of(results: &[CanonicalResult]) -> Self {
        let failed = results.iter().filter(|r| r.is_error()).count();
        Self {
            total: results.len(),
            successful: results.len() - failed,
            failed,
        }
    }
}

#[derive(Debug)]
pub struct Batch {
    id: Uuid,
    files: VirtualFileSet,
    results: Vec<CanonicalResult>,
    phase: BatchPhase,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            files: VirtualFileSet::new(),
            results: Vec::new(),
            phase: BatchPhase::Collecting,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn files(&self) -> &VirtualFileSet {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut VirtualFileSet {
        &mut self.files
    }

    /// Dispatch every file once. Each run starts all items at `Queued` and
    /// replaces the results of any previous run.
    pub async fn run(
        &mut self,
        client: &dyn AnalysisClient,
        concurrency: usize,
        reporter: &dyn BatchProgressReporter,
    ) -> Result<&[CanonicalResult]> {
        if self.files.is_empty() {
            bail!("no files to process");
        }

        self.phase = BatchPhase::Collecting;
        self.results.clear();
        let mut items: Vec<BatchItem> =
            self.files.files().iter().cloned().map(BatchItem::new).collect();
        let scheduler = DispatchScheduler::new(client, reporter, concurrency);
        self.results = scheduler.run(&mut items).await;
        self.phase = BatchPhase::Drained;
        Ok(&self.results)
    }

    pub fn results(&self) -> &[CanonicalResult] {
        &self.results
    }

    pub fn counts(&self) -> BatchCounts {
        BatchCounts::of(&self.results)
    }

    /// Drop files and results and start over with a fresh id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
