//! Fixed-size worker pool applying one analytic to every tile.
//!
//! Workers pull tiles from a shared queue until it is closed and drained, so
//! slow tiles do not hold up a static partition. A tile that fails to load or
//! transform is dropped and tallied; it never stops the batch. Rows come back
//! in completion order, which is unspecified.

use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::analytics::{TileSource, Transformer};
use crate::output::OutputRow;
use crate::tile::Tile;

const PROGRESS_INTERVAL: usize = 100;

/// Failure count and most recent failure for one processing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageErrors {
    pub count: usize,
    pub last: Option<String>,
}

impl StageErrors {
    fn record(&mut self, err: impl ToString) {
        self.count += 1;
        self.last = Some(err.to_string());
    }

    fn merge(&mut self, other: StageErrors) {
        self.count += other.count;
        if other.last.is_some() {
            self.last = other.last;
        }
    }
}

/// Per-stage failures accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSummary {
    pub setup: StageErrors,
    pub transform: StageErrors,
}

impl ErrorSummary {
    pub fn merge(&mut self, other: ErrorSummary) {
        self.setup.merge(other.setup);
        self.transform.merge(other.transform);
    }

    pub fn total(&self) -> usize {
        self.setup.count + self.transform.count
    }

    /// Logs the counts and last error of every stage that failed at least once.
    pub fn report(&self) {
        for (stage, errors) in [("setup", &self.setup), ("transform", &self.transform)] {
            if errors.count > 0 {
                warn!("encountered {} {} errors", errors.count, stage);
                if let Some(last) = &errors.last {
                    warn!("last {} error: {}", stage, last);
                }
            }
        }
    }
}

/// Everything the pool produced.
#[derive(Debug, Default)]
pub struct PoolOutput {
    pub rows: Vec<OutputRow>,
    pub errors: ErrorSummary,
}

pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `analytic` over every tile and returns the successful rows.
    pub fn run(
        &self,
        tiles: Vec<Tile>,
        analytic: Arc<dyn Transformer>,
        source: Arc<TileSource>,
    ) -> PoolOutput {
        info!(tiles = tiles.len(), workers = self.workers, "processing tiles");

        let (tile_tx, tile_rx) = flume::unbounded::<Tile>();
        let (row_tx, row_rx) = flume::unbounded::<OutputRow>();
        let summary = Arc::new(Mutex::new(ErrorSummary::default()));

        let handles: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|worker| {
                let tiles = tile_rx.clone();
                let rows = row_tx.clone();
                let analytic = Arc::clone(&analytic);
                let source = Arc::clone(&source);
                let summary = Arc::clone(&summary);
                thread::spawn(move || {
                    let errors = tile_worker(worker, tiles, rows, analytic.as_ref(), &source);
                    summary.lock().merge(errors);
                })
            })
            .collect();
        drop(tile_rx);
        drop(row_tx);

        for tile in tiles {
            if tile_tx.send(tile).is_err() {
                // every worker has exited early; the join below surfaces why
                break;
            }
        }
        drop(tile_tx);

        // drains while workers are still producing
        let rows: Vec<OutputRow> = row_rx.iter().collect();

        let mut panics = Vec::new();
        for handle in handles {
            if let Err(e) = handle.join() {
                panics.push(e);
            }
        }
        if !panics.is_empty() {
            panic::resume_unwind(Box::new(panics));
        }

        let errors = std::mem::take(&mut *summary.lock());
        info!(rows = rows.len(), failed = errors.total(), "tile processing complete");
        PoolOutput { rows, errors }
    }
}

fn tile_worker(
    worker: usize,
    tiles: Receiver<Tile>,
    rows: Sender<OutputRow>,
    analytic: &dyn Transformer,
    source: &TileSource,
) -> ErrorSummary {
    let mut errors = ErrorSummary::default();
    let mut processed = 0usize;

    for tile in tiles {
        processed += 1;
        if processed % PROGRESS_INTERVAL == 0 {
            debug!(worker, "processed {}", processed);
        }

        let bands = match analytic.setup(source, &tile) {
            Ok(bands) => bands,
            Err(e) => {
                errors.setup.record(e);
                continue;
            }
        };
        let values = match analytic.transform(&bands) {
            Ok(values) => values,
            Err(e) => {
                errors.transform.record(format!("{}_{}: {}", tile.id, tile.date, e));
                continue;
            }
        };
        let Some(first) = bands.first() else {
            errors.transform.record(format!("{}_{}: no bands loaded", tile.id, tile.date));
            continue;
        };

        if rows.send(OutputRow::assemble(&tile, &first.bounds, &values)).is_err() {
            break;
        }
    }

    info!(worker, processed, "worker finished");
    errors
}
