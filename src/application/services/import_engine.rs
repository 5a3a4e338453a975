//! Batch Import Engine
//!
//! Rows are taken in fixed-size chunks. Inside a chunk every row is priced
//! concurrently (validate, resolve, calculate); the results are then written
//! one at a time in source order, so the store never sees two writes in
//! flight regardless of how resolution latencies interleave.
//!
//! Cancellation is polled at chunk boundaries only, including the boundary
//! after the last chunk. A cancelled run deletes every record tagged with its
//! session id. Records it merely updated keep their new values and their
//! original tag.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::services::order_pricer::OrderPricer;
use crate::domain::entities::import_session::{
    CancellationToken, ImportEvent, ImportSummary, RowFailure, SessionId,
};
use crate::domain::entities::order::RawRow;
use crate::domain::errors::{ImportError, RowError};
use crate::domain::repositories::order_store::OrderStore;

pub const DEFAULT_CHUNK_SIZE: usize = 5;
pub const DEFAULT_MAX_ERROR_SAMPLES: usize = 20;

/// Per-run context. Synchronous imports use [`ImportRun::detached`].
pub struct ImportRun<'a> {
    pub session_id: Option<&'a SessionId>,
    pub cancel: &'a CancellationToken,
    pub events: Option<&'a mpsc::Sender<ImportEvent>>,
}

impl<'a> ImportRun<'a> {
    /// No session tag, no events, never cancelled.
    pub fn detached(cancel: &'a CancellationToken) -> Self {
        Self {
            session_id: None,
            cancel,
            events: None,
        }
    }

    pub fn streaming(
        session_id: &'a SessionId,
        cancel: &'a CancellationToken,
        events: &'a mpsc::Sender<ImportEvent>,
    ) -> Self {
        Self {
            session_id: Some(session_id),
            cancel,
            events: Some(events),
        }
    }

    async fn emit(&self, event: ImportEvent) {
        if let Some(events) = self.events {
            if events.send(event).await.is_err() {
                debug!("Import event receiver dropped, continuing without it");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Completed(ImportSummary),
    Cancelled {
        summary: ImportSummary,
        rolled_back: u64,
    },
}

impl ImportOutcome {
    pub fn summary(&self) -> &ImportSummary {
        match self {
            ImportOutcome::Completed(summary) => summary,
            ImportOutcome::Cancelled { summary, .. } => summary,
        }
    }

    pub fn into_terminal_event(self) -> ImportEvent {
        match self {
            ImportOutcome::Completed(summary) => ImportEvent::Done {
                success: summary.success,
                failed: summary.failed,
                errors: summary.errors,
            },
            ImportOutcome::Cancelled { rolled_back, .. } => ImportEvent::Cancelled {
                rolled_back,
                error: None,
            },
        }
    }
}

pub struct ImportEngine {
    pricer: Arc<OrderPricer>,
    store: Arc<dyn OrderStore>,
    chunk_size: usize,
    max_error_samples: usize,
}

impl ImportEngine {
    pub fn new(pricer: Arc<OrderPricer>, store: Arc<dyn OrderStore>) -> Self {
        Self {
            pricer,
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_error_samples: DEFAULT_MAX_ERROR_SAMPLES,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_error_samples(mut self, max_error_samples: usize) -> Self {
        self.max_error_samples = max_error_samples;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Process `rows` to completion or cancellation.
    ///
    /// Row failures are counted, never returned. The only error is a failed
    /// rollback after cancellation.
    pub async fn run(
        &self,
        rows: &[RawRow],
        run: &ImportRun<'_>,
    ) -> Result<ImportOutcome, ImportError> {
        let tag = run.session_id.map(SessionId::as_str);
        let mut summary = ImportSummary::default();

        for (chunk_index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            if run.cancel.is_cancelled() {
                return self.cancel(run, summary).await;
            }

            summary.chunks += 1;
            debug!(
                "Processing chunk {} ({} rows) of session {}",
                chunk_index + 1,
                chunk.len(),
                tag.unwrap_or("-")
            );

            let priced = join_all(chunk.iter().map(|row| self.pricer.price(row))).await;

            for (offset, (row, result)) in chunk.iter().zip(priced).enumerate() {
                let row_number = chunk_index * self.chunk_size + offset + 1;

                let outcome = match result {
                    Ok(priced) => {
                        if priced.fallback.is_some() {
                            summary.fallbacks += 1;
                        }
                        self.store
                            .upsert(&priced.order, tag)
                            .await
                            .map(|_| ())
                            .map_err(|e| {
                                error!("Failed to persist row {}: {}", row_number, e);
                                RowError::PersistenceFailure(e.to_string())
                            })
                    }
                    Err(e) => Err(e),
                };

                let ok = outcome.is_ok();
                match outcome {
                    Ok(()) => summary.success += 1,
                    Err(e) => {
                        summary.failed += 1;
                        if summary.errors.len() < self.max_error_samples {
                            summary.errors.push(RowFailure {
                                row: row_number,
                                id: row.label(),
                                error: e.to_string(),
                            });
                        }
                    }
                }

                run.emit(ImportEvent::Progress {
                    processed: summary.processed(),
                    id: row.label(),
                    ok,
                })
                .await;
            }
        }

        if run.cancel.is_cancelled() {
            return self.cancel(run, summary).await;
        }

        info!(
            "Import {} finished: {} succeeded, {} failed, {} fallback rates",
            tag.unwrap_or("(synchronous)"),
            summary.success,
            summary.failed,
            summary.fallbacks
        );
        Ok(ImportOutcome::Completed(summary))
    }

    async fn cancel(
        &self,
        run: &ImportRun<'_>,
        summary: ImportSummary,
    ) -> Result<ImportOutcome, ImportError> {
        let rolled_back = match run.session_id {
            Some(session_id) => self.store.delete_by_session(session_id.as_str()).await?,
            None => 0,
        };
        warn!(
            "Import {} cancelled after {} rows, rolled back {} inserted records",
            run.session_id.map(SessionId::as_str).unwrap_or("(synchronous)"),
            summary.processed(),
            rolled_back
        );
        Ok(ImportOutcome::Cancelled {
            summary,
            rolled_back,
        })
    }
}
