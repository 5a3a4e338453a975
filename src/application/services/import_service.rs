use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::services::import_engine::{ImportEngine, ImportRun};
use crate::application::services::session_registry::SessionRegistry;
use crate::domain::entities::import_session::{
    CancellationToken, ImportEvent, ImportSummary, SessionId,
};
use crate::domain::entities::order::RawRow;
use crate::domain::errors::ImportError;
use crate::infrastructure::csv_row_source;

pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Entry point for bulk imports.
///
/// Synchronous imports return a summary and are never tagged. Streaming
/// imports run on their own task, tag every inserted row with the session id
/// and report through a bounded channel.
#[derive(Clone)]
pub struct ImportService {
    engine: Arc<ImportEngine>,
    registry: Arc<SessionRegistry>,
    event_buffer: usize,
}

impl ImportService {
    pub fn new(engine: Arc<ImportEngine>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            engine,
            registry,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Run the whole batch and return the final counts.
    pub async fn import_synchronously(&self, rows: &[RawRow]) -> Result<ImportSummary, ImportError> {
        info!("Starting synchronous import of {} rows", rows.len());
        let never = CancellationToken::new();
        let outcome = self.engine.run(rows, &ImportRun::detached(&never)).await?;
        Ok(outcome.summary().clone())
    }

    pub async fn import_csv_synchronously(&self, data: &[u8]) -> Result<ImportSummary, ImportError> {
        let rows = csv_row_source::parse_rows(data)?;
        self.import_synchronously(&rows).await
    }

    /// Register a session and start importing in the background.
    ///
    /// The first event on the returned receiver is always `Session`; the last
    /// is always `Done` or `Cancelled`. By the time the terminal event is
    /// delivered the session is no longer cancellable.
    pub async fn start_streaming_import(
        &self,
        rows: Vec<RawRow>,
    ) -> (SessionId, mpsc::Receiver<ImportEvent>) {
        let session_id = SessionId::generate();
        let cancel = self.registry.register(session_id.clone()).await;
        let (tx, rx) = mpsc::channel(self.event_buffer);

        info!(
            "Starting streaming import {} of {} rows",
            session_id,
            rows.len()
        );

        let engine = self.engine.clone();
        let registry = self.registry.clone();
        let task_session = session_id.clone();
        tokio::spawn(async move {
            if tx
                .send(ImportEvent::Session {
                    session_id: task_session.clone(),
                })
                .await
                .is_err()
            {
                debug!(
                    "Import session {} started with no listener attached",
                    task_session
                );
            }

            let result = engine
                .run(&rows, &ImportRun::streaming(&task_session, &cancel, &tx))
                .await;

            registry.unregister(&task_session).await;

            let terminal = match result {
                Ok(outcome) => outcome.into_terminal_event(),
                Err(e) => {
                    error!("Rollback of import session {} failed: {}", task_session, e);
                    ImportEvent::Cancelled {
                        rolled_back: 0,
                        error: Some(format!("rollback failed: {}", e)),
                    }
                }
            };

            if tx.send(terminal).await.is_err() {
                warn!(
                    "Import session {} finished with no listener attached",
                    task_session
                );
            }
        });

        (session_id, rx)
    }

    /// Parse first, so a malformed file is rejected before any session exists.
    pub async fn start_streaming_csv_import(
        &self,
        data: &[u8],
    ) -> Result<(SessionId, mpsc::Receiver<ImportEvent>), ImportError> {
        let rows = csv_row_source::parse_rows(data)?;
        Ok(self.start_streaming_import(rows).await)
    }

    pub async fn cancel_session(&self, session_id: &SessionId) -> Result<(), ImportError> {
        self.registry.cancel(session_id).await
    }
}
