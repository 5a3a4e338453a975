use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::entities::import_session::{CancellationToken, SessionId};
use crate::domain::errors::ImportError;

/// Live streaming sessions and their cancellation switches.
///
/// Constructed once by the application and shared by reference; a session is
/// present only between `register` and `unregister`.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and get its cancellation token
    pub async fn register(&self, session_id: SessionId) -> CancellationToken {
        let token = CancellationToken::new();
        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), token.clone());
        debug!("Registered import session {}", session_id);
        token
    }

    /// Flip the session's cancellation switch.
    ///
    /// Cancelling a live session twice is not an error; cancelling one that
    /// already finished (or never existed) is.
    pub async fn cancel(&self, session_id: &SessionId) -> Result<(), ImportError> {
        let sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(token) => {
                if token.cancel() {
                    info!("Cancellation requested for import session {}", session_id);
                }
                Ok(())
            }
            None => Err(ImportError::SessionNotFound(session_id.to_string())),
        }
    }

    pub async fn unregister(&self, session_id: &SessionId) {
        self.sessions.lock().await.remove(session_id);
        debug!("Unregistered import session {}", session_id);
    }

    pub async fn is_active(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
