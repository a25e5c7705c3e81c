use movetree::{AnnotationKey, SuggestedVariation};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{MovePath, SessionCommand, SessionError};
use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use crate::sync::AnnotationDelta;

/// Cheap, cloneable handle to a session actor. The only way to change the
/// session's game.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Play `san` after `parent`. Returns the path of the resulting move,
    /// which already existed if the move had been played there before.
    pub async fn insert_san(
        &self,
        parent: MovePath,
        san: &str,
    ) -> Result<(MovePath, SessionSnapshot), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::InsertSan {
            parent,
            san: san.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn suggest_line(
        &self,
        parent: MovePath,
        sans: Vec<String>,
        training_comment: &str,
    ) -> Result<(MovePath, SessionSnapshot), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SuggestLine {
            parent,
            sans,
            training_comment: training_comment.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    /// Returns the number of moves swept.
    pub async fn accept_suggestion(&self, head: MovePath) -> Result<usize, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::AcceptSuggestion { head, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    /// Returns the number of removed moves.
    pub async fn delete_from(&self, path: MovePath) -> Result<usize, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::DeleteFrom { path, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn promote_variation(&self, path: MovePath) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::PromoteVariation { path, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn replace_move(
        &self,
        path: MovePath,
        san: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::ReplaceMove {
            path,
            san: san.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn set_annotation(
        &self,
        path: MovePath,
        key: AnnotationKey,
        value: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SetAnnotation {
            path,
            key,
            value: value.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn mark_saved(&self, path: MovePath, key: AnnotationKey) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::MarkSaved {
            path,
            key,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    pub async fn set_tag(&self, name: &str, value: &str) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SetTag {
            name: name.to_string(),
            value: value.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    /// Returns the number of created moves.
    pub async fn merge_suggestions(
        &self,
        suggestions: Vec<SuggestedVariation>,
    ) -> Result<usize, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::MergeSuggestions {
            suggestions,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    /// Returns the number of cleared entries.
    pub async fn mark_synced(&self, deltas: Vec<AnnotationDelta>) -> Result<usize, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::MarkSynced { deltas, reply: tx })
            .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    pub async fn get_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SessionEvent>), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("Session actor closed".into()))
    }
}
