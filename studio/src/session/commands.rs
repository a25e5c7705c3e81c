use movetree::{AnnotationKey, PgnError, SuggestedVariation, TreeError};
use tokio::sync::{broadcast, oneshot};

use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use crate::sync::AnnotationDelta;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No move at path {0:?}")]
    UnknownPath(Vec<usize>),
    #[error("A suggested line needs at least one move")]
    EmptyLine,
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Pgn(#[from] PgnError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Moves are addressed by child indices from the start position: 0 follows
/// the mainline continuation, `n` the n-th variation. The empty path is the
/// root. Node ids never cross the actor boundary.
pub type MovePath = Vec<usize>;

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    InsertSan {
        parent: MovePath,
        san: String,
        reply: oneshot::Sender<Result<(MovePath, SessionSnapshot), SessionError>>,
    },
    SuggestLine {
        parent: MovePath,
        sans: Vec<String>,
        training_comment: String,
        reply: oneshot::Sender<Result<(MovePath, SessionSnapshot), SessionError>>,
    },
    AcceptSuggestion {
        head: MovePath,
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    DeleteFrom {
        path: MovePath,
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    PromoteVariation {
        path: MovePath,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    ReplaceMove {
        path: MovePath,
        san: String,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    SetAnnotation {
        path: MovePath,
        key: AnnotationKey,
        value: String,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    MarkSaved {
        path: MovePath,
        key: AnnotationKey,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    SetTag {
        name: String,
        value: String,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    MergeSuggestions {
        suggestions: Vec<SuggestedVariation>,
        reply: oneshot::Sender<usize>,
    },
    MarkSynced {
        deltas: Vec<AnnotationDelta>,
        reply: oneshot::Sender<usize>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown,
}
