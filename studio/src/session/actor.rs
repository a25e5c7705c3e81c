use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use super::commands::SessionCommand;
use super::events::SessionEvent;
use super::state::SessionState;

/// The main session actor loop.
/// Owns the game. Processes commands sequentially, so every mutation goes
/// through here and is announced to subscribers.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let game_id = state.game_id.clone();
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %game_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    loop {
        match cmd_rx.recv().await {
            Some(SessionCommand::Shutdown) | None => {
                tracing::info!("Session actor shutting down");
                break;
            }
            Some(cmd) => handle_command(&mut state, cmd, &event_tx),
        }
    }

    tracing::info!("Session actor exited");
}

fn publish(state: &SessionState, event_tx: &broadcast::Sender<SessionEvent>) {
    // No subscribers is fine.
    let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
}

fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::InsertSan { parent, san, reply } => {
            let result = state.apply_insert_san(&parent, &san);
            if let Ok((_, ref snap)) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::SuggestLine {
            parent,
            sans,
            training_comment,
            reply,
        } => {
            let result = state.apply_suggest_line(&parent, &sans, &training_comment);
            if let Ok((_, ref snap)) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::AcceptSuggestion { head, reply } => {
            let result = state.apply_accept_suggestion(&head);
            if result.is_ok() {
                publish(state, event_tx);
            }
            let _ = reply.send(result);
        }
        SessionCommand::DeleteFrom { path, reply } => {
            let result = state.apply_delete_from(&path);
            if result.is_ok() {
                publish(state, event_tx);
            }
            let _ = reply.send(result);
        }
        SessionCommand::PromoteVariation { path, reply } => {
            let result = state.apply_promote_variation(&path);
            if let Ok(ref snap) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::ReplaceMove { path, san, reply } => {
            let result = state.apply_replace_move(&path, &san);
            if let Ok(ref snap) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::SetAnnotation {
            path,
            key,
            value,
            reply,
        } => {
            let result = state.apply_set_annotation(&path, key, &value);
            if let Ok(ref snap) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::MarkSaved { path, key, reply } => {
            let result = state.apply_mark_saved(&path, &key);
            if let Ok(true) = result {
                publish(state, event_tx);
            }
            let _ = reply.send(result);
        }
        SessionCommand::SetTag { name, value, reply } => {
            let result = state.apply_set_tag(&name, &value);
            if let Ok(ref snap) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::MergeSuggestions { suggestions, reply } => {
            let created = state.apply_merge_suggestions(&suggestions);
            if created > 0 {
                publish(state, event_tx);
            }
            let _ = reply.send(created);
        }
        SessionCommand::MarkSynced { deltas, reply } => {
            let cleared = state.apply_synced(&deltas);
            if cleared > 0 {
                publish(state, event_tx);
            }
            let snap = state.snapshot();
            let _ = event_tx.send(SessionEvent::Synced {
                revision: snap.revision,
                cleared,
            });
            tracing::info!(cleared, pending = snap.dirty_count, "Annotations synced");
            let _ = reply.send(cleared);
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        SessionCommand::Subscribe { reply } => {
            let _ = reply.send((state.snapshot(), event_tx.subscribe()));
        }
        SessionCommand::Shutdown => {
            // Handled by the loop.
        }
    }
}
