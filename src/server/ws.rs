//! Per-connection session loop.

use super::AppState;
use crate::models::{ClientMessage, JobKind, SessionEvent, VerificationJob};
use crate::services::VerificationPipeline;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use std::collections::VecDeque;
use uuid::Uuid;

pub(super) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// What a session does with one inbound message.
#[derive(Debug)]
enum Action {
    /// Answer the session directly.
    Reply(SessionEvent),
    /// Hand a job to the orchestrator.
    Submit(VerificationJob),
    /// Nothing to do.
    Ignore,
}

/// Identity and bounded prior context of one connection.
struct Session {
    id: String,
    history: VecDeque<String>,
    history_len: usize,
}

impl Session {
    fn new(history_len: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            history: VecDeque::with_capacity(history_len),
            history_len,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn context(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    fn remember(&mut self, transcript: String) {
        if self.history_len == 0 {
            return;
        }
        while self.history.len() >= self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(transcript);
    }

    fn handle(&mut self, message: ClientMessage, pipeline: &VerificationPipeline) -> Action {
        match message {
            ClientMessage::Transcript {
                text,
                is_final: false,
            } => {
                let claims = pipeline.preview(&text);
                if claims.is_empty() {
                    Action::Ignore
                } else {
                    Action::Reply(SessionEvent::ClaimProcessing { claims })
                }
            },
            ClientMessage::Transcript {
                text,
                is_final: true,
            } => {
                if !pipeline.accepts_transcript(&text) {
                    return Action::Ignore;
                }
                let job =
                    VerificationJob::new(&self.id, text.clone(), self.context(), JobKind::Transcript);
                self.remember(text);
                Action::Submit(job)
            },
            ClientMessage::VerifyClaim { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Action::Ignore;
                }
                Action::Submit(VerificationJob::new(
                    &self.id,
                    text,
                    self.context(),
                    JobKind::Claim,
                ))
            },
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut session = Session::new(state.history_len);
    let mut events = state.registry.register(session.id());
    let mut stats_updates = state.registry.subscribe_stats();
    tracing::info!(session_id = %session.id(), "Session connected");

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(message)) = inbound else {
                    break;
                };
                match message {
                    Message::Text(text) => {
                        if let Some(reply) = handle_text(&mut session, &state, text.as_str()).await
                            && send(&mut socket, &reply).await.is_err()
                        {
                            break;
                        }
                    },
                    Message::Close(_) => break,
                    _ => {},
                }
            },
            Some(event) = events.recv() => {
                if send(&mut socket, &event).await.is_err() {
                    break;
                }
            },
            update = stats_updates.recv() => {
                let Some(stats) = update else {
                    break;
                };
                if send(&mut socket, &SessionEvent::StatsUpdate { stats }).await.is_err() {
                    break;
                }
            },
        }
    }

    state.registry.unregister(session.id());
    state.orchestrator.limiter().remove_session(session.id());
    tracing::info!(session_id = %session.id(), "Session disconnected");
}

/// Parses and acts on one text frame, returning a direct reply if any.
async fn handle_text(session: &mut Session, state: &AppState, text: &str) -> Option<SessionEvent> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(session_id = %session.id(), error = %e, "Ignoring unparseable message");
            metrics::counter!("session_messages_invalid_total").increment(1);
            return None;
        },
    };

    match session.handle(message, &state.pipeline) {
        Action::Reply(event) => Some(event),
        Action::Submit(job) => {
            let outcome = state.orchestrator.submit(job).await;
            tracing::debug!(session_id = %session.id(), outcome = outcome.as_str(), "Job submitted");
            None
        },
        Action::Ignore => None,
    }
}

async fn send(socket: &mut WebSocket, event: &SessionEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(payload) => socket.send(Message::Text(payload.into())).await,
        Err(e) => {
            tracing::error!(event = event.event_type(), error = %e, "Failed to serialize event");
            Ok(())
        },
    }
}
