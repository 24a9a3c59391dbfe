use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use printdesk_core::flows::{
    ConversationContext, FlowRegistry, FlowServices, GraphError, Locus, Message, SessionId,
    SessionStatus,
};
use printdesk_core::store::DataStore;

use crate::session::{SessionArena, SessionEntry};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("unknown chat session `{0}`")]
    UnknownSession(SessionId),
    #[error("chat session `{0}` has ended")]
    SessionEnded(SessionId),
}

/// What a transport renders after a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub quick_replies: Vec<String>,
    /// Set once the chat is over; the session then only awaits
    /// [`ChatRuntime::end_session`].
    pub ended: bool,
}

pub struct ChatRuntime {
    registry: Arc<FlowRegistry>,
    sessions: SessionArena,
}

impl ChatRuntime {
    pub fn new(registry: FlowRegistry) -> Self {
        Self { registry: Arc::new(registry), sessions: SessionArena::new() }
    }

    /// Runtime over the standard menu, ordering and negotiation flows.
    pub fn standard<S>(services: FlowServices<S>) -> Result<Self, GraphError>
    where
        S: DataStore + 'static,
    {
        Ok(Self::new(FlowRegistry::standard(services)?))
    }

    pub async fn start_session(&self, customer_id: Option<String>) -> ChatReply {
        let context = ConversationContext::new(customer_id);
        let session_id = context.session.id.clone();
        let turn = self.registry.start(context).await;

        info!(
            event_name = "chat.session_started",
            session_id = %session_id,
            topic = turn.context.session.active_flow.key(),
            signed_in = turn.context.session.customer_id.is_some(),
            "chat session started"
        );

        let mut entry = SessionEntry::new(turn.context);
        entry.transcript.extend(turn.messages.iter().cloned());
        entry.quick_replies = turn.quick_replies.clone();
        let ended = entry.context.is_ended();
        self.sessions.insert(entry).await;

        ChatReply { session_id, messages: turn.messages, quick_replies: turn.quick_replies, ended }
    }

    /// Runs one user turn. The session's lock is held for the whole turn, so
    /// a second input for the same session waits until this one settles.
    ///
    /// A session that ends here stays registered so its transcript can still
    /// be read. The caller releases it with [`ChatRuntime::end_session`].
    pub async fn handle_input(
        &self,
        session_id: &SessionId,
        input: &str,
    ) -> Result<ChatReply, RuntimeError> {
        let slot = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| RuntimeError::UnknownSession(session_id.clone()))?;
        let mut entry = slot.lock().await;
        if entry.context.is_ended() {
            return Err(RuntimeError::SessionEnded(session_id.clone()));
        }

        let mut context = entry.context.clone();
        context.session.turn_count += 1;
        let correlation_id = context.correlation_id();
        entry.transcript.push(Message::user(input));

        let turn = self.registry.respond(context, input).await;

        info!(
            event_name = "chat.turn",
            session_id = %session_id,
            topic = turn.context.session.active_flow.key(),
            correlation_id = %correlation_id,
            locus = locus_name(&turn.context.locus),
            reply_count = turn.messages.len(),
            "chat turn handled"
        );

        entry.context = turn.context;
        entry.transcript.extend(turn.messages.iter().cloned());
        entry.quick_replies = turn.quick_replies.clone();

        Ok(ChatReply {
            session_id: session_id.clone(),
            messages: turn.messages,
            quick_replies: turn.quick_replies,
            ended: entry.context.is_ended(),
        })
    }

    pub async fn quick_replies(&self, session_id: &SessionId) -> Result<Vec<String>, RuntimeError> {
        let slot = self.slot(session_id).await?;
        let entry = slot.lock().await;
        Ok(entry.quick_replies.clone())
    }

    pub async fn transcript(&self, session_id: &SessionId) -> Result<Vec<Message>, RuntimeError> {
        let slot = self.slot(session_id).await?;
        let entry = slot.lock().await;
        Ok(entry.transcript.clone())
    }

    /// Snapshot of the session's conversation state.
    pub async fn context(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationContext, RuntimeError> {
        let slot = self.slot(session_id).await?;
        let entry = slot.lock().await;
        Ok(entry.context.clone())
    }

    /// Drops the session from the arena and returns its transcript. Works for
    /// sessions that already ended through the End Chat option.
    pub async fn end_session(&self, session_id: &SessionId) -> Result<Vec<Message>, RuntimeError> {
        let slot = self
            .sessions
            .remove(session_id)
            .await
            .ok_or_else(|| RuntimeError::UnknownSession(session_id.clone()))?;
        let mut entry = slot.lock().await;
        if !entry.context.is_ended() {
            warn!(
                event_name = "chat.session_abandoned",
                session_id = %session_id,
                topic = entry.context.session.active_flow.key(),
                turn_count = entry.context.session.turn_count,
                "chat session closed before End Chat"
            );
            entry.context.session.status = SessionStatus::Ended;
            entry.context.locus = Locus::Ended;
        }

        info!(
            event_name = "chat.session_closed",
            session_id = %session_id,
            turn_count = entry.context.session.turn_count,
            "chat session closed"
        );
        Ok(std::mem::take(&mut entry.transcript))
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    async fn slot(
        &self,
        session_id: &SessionId,
    ) -> Result<Arc<tokio::sync::Mutex<SessionEntry>>, RuntimeError> {
        self.sessions
            .get(session_id)
            .await
            .ok_or_else(|| RuntimeError::UnknownSession(session_id.clone()))
    }
}

fn locus_name(locus: &Locus) -> &'static str {
    match locus {
        Locus::Idle => "idle",
        Locus::Static { .. } => "static",
        Locus::Ordering(_) => "ordering",
        Locus::TrackingOrders { .. } => "tracking_orders",
        Locus::Negotiating(_) => "negotiating",
        Locus::Ended => "ended",
    }
}
