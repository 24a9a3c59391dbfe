use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::flows::catalog;
use crate::flows::interpreter::StaticFlow;
use crate::flows::nodes::GraphError;
use crate::flows::ordering::OrderFlow;
use crate::flows::states::{
    ConversationContext, Handoff, Locus, Message, SessionStatus, Topic, Turn,
};
use crate::flows::FlowServices;
use crate::store::DataStore;

/// Upper bound on chained handoffs resolved within one turn.
const MAX_HANDOFFS: usize = 4;

const FAREWELL: &str = "Thank you for chatting with us. Have a great day!";
const CHAT_ENDED: &str = "This chat has ended. Please start a new chat if you need anything else.";

/// A pluggable conversation handler.
#[async_trait]
pub trait Flow: Send + Sync {
    fn topic(&self) -> Topic;

    /// Enters the flow from scratch, replacing whatever locus the context held.
    async fn initial(&self, context: ConversationContext) -> Turn;

    fn quick_replies(&self, context: &ConversationContext) -> Vec<String>;

    async fn respond(&self, context: ConversationContext, input: &str) -> Turn;
}

/// Maps topic keys to flows and resolves handoffs between them.
#[derive(Default)]
pub struct FlowRegistry {
    flows: HashMap<Topic, Arc<dyn Flow>>,
}

impl FlowRegistry {
    /// Registers every flow the portal assistant ships with.
    pub fn standard<S>(services: FlowServices<S>) -> Result<Self, GraphError>
    where
        S: DataStore + 'static,
    {
        let mut registry = Self::default();
        for definition in catalog::static_definitions()? {
            registry.register(StaticFlow::new(definition, services.clone()));
        }
        registry.register(OrderFlow::new(Topic::PlaceOrder, services.clone()));
        registry.register(OrderFlow::new(Topic::TrackOrder, services));
        Ok(registry)
    }

    pub fn register<F>(&mut self, flow: F)
    where
        F: Flow + 'static,
    {
        self.flows.insert(flow.topic(), Arc::new(flow));
    }

    pub fn get(&self, topic: Topic) -> Option<Arc<dyn Flow>> {
        self.flows.get(&topic).cloned()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Opens the session's active flow.
    pub async fn start(&self, context: ConversationContext) -> Turn {
        let topic = context.session.active_flow;
        match self.get(topic) {
            Some(flow) => {
                let turn = flow.initial(context).await;
                self.resolve(turn).await
            }
            None => unregistered(context, topic),
        }
    }

    pub async fn respond(&self, context: ConversationContext, input: &str) -> Turn {
        if context.is_ended() {
            return Turn::reply(context, vec![Message::bot(CHAT_ENDED)], Vec::new());
        }

        let topic = context.session.active_flow;
        match self.get(topic) {
            Some(flow) => {
                let turn = flow.respond(context, input).await;
                self.resolve(turn).await
            }
            None => unregistered(context, topic),
        }
    }

    pub fn quick_replies(&self, context: &ConversationContext) -> Vec<String> {
        if context.is_ended() {
            return Vec::new();
        }
        self.get(context.session.active_flow)
            .map(|flow| flow.quick_replies(context))
            .unwrap_or_default()
    }

    async fn resolve(&self, mut turn: Turn) -> Turn {
        for _ in 0..MAX_HANDOFFS {
            let Some(handoff) = turn.handoff.take() else {
                return turn;
            };

            match handoff {
                Handoff::EndChat => {
                    turn.context.session.status = SessionStatus::Ended;
                    turn.context.locus = Locus::Ended;
                    turn.messages.push(Message::bot(FAREWELL));
                    turn.quick_replies.clear();
                    info!(
                        event_name = "flow.chat_ended",
                        session_id = %turn.context.session.id,
                        correlation_id = %turn.context.correlation_id(),
                        "chat ended by user"
                    );
                    return turn;
                }
                Handoff::Enter(topic) => {
                    let Some(flow) = self.get(topic) else {
                        let mut failed = unregistered(turn.context, topic);
                        turn.messages.append(&mut failed.messages);
                        failed.messages = turn.messages;
                        return failed;
                    };
                    info!(
                        event_name = "flow.handoff",
                        session_id = %turn.context.session.id,
                        correlation_id = %turn.context.correlation_id(),
                        from = turn.context.session.active_flow.key(),
                        to = topic.key(),
                        "switching flow"
                    );

                    let mut context = turn.context;
                    context.session.active_flow = topic;
                    let mut next = flow.initial(context).await;
                    let mut messages = turn.messages;
                    messages.append(&mut next.messages);
                    next.messages = messages;
                    turn = next;
                }
            }
        }

        warn!(
            event_name = "flow.handoff_limit",
            session_id = %turn.context.session.id,
            "handoff chain exceeded limit"
        );
        turn.handoff = None;
        turn
    }
}

fn unregistered(context: ConversationContext, topic: Topic) -> Turn {
    warn!(
        event_name = "flow.unregistered_topic",
        session_id = %context.session.id,
        topic = topic.key(),
        "no flow registered for topic"
    );
    Turn::reply(
        context,
        vec![Message::bot("Sorry, that option isn't available right now.")],
        Vec::new(),
    )
}
