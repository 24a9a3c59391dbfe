//! Executes a declarative dialogue graph one turn at a time.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome};
use crate::domain::ticket::{SupportTicket, TicketCategory, TicketId};
use crate::errors::FlowError;
use crate::flows::catalog::ticket_category_for;
use crate::flows::engine::Flow;
use crate::flows::labels;
use crate::flows::nodes::{FlowDefinition, Node, NodeEffect, NodeId, Target};
use crate::flows::states::{ConversationContext, Handoff, Locus, Message, Topic, Turn};
use crate::flows::submission::authenticated_customer;
use crate::flows::FlowServices;
use crate::store::DataStore;

const CHOOSE_OPTION: &str = "Please choose one of the options below.";
const DETAIL_NOTED: &str = "Noted. Add more details or choose an option below when you're ready.";

pub struct StaticFlow<S> {
    definition: FlowDefinition,
    services: FlowServices<S>,
}

impl<S> StaticFlow<S>
where
    S: DataStore + 'static,
{
    pub fn new(definition: FlowDefinition, services: FlowServices<S>) -> Self {
        Self { definition, services }
    }

    fn show(&self, mut context: ConversationContext, node: &Node, mut messages: Vec<Message>) -> Turn {
        if let Some(prompt) = &node.prompt {
            messages.push(Message::bot(prompt.clone()));
        }
        context.locus = Locus::Static { node: node.id, details: Vec::new() };
        Turn::reply(context, messages, replies_for(node))
    }

    fn current<'a>(&'a self, context: &ConversationContext) -> Option<(&'a Node, Vec<String>)> {
        match &context.locus {
            Locus::Static { node, details } => {
                self.definition.node(*node).map(|node| (node, details.clone()))
            }
            _ => None,
        }
    }

    async fn run_effect(
        &self,
        context: &ConversationContext,
        effect: NodeEffect,
        source: NodeId,
        details: &[String],
    ) -> Result<Vec<Message>, FlowError> {
        match effect {
            NodeEffect::CreateTicket => self.create_ticket(context, source, details).await,
            NodeEffect::ListTickets => self.list_tickets(context).await,
        }
    }

    async fn create_ticket(
        &self,
        context: &ConversationContext,
        source: NodeId,
        details: &[String],
    ) -> Result<Vec<Message>, FlowError> {
        let customer_id = authenticated_customer(&context.session)?;
        let description = details.join("\n").trim().to_owned();
        if description.is_empty() {
            return Err(FlowError::Validation(
                "Please describe your concern before submitting the ticket.".to_owned(),
            ));
        }

        let ticket = SupportTicket {
            id: TicketId(Uuid::new_v4().to_string()),
            customer_id,
            category: ticket_category_for(source).unwrap_or(TicketCategory::Other),
            description,
            status: "open".to_owned(),
            created_at: Utc::now(),
        };
        self.services.store.insert_ticket(&ticket).await.map_err(FlowError::write)?;

        info!(
            event_name = "ticket.created",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            ticket_id = %ticket.id.0,
            category = ticket.category.as_str(),
            "support ticket created"
        );
        self.services.audit.emit(
            AuditEvent::new(
                &AuditContext::for_turn(context, None),
                "ticket.created",
                AuditCategory::Ticket,
                AuditOutcome::Success,
            )
            .with_metadata("ticket_id", ticket.id.0.clone())
            .with_metadata("category", ticket.category.as_str()),
        );

        Ok(vec![Message::bot(format!(
            "Your ticket {} ({}) has been submitted.",
            short_id(&ticket.id.0),
            ticket.category.label()
        ))])
    }

    async fn list_tickets(&self, context: &ConversationContext) -> Result<Vec<Message>, FlowError> {
        let customer_id = authenticated_customer(&context.session)?;
        let tickets = self
            .services
            .store
            .list_tickets_for_customer(&customer_id)
            .await
            .map_err(FlowError::read)?;

        if tickets.is_empty() {
            return Ok(vec![Message::bot("You haven't submitted any tickets yet.")]);
        }

        let lines = tickets
            .iter()
            .map(|ticket| {
                format!(
                    "- {} | {} | {} | {}",
                    short_id(&ticket.id.0),
                    ticket.category.label(),
                    ticket.status,
                    ticket.created_at.format("%Y-%m-%d")
                )
            })
            .collect::<Vec<_>>();
        Ok(vec![Message::bot(format!("Your tickets:\n{}", lines.join("\n")))])
    }
}

#[async_trait]
impl<S> Flow for StaticFlow<S>
where
    S: DataStore + 'static,
{
    fn topic(&self) -> Topic {
        self.definition.topic()
    }

    async fn initial(&self, context: ConversationContext) -> Turn {
        self.show(context, self.definition.start(), Vec::new())
    }

    fn quick_replies(&self, context: &ConversationContext) -> Vec<String> {
        match self.current(context) {
            Some((node, _)) => replies_for(node),
            None => replies_for(self.definition.start()),
        }
    }

    async fn respond(&self, mut context: ConversationContext, input: &str) -> Turn {
        let Some((node, mut details)) = self.current(&context) else {
            return self.initial(context).await;
        };

        let Some(option) = node.find_option(input) else {
            let text = input.trim();
            if node.collects_details && !text.is_empty() {
                append_detail(&mut details, text, self.services.settings.max_detail_chars);
                context.locus = Locus::Static { node: node.id, details };
                return Turn::reply(context, vec![Message::bot(DETAIL_NOTED)], replies_for(node));
            }
            return Turn::reply(context, vec![Message::bot(CHOOSE_OPTION)], replies_for(node));
        };

        match option.target {
            Target::EndChat => Turn::handoff(context, Vec::new(), Handoff::EndChat),
            Target::Flow(topic) => Turn::handoff(context, Vec::new(), Handoff::Enter(topic)),
            Target::Node(target_id) => {
                let Some(target) = self.definition.node(target_id) else {
                    return Turn::reply(context, vec![Message::bot(CHOOSE_OPTION)], replies_for(node));
                };

                let mut messages = Vec::new();
                if let Some(effect) = target.effect {
                    match self.run_effect(&context, effect, node.id, &details).await {
                        Ok(mut output) => messages.append(&mut output),
                        Err(error) => {
                            warn!(
                                event_name = "static.effect_failed",
                                session_id = %context.session.id,
                                correlation_id = %context.correlation_id(),
                                node = ?target_id,
                                error_class = error.class(),
                                error = %error,
                                "node effect failed"
                            );
                            let retry = format!("{} You can tap {} to try again.", error.user_message(), option.label);
                            return Turn::reply(context, vec![Message::bot(retry)], replies_for(node));
                        }
                    }
                }
                self.show(context, target, messages)
            }
        }
    }
}

fn replies_for(node: &Node) -> Vec<String> {
    if node.id == NodeId::End {
        return labels::owned(&[labels::END_CHAT]);
    }
    node.labels()
}

fn append_detail(details: &mut Vec<String>, text: &str, max_chars: usize) {
    let used = details.iter().map(|detail| detail.chars().count()).sum::<usize>();
    let remaining = max_chars.saturating_sub(used);
    if remaining == 0 {
        return;
    }
    details.push(text.chars().take(remaining).collect());
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect::<String>().to_uppercase()
}
