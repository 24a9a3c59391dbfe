//! Place Order and Track Order: the dynamic flows composed of the phase
//! pipeline, order submission and quote negotiation.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::order::OrderDraft;
use crate::errors::FlowError;
use crate::flows::engine::Flow;
use crate::flows::labels;
use crate::flows::negotiation::{NegotiationStep, QuoteNegotiationMachine};
use crate::flows::pipeline::{self, PhasePipeline, PipelineStep};
use crate::flows::states::{
    ConversationContext, Handoff, Locus, Message, NegotiationStage, NegotiationState,
    OrderingPurpose, Phase, Topic, TrackedOrder, Turn,
};
use crate::flows::submission::{authenticated_customer, OrderSubmission};
use crate::flows::FlowServices;
use crate::store::DataStore;

const CHOOSE_OPTION: &str = "Please choose one of the options below.";

pub struct OrderFlow<S> {
    topic: Topic,
    services: FlowServices<S>,
}

impl<S> OrderFlow<S>
where
    S: DataStore + 'static,
{
    pub fn new(topic: Topic, services: FlowServices<S>) -> Self {
        Self { topic, services }
    }

    fn pipeline(&self) -> PhasePipeline<'_, S> {
        PhasePipeline::new(self.services.store.as_ref())
    }

    fn negotiation(&self) -> QuoteNegotiationMachine<'_, S> {
        QuoteNegotiationMachine::new(&self.services)
    }

    async fn start_order(&self, context: ConversationContext) -> Turn {
        let step = self
            .pipeline()
            .start(OrderingPurpose::NewOrder, Phase::Products, OrderDraft::default())
            .await;
        match step {
            Ok(step) => self.pipeline_turn(context, step, Vec::new()).await,
            Err(error) => leave_to_menu(context, &error),
        }
    }

    async fn start_tracking(&self, mut context: ConversationContext) -> Turn {
        let customer_id = match authenticated_customer(&context.session) {
            Ok(customer_id) => customer_id,
            Err(error) => return leave_to_menu(context, &error),
        };
        let orders = match self
            .services
            .store
            .list_orders_for_customer(&customer_id, self.services.settings.recent_orders_limit)
            .await
        {
            Ok(orders) => orders,
            Err(error) => return leave_to_menu(context, &FlowError::read(error)),
        };

        if orders.is_empty() {
            return Turn::handoff(
                context,
                vec![Message::bot("You don't have any orders yet.")],
                Handoff::Enter(Topic::MainMenu),
            );
        }

        let orders = orders
            .iter()
            .map(|order| TrackedOrder {
                label: format!(
                    "Order {} - {}",
                    order.id.0.chars().take(8).collect::<String>().to_uppercase(),
                    order.service_name
                ),
                order_id: order.id.clone(),
            })
            .collect::<Vec<_>>();
        let replies = tracking_replies(&orders);
        context.locus = Locus::TrackingOrders { orders };
        Turn::reply(context, vec![Message::bot("Which order would you like to check?")], replies)
    }

    async fn pipeline_turn(
        &self,
        mut context: ConversationContext,
        step: PipelineStep,
        mut messages: Vec<Message>,
    ) -> Turn {
        match step {
            PipelineStep::Show(state) => {
                let (mut prompt, replies) = pipeline::render(&state);
                messages.append(&mut prompt);
                context.locus = Locus::Ordering(state);
                Turn::reply(context, messages, replies)
            }
            PipelineStep::Unrecognized(state) => {
                let (_, replies) = pipeline::render(&state);
                messages.push(Message::bot(CHOOSE_OPTION));
                context.locus = Locus::Ordering(state);
                Turn::reply(context, messages, replies)
            }
            PipelineStep::Exit(state) => match state.purpose {
                OrderingPurpose::NewOrder => {
                    context.locus = Locus::Idle;
                    Turn::handoff(context, messages, Handoff::Enter(Topic::MainMenu))
                }
                OrderingPurpose::Edit(negotiation) => {
                    let step = QuoteNegotiationMachine::<S>::abandon_edit(*negotiation);
                    self.negotiation_turn(context, step, messages).await
                }
            },
            PipelineStep::Confirmed(state) => {
                match OrderSubmission::new(&self.services).submit(&context, &state.draft).await {
                    Ok(order) => {
                        messages.push(Message::bot(format!(
                            "Your order has been placed! We'll prepare a quote for your {}. Tap {} to see if it's ready.",
                            order.service_name,
                            labels::CHECK_QUOTE
                        )));
                        let negotiation =
                            NegotiationState::for_order(&order, NegotiationStage::AwaitingQuote);
                        let replies = QuoteNegotiationMachine::<S>::quick_replies(&negotiation);
                        context.locus = Locus::Negotiating(negotiation);
                        Turn::reply(context, messages, replies)
                    }
                    Err(error) => {
                        let (_, replies) = pipeline::render(&state);
                        messages.push(Message::bot(error.user_message()));
                        context.locus = Locus::Ordering(state);
                        Turn::reply(context, messages, replies)
                    }
                }
            }
            PipelineStep::Completed(state) => {
                let OrderingPurpose::Edit(negotiation) = state.purpose.clone() else {
                    let (mut prompt, replies) = pipeline::render(&state);
                    messages.append(&mut prompt);
                    context.locus = Locus::Ordering(state);
                    return Turn::reply(context, messages, replies);
                };
                let completed =
                    self.negotiation().complete_edit(&context, *negotiation, &state.draft).await;
                match completed {
                    Ok(step) => self.negotiation_turn(context, step, messages).await,
                    Err(error) => self.failed(context, &error),
                }
            }
            PipelineStep::EndChat => Turn::handoff(context, messages, Handoff::EndChat),
        }
    }

    /// Boxed because an edit step re-enters the pipeline.
    fn negotiation_turn<'s>(
        &'s self,
        mut context: ConversationContext,
        step: NegotiationStep,
        mut messages: Vec<Message>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Turn> + Send + 's>> {
        Box::pin(async move {
            match step {
                NegotiationStep::Reply { state, messages: mut reply } => {
                    messages.append(&mut reply);
                    let replies = QuoteNegotiationMachine::<S>::quick_replies(&state);
                    context.locus = Locus::Negotiating(state);
                    Turn::reply(context, messages, replies)
                }
                NegotiationStep::Handoff { messages: mut reply, handoff } => {
                    messages.append(&mut reply);
                    Turn::handoff(context, messages, handoff)
                }
                NegotiationStep::Edit { state, entry, draft } => {
                    let started =
                        self.pipeline().start(OrderingPurpose::Edit(Box::new(state)), entry, draft).await;
                    match started {
                        Ok(step) => self.pipeline_turn(context, step, messages).await,
                        Err(error) => self.failed(context, &error),
                    }
                }
            }
        })
    }

    /// Keeps the previous context and shows the error with the same replies.
    fn failed(&self, context: ConversationContext, error: &FlowError) -> Turn {
        warn!(
            event_name = "flow.turn_failed",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            topic = self.topic.key(),
            error_class = error.class(),
            error = %error,
            "turn failed"
        );
        let replies = self.quick_replies(&context);
        Turn::reply(context, vec![Message::bot(error.user_message())], replies)
    }
}

#[async_trait]
impl<S> Flow for OrderFlow<S>
where
    S: DataStore + 'static,
{
    fn topic(&self) -> Topic {
        self.topic
    }

    async fn initial(&self, context: ConversationContext) -> Turn {
        match self.topic {
            Topic::TrackOrder => self.start_tracking(context).await,
            _ => self.start_order(context).await,
        }
    }

    fn quick_replies(&self, context: &ConversationContext) -> Vec<String> {
        match &context.locus {
            Locus::Ordering(state) => pipeline::render(state).1,
            Locus::Negotiating(state) => QuoteNegotiationMachine::<S>::quick_replies(state),
            Locus::TrackingOrders { orders } => tracking_replies(orders),
            _ => Vec::new(),
        }
    }

    async fn respond(&self, context: ConversationContext, input: &str) -> Turn {
        match context.locus.clone() {
            Locus::Ordering(state) => match self.pipeline().respond(state, input).await {
                Ok(step) => self.pipeline_turn(context, step, Vec::new()).await,
                Err(error) => self.failed(context, &error),
            },
            Locus::Negotiating(state) => {
                match self.negotiation().respond(&context, state, input).await {
                    Ok(step) => self.negotiation_turn(context, step, Vec::new()).await,
                    Err(error) => self.failed(context, &error),
                }
            }
            Locus::TrackingOrders { orders } => {
                if labels::matches(input, labels::BACK_TO_MENU) {
                    return Turn::handoff(context, Vec::new(), Handoff::Enter(Topic::MainMenu));
                }
                if labels::matches(input, labels::END_CHAT) {
                    return Turn::handoff(context, Vec::new(), Handoff::EndChat);
                }
                let Some(chosen) = orders.iter().find(|order| labels::matches(input, &order.label))
                else {
                    return Turn::reply(
                        context,
                        vec![Message::bot(CHOOSE_OPTION)],
                        tracking_replies(&orders),
                    );
                };
                match self.negotiation().resume(&context, &chosen.order_id).await {
                    Ok(step) => self.negotiation_turn(context, step, Vec::new()).await,
                    Err(error) => self.failed(context, &error),
                }
            }
            _ => self.initial(context).await,
        }
    }
}

fn tracking_replies(orders: &[TrackedOrder]) -> Vec<String> {
    let mut replies = orders.iter().map(|order| order.label.clone()).collect::<Vec<_>>();
    replies.push(labels::BACK_TO_MENU.to_owned());
    replies.push(labels::END_CHAT.to_owned());
    replies
}

fn leave_to_menu(mut context: ConversationContext, error: &FlowError) -> Turn {
    warn!(
        event_name = "flow.entry_failed",
        session_id = %context.session.id,
        correlation_id = %context.correlation_id(),
        error_class = error.class(),
        error = %error,
        "could not enter flow"
    );
    context.locus = Locus::Idle;
    Turn::handoff(context, vec![Message::bot(error.user_message())], Handoff::Enter(Topic::MainMenu))
}
