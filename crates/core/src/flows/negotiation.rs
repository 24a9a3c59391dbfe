//! Quote negotiation over a submitted order.
//!
//! Local edits (price, remarks, product fields) live in [`NegotiationState`]
//! until the customer submits a modified quotation. Accepting, resubmitting
//! and cancelling write back onto the order row; the quote row is never
//! touched from here.

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::order::{OrderDraft, OrderId, OrderStatus, PlacedOrder, ProductEdits};
use crate::domain::quote::{latest_by_issue_time, Quote};
use crate::errors::FlowError;
use crate::flows::labels;
use crate::flows::states::{
    ConversationContext, Handoff, Message, NegotiationStage, NegotiationState, Phase, Topic,
};
use crate::flows::submission::authenticated_customer;
use crate::flows::FlowServices;
use crate::store::DataStore;

const STILL_PENDING: &str =
    "Your quote is still pending. Our team is reviewing your order; please check again later.";
const CHOOSE_OPTION: &str = "Please choose one of the options below.";
const UNSAVED_ACCEPT: &str = "You have unsaved changes. Please tap Submit Modified Quotation to send them, or Undo Changes before accepting the quote.";
const NOTHING_TO_SUBMIT: &str = "There are no changes to submit. You can accept the quote or make a change first.";

#[derive(Clone, Debug, PartialEq)]
pub enum NegotiationStep {
    Reply { state: NegotiationState, messages: Vec<Message> },
    /// Re-enter the ordering phases to edit the product.
    Edit { state: NegotiationState, entry: Phase, draft: OrderDraft },
    Handoff { messages: Vec<Message>, handoff: Handoff },
}

impl NegotiationStep {
    fn reply(state: NegotiationState, text: impl Into<String>) -> Self {
        Self::Reply { state, messages: vec![Message::bot(text)] }
    }
}

pub struct QuoteNegotiationMachine<'a, S> {
    services: &'a FlowServices<S>,
}

impl<'a, S> QuoteNegotiationMachine<'a, S>
where
    S: DataStore,
{
    pub fn new(services: &'a FlowServices<S>) -> Self {
        Self { services }
    }

    pub fn quick_replies(state: &NegotiationState) -> Vec<String> {
        match state.stage {
            NegotiationStage::AwaitingQuote => labels::owned(&[labels::CHECK_QUOTE]),
            NegotiationStage::QuoteReady => labels::owned(&[labels::REVIEW_QUOTE, labels::END_CHAT]),
            NegotiationStage::Reviewing
            | NegotiationStage::EditingProduct
            | NegotiationStage::EditingDetails => {
                let mut replies = labels::owned(&[
                    state.primary_action(),
                    labels::NEGOTIATE_PRICING,
                    labels::EDIT_REMARKS,
                    labels::EDIT_PRODUCT,
                    labels::EDIT_DETAILS,
                ]);
                if state.modified() {
                    replies.push(labels::UNDO_CHANGES.to_owned());
                }
                replies.push(labels::CANCEL_ORDER.to_owned());
                replies.push(labels::END_CHAT.to_owned());
                replies
            }
            NegotiationStage::ProposingPrice | NegotiationStage::EditingRemarks => {
                labels::owned(&[labels::BACK_TO_NEGOTIATION, labels::END_CHAT])
            }
            NegotiationStage::Accepted => labels::owned(&[labels::PAYMENT_METHODS, labels::END_CHAT]),
            NegotiationStage::Cancelled => labels::owned(&[labels::BACK_TO_MENU, labels::END_CHAT]),
        }
    }

    /// Picks a negotiation back up for an order chosen from the tracking list.
    pub async fn resume(
        &self,
        context: &ConversationContext,
        order_id: &OrderId,
    ) -> Result<NegotiationStep, FlowError> {
        let (order, quote) = self.load(context, order_id).await?;
        let short = short_order_id(&order.id);

        match order.status {
            OrderStatus::AwaitingPayment => {
                let state = NegotiationState::for_order(&order, NegotiationStage::Accepted);
                Ok(NegotiationStep::reply(
                    state,
                    format!("Order {short} ({}) is confirmed and awaiting payment.", order.service_name),
                ))
            }
            OrderStatus::Cancelled => Ok(NegotiationStep::Handoff {
                messages: vec![Message::bot(format!("Order {short} has been cancelled."))],
                handoff: Handoff::Enter(Topic::MainMenu),
            }),
            ref status if !status.is_negotiable() => Ok(NegotiationStep::Handoff {
                messages: vec![Message::bot(format!(
                    "Order {short} is currently {}.",
                    status.as_str()
                ))],
                handoff: Handoff::Enter(Topic::MainMenu),
            }),
            _ if quote.is_some() => {
                let state = NegotiationState::for_order(&order, NegotiationStage::QuoteReady);
                Ok(NegotiationStep::reply(
                    state,
                    format!("A quote is ready for order {short} ({}).", order.service_name),
                ))
            }
            _ => {
                let state = NegotiationState::for_order(&order, NegotiationStage::AwaitingQuote);
                Ok(NegotiationStep::reply(
                    state,
                    format!("Order {short} ({}) is still waiting for a quote.", order.service_name),
                ))
            }
        }
    }

    pub async fn respond(
        &self,
        context: &ConversationContext,
        mut state: NegotiationState,
        input: &str,
    ) -> Result<NegotiationStep, FlowError> {
        if labels::matches(input, labels::END_CHAT) {
            return Ok(NegotiationStep::Handoff { messages: Vec::new(), handoff: Handoff::EndChat });
        }

        match state.stage {
            NegotiationStage::AwaitingQuote => {
                if labels::matches(input, labels::CHECK_QUOTE) {
                    return self.check_quote(context, state).await;
                }
                Ok(NegotiationStep::reply(state, "Please tap Check Quote to see if your quote is ready."))
            }
            NegotiationStage::QuoteReady => {
                if labels::matches(input, labels::REVIEW_QUOTE) {
                    return self.review(context, state).await;
                }
                Ok(NegotiationStep::reply(state, CHOOSE_OPTION))
            }
            NegotiationStage::Reviewing
            | NegotiationStage::EditingProduct
            | NegotiationStage::EditingDetails => {
                state.stage = NegotiationStage::Reviewing;
                self.respond_reviewing(context, state, input).await
            }
            NegotiationStage::ProposingPrice => {
                if labels::matches(input, labels::BACK_TO_NEGOTIATION) {
                    return Ok(back_to_reviewing(state));
                }
                let price = parse_price(input, &self.services.settings.currency_symbol)?;
                state.proposed_price = Some(price);
                state.stage = NegotiationStage::Reviewing;
                let text = if state.modified() {
                    format!(
                        "Your proposed price of {} has been noted (unsaved). Tap {} to send it.",
                        self.money(price),
                        labels::SUBMIT_MODIFIED
                    )
                } else {
                    format!(
                        "{} is the price you already submitted, so nothing has changed.",
                        self.money(price)
                    )
                };
                Ok(NegotiationStep::reply(state, text))
            }
            NegotiationStage::EditingRemarks => {
                if labels::matches(input, labels::BACK_TO_NEGOTIATION) {
                    return Ok(back_to_reviewing(state));
                }
                let remarks = input.trim();
                if remarks.is_empty() {
                    return Err(FlowError::Validation("Please type your remarks for this order.".to_owned()));
                }
                state.remarks = Some(remarks.to_owned());
                state.stage = NegotiationStage::Reviewing;
                let text = if state.modified() {
                    format!(
                        "Your remarks have been noted (unsaved). Tap {} to send them.",
                        labels::SUBMIT_MODIFIED
                    )
                } else {
                    "These remarks match what you already submitted, so nothing has changed."
                        .to_owned()
                };
                Ok(NegotiationStep::reply(state, text))
            }
            NegotiationStage::Accepted => {
                if labels::matches(input, labels::PAYMENT_METHODS) {
                    return Ok(NegotiationStep::Handoff {
                        messages: Vec::new(),
                        handoff: Handoff::Enter(Topic::PaymentMethods),
                    });
                }
                Ok(NegotiationStep::reply(state, CHOOSE_OPTION))
            }
            NegotiationStage::Cancelled => {
                if labels::matches(input, labels::BACK_TO_MENU) {
                    return Ok(NegotiationStep::Handoff {
                        messages: Vec::new(),
                        handoff: Handoff::Enter(Topic::MainMenu),
                    });
                }
                Ok(NegotiationStep::reply(state, CHOOSE_OPTION))
            }
        }
    }

    async fn respond_reviewing(
        &self,
        context: &ConversationContext,
        mut state: NegotiationState,
        input: &str,
    ) -> Result<NegotiationStep, FlowError> {
        if labels::matches(input, labels::NEGOTIATE_PRICING)
            || labels::matches(input, labels::PROPOSE_ALTERNATIVE_PRICE)
        {
            state.stage = NegotiationStage::ProposingPrice;
            let text = format!(
                "Please enter the price you'd like to propose (for example, {}1500).",
                self.services.settings.currency_symbol
            );
            return Ok(NegotiationStep::reply(state, text));
        }
        if labels::matches(input, labels::EDIT_REMARKS) {
            state.stage = NegotiationStage::EditingRemarks;
            return Ok(NegotiationStep::reply(state, "Please type your remarks for this order."));
        }
        if labels::matches(input, labels::EDIT_PRODUCT) {
            return self.begin_edit(context, state, Phase::Products).await;
        }
        if labels::matches(input, labels::EDIT_DETAILS) {
            return self.begin_edit(context, state, Phase::Specifications).await;
        }
        if labels::matches(input, labels::ACCEPT_QUOTE) {
            if state.modified() {
                return Ok(NegotiationStep::reply(state, UNSAVED_ACCEPT));
            }
            return self.accept(context, state).await;
        }
        if labels::matches(input, labels::SUBMIT_MODIFIED) {
            if !state.modified() {
                return Ok(NegotiationStep::reply(state, NOTHING_TO_SUBMIT));
            }
            return self.resubmit(context, state).await;
        }
        if labels::matches(input, labels::UNDO_CHANGES) && state.modified() {
            state.undo_changes();
            return Ok(NegotiationStep::reply(state, "Your changes have been undone."));
        }
        if labels::matches(input, labels::CANCEL_ORDER) {
            return self.cancel(context, state).await;
        }
        Ok(NegotiationStep::reply(state, CHOOSE_OPTION))
    }

    async fn check_quote(
        &self,
        context: &ConversationContext,
        mut state: NegotiationState,
    ) -> Result<NegotiationStep, FlowError> {
        let (order, quote) = self.load(context, &state.order_id).await?;
        info!(
            event_name = "negotiation.quote_checked",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            order_id = %order.id,
            quote_ready = quote.is_some(),
            "quote checked"
        );

        let Some(quote) = quote else {
            return Ok(NegotiationStep::reply(state, STILL_PENDING));
        };
        state.stage = NegotiationStage::Reviewing;
        let customer = self.customer(&order.customer_id).await;
        let rendered = self.render_quote(&order, &quote, &state, customer.as_ref());
        Ok(NegotiationStep::reply(state, rendered))
    }

    async fn review(
        &self,
        context: &ConversationContext,
        mut state: NegotiationState,
    ) -> Result<NegotiationStep, FlowError> {
        let (order, quote) = self.load(context, &state.order_id).await?;
        let Some(quote) = quote else {
            state.stage = NegotiationStage::AwaitingQuote;
            return Ok(NegotiationStep::reply(state, STILL_PENDING));
        };
        state.stage = NegotiationStage::Reviewing;
        let customer = self.customer(&order.customer_id).await;
        let rendered = self.render_quote(&order, &quote, &state, customer.as_ref());
        Ok(NegotiationStep::reply(state, rendered))
    }

    async fn begin_edit(
        &self,
        context: &ConversationContext,
        mut state: NegotiationState,
        entry: Phase,
    ) -> Result<NegotiationStep, FlowError> {
        let mut order = self.owned_order(context, &state.order_id).await?;
        order.apply_edits(&state.edits);
        state.stage = match entry {
            Phase::Products => NegotiationStage::EditingProduct,
            _ => NegotiationStage::EditingDetails,
        };
        Ok(NegotiationStep::Edit { state, entry, draft: OrderDraft::from_order(&order) })
    }

    /// Folds a finished product edit back into the negotiation.
    pub async fn complete_edit(
        &self,
        context: &ConversationContext,
        mut state: NegotiationState,
        draft: &OrderDraft,
    ) -> Result<NegotiationStep, FlowError> {
        let order = self.owned_order(context, &state.order_id).await?;
        state.edits = ProductEdits::between(&order, draft);
        state.product_edited = true;
        state.stage = NegotiationStage::Reviewing;
        let text = format!(
            "Your product changes have been noted (unsaved):\n{}\nTap {} to send them.",
            draft.summary(),
            labels::SUBMIT_MODIFIED
        );
        Ok(NegotiationStep::reply(state, text))
    }

    /// Abandons a product edit; earlier changes stay.
    pub fn abandon_edit(mut state: NegotiationState) -> NegotiationStep {
        state.stage = NegotiationStage::Reviewing;
        NegotiationStep::reply(state, "No product changes were made.")
    }

    async fn accept(
        &self,
        context: &ConversationContext,
        state: NegotiationState,
    ) -> Result<NegotiationStep, FlowError> {
        let mut order = self.owned_order(context, &state.order_id).await?;
        order.transition_to(OrderStatus::AwaitingPayment)?;
        self.persist(context, &order).await?;

        info!(
            event_name = "negotiation.accepted",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            order_id = %order.id,
            "quote accepted"
        );
        self.audit(context, &order, "negotiation.accepted");

        let state = NegotiationState::for_order(&order, NegotiationStage::Accepted);
        let text = format!(
            "Thank you! Order {} is confirmed and now awaiting payment. Tap {} to see how to pay.",
            short_order_id(&order.id),
            labels::PAYMENT_METHODS
        );
        Ok(NegotiationStep::reply(state, text))
    }

    async fn resubmit(
        &self,
        context: &ConversationContext,
        state: NegotiationState,
    ) -> Result<NegotiationStep, FlowError> {
        let mut order = self.owned_order(context, &state.order_id).await?;
        order.transition_to(OrderStatus::NeedsQuote)?;
        order.apply_edits(&state.edits);
        order.proposed_price = state.proposed_price;
        order.remarks = state.remarks.clone();
        order.negotiated_at = Some(Utc::now());
        self.persist(context, &order).await?;

        info!(
            event_name = "negotiation.resubmitted",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            order_id = %order.id,
            proposed_price = ?order.proposed_price,
            product_edited = state.product_edited,
            "modified quotation submitted"
        );
        self.audit(context, &order, "negotiation.resubmitted");

        let state = NegotiationState::for_order(&order, NegotiationStage::AwaitingQuote);
        Ok(NegotiationStep::reply(
            state,
            "Your modified quotation has been submitted. We'll send you an updated quote soon.",
        ))
    }

    async fn cancel(
        &self,
        context: &ConversationContext,
        state: NegotiationState,
    ) -> Result<NegotiationStep, FlowError> {
        let mut order = self.owned_order(context, &state.order_id).await?;
        order.transition_to(OrderStatus::Cancelled)?;
        self.persist(context, &order).await?;

        info!(
            event_name = "negotiation.cancelled",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            order_id = %order.id,
            "order cancelled"
        );
        self.audit(context, &order, "negotiation.cancelled");

        let state = NegotiationState::for_order(&order, NegotiationStage::Cancelled);
        Ok(NegotiationStep::reply(state, format!("Order {} has been cancelled.", short_order_id(&order.id))))
    }

    /// Reads the order and its current quote, preferring the joined RPC.
    /// A quote issued before the last resubmission does not count.
    async fn load(
        &self,
        context: &ConversationContext,
        order_id: &OrderId,
    ) -> Result<(PlacedOrder, Option<Quote>), FlowError> {
        let customer_id = authenticated_customer(&context.session)?;
        let store = &self.services.store;

        let (order, latest) = match store.latest_quote_for_order(order_id).await {
            Ok(Some(view)) if view.order.customer_id == customer_id => (view.order, view.latest_quote),
            Ok(_) => return Err(FlowError::NotFound("that order".to_owned())),
            Err(error) => {
                warn!(
                    event_name = "negotiation.rpc_fallback",
                    session_id = %context.session.id,
                    correlation_id = %context.correlation_id(),
                    order_id = %order_id,
                    error = %error,
                    "latest-quote lookup failed, falling back to direct reads"
                );
                let order = store
                    .find_order(order_id, &customer_id)
                    .await
                    .map_err(FlowError::read)?
                    .ok_or_else(|| FlowError::NotFound("that order".to_owned()))?;
                let quotes = store.quotes_for_order(order_id).await.map_err(FlowError::read)?;
                (order, latest_by_issue_time(quotes))
            }
        };

        let current = latest.filter(|quote| quote.is_current_for(&order));
        Ok((order, current))
    }

    async fn owned_order(
        &self,
        context: &ConversationContext,
        order_id: &OrderId,
    ) -> Result<PlacedOrder, FlowError> {
        let customer_id = authenticated_customer(&context.session)?;
        self.services
            .store
            .find_order(order_id, &customer_id)
            .await
            .map_err(FlowError::read)?
            .ok_or_else(|| FlowError::NotFound("that order".to_owned()))
    }

    async fn persist(&self, context: &ConversationContext, order: &PlacedOrder) -> Result<(), FlowError> {
        let updated = self.services.store.update_order(order).await.map_err(|error| {
            warn!(
                event_name = "negotiation.write_failed",
                session_id = %context.session.id,
                correlation_id = %context.correlation_id(),
                order_id = %order.id,
                error = %error,
                "order update failed"
            );
            FlowError::write(error)
        })?;
        if !updated {
            return Err(FlowError::NotFound("that order".to_owned()));
        }
        Ok(())
    }

    async fn customer(&self, customer_id: &CustomerId) -> Option<Customer> {
        self.services.store.find_customer(customer_id).await.ok().flatten()
    }

    fn audit(&self, context: &ConversationContext, order: &PlacedOrder, event_type: &str) {
        self.services.audit.emit(
            AuditEvent::new(
                &AuditContext::for_turn(context, Some(order.id.clone())),
                event_type,
                AuditCategory::Negotiation,
                AuditOutcome::Success,
            )
            .with_metadata("status", order.status.as_str()),
        );
    }

    fn money(&self, amount: Decimal) -> String {
        format!("{}{:.2}", self.services.settings.currency_symbol, amount)
    }

    fn render_quote(
        &self,
        order: &PlacedOrder,
        quote: &Quote,
        state: &NegotiationState,
        customer: Option<&Customer>,
    ) -> String {
        let mut shown = order.clone();
        shown.apply_edits(&state.edits);
        let unsaved = |changed: bool| if changed { " (unsaved)" } else { "" };

        let mut lines = vec![
            format!("Quote for order {}", short_order_id(&order.id)),
            format!("Product: {}{}", shown.service_name, unsaved(state.edits.service_id.is_some())),
            format!(
                "Specification: {}{}",
                shown.specification,
                unsaved(state.edits.specification.is_some())
            ),
            format!("Size: {}{}", shown.page_size, unsaved(state.edits.page_size.is_some())),
            format!("Quantity: {}{}", shown.quantity_label, unsaved(state.edits.quantity_label.is_some())),
            format!("Initial price: {}", self.money(quote.initial_price)),
            format!(
                "Negotiated price: {}",
                quote.negotiated_price.map_or_else(|| "-".to_owned(), |price| self.money(price))
            ),
            format!("Amount due: {}", self.money(quote.effective_price())),
            format!("Issued: {}", quote.issued_at.format("%Y-%m-%d %H:%M")),
            format!("Due: {}", quote.due_at.format("%Y-%m-%d")),
        ];

        if let Some(customer) = customer {
            lines.push(format!("Customer: {}", customer.name));
            if let Some(address) = &customer.address {
                lines.push(format!("Address: {address}"));
            }
            if let Some(contact) = &customer.contact {
                lines.push(format!("Contact: {contact}"));
            }
        }
        if let Some(price) = state.proposed_price {
            let changed = state.proposed_price != state.persisted.proposed_price;
            lines.push(format!("Your proposed price: {}{}", self.money(price), unsaved(changed)));
        }
        if let Some(remarks) = &state.remarks {
            let changed = state.remarks != state.persisted.remarks;
            lines.push(format!("Your remarks: {remarks}{}", unsaved(changed)));
        }
        lines.join("\n")
    }
}

fn back_to_reviewing(mut state: NegotiationState) -> NegotiationStep {
    state.stage = NegotiationStage::Reviewing;
    NegotiationStep::reply(state, "Okay, back to your quote.")
}

/// Accepts `1500`, `1,500.50`, `PHP 1500` or `₱1500`; rejects zero,
/// negatives and anything non-numeric.
pub fn parse_price(input: &str, currency_symbol: &str) -> Result<Decimal, FlowError> {
    let invalid =
        || FlowError::Validation("Please enter a valid price greater than zero, for example 1500.".to_owned());

    let mut text = input.trim();
    for symbol in [currency_symbol.trim(), "PHP", "₱"] {
        if !symbol.is_empty() && text.len() >= symbol.len() && text.is_char_boundary(symbol.len()) {
            let (head, tail) = text.split_at(symbol.len());
            if head.eq_ignore_ascii_case(symbol) {
                text = tail.trim_start();
            }
        }
    }
    let cleaned = text.replace(',', "");
    let price = Decimal::from_str(cleaned.trim()).map_err(|_| invalid())?;
    if price <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(price)
}

fn short_order_id(id: &OrderId) -> String {
    id.0.chars().take(8).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::parse_price;
    use crate::errors::FlowError;

    #[test]
    fn parses_plain_and_formatted_prices() {
        assert_eq!(parse_price("150", "PHP ").expect("price"), Decimal::new(150, 0));
        assert_eq!(parse_price(" 1,500.50 ", "PHP ").expect("price"), Decimal::new(150_050, 2));
        assert_eq!(parse_price("php 900", "PHP ").expect("price"), Decimal::new(900, 0));
        assert_eq!(parse_price("₱75", "PHP ").expect("price"), Decimal::new(75, 0));
    }

    #[test]
    fn rejects_non_positive_and_garbage() {
        for input in ["-5", "0", "abc", "", "12abc", "NaN"] {
            assert!(matches!(parse_price(input, "PHP "), Err(FlowError::Validation(_))), "{input}");
        }
    }
}
