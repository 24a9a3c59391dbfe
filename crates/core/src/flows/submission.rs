//! Commits a completed draft as a new order.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome};
use crate::domain::customer::CustomerId;
use crate::domain::order::{parse_quantity_label, OrderDraft, OrderId, OrderStatus, PlacedOrder};
use crate::errors::FlowError;
use crate::flows::states::{ConversationContext, ConversationSession};
use crate::flows::FlowServices;
use crate::store::DataStore;

/// Resolves the signed-in customer for this session, or asks them to sign in.
pub fn authenticated_customer(session: &ConversationSession) -> Result<CustomerId, FlowError> {
    let raw = session
        .customer_id
        .as_deref()
        .ok_or_else(|| FlowError::Auth("session has no customer".to_owned()))?;
    CustomerId::parse(raw).map_err(|error| FlowError::Auth(error.to_string()))
}

pub struct OrderSubmission<'a, S> {
    services: &'a FlowServices<S>,
}

impl<'a, S> OrderSubmission<'a, S>
where
    S: DataStore,
{
    pub fn new(services: &'a FlowServices<S>) -> Self {
        Self { services }
    }

    /// Builds the order row a draft would produce, filling unset fields from
    /// the configured defaults.
    pub fn build(&self, customer_id: CustomerId, draft: &OrderDraft) -> Result<PlacedOrder, FlowError> {
        let defaults = &self.services.settings.order_defaults;
        let service_id = draft
            .product_id
            .clone()
            .ok_or_else(|| FlowError::Validation("Please choose a product before confirming.".to_owned()))?;
        let service_name = draft.product_name.clone().unwrap_or_else(|| service_id.0.clone());
        let quantity =
            draft.quantity_label.as_deref().and_then(parse_quantity_label).unwrap_or(defaults.quantity);
        let quantity_label = draft.quantity_label.clone().unwrap_or_else(|| quantity.to_string());

        Ok(PlacedOrder {
            id: OrderId(Uuid::new_v4().to_string()),
            service_id,
            service_name,
            customer_id,
            status: OrderStatus::Pending,
            delivery_mode: defaults.delivery_mode,
            ordered_at: Utc::now(),
            specification: draft.specification.clone().unwrap_or_else(|| defaults.specification.clone()),
            page_size: draft.size.clone().unwrap_or_else(|| defaults.size.clone()),
            quantity,
            quantity_label,
            priority_level: defaults.priority_level,
            proposed_price: None,
            remarks: None,
            negotiated_at: None,
        })
    }

    /// Persists one pending order. Nothing is written unless the whole row is.
    pub async fn submit(
        &self,
        context: &ConversationContext,
        draft: &OrderDraft,
    ) -> Result<PlacedOrder, FlowError> {
        let customer_id = authenticated_customer(&context.session)?;
        let order = self.build(customer_id, draft)?;

        if let Err(error) = self.services.store.insert_order(&order).await {
            let error = FlowError::write(error);
            warn!(
                event_name = "order.submit_failed",
                session_id = %context.session.id,
                correlation_id = %context.correlation_id(),
                error_class = error.class(),
                error = %error,
                "order submission failed"
            );
            self.services.audit.emit(
                AuditEvent::new(
                    &AuditContext::for_turn(context, None),
                    "order.submit_failed",
                    AuditCategory::Ordering,
                    AuditOutcome::Failed,
                )
                .with_metadata("reason", error.to_string()),
            );
            return Err(error);
        }

        info!(
            event_name = "order.submitted",
            session_id = %context.session.id,
            correlation_id = %context.correlation_id(),
            order_id = %order.id,
            service_id = %order.service_id.0,
            quantity = order.quantity,
            "order submitted"
        );
        self.services.audit.emit(
            AuditEvent::new(
                &AuditContext::for_turn(context, Some(order.id.clone())),
                "order.submitted",
                AuditCategory::Ordering,
                AuditOutcome::Success,
            )
            .with_metadata("service_id", order.service_id.0.clone())
            .with_metadata("quantity", order.quantity.to_string()),
        );
        Ok(order)
    }
}
