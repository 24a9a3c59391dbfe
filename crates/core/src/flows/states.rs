use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::category::{CategoryNode, CategoryRoot};
use crate::domain::order::{OrderDraft, OrderId, PlacedOrder, ProductEdits};
use crate::flows::labels;
use crate::flows::nodes::NodeId;

/// Topic key a flow is registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    MainMenu,
    PlaceOrder,
    TrackOrder,
    Tickets,
    TicketTracking,
    Faqs,
    ServiceInfo,
    PaymentMethods,
}

impl Topic {
    pub fn key(self) -> &'static str {
        match self {
            Self::MainMenu => "main_menu",
            Self::PlaceOrder => "place_order",
            Self::TrackOrder => "track_order",
            Self::Tickets => "tickets",
            Self::TicketTracking => "ticket_tracking",
            Self::Faqs => "faqs",
            Self::ServiceInfo => "service_info",
            Self::PaymentMethods => "payment_methods",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        [
            Self::MainMenu,
            Self::PlaceOrder,
            Self::TrackOrder,
            Self::Tickets,
            Self::TicketTracking,
            Self::Faqs,
            Self::ServiceInfo,
            Self::PaymentMethods,
        ]
        .into_iter()
        .find(|topic| topic.key() == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bot,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn bot(text: impl Into<String>) -> Self {
        Self { role: Role::Bot, text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: SessionId,
    /// Raw identifier handed over by the auth layer; validated where an
    /// operation needs a signed-in customer.
    pub customer_id: Option<String>,
    pub active_flow: Topic,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub turn_count: u64,
}

/// Where the conversation currently is. Exactly one locus is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Locus {
    Idle,
    Static { node: NodeId, details: Vec<String> },
    Ordering(OrderingState),
    TrackingOrders { orders: Vec<TrackedOrder> },
    Negotiating(NegotiationState),
    Ended,
}

/// Per-session state threaded through every flow call. Flows take it by
/// value and hand back the next snapshot in a [`Turn`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session: ConversationSession,
    pub locus: Locus,
}

impl ConversationContext {
    pub fn new(customer_id: Option<String>) -> Self {
        Self {
            session: ConversationSession {
                id: SessionId::generate(),
                customer_id,
                active_flow: Topic::MainMenu,
                status: SessionStatus::Active,
                created_at: Utc::now(),
                turn_count: 0,
            },
            locus: Locus::Idle,
        }
    }

    pub fn correlation_id(&self) -> String {
        format!("{}:{}", self.session.id, self.session.turn_count)
    }

    pub fn is_ended(&self) -> bool {
        self.session.status == SessionStatus::Ended
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Products,
    Specifications,
    Sizes,
    Quantities,
    Confirmation,
}

impl Phase {
    pub const SEQUENCE: [Phase; 5] =
        [Self::Products, Self::Specifications, Self::Sizes, Self::Quantities, Self::Confirmation];

    pub fn next(self) -> Option<Self> {
        let index = Self::SEQUENCE.iter().position(|phase| *phase == self)?;
        Self::SEQUENCE.get(index + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        let index = Self::SEQUENCE.iter().position(|phase| *phase == self)?;
        index.checked_sub(1).map(|previous| Self::SEQUENCE[previous])
    }

    pub fn category_root(self) -> Option<CategoryRoot> {
        match self {
            Self::Products => Some(CategoryRoot::Products),
            Self::Specifications => Some(CategoryRoot::Specifications),
            Self::Sizes => Some(CategoryRoot::Sizes),
            Self::Quantities => Some(CategoryRoot::Quantities),
            Self::Confirmation => None,
        }
    }

    /// Only products are a multi-level tree; other phases are choose-and-done.
    pub fn is_multi_level(self) -> bool {
        matches!(self, Self::Products)
    }
}

/// Position inside one category tree. `stack` holds the parents above
/// `parent`, top-level first; `None` stands for the tree root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigatorState {
    pub root: CategoryRoot,
    pub parent: Option<CategoryNode>,
    pub stack: Vec<Option<CategoryNode>>,
    pub options: Vec<CategoryNode>,
}

impl NavigatorState {
    pub fn at_root(&self) -> bool {
        self.parent.is_none() && self.stack.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderingPurpose {
    NewOrder,
    /// Re-entrant edit of a submitted order; completion returns to this
    /// negotiation instead of creating an order.
    Edit(Box<NegotiationState>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderingState {
    pub phase: Phase,
    pub entry: Phase,
    pub navigator: Option<NavigatorState>,
    pub draft: OrderDraft,
    pub purpose: OrderingPurpose,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedOrder {
    pub label: String,
    pub order_id: OrderId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStage {
    AwaitingQuote,
    QuoteReady,
    Reviewing,
    ProposingPrice,
    EditingRemarks,
    EditingProduct,
    EditingDetails,
    Accepted,
    Cancelled,
}

/// Negotiation terms as last persisted on the order row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTerms {
    pub proposed_price: Option<Decimal>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiationState {
    pub order_id: OrderId,
    pub stage: NegotiationStage,
    pub proposed_price: Option<Decimal>,
    pub remarks: Option<String>,
    pub edits: ProductEdits,
    pub product_edited: bool,
    pub persisted: PersistedTerms,
}

impl NegotiationState {
    pub fn for_order(order: &PlacedOrder, stage: NegotiationStage) -> Self {
        let persisted = PersistedTerms {
            proposed_price: order.proposed_price,
            remarks: order.remarks.clone(),
        };
        Self {
            order_id: order.id.clone(),
            stage,
            proposed_price: persisted.proposed_price,
            remarks: persisted.remarks.clone(),
            edits: ProductEdits::default(),
            product_edited: false,
            persisted,
        }
    }

    /// True iff the terms differ from what was last persisted, or the
    /// product was edited since then.
    pub fn modified(&self) -> bool {
        self.proposed_price != self.persisted.proposed_price
            || self.remarks != self.persisted.remarks
            || self.product_edited
    }

    pub fn primary_action(&self) -> &'static str {
        if self.modified() {
            labels::SUBMIT_MODIFIED
        } else {
            labels::ACCEPT_QUOTE
        }
    }

    pub fn undo_changes(&mut self) {
        self.proposed_price = self.persisted.proposed_price;
        self.remarks = self.persisted.remarks.clone();
        self.edits = ProductEdits::default();
        self.product_edited = false;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handoff {
    Enter(Topic),
    EndChat,
}

/// Outcome of one flow call: the next context snapshot plus what to show.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub context: ConversationContext,
    pub messages: Vec<Message>,
    pub quick_replies: Vec<String>,
    pub handoff: Option<Handoff>,
}

impl Turn {
    pub fn reply(
        context: ConversationContext,
        messages: Vec<Message>,
        quick_replies: Vec<String>,
    ) -> Self {
        Self { context, messages, quick_replies, handoff: None }
    }

    pub fn handoff(context: ConversationContext, messages: Vec<Message>, handoff: Handoff) -> Self {
        Self { context, messages, quick_replies: Vec::new(), handoff: Some(handoff) }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{NegotiationStage, NegotiationState, Phase, PersistedTerms, Topic};
    use crate::domain::order::{OrderId, ProductEdits};
    use crate::flows::labels;

    fn negotiation() -> NegotiationState {
        NegotiationState {
            order_id: OrderId("ord-1".to_owned()),
            stage: NegotiationStage::Reviewing,
            proposed_price: None,
            remarks: None,
            edits: ProductEdits::default(),
            product_edited: false,
            persisted: PersistedTerms::default(),
        }
    }

    #[test]
    fn phases_follow_fixed_sequence() {
        assert_eq!(Phase::Products.next(), Some(Phase::Specifications));
        assert_eq!(Phase::Quantities.next(), Some(Phase::Confirmation));
        assert_eq!(Phase::Confirmation.next(), None);
        assert_eq!(Phase::Confirmation.previous(), Some(Phase::Quantities));
        assert_eq!(Phase::Products.previous(), None);
        assert!(Phase::Products.is_multi_level());
        assert!(!Phase::Sizes.is_multi_level());
    }

    #[test]
    fn modified_tracks_difference_from_persisted_terms() {
        let mut state = negotiation();
        assert!(!state.modified());
        assert_eq!(state.primary_action(), labels::ACCEPT_QUOTE);

        state.proposed_price = Some(Decimal::new(150, 0));
        assert!(state.modified());
        assert_eq!(state.primary_action(), labels::SUBMIT_MODIFIED);

        state.persisted.proposed_price = Some(Decimal::new(150, 0));
        assert!(!state.modified());
    }

    #[test]
    fn undo_restores_persisted_terms() {
        let mut state = negotiation();
        state.remarks = Some("Rush please".to_owned());
        state.product_edited = true;
        state.undo_changes();
        assert!(!state.modified());
        assert!(state.remarks.is_none());
    }

    #[test]
    fn topic_keys_round_trip() {
        assert_eq!(Topic::parse("place_order"), Some(Topic::PlaceOrder));
        assert_eq!(Topic::parse(Topic::TicketTracking.key()), Some(Topic::TicketTracking));
        assert_eq!(Topic::parse("billing"), None);
    }
}
