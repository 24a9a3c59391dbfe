//! Guided dialogue engine: scripted menus, order composition, and quote
//! negotiation, all driven one user turn at a time.

use std::sync::Arc;

use crate::audit::AuditSink;
use crate::domain::order::DeliveryMode;

pub mod catalog;
pub mod engine;
pub mod interpreter;
pub mod labels;
pub mod navigator;
pub mod negotiation;
pub mod nodes;
pub mod ordering;
pub mod pipeline;
pub mod states;
pub mod submission;

pub use engine::{Flow, FlowRegistry};
pub use interpreter::StaticFlow;
pub use nodes::{FlowDefinition, GraphError, Node, NodeEffect, NodeId, NodeOption, Target};
pub use ordering::OrderFlow;
pub use states::{
    ConversationContext, ConversationSession, Handoff, Locus, Message, NegotiationStage,
    NegotiationState, Phase, Role, SessionId, SessionStatus, Topic, Turn,
};

/// Values applied when a draft leaves a field unset at submission time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderDefaults {
    pub specification: String,
    pub size: String,
    pub quantity: u32,
    pub delivery_mode: DeliveryMode,
    pub priority_level: u8,
}

impl Default for OrderDefaults {
    fn default() -> Self {
        Self {
            specification: "Standard".to_owned(),
            size: "Standard".to_owned(),
            quantity: 1,
            delivery_mode: DeliveryMode::Pickup,
            priority_level: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowSettings {
    pub order_defaults: OrderDefaults,
    pub recent_orders_limit: u32,
    pub max_detail_chars: usize,
    pub currency_symbol: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            order_defaults: OrderDefaults::default(),
            recent_orders_limit: 5,
            max_detail_chars: 2_000,
            currency_symbol: "PHP ".to_owned(),
        }
    }
}

/// Collaborators shared by every flow instance.
pub struct FlowServices<S> {
    pub store: Arc<S>,
    pub settings: Arc<FlowSettings>,
    pub audit: Arc<dyn AuditSink>,
}

impl<S> FlowServices<S> {
    pub fn new(store: Arc<S>, settings: FlowSettings, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, settings: Arc::new(settings), audit }
    }
}

impl<S> Clone for FlowServices<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: Arc::clone(&self.settings),
            audit: Arc::clone(&self.audit),
        }
    }
}
