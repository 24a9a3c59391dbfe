pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod store;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::category::{CategoryId, CategoryNode, CategoryRoot};
pub use domain::customer::{Customer, CustomerId};
pub use domain::order::{DeliveryMode, OrderDraft, OrderId, OrderStatus, PlacedOrder};
pub use domain::quote::{OrderQuoteView, Quote, QuoteId};
pub use domain::ticket::{SupportTicket, TicketCategory, TicketId};
pub use errors::{DomainError, FlowError};
pub use flows::{
    ConversationContext, Flow, FlowRegistry, FlowServices, FlowSettings, Message, Role, SessionId,
    Topic, Turn,
};
pub use store::{DataStore, InMemoryDataStore, StoreError};
