//! Data Store ports.
//!
//! The chat engine never owns persistence. Every read and write goes through
//! these traits; `printdesk-db` provides the SQLite implementation and
//! [`memory::InMemoryDataStore`] backs tests and local demos.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::category::{CategoryId, CategoryNode, CategoryRoot};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::order::{OrderId, PlacedOrder};
use crate::domain::quote::{OrderQuoteView, Quote};
use crate::domain::ticket::SupportTicket;

pub mod memory;

pub use memory::InMemoryDataStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("operation `{0}` is not supported by this store")]
    Unsupported(&'static str),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &PlacedOrder) -> Result<(), StoreError>;

    async fn find_order(
        &self,
        id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Option<PlacedOrder>, StoreError>;

    /// Newest first.
    async fn list_orders_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<PlacedOrder>, StoreError>;

    /// Overwrites the mutable columns of the row matching `(id, customer_id)`.
    /// Returns `false` when no such row exists.
    async fn update_order(&self, order: &PlacedOrder) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Preferred read path: order row joined with its latest quote.
    async fn latest_quote_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<OrderQuoteView>, StoreError>;

    /// Fallback read path: every quote issued for the order, any order.
    async fn quotes_for_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, StoreError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Children of `parent`, or the top level of `root` when `parent` is
    /// `None`. Ordered by name.
    async fn child_categories(
        &self,
        root: CategoryRoot,
        parent: Option<&CategoryId>,
    ) -> Result<Vec<CategoryNode>, StoreError>;

    async fn find_category(&self, id: &CategoryId) -> Result<Option<CategoryNode>, StoreError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_customer(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, ticket: &SupportTicket) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_tickets_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<SupportTicket>, StoreError>;
}

/// Everything the chat engine reads or writes.
pub trait DataStore: OrderStore + QuoteStore + CategoryStore + CustomerStore + TicketStore {}

impl<T> DataStore for T where T: OrderStore + QuoteStore + CategoryStore + CustomerStore + TicketStore
{}
