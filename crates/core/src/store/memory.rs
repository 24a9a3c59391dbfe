use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::category::{CategoryId, CategoryNode, CategoryRoot};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::order::{OrderId, PlacedOrder};
use crate::domain::quote::{latest_by_issue_time, OrderQuoteView, Quote};
use crate::domain::ticket::SupportTicket;

use super::{CategoryStore, CustomerStore, OrderStore, QuoteStore, StoreError, TicketStore};

/// Process-local Data Store with failure injection for tests.
#[derive(Default)]
pub struct InMemoryDataStore {
    orders: RwLock<Vec<PlacedOrder>>,
    quotes: RwLock<Vec<Quote>>,
    categories: RwLock<Vec<CategoryNode>>,
    customers: RwLock<HashMap<CustomerId, Customer>>,
    tickets: RwLock<Vec<SupportTicket>>,
    fail_writes: AtomicBool,
    rpc_unavailable: AtomicBool,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_categories(self, categories: Vec<CategoryNode>) -> Self {
        self.categories.write().await.extend(categories);
        self
    }

    pub async fn add_customer(&self, customer: Customer) {
        self.customers.write().await.insert(customer.id, customer);
    }

    /// Stands in for the admin side issuing a quote.
    pub async fn issue_quote(&self, quote: Quote) {
        self.quotes.write().await.push(quote);
    }

    pub async fn orders(&self) -> Vec<PlacedOrder> {
        self.orders.read().await.clone()
    }

    pub async fn tickets(&self) -> Vec<SupportTicket> {
        self.tickets.read().await.clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_rpc_unavailable(&self, unavailable: bool) {
        self.rpc_unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected by store".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryDataStore {
    async fn insert_order(&self, order: &PlacedOrder) -> Result<(), StoreError> {
        self.check_write()?;
        let mut orders = self.orders.write().await;
        if orders.iter().any(|existing| existing.id == order.id) {
            return Err(StoreError::Backend(format!("duplicate order id `{}`", order.id)));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn find_order(
        &self,
        id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Option<PlacedOrder>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .find(|order| order.id == *id && order.customer_id == *customer_id)
            .cloned())
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<PlacedOrder>, StoreError> {
        let orders = self.orders.read().await;
        let mut owned = orders
            .iter()
            .filter(|order| order.customer_id == *customer_id)
            .cloned()
            .collect::<Vec<_>>();
        owned.sort_by(|left, right| right.ordered_at.cmp(&left.ordered_at));
        owned.truncate(limit as usize);
        Ok(owned)
    }

    async fn update_order(&self, order: &PlacedOrder) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut orders = self.orders.write().await;
        match orders
            .iter_mut()
            .find(|existing| existing.id == order.id && existing.customer_id == order.customer_id)
        {
            Some(existing) => {
                let ordered_at = existing.ordered_at;
                *existing = order.clone();
                existing.ordered_at = ordered_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl QuoteStore for InMemoryDataStore {
    async fn latest_quote_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<OrderQuoteView>, StoreError> {
        if self.rpc_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unsupported("get_latest_quote_for_order"));
        }
        let order = {
            let orders = self.orders.read().await;
            orders.iter().find(|order| order.id == *order_id).cloned()
        };
        let Some(order) = order else {
            return Ok(None);
        };
        let latest_quote = latest_by_issue_time(self.quotes_for_order(order_id).await?);
        Ok(Some(OrderQuoteView { order, latest_quote }))
    }

    async fn quotes_for_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, StoreError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.iter().filter(|quote| quote.order_id == *order_id).cloned().collect())
    }
}

#[async_trait]
impl CategoryStore for InMemoryDataStore {
    async fn child_categories(
        &self,
        root: CategoryRoot,
        parent: Option<&CategoryId>,
    ) -> Result<Vec<CategoryNode>, StoreError> {
        let categories = self.categories.read().await;
        let mut children = categories
            .iter()
            .filter(|node| node.root == root && node.parent_id.as_ref() == parent)
            .cloned()
            .collect::<Vec<_>>();
        children.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(children)
    }

    async fn find_category(&self, id: &CategoryId) -> Result<Option<CategoryNode>, StoreError> {
        let categories = self.categories.read().await;
        Ok(categories.iter().find(|node| node.id == *id).cloned())
    }
}

#[async_trait]
impl CustomerStore for InMemoryDataStore {
    async fn find_customer(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.customers.read().await.get(id).cloned())
    }
}

#[async_trait]
impl TicketStore for InMemoryDataStore {
    async fn insert_ticket(&self, ticket: &SupportTicket) -> Result<(), StoreError> {
        self.check_write()?;
        self.tickets.write().await.push(ticket.clone());
        Ok(())
    }

    async fn list_tickets_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<SupportTicket>, StoreError> {
        let tickets = self.tickets.read().await;
        let mut owned = tickets
            .iter()
            .filter(|ticket| ticket.customer_id == *customer_id)
            .cloned()
            .collect::<Vec<_>>();
        owned.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::domain::category::{CategoryId, CategoryNode, CategoryRoot};
    use crate::domain::customer::CustomerId;
    use crate::domain::order::{DeliveryMode, OrderId, OrderStatus, PlacedOrder};
    use crate::store::{CategoryStore, InMemoryDataStore, OrderStore, StoreError};

    fn order(customer_id: CustomerId) -> PlacedOrder {
        PlacedOrder {
            id: OrderId(Uuid::new_v4().to_string()),
            service_id: CategoryId("cat-flyers".to_owned()),
            service_name: "Flyers".to_owned(),
            customer_id,
            status: OrderStatus::Pending,
            delivery_mode: DeliveryMode::Pickup,
            ordered_at: Utc::now(),
            specification: "Glossy".to_owned(),
            page_size: "A5".to_owned(),
            quantity: 500,
            quantity_label: "500 pcs".to_owned(),
            priority_level: 1,
            proposed_price: None,
            remarks: None,
            negotiated_at: None,
        }
    }

    #[tokio::test]
    async fn children_are_scoped_by_root_and_sorted_by_name() {
        let store = InMemoryDataStore::new()
            .with_categories(vec![
                CategoryNode::new("p-2", None, CategoryRoot::Products, "Signage"),
                CategoryNode::new("p-1", None, CategoryRoot::Products, "Printing"),
                CategoryNode::new("s-1", None, CategoryRoot::Sizes, "A4"),
                CategoryNode::new("p-1-1", Some("p-1"), CategoryRoot::Products, "Flyers"),
            ])
            .await;

        let top = store.child_categories(CategoryRoot::Products, None).await.expect("top level");
        let names = top.iter().map(|node| node.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Printing", "Signage"]);

        let nested = store
            .child_categories(CategoryRoot::Products, Some(&CategoryId("p-1".to_owned())))
            .await
            .expect("children");
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "Flyers");
    }

    #[tokio::test]
    async fn orders_are_only_visible_to_their_customer() {
        let store = InMemoryDataStore::new();
        let owner = CustomerId(Uuid::new_v4());
        let stranger = CustomerId(Uuid::new_v4());
        let placed = order(owner);
        store.insert_order(&placed).await.expect("insert");

        assert!(store.find_order(&placed.id, &owner).await.expect("find").is_some());
        assert!(store.find_order(&placed.id, &stranger).await.expect("find").is_none());
        let mut foreign = placed.clone();
        foreign.customer_id = stranger;
        assert!(!store.update_order(&foreign).await.expect("update"));
    }

    #[tokio::test]
    async fn injected_write_failures_leave_no_rows() {
        let store = InMemoryDataStore::new();
        store.set_fail_writes(true);
        let error = store
            .insert_order(&order(CustomerId(Uuid::new_v4())))
            .await
            .expect_err("writes are failing");
        assert!(matches!(error, StoreError::Backend(_)));
        assert!(store.orders().await.is_empty());
    }
}
