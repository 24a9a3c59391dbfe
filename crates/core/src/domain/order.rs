use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::category::CategoryId;
use crate::domain::customer::CustomerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order status as stored on the order row. The admin side may write
/// statuses this engine does not drive; those are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Quoted,
    NeedsQuote,
    AwaitingPayment,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Quoted => "Quoted",
            Self::NeedsQuote => "Needs Quote",
            Self::AwaitingPayment => "Awaiting Payment",
            Self::Cancelled => "Cancelled",
            Self::Other(value) => value.as_str(),
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "pending" | "Pending" => Self::Pending,
            "Quoted" | "quoted" => Self::Quoted,
            "Needs Quote" | "needs_quote" => Self::NeedsQuote,
            "Awaiting Payment" | "awaiting_payment" => Self::AwaitingPayment,
            "Cancelled" | "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Whether the customer can still negotiate on an order in this status.
    pub fn is_negotiable(&self) -> bool {
        matches!(self, Self::Pending | Self::Quoted | Self::NeedsQuote)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Pickup,
    Delivery,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pickup" => Some(Self::Pickup),
            "delivery" => Some(Self::Delivery),
            _ => None,
        }
    }
}

/// The not-yet-submitted order being composed across phases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub product_id: Option<CategoryId>,
    pub product_name: Option<String>,
    pub specification: Option<String>,
    pub size: Option<String>,
    pub quantity_label: Option<String>,
}

impl OrderDraft {
    /// Seeds a draft from an existing order so a re-entrant edit starts from
    /// the values the customer already chose.
    pub fn from_order(order: &PlacedOrder) -> Self {
        Self {
            product_id: Some(order.service_id.clone()),
            product_name: Some(order.service_name.clone()),
            specification: Some(order.specification.clone()),
            size: Some(order.page_size.clone()),
            quantity_label: Some(order.quantity_label.clone()),
        }
    }

    pub fn summary(&self) -> String {
        let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_owned());
        format!(
            "Product: {}\nSpecification: {}\nSize: {}\nQuantity: {}",
            field(&self.product_name),
            field(&self.specification),
            field(&self.size),
            field(&self.quantity_label)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub service_id: CategoryId,
    pub service_name: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub delivery_mode: DeliveryMode,
    pub ordered_at: DateTime<Utc>,
    pub specification: String,
    pub page_size: String,
    pub quantity: u32,
    pub quantity_label: String,
    pub priority_level: u8,
    pub proposed_price: Option<Decimal>,
    pub remarks: Option<String>,
    /// Set each time a modified quotation is submitted; quotes issued before
    /// this instant are stale.
    pub negotiated_at: Option<DateTime<Utc>>,
}

impl PlacedOrder {
    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        matches!(
            (&self.status, next),
            (OrderStatus::Pending, OrderStatus::NeedsQuote)
                | (OrderStatus::Pending, OrderStatus::AwaitingPayment)
                | (OrderStatus::Quoted, OrderStatus::NeedsQuote)
                | (OrderStatus::Quoted, OrderStatus::AwaitingPayment)
                | (OrderStatus::NeedsQuote, OrderStatus::NeedsQuote)
                | (OrderStatus::NeedsQuote, OrderStatus::AwaitingPayment)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Quoted, OrderStatus::Cancelled)
                | (OrderStatus::NeedsQuote, OrderStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(&next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidOrderTransition { from: self.status.clone(), to: next })
    }

    pub fn apply_edits(&mut self, edits: &ProductEdits) {
        if let Some(service_id) = &edits.service_id {
            self.service_id = service_id.clone();
        }
        if let Some(service_name) = &edits.service_name {
            self.service_name = service_name.clone();
        }
        if let Some(specification) = &edits.specification {
            self.specification = specification.clone();
        }
        if let Some(page_size) = &edits.page_size {
            self.page_size = page_size.clone();
        }
        if let Some(quantity_label) = &edits.quantity_label {
            self.quantity = parse_quantity_label(quantity_label).unwrap_or(self.quantity);
            self.quantity_label = quantity_label.clone();
        }
    }
}

/// Product-level changes made during negotiation, not yet persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEdits {
    pub service_id: Option<CategoryId>,
    pub service_name: Option<String>,
    pub specification: Option<String>,
    pub page_size: Option<String>,
    pub quantity_label: Option<String>,
}

impl ProductEdits {
    /// Diffs a completed draft against the order it edits. Only fields that
    /// actually changed are recorded.
    pub fn between(order: &PlacedOrder, draft: &OrderDraft) -> Self {
        let changed = |next: &Option<String>, current: &str| {
            next.as_ref().filter(|value| value.as_str() != current).cloned()
        };
        let service_changed =
            draft.product_id.as_ref().filter(|id| **id != order.service_id).cloned();

        Self {
            service_name: service_changed.as_ref().and(draft.product_name.clone()),
            service_id: service_changed,
            specification: changed(&draft.specification, &order.specification),
            page_size: changed(&draft.size, &order.page_size),
            quantity_label: changed(&draft.quantity_label, &order.quantity_label),
        }
    }
}

/// Reads the leading count out of a quantity option such as `"1,000 pcs"`.
pub fn parse_quantity_label(label: &str) -> Option<u32> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse::<u32>().ok().filter(|quantity| *quantity > 0)
}
