use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderId, PlacedOrder};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

/// A priced proposal issued by an admin against a submitted order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub order_id: OrderId,
    pub initial_price: Decimal,
    pub negotiated_price: Option<Decimal>,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

impl Quote {
    /// The amount the customer would accept: the negotiated price when the
    /// admin has set one, otherwise the initial price.
    pub fn effective_price(&self) -> Decimal {
        self.negotiated_price.unwrap_or(self.initial_price)
    }

    /// A quote is current for an order unless the customer resubmitted a
    /// modified quotation after it was issued.
    pub fn is_current_for(&self, order: &PlacedOrder) -> bool {
        order.negotiated_at.map_or(true, |submitted| self.issued_at > submitted)
    }
}

/// Result shape of the latest-quote read path: the order row plus its most
/// recently issued quote, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderQuoteView {
    pub order: PlacedOrder,
    pub latest_quote: Option<Quote>,
}

pub fn latest_by_issue_time(quotes: Vec<Quote>) -> Option<Quote> {
    quotes.into_iter().max_by_key(|quote| quote.issued_at)
}
