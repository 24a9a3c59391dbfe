use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    OrderIssue,
    PaymentIssue,
    Other,
}

impl TicketCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderIssue => "order_issue",
            Self::PaymentIssue => "payment_issue",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "order_issue" => Self::OrderIssue,
            "payment_issue" => Self::PaymentIssue,
            _ => Self::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OrderIssue => "Order Issue",
            Self::PaymentIssue => "Payment Issue",
            Self::Other => "Other Concern",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: TicketId,
    pub customer_id: CustomerId,
    pub category: TicketCategory,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
