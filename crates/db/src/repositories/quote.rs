use sqlx::{sqlite::SqliteRow, Row};

use printdesk_core::domain::order::OrderId;
use printdesk_core::domain::quote::{OrderQuoteView, Quote, QuoteId};
use printdesk_core::store::{QuoteStore, StoreError};

use super::order::{order_from_row, ORDER_COLUMNS};
use super::{format_timestamp, parse_decimal, parse_timestamp, RepositoryError, SqlDataStore};

impl SqlDataStore {
    /// Quotes are written by the admin side; the chat engine only reads them.
    /// Exposed for seeding and tests.
    pub async fn insert_quote(&self, quote: &Quote) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote (id, order_id, initial_price, negotiated_price, issued_at, due_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.order_id.0)
        .bind(quote.initial_price.to_string())
        .bind(quote.negotiated_price.map(|price| price.to_string()))
        .bind(format_timestamp(&quote.issued_at))
        .bind(format_timestamp(&quote.due_at))
        .execute(self.pool())
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl QuoteStore for SqlDataStore {
    async fn latest_quote_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<OrderQuoteView>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS},
                q.id AS quote_id,
                q.initial_price,
                q.negotiated_price,
                q.issued_at,
                q.due_at
             FROM customer_order o
             LEFT JOIN quote q ON q.id = (
                SELECT latest.id FROM quote latest
                WHERE latest.order_id = o.id
                ORDER BY latest.issued_at DESC, latest.id DESC
                LIMIT 1
             )
             WHERE o.id = ?"
        ))
        .bind(&order_id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order = order_from_row(&row)?;
        let quote_id: Option<String> = row.try_get("quote_id").map_err(RepositoryError::from)?;
        let latest_quote = match quote_id {
            Some(id) => Some(quote_columns(&row, QuoteId(id), order.id.clone())?),
            None => None,
        };

        Ok(Some(OrderQuoteView { order, latest_quote }))
    }

    async fn quotes_for_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, order_id, initial_price, negotiated_price, issued_at, due_at
             FROM quote
             WHERE order_id = ?
             ORDER BY issued_at ASC",
        )
        .bind(&order_id.0)
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(quote_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

fn quote_from_row(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let id = QuoteId(row.try_get("id")?);
    let order_id = OrderId(row.try_get("order_id")?);
    quote_columns(row, id, order_id)
}

fn quote_columns(row: &SqliteRow, id: QuoteId, order_id: OrderId) -> Result<Quote, RepositoryError> {
    let initial_price: String = row.try_get("initial_price")?;
    let negotiated_price: Option<String> = row.try_get("negotiated_price")?;
    let issued_at: String = row.try_get("issued_at")?;
    let due_at: String = row.try_get("due_at")?;

    Ok(Quote {
        id,
        order_id,
        initial_price: parse_decimal("initial_price", &initial_price)?,
        negotiated_price: negotiated_price
            .as_deref()
            .map(|value| parse_decimal("negotiated_price", value))
            .transpose()?,
        issued_at: parse_timestamp("issued_at", &issued_at)?,
        due_at: parse_timestamp("due_at", &due_at)?,
    })
}
