use sqlx::{sqlite::SqliteRow, Row};

use printdesk_core::domain::customer::CustomerId;
use printdesk_core::domain::ticket::{SupportTicket, TicketCategory, TicketId};
use printdesk_core::store::{StoreError, TicketStore};

use super::{format_timestamp, parse_timestamp, RepositoryError, SqlDataStore};

#[async_trait::async_trait]
impl TicketStore for SqlDataStore {
    async fn insert_ticket(&self, ticket: &SupportTicket) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO support_ticket (id, customer_id, category, description, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&ticket.id.0)
        .bind(ticket.customer_id.to_string())
        .bind(ticket.category.as_str())
        .bind(&ticket.description)
        .bind(&ticket.status)
        .bind(format_timestamp(&ticket.created_at))
        .execute(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn list_tickets_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<SupportTicket>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, customer_id, category, description, status, created_at
             FROM support_ticket
             WHERE customer_id = ?
             ORDER BY created_at DESC, id ASC",
        )
        .bind(customer_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(ticket_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

fn ticket_from_row(row: &SqliteRow) -> Result<SupportTicket, RepositoryError> {
    let customer_id: String = row.try_get("customer_id")?;
    let customer_id = CustomerId::parse(&customer_id)
        .map_err(|err| RepositoryError::Decode(format!("support_ticket.customer_id: {err}")))?;
    let category: String = row.try_get("category")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(SupportTicket {
        id: TicketId(row.try_get("id")?),
        customer_id,
        category: TicketCategory::parse(&category),
        description: row.try_get("description")?,
        status: row.try_get("status")?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}
