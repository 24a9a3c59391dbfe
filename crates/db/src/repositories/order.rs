use sqlx::{sqlite::SqliteRow, Row};

use printdesk_core::domain::category::CategoryId;
use printdesk_core::domain::customer::CustomerId;
use printdesk_core::domain::order::{DeliveryMode, OrderId, OrderStatus, PlacedOrder};
use printdesk_core::store::{OrderStore, StoreError};

use super::{format_timestamp, parse_decimal, parse_timestamp, RepositoryError, SqlDataStore};

pub(crate) const ORDER_COLUMNS: &str = "o.id,
                o.service_id,
                o.service_name,
                o.customer_id,
                o.status,
                o.delivery_mode,
                o.ordered_at,
                o.specification,
                o.page_size,
                o.quantity,
                o.quantity_label,
                o.priority_level,
                o.proposed_price,
                o.remarks,
                o.negotiated_at";

#[async_trait::async_trait]
impl OrderStore for SqlDataStore {
    async fn insert_order(&self, order: &PlacedOrder) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO customer_order (
                id,
                service_id,
                service_name,
                customer_id,
                status,
                delivery_mode,
                ordered_at,
                specification,
                page_size,
                quantity,
                quantity_label,
                priority_level,
                proposed_price,
                remarks,
                negotiated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id.0)
        .bind(&order.service_id.0)
        .bind(&order.service_name)
        .bind(order.customer_id.to_string())
        .bind(order.status.as_str())
        .bind(order.delivery_mode.as_str())
        .bind(format_timestamp(&order.ordered_at))
        .bind(&order.specification)
        .bind(&order.page_size)
        .bind(i64::from(order.quantity))
        .bind(&order.quantity_label)
        .bind(i64::from(order.priority_level))
        .bind(order.proposed_price.map(|price| price.to_string()))
        .bind(order.remarks.as_deref())
        .bind(order.negotiated_at.as_ref().map(format_timestamp))
        .execute(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_order(
        &self,
        id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Option<PlacedOrder>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS}
             FROM customer_order o
             WHERE o.id = ? AND o.customer_id = ?"
        ))
        .bind(&id.0)
        .bind(customer_id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.as_ref().map(order_from_row).transpose()?)
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<PlacedOrder>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS}
             FROM customer_order o
             WHERE o.customer_id = ?
             ORDER BY o.ordered_at DESC, o.id ASC
             LIMIT ?"
        ))
        .bind(customer_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_order(&self, order: &PlacedOrder) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE customer_order SET
                service_id = ?,
                service_name = ?,
                status = ?,
                delivery_mode = ?,
                specification = ?,
                page_size = ?,
                quantity = ?,
                quantity_label = ?,
                priority_level = ?,
                proposed_price = ?,
                remarks = ?,
                negotiated_at = ?
             WHERE id = ? AND customer_id = ?",
        )
        .bind(&order.service_id.0)
        .bind(&order.service_name)
        .bind(order.status.as_str())
        .bind(order.delivery_mode.as_str())
        .bind(&order.specification)
        .bind(&order.page_size)
        .bind(i64::from(order.quantity))
        .bind(&order.quantity_label)
        .bind(i64::from(order.priority_level))
        .bind(order.proposed_price.map(|price| price.to_string()))
        .bind(order.remarks.as_deref())
        .bind(order.negotiated_at.as_ref().map(format_timestamp))
        .bind(&order.id.0)
        .bind(order.customer_id.to_string())
        .execute(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) fn order_from_row(row: &SqliteRow) -> Result<PlacedOrder, RepositoryError> {
    let customer_id: String = row.try_get("customer_id")?;
    let customer_id = CustomerId::parse(&customer_id)
        .map_err(|err| RepositoryError::Decode(format!("customer_order.customer_id: {err}")))?;

    let delivery_mode: String = row.try_get("delivery_mode")?;
    let delivery_mode = DeliveryMode::parse(&delivery_mode).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown delivery mode `{delivery_mode}`"))
    })?;

    let quantity: i64 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| RepositoryError::Decode(format!("quantity {quantity} is out of range")))?;
    let priority_level: i64 = row.try_get("priority_level")?;
    let priority_level = u8::try_from(priority_level).map_err(|_| {
        RepositoryError::Decode(format!("priority level {priority_level} is out of range"))
    })?;

    let ordered_at: String = row.try_get("ordered_at")?;
    let proposed_price: Option<String> = row.try_get("proposed_price")?;
    let negotiated_at: Option<String> = row.try_get("negotiated_at")?;
    let status: String = row.try_get("status")?;

    Ok(PlacedOrder {
        id: OrderId(row.try_get("id")?),
        service_id: CategoryId(row.try_get("service_id")?),
        service_name: row.try_get("service_name")?,
        customer_id,
        status: OrderStatus::parse(&status),
        delivery_mode,
        ordered_at: parse_timestamp("ordered_at", &ordered_at)?,
        specification: row.try_get("specification")?,
        page_size: row.try_get("page_size")?,
        quantity,
        quantity_label: row.try_get("quantity_label")?,
        priority_level,
        proposed_price: proposed_price
            .as_deref()
            .map(|value| parse_decimal("proposed_price", value))
            .transpose()?,
        remarks: row.try_get("remarks")?,
        negotiated_at: negotiated_at
            .as_deref()
            .map(|value| parse_timestamp("negotiated_at", value))
            .transpose()?,
    })
}
