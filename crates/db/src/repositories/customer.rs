use sqlx::Row;

use printdesk_core::domain::customer::{Customer, CustomerId};
use printdesk_core::store::{CustomerStore, StoreError};

use super::{RepositoryError, SqlDataStore};

impl SqlDataStore {
    pub async fn upsert_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer (id, name, address, contact) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                contact = excluded.contact",
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(customer.address.as_deref())
        .bind(customer.contact.as_deref())
        .execute(self.pool())
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CustomerStore for SqlDataStore {
    async fn find_customer(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT name, address, contact FROM customer WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Customer {
            id: *id,
            name: row.try_get("name").map_err(RepositoryError::from)?,
            address: row.try_get("address").map_err(RepositoryError::from)?,
            contact: row.try_get("contact").map_err(RepositoryError::from)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use printdesk_core::domain::customer::{Customer, CustomerId};
    use printdesk_core::store::CustomerStore;

    use crate::repositories::test_support::setup_pool;
    use crate::SqlDataStore;

    #[tokio::test]
    async fn upserted_customer_is_readable() {
        let store = SqlDataStore::new(setup_pool().await);
        let mut customer = Customer {
            id: CustomerId(Uuid::new_v4()),
            name: "Lea Cruz".to_string(),
            address: None,
            contact: Some("0918 000 1111".to_string()),
        };
        store.upsert_customer(&customer).await.expect("insert");

        customer.address = Some("3 Rizal Ave".to_string());
        store.upsert_customer(&customer).await.expect("update");

        let found = store.find_customer(&customer.id).await.expect("find");
        assert_eq!(found, Some(customer));

        let unknown = store.find_customer(&CustomerId(Uuid::new_v4())).await.expect("find");
        assert!(unknown.is_none());
    }
}
