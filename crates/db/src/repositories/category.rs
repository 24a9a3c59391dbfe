use sqlx::{sqlite::SqliteRow, Row};

use printdesk_core::domain::category::{CategoryId, CategoryNode, CategoryRoot};
use printdesk_core::store::{CategoryStore, StoreError};

use super::{RepositoryError, SqlDataStore};

#[async_trait::async_trait]
impl CategoryStore for SqlDataStore {
    async fn child_categories(
        &self,
        root: CategoryRoot,
        parent: Option<&CategoryId>,
    ) -> Result<Vec<CategoryNode>, StoreError> {
        let rows = match parent {
            Some(parent) => {
                sqlx::query(
                    "SELECT id, parent_id, root_tag, name
                     FROM category
                     WHERE root_tag = ? AND parent_id = ?
                     ORDER BY name ASC",
                )
                .bind(root.as_str())
                .bind(&parent.0)
                .fetch_all(self.pool())
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, parent_id, root_tag, name
                     FROM category
                     WHERE root_tag = ? AND parent_id IS NULL
                     ORDER BY name ASC",
                )
                .bind(root.as_str())
                .fetch_all(self.pool())
                .await
            }
        }
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(category_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_category(&self, id: &CategoryId) -> Result<Option<CategoryNode>, StoreError> {
        let row = sqlx::query(
            "SELECT id, parent_id, root_tag, name
             FROM category
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.as_ref().map(category_from_row).transpose()?)
    }
}

fn category_from_row(row: &SqliteRow) -> Result<CategoryNode, RepositoryError> {
    let root_tag: String = row.try_get("root_tag")?;
    let root = CategoryRoot::parse(&root_tag)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown category root `{root_tag}`")))?;
    let parent_id: Option<String> = row.try_get("parent_id")?;

    Ok(CategoryNode {
        id: CategoryId(row.try_get("id")?),
        parent_id: parent_id.map(CategoryId),
        root,
        name: row.try_get("name")?,
    })
}
