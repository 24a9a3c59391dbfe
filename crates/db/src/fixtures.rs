use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Expected shape of each seeded category tree: the root tag, the names of
/// its top-level nodes and the total node count.
struct SeedTreeContract {
    root_tag: &'static str,
    top_level: &'static [&'static str],
    node_count: i64,
}

const SEED_TREES: &[SeedTreeContract] = &[
    SeedTreeContract {
        root_tag: "products",
        top_level: &["Binding", "Large Format", "Printing"],
        node_count: 10,
    },
    SeedTreeContract {
        root_tag: "specifications",
        top_level: &["Glossy", "Matte", "Standard"],
        node_count: 3,
    },
    SeedTreeContract { root_tag: "sizes", top_level: &["A3", "A4", "Legal", "Letter"], node_count: 4 },
    SeedTreeContract {
        root_tag: "quantities",
        top_level: &["1,000 pcs", "100 pcs", "50 pcs", "500 pcs"],
        node_count: 4,
    },
];

/// Customer id of the seeded demo account.
pub const DEMO_CUSTOMER_ID: &str = "6f1c2b0e-4f7a-4a59-9a51-0d7f2c3b9e11";

/// Demo catalog: product, specification, size and quantity trees plus one
/// customer to chat as.
pub struct CatalogSeed;

impl CatalogSeed {
    pub const SQL: &str = include_str!("../../../config/fixtures/catalog_seed.sql");

    /// Loads the catalog in one transaction. Re-running is a no-op.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        let trees_seeded = SEED_TREES
            .iter()
            .map(|tree| TreeSeedInfo { root_tag: tree.root_tag, node_count: tree.node_count })
            .collect();

        Ok(SeedResult { trees_seeded, demo_customer_id: DEMO_CUSTOMER_ID })
    }

    /// Checks that every seeded tree and the demo customer are present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for tree in SEED_TREES {
            let node_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM category WHERE root_tag = ?1")
                    .bind(tree.root_tag)
                    .fetch_one(pool)
                    .await?;
            checks.push((format!("{}:node-count", tree.root_tag), node_count >= tree.node_count));

            let top_level: Vec<String> = sqlx::query_scalar(
                "SELECT name FROM category WHERE root_tag = ?1 AND parent_id IS NULL ORDER BY name",
            )
            .bind(tree.root_tag)
            .fetch_all(pool)
            .await?;
            let all_top_level =
                tree.top_level.iter().all(|name| top_level.iter().any(|found| found == name));
            checks.push((format!("{}:top-level", tree.root_tag), all_top_level));
        }

        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM category child
             LEFT JOIN category parent ON parent.id = child.parent_id
             WHERE child.parent_id IS NOT NULL
               AND (parent.id IS NULL OR parent.root_tag <> child.root_tag)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("category:parents-share-root".to_string(), orphans == 0));

        let customer_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customer WHERE id = ?1)")
                .bind(DEMO_CUSTOMER_ID)
                .fetch_one(pool)
                .await?;
        checks.push(("customer:demo".to_string(), customer_exists == 1));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeSeedInfo {
    pub root_tag: &'static str,
    pub node_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub trees_seeded: Vec<TreeSeedInfo>,
    pub demo_customer_id: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks.iter().filter(|(_, ok)| !ok).map(|(label, _)| label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogSeed, DEMO_CUSTOMER_ID};
    use crate::repositories::test_support::setup_pool;

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = setup_pool().await;

        let before = CatalogSeed::verify(&pool).await.expect("verify empty");
        assert!(!before.all_present);
        assert!(before.failed_checks().contains(&"customer:demo"));

        let result = CatalogSeed::load(&pool).await.expect("load");
        assert_eq!(result.trees_seeded.len(), 4);
        assert_eq!(result.demo_customer_id, DEMO_CUSTOMER_ID);

        let after = CatalogSeed::verify(&pool).await.expect("verify seeded");
        assert!(after.all_present, "failed checks: {:?}", after.failed_checks());
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = setup_pool().await;
        CatalogSeed::load(&pool).await.expect("first load");
        CatalogSeed::load(&pool).await.expect("second load");

        let categories: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM category")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(categories, 21);
    }
}
