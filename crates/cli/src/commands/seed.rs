use printdesk_db::{CatalogSeed, SeedResult};

use crate::commands::{migrated_pool, prepare, CommandResult, StepError};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;

        let seed_result = CatalogSeed::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = CatalogSeed::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, StepError> = if verification.all_present {
            Ok(seed_result)
        } else {
            Err(("seed_verification", verification_message(&verification.failed_checks()), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", success_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn success_message(seeded: &SeedResult) -> String {
    let trees: Vec<String> = seeded
        .trees_seeded
        .iter()
        .map(|tree| format!("  - {}: {} categories", tree.root_tag, tree.node_count))
        .collect();
    format!(
        "demo catalog loaded:\n{}\ndemo customer: {}",
        trees.join("\n"),
        seeded.demo_customer_id
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use printdesk_db::fixtures::TreeSeedInfo;
    use printdesk_db::SeedResult;

    use super::{success_message, verification_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        assert_eq!(
            verification_message(&["sizes:top-level", "customer:demo"]),
            "Seed verification failed for checks: sizes:top-level, customer:demo"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(verification_message(&[]), "Some seed data failed to load");
    }

    #[test]
    fn success_message_lists_every_tree() {
        let seeded = SeedResult {
            trees_seeded: vec![
                TreeSeedInfo { root_tag: "products", node_count: 10 },
                TreeSeedInfo { root_tag: "sizes", node_count: 4 },
            ],
            demo_customer_id: "demo",
        };

        let message = success_message(&seeded);
        assert!(message.contains("  - products: 10 categories"));
        assert!(message.contains("  - sizes: 4 categories"));
        assert!(message.ends_with("demo customer: demo"));
    }
}
