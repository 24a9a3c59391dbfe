use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use printdesk_cli::commands::{config, migrate, seed};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("PRINTDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_failure() {
    with_env(&[("PRINTDESK_DATABASE_URL", "postgres://elsewhere/printdesk")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_every_catalog_tree() {
    with_env(&[("PRINTDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        for line in [
            "  - products: 10 categories",
            "  - specifications: 3 categories",
            "  - sizes: 4 categories",
            "  - quantities: 4 categories",
        ] {
            assert!(message.contains(line), "missing `{line}` in {message}");
        }
    });
}

#[test]
fn seed_is_idempotent_against_a_file_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("printdesk.db").display());

    with_env(&[("PRINTDESK_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0, "first seed: {}", first.output);
        assert_eq!(second.exit_code, 0, "second seed: {}", second.output);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn config_attributes_values_to_env_file_and_default() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("printdesk.toml");
    fs::write(&path, "[chat]\nrecent_orders_limit = 3\n").expect("write config");

    with_env(&[("PRINTDESK_LOG_LEVEL", "debug")], || {
        let output = config::render(Some(path.clone()));

        assert!(output.contains("- chat.recent_orders_limit = 3 (source: file ("));
        assert!(output.contains("- logging.level = debug (source: env (PRINTDESK_LOG_LEVEL))"));
        assert!(output.contains("- database.url = sqlite://printdesk.db (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PRINTDESK_DATABASE_URL",
        "PRINTDESK_DATABASE_MAX_CONNECTIONS",
        "PRINTDESK_DATABASE_TIMEOUT_SECS",
        "PRINTDESK_ORDERS_DEFAULT_SPECIFICATION",
        "PRINTDESK_ORDERS_DEFAULT_SIZE",
        "PRINTDESK_ORDERS_DEFAULT_QUANTITY",
        "PRINTDESK_ORDERS_DEFAULT_DELIVERY_MODE",
        "PRINTDESK_ORDERS_DEFAULT_PRIORITY",
        "PRINTDESK_CHAT_RECENT_ORDERS_LIMIT",
        "PRINTDESK_CHAT_MAX_DETAIL_CHARS",
        "PRINTDESK_CHAT_CURRENCY_SYMBOL",
        "PRINTDESK_LOGGING_LEVEL",
        "PRINTDESK_LOGGING_FORMAT",
        "PRINTDESK_LOG_LEVEL",
        "PRINTDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
