use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use printdesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    render(detect_config_path())
}

/// Renders every effective setting with the layer it came from. `config_path`
/// is the file to load and attribute; `None` means defaults and env only.
pub fn render(config_path: Option<PathBuf>) -> String {
    let options = LoadOptions { config_path: config_path.clone(), ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_path.as_deref());
    let fields: Vec<(&str, String, &[&str])> = vec![
        ("database.url", config.database.url.clone(), &["PRINTDESK_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PRINTDESK_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PRINTDESK_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "orders.default_specification",
            config.orders.default_specification.clone(),
            &["PRINTDESK_ORDERS_DEFAULT_SPECIFICATION"],
        ),
        (
            "orders.default_size",
            config.orders.default_size.clone(),
            &["PRINTDESK_ORDERS_DEFAULT_SIZE"],
        ),
        (
            "orders.default_quantity",
            config.orders.default_quantity.to_string(),
            &["PRINTDESK_ORDERS_DEFAULT_QUANTITY"],
        ),
        (
            "orders.default_delivery_mode",
            config.orders.default_delivery_mode.as_str().to_string(),
            &["PRINTDESK_ORDERS_DEFAULT_DELIVERY_MODE"],
        ),
        (
            "orders.default_priority",
            config.orders.default_priority.to_string(),
            &["PRINTDESK_ORDERS_DEFAULT_PRIORITY"],
        ),
        (
            "chat.recent_orders_limit",
            config.chat.recent_orders_limit.to_string(),
            &["PRINTDESK_CHAT_RECENT_ORDERS_LIMIT"],
        ),
        (
            "chat.max_detail_chars",
            config.chat.max_detail_chars.to_string(),
            &["PRINTDESK_CHAT_MAX_DETAIL_CHARS"],
        ),
        (
            "chat.currency_symbol",
            format!("{:?}", config.chat.currency_symbol),
            &["PRINTDESK_CHAT_CURRENCY_SYMBOL"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["PRINTDESK_LOGGING_LEVEL", "PRINTDESK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["PRINTDESK_LOGGING_FORMAT", "PRINTDESK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("printdesk.toml"), PathBuf::from("config/printdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
