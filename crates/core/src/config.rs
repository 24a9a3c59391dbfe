use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::DeliveryMode;
use crate::flows::{FlowSettings, OrderDefaults};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub orders: OrdersConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Values applied to a draft field the customer left unset.
#[derive(Clone, Debug)]
pub struct OrdersConfig {
    pub default_specification: String,
    pub default_size: String,
    pub default_quantity: u32,
    pub default_delivery_mode: DeliveryMode,
    pub default_priority: u8,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub recent_orders_limit: u32,
    pub max_detail_chars: usize,
    pub currency_symbol: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://printdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            orders: OrdersConfig {
                default_specification: "Standard".to_string(),
                default_size: "Standard".to_string(),
                default_quantity: 1,
                default_delivery_mode: DeliveryMode::Pickup,
                default_priority: 1,
            },
            chat: ChatConfig {
                recent_orders_limit: 5,
                max_detail_chars: 2_000,
                currency_symbol: "PHP ".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("printdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Settings handed to the chat flows.
    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            order_defaults: OrderDefaults {
                specification: self.orders.default_specification.clone(),
                size: self.orders.default_size.clone(),
                quantity: self.orders.default_quantity,
                delivery_mode: self.orders.default_delivery_mode,
                priority_level: self.orders.default_priority,
            },
            recent_orders_limit: self.chat.recent_orders_limit,
            max_detail_chars: self.chat.max_detail_chars,
            currency_symbol: self.chat.currency_symbol.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(orders) = patch.orders {
            if let Some(specification) = orders.default_specification {
                self.orders.default_specification = specification;
            }
            if let Some(size) = orders.default_size {
                self.orders.default_size = size;
            }
            if let Some(quantity) = orders.default_quantity {
                self.orders.default_quantity = quantity;
            }
            if let Some(delivery_mode) = orders.default_delivery_mode {
                self.orders.default_delivery_mode = parse_delivery_mode(&delivery_mode)?;
            }
            if let Some(priority) = orders.default_priority {
                self.orders.default_priority = priority;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(limit) = chat.recent_orders_limit {
                self.chat.recent_orders_limit = limit;
            }
            if let Some(max_detail_chars) = chat.max_detail_chars {
                self.chat.max_detail_chars = max_detail_chars;
            }
            if let Some(currency_symbol) = chat.currency_symbol {
                self.chat.currency_symbol = currency_symbol;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRINTDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PRINTDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_number("PRINTDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PRINTDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_number("PRINTDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRINTDESK_ORDERS_DEFAULT_SPECIFICATION") {
            self.orders.default_specification = value;
        }
        if let Some(value) = read_env("PRINTDESK_ORDERS_DEFAULT_SIZE") {
            self.orders.default_size = value;
        }
        if let Some(value) = read_env("PRINTDESK_ORDERS_DEFAULT_QUANTITY") {
            self.orders.default_quantity =
                parse_number("PRINTDESK_ORDERS_DEFAULT_QUANTITY", &value)?;
        }
        if let Some(value) = read_env("PRINTDESK_ORDERS_DEFAULT_DELIVERY_MODE") {
            self.orders.default_delivery_mode = DeliveryMode::parse(&value).ok_or_else(|| {
                ConfigError::InvalidEnvOverride {
                    key: "PRINTDESK_ORDERS_DEFAULT_DELIVERY_MODE".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("PRINTDESK_ORDERS_DEFAULT_PRIORITY") {
            self.orders.default_priority =
                parse_number("PRINTDESK_ORDERS_DEFAULT_PRIORITY", &value)?;
        }

        if let Some(value) = read_env("PRINTDESK_CHAT_RECENT_ORDERS_LIMIT") {
            self.chat.recent_orders_limit =
                parse_number("PRINTDESK_CHAT_RECENT_ORDERS_LIMIT", &value)?;
        }
        if let Some(value) = read_env("PRINTDESK_CHAT_MAX_DETAIL_CHARS") {
            self.chat.max_detail_chars = parse_number("PRINTDESK_CHAT_MAX_DETAIL_CHARS", &value)?;
        }
        if let Ok(value) = env::var("PRINTDESK_CHAT_CURRENCY_SYMBOL") {
            self.chat.currency_symbol = value;
        }

        let log_level =
            read_env("PRINTDESK_LOGGING_LEVEL").or_else(|| read_env("PRINTDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRINTDESK_LOGGING_FORMAT").or_else(|| read_env("PRINTDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_orders(&self.orders)?;
        validate_chat(&self.chat)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("printdesk.toml"), PathBuf::from("config/printdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_orders(orders: &OrdersConfig) -> Result<(), ConfigError> {
    if orders.default_specification.trim().is_empty() || orders.default_size.trim().is_empty() {
        return Err(ConfigError::Validation(
            "orders.default_specification and orders.default_size must not be empty".to_string(),
        ));
    }

    if orders.default_quantity == 0 {
        return Err(ConfigError::Validation(
            "orders.default_quantity must be greater than zero".to_string(),
        ));
    }

    if !(1..=5).contains(&orders.default_priority) {
        return Err(ConfigError::Validation(
            "orders.default_priority must be in range 1..=5".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.recent_orders_limit == 0 || chat.recent_orders_limit > 20 {
        return Err(ConfigError::Validation(
            "chat.recent_orders_limit must be in range 1..=20 (each order becomes a quick reply)"
                .to_string(),
        ));
    }

    if chat.max_detail_chars < 20 {
        return Err(ConfigError::Validation(
            "chat.max_detail_chars must be at least 20 so ticket descriptions fit".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_delivery_mode(value: &str) -> Result<DeliveryMode, ConfigError> {
    DeliveryMode::parse(value).ok_or_else(|| {
        ConfigError::Validation(format!(
            "orders.default_delivery_mode `{value}` is not supported (expected pickup|delivery)"
        ))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    orders: Option<OrdersPatch>,
    chat: Option<ChatPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OrdersPatch {
    default_specification: Option<String>,
    default_size: Option<String>,
    default_quantity: Option<u32>,
    default_delivery_mode: Option<String>,
    default_priority: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    recent_orders_limit: Option<u32>,
    max_detail_chars: Option<usize>,
    currency_symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::order::DeliveryMode;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_order_fallbacks() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let settings = config.flow_settings();

        ensure(settings.order_defaults.specification == "Standard", "spec defaults to Standard")?;
        ensure(settings.order_defaults.size == "Standard", "size defaults to Standard")?;
        ensure(settings.order_defaults.quantity == 1, "quantity defaults to 1")?;
        ensure(
            settings.order_defaults.delivery_mode == DeliveryMode::Pickup,
            "delivery defaults to pickup",
        )?;
        ensure(settings.order_defaults.priority_level == 1, "priority defaults to 1")?;
        ensure(settings.recent_orders_limit == 5, "tracking lists five orders")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRINTDESK_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("printdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_PRINTDESK_DB}"

[orders]
default_delivery_mode = "delivery"

[chat]
currency_symbol = "USD "
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(
                config.orders.default_delivery_mode == DeliveryMode::Delivery,
                "delivery mode should be read from file",
            )?;
            ensure(config.chat.currency_symbol == "USD ", "currency symbol should keep its space")
        })();

        clear_vars(&["TEST_PRINTDESK_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTDESK_LOG_LEVEL", "warn");
        env::set_var("PRINTDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["PRINTDESK_LOG_LEVEL", "PRINTDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("PRINTDESK_CHAT_RECENT_ORDERS_LIMIT", "8");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("printdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[chat]
recent_orders_limit = 3
max_detail_chars = 500

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.chat.recent_orders_limit == 8, "env should win over file")?;
            ensure(config.chat.max_detail_chars == 500, "file should win over defaults")
        })();

        clear_vars(&["PRINTDESK_DATABASE_URL", "PRINTDESK_CHAT_RECENT_ORDERS_LIMIT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTDESK_ORDERS_DEFAULT_QUANTITY", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("orders.default_quantity")
            );
            ensure(has_message, "validation failure should mention orders.default_quantity")
        })();

        clear_vars(&["PRINTDESK_ORDERS_DEFAULT_QUANTITY"]);
        result
    }

    #[test]
    fn malformed_env_number_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTDESK_DATABASE_MAX_CONNECTIONS", "many");
        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "PRINTDESK_DATABASE_MAX_CONNECTIONS", "key should be reported")
            }
            _ => Err("expected invalid env override".to_string()),
        };

        clear_vars(&["PRINTDESK_DATABASE_MAX_CONNECTIONS"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });
        ensure(matches!(result, Err(ConfigError::MissingConfigFile(_))), "missing file should fail")
    }
}
