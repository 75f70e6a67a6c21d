use rust_decimal::Decimal;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub expenses: ExpenseConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let reporting_currency = normalize_currency(
            &env::var("APP_REPORTING_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
        )?;
        let fx_rates = match env::var("APP_FX_RATES") {
            Ok(raw) => parse_fx_rates(&raw)?,
            Err(_) => Vec::new(),
        };
        let message_seed = match env::var("APP_MESSAGE_SEED") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidMessageSeed(raw.clone()))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            expenses: ExpenseConfig {
                reporting_currency,
                fx_rates,
                message_seed,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Expense pipeline settings: reporting currency, static FX table, and message seeding.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseConfig {
    /// Currency used when a company record carries none.
    pub reporting_currency: String,
    /// Value of one unit of each currency expressed in `reporting_currency`.
    pub fx_rates: Vec<(String, Decimal)>,
    /// Fixed seed for gamified message selection; entropy is used when absent.
    pub message_seed: Option<u64>,
}

impl Default for ExpenseConfig {
    fn default() -> Self {
        Self {
            reporting_currency: "USD".to_string(),
            fx_rates: Vec::new(),
            message_seed: None,
        }
    }
}

fn normalize_currency(raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ConfigError::InvalidCurrency(raw.to_string()))
    }
}

/// Parses `EUR:1.08,GBP:1.27` into normalized `(code, rate)` pairs.
pub fn parse_fx_rates(raw: &str) -> Result<Vec<(String, Decimal)>, ConfigError> {
    let mut rates = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (code, rate) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidFxRate(entry.to_string()))?;
        let code = normalize_currency(code)?;
        let rate = Decimal::from_str(rate.trim())
            .map_err(|_| ConfigError::InvalidFxRate(entry.to_string()))?;
        if rate <= Decimal::ZERO {
            return Err(ConfigError::InvalidFxRate(entry.to_string()));
        }
        rates.push((code, rate));
    }
    Ok(rates)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("'{0}' is not a three letter currency code")]
    InvalidCurrency(String),
    #[error("APP_FX_RATES entry '{0}' must look like CODE:RATE with a positive rate")]
    InvalidFxRate(String),
    #[error("APP_MESSAGE_SEED '{0}' must be an unsigned integer")]
    InvalidMessageSeed(String),
}
