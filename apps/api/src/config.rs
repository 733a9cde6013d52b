use anyhow::{Context, Result};

/// Default per-day late fee, in the smallest currency unit.
pub const DEFAULT_PENALTY_PER_DAY: i64 = 10_000;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    pub penalty_per_day: i64,
    pub upload_url_ttl_secs: u64,
    pub telegram_bot_token: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook calls, if set.
    pub telegram_webhook_secret: Option<String>,
    pub twilio: Option<TwilioConfig>,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: optional_env("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            penalty_per_day: parse_env("PENALTY_PER_DAY", DEFAULT_PENALTY_PER_DAY)
                .context("PENALTY_PER_DAY must be an integer")?,
            upload_url_ttl_secs: parse_env("UPLOAD_URL_TTL_SECS", 900)
                .context("UPLOAD_URL_TTL_SECS must be a number of seconds")?,
            telegram_bot_token: optional_env("TELEGRAM_BOT_TOKEN"),
            telegram_webhook_secret: optional_env("TELEGRAM_WEBHOOK_SECRET"),
            twilio: twilio_from_env(),
        })
    }
}

/// SMS is enabled only when all three Twilio variables are present.
fn twilio_from_env() -> Option<TwilioConfig> {
    Some(TwilioConfig {
        account_sid: optional_env("TWILIO_ACCOUNT_SID")?,
        auth_token: optional_env("TWILIO_AUTH_TOKEN")?,
        from_number: optional_env("TWILIO_FROM_NUMBER")?,
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value for '{key}': {raw}")),
        None => Ok(default),
    }
}
