use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::materials::storage::BlobStore;
use crate::notify::telegram::TelegramClient;
use crate::notify::Dispatcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub blobs: BlobStore,
    pub config: Config,
    /// Best-effort Telegram/SMS fan-out. Empty when no channel is configured.
    pub notifier: Dispatcher,
    /// Used directly for webhook replies; `None` without a bot token.
    pub telegram: Option<TelegramClient>,
}

impl AppState {
    pub fn new(db: PgPool, s3: S3Client, config: Config) -> Self {
        let telegram = config
            .telegram_bot_token
            .clone()
            .map(TelegramClient::new);
        let notifier = Dispatcher::from_config(&config, telegram.clone());
        let blobs = BlobStore::new(s3, config.s3_bucket.clone(), config.upload_url_ttl_secs);
        Self {
            db,
            blobs,
            config,
            notifier,
            telegram,
        }
    }
}
