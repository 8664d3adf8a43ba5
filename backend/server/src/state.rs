use std::sync::Arc;

use tokio::sync::Semaphore;

use super::{config::Config, database::Database, error::AppError, password::hash_password};

/// Hashed at startup and verified against when a login names an unknown
/// account, so both paths cost one bcrypt check.
pub const DECOY_PASSWORD: &str = "decoy-password";

pub struct AppState {
    pub config: Config,
    pub database: Database,
    /// Caps how many dashboard row streams run at once.
    pub streams: Semaphore,
    pub decoy_hash: String,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let database = Database::open(&config.database_path)
            .map_err(AppError::database("Error opening database"))?;

        let seed_hash = hash_password(&config.admin_seed_password, config.bcrypt_cost).await?;
        database
            .init(seed_hash)
            .await
            .map_err(AppError::database("Error creating tables"))?;

        let decoy_hash = hash_password(DECOY_PASSWORD, config.bcrypt_cost).await?;

        Ok(Arc::new(Self {
            streams: Semaphore::new(config.max_streams.max(1)),
            config,
            database,
            decoy_hash,
        }))
    }
}
