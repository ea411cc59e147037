use std::sync::Arc;

use crate::config::AppConfig;
use crate::db;
use crate::donations::repo::{DonationRepo, PgDonationRepo};
use crate::storage::{self, StorageClient};
use crate::users::repo::{PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub donations: Arc<dyn DonationRepo>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        let storage = storage::from_config(&config.storage).await?;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(pool.clone())),
            Arc::new(PgDonationRepo::new(pool)),
            storage,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        donations: Arc<dyn DonationRepo>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            config,
            users,
            donations,
            storage,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Fixture::new().state
    }
}
