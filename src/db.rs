use db_pool::{create_pool, DbConfig};
use sqlx::migrate::Migrator;
use sqlx::{Pool, Postgres};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Build the service pool; env tuning applies, the URL argument wins when
/// `DATABASE_URL` is unset (tests pass their own).
pub async fn init_pool(database_url: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    let mut config = DbConfig::from_env();
    if config.database_url.is_empty() {
        config.database_url = database_url.to_string();
    }
    create_pool(config).await
}
