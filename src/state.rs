use crate::{config::Config, storage::ObjectStore};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub attachments: Arc<dyn ObjectStore>,
    pub config: Arc<Config>,
}
