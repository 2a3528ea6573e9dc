use std::sync::Arc;

use db::DBService;
use utils::assets::asset_dir;
use utils_jwt::TokenService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

const JWT_SECRET_ENV: &str = "TASKFLOW_JWT_SECRET";

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub async fn new() -> Result<Self, sqlx::Error> {
        let secret = match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) => secret,
            Err(_) => {
                tracing::warn!(
                    "{JWT_SECRET_ENV} not set; using an ephemeral secret, tokens will not survive restarts"
                );
                uuid::Uuid::new_v4().to_string()
            }
        };
        let db = DBService::new(&asset_dir()).await?;
        Ok(Self {
            db,
            tokens: Arc::new(TokenService::new(secret.as_bytes())),
        })
    }
}
