use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    Pool, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
};

pub mod models;
pub mod types;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Opens (creating if necessary) the database and runs pending migrations.
    ///
    /// `DATABASE_URL` takes precedence over the on-disk default so tests and
    /// deployments can point at their own files.
    pub async fn new(asset_dir: &Path) -> Result<Self, sqlx::Error> {
        let options = match std::env::var("DATABASE_URL") {
            Ok(url) => SqliteConnectOptions::from_str(&url)?,
            Err(_) => SqliteConnectOptions::new().filename(asset_dir.join("taskflow.sqlite")),
        };
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}
