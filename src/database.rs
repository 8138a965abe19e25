use sqlx::{
    mysql::MySqlPoolOptions,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    MySqlPool, SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::{DatabaseConfig, DbBackend};

/// Пул соединений конкретного движка.
#[derive(Clone, Debug)]
pub enum Pool {
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: Pool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = match config.backend {
            DbBackend::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(config.pool_size)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect(&config.url)
                    .await?;
                Pool::MySql(pool)
            }
            DbBackend::Sqlite => {
                let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(config.pool_size)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect_with(options)
                    .await?;
                Pool::Sqlite(pool)
            }
        };

        Ok(Database { pool })
    }

    /// Migrated in-memory SQLite database.
    ///
    /// Every SQLite connection to `:memory:` opens its own empty database, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Database { pool: Pool::Sqlite(pool) };
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn backend(&self) -> DbBackend {
        match self.pool {
            Pool::MySql(_) => DbBackend::MySql,
            Pool::Sqlite(_) => DbBackend::Sqlite,
        }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations ({:?})...", self.backend());
        match &self.pool {
            Pool::MySql(pool) => sqlx::migrate!("./src/migrations/mysql").run(pool).await?,
            Pool::Sqlite(pool) => sqlx::migrate!("./src/migrations/sqlite").run(pool).await?,
        }
        info!("Migrations completed");
        Ok(())
    }
}
