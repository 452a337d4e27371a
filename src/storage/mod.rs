//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, StorageType};
use crate::interfaces::{AuditStore, IdempotencyStore, PointsStore};

pub mod schema;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::{PgAuditStore, PgIdempotencyStore, PgPointsStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteAuditStore, SqliteIdempotencyStore, SqlitePointsStore};

/// Handles to the three storage concerns of the points core.
pub struct Stores {
    pub points: Arc<dyn PointsStore>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub audit: Arc<dyn AuditStore>,
}

/// Initialize storage based on configuration.
///
/// Creates the schema if missing and returns store implementations for the
/// configured backend.
pub async fn init_storage(config: &Config) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.storage.storage_type {
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let sqlite = &config.storage.sqlite;
            info!("Storage: sqlite at {}", sqlite.path);

            if let Some(parent) = std::path::Path::new(&sqlite.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let options = sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&sqlite.path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(sqlite.busy_timeout_secs));
            let pool = sqlx::SqlitePool::connect_with(options).await?;

            let points = Arc::new(SqlitePointsStore::new(
                pool.clone(),
                config.points.earn_divisor_minor_units,
            ));
            points.init().await?;

            Ok(Stores {
                points,
                idempotency: Arc::new(SqliteIdempotencyStore::new(pool.clone())),
                audit: Arc::new(SqliteAuditStore::new(pool)),
            })
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => Err("SQLite storage requested but 'sqlite' feature is not enabled".into()),

        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            info!("Storage: postgres");

            let pool = sqlx::PgPool::connect(&config.storage.postgres.uri).await?;

            let points = Arc::new(PgPointsStore::new(
                pool.clone(),
                config.points.earn_divisor_minor_units,
            ));
            points.init().await?;

            Ok(Stores {
                points,
                idempotency: Arc::new(PgIdempotencyStore::new(pool.clone())),
                audit: Arc::new(PgAuditStore::new(pool)),
            })
        }
        #[cfg(not(feature = "postgres"))]
        StorageType::Postgres => {
            Err("PostgreSQL storage requested but 'postgres' feature is not enabled".into())
        }
    }
}
