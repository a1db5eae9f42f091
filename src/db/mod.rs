//! Database module providing connection management, migrations, and queries.
//!
//! Queries that run inside a caller-owned transaction are free functions
//! generic over `ConnectionTrait`; the rest are `impl DbPool` methods.

pub mod api_keys;
pub mod code_sequences;
pub mod invites;
pub mod projects;
pub mod test_cases;
pub mod test_plans;
pub mod test_runs;
pub mod users;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database.url.clone());
        options
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to connect: {}", e)))?;

        tracing::info!(
            backend = ?conn.get_database_backend(),
            max_connections = config.database.max_connections,
            "Database pool established"
        );

        Ok(Self { conn })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply all pending schema migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query to verify connectivity.
    pub async fn ping(&self) -> AppResult<()> {
        let backend = self.conn.get_database_backend();
        let stmt = Statement::from_string(backend, "SELECT 1".to_owned());
        self.conn.query_one_raw(stmt).await?;
        Ok(())
    }
}
