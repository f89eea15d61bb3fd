//! Database connection management.

use std::sync::Arc;
use std::time::Duration;

use common::{AppResult, DatabaseConfig};
use domain::Schema;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr,
    EntityTrait, Statement,
};

use crate::relational::RelationalRepo;

/// Database wrapper for connection management.
///
/// The connection is shared behind an `Arc`, so clones of the wrapper and
/// every repository built from it use one pool.
#[derive(Clone)]
pub struct Database {
    connection: Arc<DatabaseConnection>,
}

impl Database {
    /// Open a connection pool sized by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(config.sql_logging);

        let connection = SeaDatabase::connect(options).await?;
        tracing::info!(
            backend = ?connection.get_database_backend(),
            max_connections = config.max_connections,
            "Database connected"
        );

        Ok(Self::from_connection(connection))
    }

    /// Wrap an existing connection.
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self {
            connection: Arc::new(connection),
        }
    }

    /// Get a reference to the database connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Get a shared handle to the database connection.
    pub fn get_connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.connection)
    }

    /// Repository for the entity `E`, accepting any declared field in
    /// filters and sorts.
    pub fn repository<E: EntityTrait>(&self, schema: Arc<Schema>) -> AppResult<RelationalRepo<E>> {
        RelationalRepo::new(self.get_connection(), schema)
    }

    /// Check database connectivity by executing a simple query.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.connection
            .execute(Statement::from_string(
                self.connection.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}
