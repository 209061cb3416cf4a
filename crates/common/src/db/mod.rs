//! Database layer for Acervo
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Schema bootstrap (sqlx migrations on Postgres, entity schema elsewhere)

mod input;
pub mod models;
mod repository;

pub use input::{today, LookupInput, NewSubproject, RecordInput};
pub use repository::{
    Facets, NamedRef, Page, RecordDetail, Repository, SubprojectSummary,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::*;
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema,
};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Private SQLite database held in memory, schema applied.
    ///
    /// A single connection is kept so every query sees the same database.
    pub async fn in_memory() -> Result<Self> {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let primary = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let pool = Self {
            primary,
            replica: None,
        };
        pool.create_schema().await?;
        Ok(pool)
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }

    /// Bring the schema up to date for the connected backend
    pub async fn migrate(&self) -> Result<()> {
        match self.primary.get_database_backend() {
            DbBackend::Postgres => {
                info!("Applying migrations...");
                sqlx::migrate!("../../migrations")
                    .run(self.primary.get_postgres_connection_pool())
                    .await
                    .map_err(|e| AppError::DatabaseConnection {
                        message: format!("Migration failed: {}", e),
                    })?;
                Ok(())
            }
            _ => self.create_schema().await,
        }
    }

    /// Create tables and indexes from the entity definitions (idempotent)
    pub async fn create_schema(&self) -> Result<()> {
        let conn = self.write();
        let backend = conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut tables = vec![
            schema.create_table_from_entity(LookupEntity),
            schema.create_table_from_entity(SubprojectEntity),
            schema.create_table_from_entity(RecordEntity),
            schema.create_table_from_entity(RecordAuthorEntity),
            schema.create_table_from_entity(RecordTagEntity),
        ];

        for table in tables.iter_mut() {
            table.if_not_exists();
            conn.execute(backend.build(&*table)).await?;
        }

        let indexes = [
            Index::create()
                .if_not_exists()
                .name("ux_lookups_kind_name")
                .table(LookupEntity)
                .col(LookupColumn::Kind)
                .col(LookupColumn::Name)
                .unique()
                .to_owned(),
            Index::create()
                .if_not_exists()
                .name("ux_subprojects_project_name")
                .table(SubprojectEntity)
                .col(SubprojectColumn::ProjectId)
                .col(SubprojectColumn::Name)
                .unique()
                .to_owned(),
            Index::create()
                .if_not_exists()
                .name("ix_records_published_on")
                .table(RecordEntity)
                .col(RecordColumn::PublishedOn)
                .to_owned(),
        ];

        for index in indexes.iter() {
            conn.execute(backend.build(index)).await?;
        }

        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}
