//! Database connection, schema bootstrap and health check

use anyhow::{anyhow, Result};
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectionTrait, Database as SeaOrmDatabase, DatabaseConnection, DbBackend, EntityName,
    EntityTrait, PaginatorTrait, Schema, Statement,
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::entity::*;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Get a reference to the database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn backend(&self) -> DbBackend {
        self.connection.get_database_backend()
    }

    /// Connect with the default pool size
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Create a new database connection, retrying a few times before giving up
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to database...");

        // Every connection to an in-memory SQLite database opens a fresh, empty database
        let in_memory = database_url.starts_with("sqlite::memory:")
            || database_url.contains("mode=memory");

        let mut attempts = 0;
        loop {
            attempts += 1;

            let mut opt = sea_orm::ConnectOptions::new(database_url.to_string());
            if in_memory {
                opt.max_connections(1).min_connections(1);
            } else {
                opt.max_connections(max_connections.max(1))
                    .min_connections(1)
                    .idle_timeout(Duration::from_secs(300))        // Close idle connections after 5min
                    .max_lifetime(Duration::from_secs(3600));      // Recreate connections hourly
            }
            opt.connect_timeout(Duration::from_secs(10))
                .acquire_timeout(Duration::from_secs(30))
                .sqlx_logging(false);

            match SeaOrmDatabase::connect(opt).await {
                Ok(connection) => {
                    info!(
                        "Connected to {:?} database (max connections: {})",
                        connection.get_database_backend(),
                        if in_memory { 1 } else { max_connections }
                    );
                    return Ok(Self { connection });
                }
                Err(e) if attempts < MAX_ATTEMPTS => {
                    warn!(
                        "Failed to connect to database (attempt {}/{}): {}",
                        attempts, MAX_ATTEMPTS, e
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    error!("Failed to connect to database after {} attempts", MAX_ATTEMPTS);
                    return Err(anyhow!("Database connection failed: {}", e));
                }
            }
        }
    }

    /// Create missing tables and unique indexes from the entity definitions
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.backend();
        let schema = Schema::new(backend);

        // Parents before children so foreign keys resolve
        let tables = [
            schema.create_table_from_entity(Users).if_not_exists().to_owned(),
            schema.create_table_from_entity(Contracts).if_not_exists().to_owned(),
            schema.create_table_from_entity(ContractVersions).if_not_exists().to_owned(),
            schema.create_table_from_entity(ContractParties).if_not_exists().to_owned(),
            schema.create_table_from_entity(Signatures).if_not_exists().to_owned(),
        ];
        for table in &tables {
            self.connection.execute(backend.build(table)).await?;
        }

        let indexes = [
            (
                "uq_contract_versions_contract_number",
                ContractVersions.table_name().to_owned(),
                unique_index(
                    "uq_contract_versions_contract_number",
                    ContractVersions,
                    &[
                        contract_versions::Column::ContractId,
                        contract_versions::Column::VersionNumber,
                    ],
                    backend,
                ),
            ),
            (
                "uq_contract_parties_contract_user",
                ContractParties.table_name().to_owned(),
                unique_index(
                    "uq_contract_parties_contract_user",
                    ContractParties,
                    &[
                        contract_parties::Column::ContractId,
                        contract_parties::Column::UserId,
                    ],
                    backend,
                ),
            ),
            (
                "uq_signatures_version_signer",
                Signatures.table_name().to_owned(),
                unique_index(
                    "uq_signatures_version_signer",
                    Signatures,
                    &[signatures::Column::VersionId, signatures::Column::SignerId],
                    backend,
                ),
            ),
        ];
        for (name, table, index) in &indexes {
            // MySQL has no CREATE INDEX IF NOT EXISTS
            if backend == DbBackend::MySql && self.mysql_index_exists(table, name).await? {
                debug!("Unique index {} already present", name);
                continue;
            }
            self.connection.execute(backend.build(index)).await?;
        }

        info!("Database schema ready");
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        // Try a simple query to check connection
        let _ = Users::find()
            .paginate(&self.connection, 1)
            .fetch_page(0)
            .await
            .map_err(|e| anyhow!("Health check failed: {}", e))?;
        Ok(())
    }

    /// Whether `index` exists on `table` in the current MySQL schema
    async fn mysql_index_exists(&self, table: &str, index: &str) -> Result<bool> {
        let count: i64 = match self
            .connection
            .query_one(mysql_index_exists_statement(table, index))
            .await?
        {
            Some(row) => row.try_get_by_index(0)?,
            None => 0,
        };
        Ok(count > 0)
    }
}

fn unique_index<E, C>(name: &str, entity: E, columns: &[C], backend: DbBackend) -> IndexCreateStatement
where
    E: EntityTrait,
    C: sea_orm::sea_query::IntoIden + Copy,
{
    let mut index = Index::create();
    index.name(name).table(entity).unique();
    for column in columns {
        index.col(*column);
    }
    if backend != DbBackend::MySql {
        index.if_not_exists();
    }
    index.to_owned()
}

fn mysql_index_exists_statement(table: &str, index: &str) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::MySql,
        "SELECT COUNT(*) FROM information_schema.statistics \
         WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?",
        [table.into(), index.into()],
    )
}
