//! MySQL-backed directory store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use tracing::{debug, warn};

use super::queries::QueryKind;
use super::types::{Patient, PatientFirstName, Provider, ProviderSpecialty};
use super::DirectoryStore;
use crate::config::DatabaseSettings;
use crate::error::StoreError;

/// Acquire timeout used when none is configured. Callers queue behind a busy
/// pool for this long; a refused connect is retried until it elapses.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Directory store over a bounded MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Build the pool without opening a connection. Connections are made on
    /// first use, so an unreachable server only fails the requests that need it.
    pub fn connect(settings: &DatabaseSettings) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.username)
            .password(&settings.password)
            .database(&settings.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT))
            .connect_lazy_with(options);

        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Close all pooled connections, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Close the pool, giving up after `limit`. Returns false when a
    /// checked-out connection kept the pool open past the limit.
    pub async fn close_within(&self, limit: Duration) -> bool {
        match tokio::time::timeout(limit, self.pool.close()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    in_use = (self.pool.size() as usize).saturating_sub(self.pool.num_idle()),
                    "Database pool still busy after {}s; closing anyway",
                    limit.as_secs_f64()
                );
                false
            }
        }
    }

    fn log_query(kind: QueryKind, sql: &str, start: Instant, rows: usize) {
        debug!(
            query = %kind,
            sql,
            rows,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "query completed"
        );
    }
}

#[async_trait]
impl DirectoryStore for MySqlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query(QueryKind::Ping.sql(false))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        let start = Instant::now();
        let sql = QueryKind::ListPatients.sql(false);
        let rows = sqlx::query_as::<_, Patient>(sql)
            .fetch_all(&self.pool)
            .await?;
        Self::log_query(QueryKind::ListPatients, sql, start, rows.len());
        Ok(rows)
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, StoreError> {
        let start = Instant::now();
        let sql = QueryKind::ListProviders.sql(false);
        let rows = sqlx::query_as::<_, Provider>(sql)
            .fetch_all(&self.pool)
            .await?;
        Self::log_query(QueryKind::ListProviders, sql, start, rows.len());
        Ok(rows)
    }

    async fn search_patients(
        &self,
        first_name: Option<&str>,
    ) -> Result<Vec<PatientFirstName>, StoreError> {
        let start = Instant::now();
        let sql = QueryKind::SearchPatients.sql(first_name.is_some());
        let mut query = sqlx::query_as::<_, PatientFirstName>(sql);
        if let Some(name) = first_name {
            query = query.bind(name);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Self::log_query(QueryKind::SearchPatients, sql, start, rows.len());
        Ok(rows)
    }

    async fn search_providers(
        &self,
        specialty: Option<&str>,
    ) -> Result<Vec<ProviderSpecialty>, StoreError> {
        let start = Instant::now();
        let sql = QueryKind::SearchProviders.sql(specialty.is_some());
        let mut query = sqlx::query_as::<_, ProviderSpecialty>(sql);
        if let Some(specialty) = specialty {
            query = query.bind(specialty);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Self::log_query(QueryKind::SearchProviders, sql, start, rows.len());
        Ok(rows)
    }
}
