use crate::config::Config;
use crate::error::{AdminError, Result};
use deadpool_postgres::{Config as PoolConfig, Object, Pool, Runtime};
use serde::Serialize;
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::info;

const DATABASE_LABEL: &str = "postgres";

/// Snapshot of pool occupancy for the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub max_size: usize,
    pub size: usize,
    pub available: usize,
}

/// Owns the single connection pool shared by every schema.
///
/// Tenants are schemas inside one physical database, so one pool serves all of
/// them. Components receive `&Pool` explicitly and acquire connections scoped
/// to the operation.
pub struct PoolManager {
    pool: Pool,
}

impl PoolManager {
    pub async fn new(config: &Config) -> Result<Self> {
        Self::from_url(
            &config.database_url,
            config.max_connections,
            config.pool_wait_timeout,
        )
        .await
    }

    pub async fn from_url(database_url: &str, max_size: u32, wait: Duration) -> Result<Self> {
        let pool = create_pool(database_url, max_size, wait)?;

        let client = pool.get().await.map_err(|e| AdminError::ConnectionFailed {
            database: DATABASE_LABEL.to_string(),
            cause: e.to_string(),
        })?;

        // Simple ping query
        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| AdminError::ConnectionFailed {
                database: DATABASE_LABEL.to_string(),
                cause: format!("Ping failed: {}", e),
            })?;

        info!("Connected to PostgreSQL (pool max size {})", max_size);

        Ok(Self { pool })
    }

    /// Wrap an existing pool without pinging it
    pub fn with_pool(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn client(&self) -> Result<Object> {
        acquire(&self.pool).await
    }

    pub async fn is_healthy(&self) -> bool {
        match self.pool.get().await {
            Ok(client) => client.execute("SELECT 1", &[]).await.is_ok(),
            Err(_) => false,
        }
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
        }
    }
}

/// Take one connection from the pool; it returns to the pool when dropped.
pub async fn acquire(pool: &Pool) -> Result<Object> {
    pool.get().await.map_err(|e| AdminError::ConnectionFailed {
        database: DATABASE_LABEL.to_string(),
        cause: e.to_string(),
    })
}

fn create_pool(database_url: &str, max_size: u32, wait: Duration) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: max_size as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(wait),
            create: Some(Duration::from_secs(5)),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| AdminError::Internal(format!("Failed to create pool: {}", e)))
}
