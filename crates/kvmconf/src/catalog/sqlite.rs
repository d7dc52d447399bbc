// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed catalog.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::{Catalog, CatalogError, CatalogId};

const NETWORKS_TABLE: &str = "networks";
const STORES_TABLE: &str = "stores";

/// Catalog stored in the kvmconf SQLite database.
///
/// The database is opened read-only; the tables are owned and migrated by the
/// resource constructors, never by the loader.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteCatalog {
    /// Open the catalog database at `path`.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(CatalogError::Unavailable(
                "database path is empty".to_string(),
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "opened catalog");
        Ok(Self { pool, path })
    }

    /// Wrap an existing pool.
    pub fn from_pool<P: Into<PathBuf>>(pool: SqlitePool, path: P) -> Self {
        Self {
            pool,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn id_by_name(&self, table: &str, name: &str) -> Result<Option<CatalogId>, CatalogError> {
        let query = format!("SELECT id FROM {table} WHERE name = ?1");
        let id = sqlx::query_scalar::<_, i64>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        tracing::trace!(table, name, found = id.is_some(), "catalog lookup");
        Ok(id)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn network_id(&self, name: &str) -> Result<Option<CatalogId>, CatalogError> {
        self.id_by_name(NETWORKS_TABLE, name).await
    }

    async fn store_id(&self, name: &str) -> Result<Option<CatalogId>, CatalogError> {
        self.id_by_name(STORES_TABLE, name).await
    }
}
