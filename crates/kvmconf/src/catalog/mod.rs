// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Read-only access to the persistent catalog of networks and stores.
//!
//! Data references in a document are validated against a [`Catalog`]. A
//! lookup distinguishes "not found" (`Ok(None)`) from a failure to reach the
//! backing store (`Err`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::DataKind;

mod sqlite;

pub use sqlite::SqliteCatalog;


/// Row identifier of a catalog record.
pub type CatalogId = i64;

/// Failure to query the catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Lookup capability over the persistent catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Find the id of the network named `name`.
    async fn network_id(&self, name: &str) -> Result<Option<CatalogId>, CatalogError>;

    /// Find the id of the store named `name`.
    async fn store_id(&self, name: &str) -> Result<Option<CatalogId>, CatalogError>;

    /// Dispatch a lookup by data kind.
    async fn lookup(&self, kind: DataKind, name: &str) -> Result<Option<CatalogId>, CatalogError> {
        match kind {
            DataKind::Network => self.network_id(name).await,
            DataKind::Store => self.store_id(name).await,
        }
    }
}

/// In-memory catalog, used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    networks: BTreeMap<String, CatalogId>,
    stores: BTreeMap<String, CatalogId>,
    next_id: CatalogId,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network<S: Into<String>>(mut self, name: S) -> Self {
        self.next_id += 1;
        self.networks.insert(name.into(), self.next_id);
        self
    }

    pub fn with_store<S: Into<String>>(mut self, name: S) -> Self {
        self.next_id += 1;
        self.stores.insert(name.into(), self.next_id);
        self
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn network_id(&self, name: &str) -> Result<Option<CatalogId>, CatalogError> {
        Ok(self.networks.get(name).copied())
    }

    async fn store_id(&self, name: &str) -> Result<Option<CatalogId>, CatalogError> {
        Ok(self.stores.get(name).copied())
    }
}
