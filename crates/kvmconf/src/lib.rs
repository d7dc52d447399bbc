// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! kvmconf - Declarative KVM Environment Loader
//!
//! This crate loads HCL documents describing networks, storage pools,
//! virtual machines and clusters, and resolves them into a validated model
//! that can be handed to backend resource constructors.
//!
//! # Overview
//!
//! Loading runs four strictly ordered stages, and any failure aborts the
//! whole load:
//!
//! 1. [`ParsedDocument`] - the document as written
//! 2. [`SymbolIndex`] - declared names, rejecting empty and duplicate names
//! 3. [`EvaluationNamespace`] - `var`, `local`, `network`, `store` and `data`
//!    tables, with `data` blocks checked against the [`Catalog`]
//! 4. [`ResolvedDocument`] - every VM bound to a known network and store
//!
//! # Example
//!
//! ```hcl
//! variable "bridge" {
//!   default = "default"
//! }
//!
//! locals {
//!   net = var.bridge
//! }
//!
//! network "default" {}
//! store "pool1" {}
//! data "store" "images" {}
//!
//! vm "web1" {
//!   network = local.net
//!   store   = data.store.images
//!   cpu     = 2
//! }
//!
//! cluster "web" {
//!   vms    = ["web1"]
//!   labels = { tier = "frontend" }
//!   lifecycle {
//!     start_order = ["web1"]
//!   }
//! }
//! ```

pub mod assemble;
pub mod catalog;
pub mod document;
pub mod error;
pub mod index;
pub mod loader;
pub mod namespace;
pub mod resolve;
pub mod settings;

pub use assemble::{PlanFactory, PlannedResource, Resource, ResourceFactory, build_resources};
pub use catalog::{Catalog, CatalogError, CatalogId, MemoryCatalog, SqliteCatalog};
pub use document::{
    BackendAttributes, ClusterDecl, DataKind, DataRef, Lifecycle, Locals, NetworkDecl,
    ParsedDocument, StoreDecl, Variable, VmDecl,
};
pub use error::{Error, Field, Owner, ResourceKind, Result};
pub use index::SymbolIndex;
pub use loader::{load, load_resources, load_str, resolve_document};
pub use namespace::{DataTables, EvaluationNamespace, ResourceName, build_namespace};
pub use resolve::{
    ResolvedCluster, ResolvedDocument, ResolvedNetwork, ResolvedStore, ResolvedVm, resolve,
};
pub use settings::Settings;

/// Conventional filename for environment documents.
pub const DOCUMENT_FILENAME: &str = "kvmconf.hcl";
