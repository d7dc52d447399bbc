// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Index of the resource names declared in a document.

use std::collections::BTreeSet;

use crate::document::ParsedDocument;
use crate::error::ResourceKind;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./index_test.rs"]
mod index_test;

/// Names declared locally in a document, per resource kind.
///
/// No set contains an empty name, and no name was declared twice within its
/// kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolIndex {
    pub networks: BTreeSet<String>,
    pub stores: BTreeSet<String>,
    pub vms: BTreeSet<String>,
    pub clusters: BTreeSet<String>,
    pub variables: BTreeSet<String>,
}

impl SymbolIndex {
    /// Build the index, failing on the first empty or repeated name.
    ///
    /// Networks are checked first, then stores, VMs, clusters and variables,
    /// each in document order.
    pub fn build(doc: &ParsedDocument) -> Result<Self> {
        Ok(Self {
            networks: collect_names(ResourceKind::Network, doc.networks.iter().map(|n| &n.name))?,
            stores: collect_names(ResourceKind::Store, doc.stores.iter().map(|s| &s.name))?,
            vms: collect_names(ResourceKind::Vm, doc.vms.iter().map(|v| &v.name))?,
            clusters: collect_names(ResourceKind::Cluster, doc.clusters.iter().map(|c| &c.name))?,
            variables: collect_names(
                ResourceKind::Variable,
                doc.variables.iter().map(|v| &v.name),
            )?,
        })
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.networks.contains(name)
    }

    pub fn has_store(&self, name: &str) -> bool {
        self.stores.contains(name)
    }

    pub fn has_vm(&self, name: &str) -> bool {
        self.vms.contains(name)
    }
}

fn collect_names<'a, I>(kind: ResourceKind, names: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = BTreeSet::new();
    for name in names {
        if name.is_empty() {
            return Err(Error::EmptyName { kind });
        }
        if !seen.insert(name.clone()) {
            return Err(Error::DuplicateName {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(seen)
}
