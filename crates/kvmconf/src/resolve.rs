// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of VM and cluster references into a [`ResolvedDocument`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use hcl::eval::{Context, Evaluate};
use hcl::{Expression, Value};
use serde::Serialize;

use crate::document::{
    BackendAttributes, ClusterDecl, DataKind, Lifecycle, NetworkDecl, ParsedDocument, StoreDecl,
    VmDecl,
};
use crate::error::{Field, Owner};
use crate::index::SymbolIndex;
use crate::namespace::{EvaluationNamespace, ResourceName};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// A VM with its network and store bound to known resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVm {
    pub name: String,
    pub network: ResourceName,
    pub store: ResourceName,
    #[serde(skip_serializing_if = "BackendAttributes::is_empty")]
    pub attributes: BackendAttributes,
}

/// A cluster with its member expression expanded to VM names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCluster {
    pub name: String,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNetwork {
    pub name: String,
    #[serde(skip_serializing_if = "BackendAttributes::is_empty")]
    pub attributes: BackendAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedStore {
    pub name: String,
    #[serde(skip_serializing_if = "BackendAttributes::is_empty")]
    pub attributes: BackendAttributes,
}

/// A document whose every reference has been validated.
///
/// Only produced by [`resolve`]; there is no partially resolved state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    pub networks: Vec<ResolvedNetwork>,
    pub stores: Vec<ResolvedStore>,
    pub vms: Vec<ResolvedVm>,
    pub clusters: Vec<ResolvedCluster>,
}

impl ResolvedDocument {
    pub fn vm(&self, name: &str) -> Option<&ResolvedVm> {
        self.vms.iter().find(|vm| vm.name == name)
    }

    pub fn cluster(&self, name: &str) -> Option<&ResolvedCluster> {
        self.clusters.iter().find(|cluster| cluster.name == name)
    }
}

/// Resolve every VM and cluster in `doc` against `namespace`.
///
/// VMs are resolved in document order, network before store, then clusters.
/// The first failure aborts resolution.
pub fn resolve(
    doc: &ParsedDocument,
    index: &SymbolIndex,
    namespace: &EvaluationNamespace,
) -> Result<ResolvedDocument> {
    let resolver = Resolver {
        index,
        namespace,
        ctx: namespace.context(),
    };

    let vms = doc
        .vms
        .iter()
        .map(|vm| resolver.vm(vm))
        .collect::<Result<Vec<_>>>()?;

    let clusters = doc
        .clusters
        .iter()
        .map(|cluster| resolver.cluster(cluster))
        .collect::<Result<Vec<_>>>()?;

    Ok(ResolvedDocument {
        source_path: doc.source_path.clone(),
        networks: doc.networks.iter().map(ResolvedNetwork::from).collect(),
        stores: doc.stores.iter().map(ResolvedStore::from).collect(),
        vms,
        clusters,
    })
}

struct Resolver<'a> {
    index: &'a SymbolIndex,
    namespace: &'a EvaluationNamespace,
    ctx: Context<'static>,
}

impl Resolver<'_> {
    fn vm(&self, vm: &VmDecl) -> Result<ResolvedVm> {
        let owner = Owner::Vm(vm.name.clone());

        let network = self.eval_string(vm.network.as_ref(), &owner, Field::Network)?;
        let network = self.reference(DataKind::Network, network, &owner, Field::Network)?;

        let store = self.eval_string(vm.store.as_ref(), &owner, Field::Store)?;
        let store = self.reference(DataKind::Store, store, &owner, Field::Store)?;

        Ok(ResolvedVm {
            name: vm.name.clone(),
            network,
            store,
            attributes: vm.attributes.clone(),
        })
    }

    fn cluster(&self, cluster: &ClusterDecl) -> Result<ResolvedCluster> {
        let owner = Owner::Cluster(cluster.name.clone());
        let value = self.eval(cluster.members.as_ref(), &owner, Field::Members)?;

        let mismatch = || Error::TypeMismatch {
            owner: owner.clone(),
            field: Field::Members,
            expected: "list of string",
        };
        let Value::Array(items) = value else {
            return Err(mismatch());
        };

        let mut members = Vec::with_capacity(items.len());
        for item in items {
            let Value::String(member) = item else {
                return Err(mismatch());
            };
            if !self.index.has_vm(&member) {
                return Err(Error::UnknownReference {
                    owner: owner.clone(),
                    field: Field::Members,
                    value: member,
                });
            }
            members.push(member);
        }

        if let Some(lifecycle) = &cluster.lifecycle {
            check_order(&owner, Field::StartOrder, &lifecycle.start_order, &members)?;
            check_order(&owner, Field::StopOrder, &lifecycle.stop_order, &members)?;
        }

        Ok(ResolvedCluster {
            name: cluster.name.clone(),
            members,
            labels: cluster.labels.clone(),
            lifecycle: cluster.lifecycle.clone(),
        })
    }

    fn eval(&self, expr: Option<&Expression>, owner: &Owner, field: Field) -> Result<Value> {
        let expr = expr.ok_or_else(|| Error::MissingAttribute {
            owner: owner.clone(),
            field,
        })?;

        expr.evaluate(&self.ctx).map_err(|e| Error::ExpressionEval {
            owner: owner.clone(),
            field,
            message: e.to_string(),
        })
    }

    fn eval_string(&self, expr: Option<&Expression>, owner: &Owner, field: Field) -> Result<String> {
        match self.eval(expr, owner, field)? {
            Value::String(value) => Ok(value),
            _ => Err(Error::TypeMismatch {
                owner: owner.clone(),
                field,
                expected: "string",
            }),
        }
    }

    /// Bind `value` to a locally declared resource or a validated data reference.
    fn reference(
        &self,
        kind: DataKind,
        value: String,
        owner: &Owner,
        field: Field,
    ) -> Result<ResourceName> {
        let declared = match kind {
            DataKind::Network => self.index.has_network(&value),
            DataKind::Store => self.index.has_store(&value),
        };
        if declared || self.namespace.data().contains(kind, &value) {
            return Ok(ResourceName::new(value));
        }

        Err(Error::UnknownReference {
            owner: owner.clone(),
            field,
            value,
        })
    }
}

fn check_order(owner: &Owner, field: Field, order: &[String], members: &[String]) -> Result<()> {
    match order.iter().find(|name| !members.contains(*name)) {
        Some(stray) => Err(Error::UnknownReference {
            owner: owner.clone(),
            field,
            value: stray.clone(),
        }),
        None => Ok(()),
    }
}

impl From<&NetworkDecl> for ResolvedNetwork {
    fn from(decl: &NetworkDecl) -> Self {
        Self {
            name: decl.name.clone(),
            attributes: decl.attributes.clone(),
        }
    }
}

impl From<&StoreDecl> for ResolvedStore {
    fn from(decl: &StoreDecl) -> Self {
        Self {
            name: decl.name.clone(),
            attributes: decl.attributes.clone(),
        }
    }
}
