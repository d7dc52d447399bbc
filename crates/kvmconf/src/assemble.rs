// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Hand-off of a resolved document to backend resource constructors.

use std::collections::BTreeMap;
use std::fmt;

use hcl::eval::{Context, Evaluate};
use hcl::Value;
use serde::Serialize;

use crate::document::BackendAttributes;
use crate::error::{BoxError, ResourceKind};
use crate::resolve::{ResolvedDocument, ResolvedNetwork, ResolvedStore, ResolvedVm};
use crate::settings::Settings;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./assemble_test.rs"]
mod assemble_test;

/// A backend-bound resource ready to be created.
pub trait Resource: fmt::Debug + Send + Sync {
    fn kind(&self) -> ResourceKind;
    fn name(&self) -> &str;
}

/// Constructors for backend resources.
///
/// Implementations hold whatever backend and catalog connections they need.
pub trait ResourceFactory {
    fn new_network(&self, decl: &ResolvedNetwork) -> std::result::Result<Box<dyn Resource>, BoxError>;

    fn new_store(&self, decl: &ResolvedStore) -> std::result::Result<Box<dyn Resource>, BoxError>;

    fn new_virtual_machine(&self, decl: &ResolvedVm)
    -> std::result::Result<Box<dyn Resource>, BoxError>;
}

/// Build every network, then store, then VM of `doc`.
///
/// The first factory error is returned as-is and no resources are returned.
pub fn build_resources<F>(doc: &ResolvedDocument, factory: &F) -> Result<Vec<Box<dyn Resource>>>
where
    F: ResourceFactory + ?Sized,
{
    let mut out = Vec::with_capacity(doc.networks.len() + doc.stores.len() + doc.vms.len());

    for network in &doc.networks {
        out.push(factory.new_network(network).map_err(Error::Assembly)?);
    }
    for store in &doc.stores {
        out.push(factory.new_store(store).map_err(Error::Assembly)?);
    }
    for vm in &doc.vms {
        out.push(factory.new_virtual_machine(vm).map_err(Error::Assembly)?);
    }

    Ok(out)
}

/// Description of a resource that would be created, used for dry runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    pub kind: ResourceKind,
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl Resource for PlannedResource {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory that describes resources instead of creating them.
///
/// VM properties missing from the document are filled in from [`Settings`].
///
/// Attributes are rendered without the document namespace. A value computed
/// from `var` or `local` is shown as `(computed)` and is not replaced by a
/// settings default, since the document does set it.
#[derive(Debug, Clone, Copy)]
pub struct PlanFactory<'a> {
    settings: &'a Settings,
}

impl<'a> PlanFactory<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Plan every resource of `doc`.
    pub fn plan(&self, doc: &ResolvedDocument) -> Vec<PlannedResource> {
        let mut planned = Vec::new();
        for network in &doc.networks {
            planned.push(describe(ResourceKind::Network, &network.name, &network.attributes));
        }
        for store in &doc.stores {
            planned.push(describe(ResourceKind::Store, &store.name, &store.attributes));
        }
        for vm in &doc.vms {
            planned.push(self.describe_vm(vm));
        }
        planned
    }

    fn describe_vm(&self, vm: &ResolvedVm) -> PlannedResource {
        let defaults = self.settings;
        let mut planned = describe(ResourceKind::Vm, &vm.name, &vm.attributes);
        let properties = &mut planned.properties;

        properties.insert("network".to_string(), vm.network.to_string());
        properties.insert("store".to_string(), vm.store.to_string());
        properties
            .entry("cpu".to_string())
            .or_insert_with(|| defaults.vm.defaults.cpu.to_string());
        properties
            .entry("memory".to_string())
            .or_insert_with(|| defaults.vm.defaults.memory.clone());
        properties
            .entry("disk".to_string())
            .or_insert_with(|| defaults.vm.defaults.disk.clone());
        properties
            .entry("namespace".to_string())
            .or_insert_with(|| defaults.vm.defaults.namespace.clone());

        let machine = properties
            .get("machine")
            .cloned()
            .unwrap_or_else(|| defaults.domain.defaults.machine.clone());
        properties.insert(
            "machine".to_string(),
            defaults.machine_type(&machine).to_string(),
        );

        planned
    }
}

impl ResourceFactory for PlanFactory<'_> {
    fn new_network(&self, decl: &ResolvedNetwork) -> std::result::Result<Box<dyn Resource>, BoxError> {
        Ok(Box::new(describe(ResourceKind::Network, &decl.name, &decl.attributes)))
    }

    fn new_store(&self, decl: &ResolvedStore) -> std::result::Result<Box<dyn Resource>, BoxError> {
        Ok(Box::new(describe(ResourceKind::Store, &decl.name, &decl.attributes)))
    }

    fn new_virtual_machine(
        &self,
        decl: &ResolvedVm,
    ) -> std::result::Result<Box<dyn Resource>, BoxError> {
        Ok(Box::new(self.describe_vm(decl)))
    }
}

fn describe(kind: ResourceKind, name: &str, attributes: &BackendAttributes) -> PlannedResource {
    let empty = Context::new();
    let properties = attributes
        .attributes
        .iter()
        .map(|(key, expr)| {
            let rendered = match expr.evaluate(&empty) {
                Ok(Value::String(s)) => s,
                Ok(Value::Number(n)) => n.to_string(),
                Ok(Value::Bool(b)) => b.to_string(),
                Ok(_) => "(complex)".to_string(),
                Err(_) => "(computed)".to_string(),
            };
            (key.clone(), rendered)
        })
        .collect();

    PlannedResource {
        kind,
        name: name.to_string(),
        properties,
    }
}
