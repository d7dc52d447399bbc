// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Construction of the layered evaluation namespace.
//!
//! The namespace exposes five tables to expressions:
//!
//! | table     | contents                                       |
//! |-----------|------------------------------------------------|
//! | `var`     | variable defaults                              |
//! | `local`   | locals, evaluated against `var` only           |
//! | `network` | each declared network name, mapped to itself   |
//! | `store`   | each declared store name, mapped to itself     |
//! | `data`    | `data.network.*` / `data.store.*` names found in the catalog |
//!
//! Resource tables map to plain name strings, so `network.default`
//! evaluates to `"default"`.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use hcl::Value;
use hcl::eval::{Context, Evaluate};
use indexmap::IndexMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;
use crate::document::{DataKind, ParsedDocument};
use crate::index::SymbolIndex;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./namespace_test.rs"]
mod namespace_test;

/// Name of a resource that is known to exist, either declared in the
/// document or validated against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub(crate) fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ResourceName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Names of resources validated through `data` blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTables {
    network: BTreeMap<String, ResourceName>,
    store: BTreeMap<String, ResourceName>,
}

impl DataTables {
    pub fn get(&self, kind: DataKind, name: &str) -> Option<&ResourceName> {
        self.table(kind).get(name)
    }

    pub fn contains(&self, kind: DataKind, name: &str) -> bool {
        self.table(kind).contains_key(name)
    }

    pub fn names(&self, kind: DataKind) -> impl Iterator<Item = &ResourceName> {
        self.table(kind).values()
    }

    fn table(&self, kind: DataKind) -> &BTreeMap<String, ResourceName> {
        match kind {
            DataKind::Network => &self.network,
            DataKind::Store => &self.store,
        }
    }

    fn insert(&mut self, kind: DataKind, name: &str) {
        let table = match kind {
            DataKind::Network => &mut self.network,
            DataKind::Store => &mut self.store,
        };
        table.insert(name.to_string(), ResourceName::new(name));
    }

    fn to_value(&self) -> Value {
        Value::Object(
            [
                ("network".to_string(), names_object(&self.network)),
                ("store".to_string(), names_object(&self.store)),
            ]
            .into_iter()
            .collect(),
        )
    }
}

/// Snapshot of every value visible to reference expressions.
///
/// Built once per load by [`build_namespace`] and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationNamespace {
    var: IndexMap<String, Value>,
    local: IndexMap<String, Value>,
    network: BTreeMap<String, ResourceName>,
    store: BTreeMap<String, ResourceName>,
    data: DataTables,
}

impl EvaluationNamespace {
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.var.get(name)
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.local.get(name)
    }

    pub fn network(&self, name: &str) -> Option<&ResourceName> {
        self.network.get(name)
    }

    pub fn store(&self, name: &str) -> Option<&ResourceName> {
        self.store.get(name)
    }

    pub fn data(&self) -> &DataTables {
        &self.data
    }

    /// Expression context exposing all five tables.
    pub fn context(&self) -> Context<'static> {
        let mut ctx = Context::new();
        ctx.declare_var("var", values_object(&self.var));
        ctx.declare_var("local", values_object(&self.local));
        ctx.declare_var("network", names_object(&self.network));
        ctx.declare_var("store", names_object(&self.store));
        ctx.declare_var("data", self.data.to_value());
        ctx
    }
}

/// Build the evaluation namespace for `doc`.
///
/// Variables are evaluated first against an empty context, then locals
/// against `var` alone, then declared resource names are bound, and finally
/// every `data` block is checked against `catalog` in document order. The
/// catalog is only read. `cancel` is observed around each catalog lookup.
pub async fn build_namespace<C>(
    doc: &ParsedDocument,
    index: &SymbolIndex,
    catalog: &C,
    cancel: &CancellationToken,
) -> Result<EvaluationNamespace>
where
    C: Catalog + ?Sized,
{
    let var = evaluate_variables(doc)?;
    let local = evaluate_locals(doc, &var)?;

    let network = index
        .networks
        .iter()
        .map(|name| (name.clone(), ResourceName::new(name.as_str())))
        .collect();
    let store = index
        .stores
        .iter()
        .map(|name| (name.clone(), ResourceName::new(name.as_str())))
        .collect();

    let mut data = DataTables::default();
    for data_ref in &doc.data {
        let kind = data_ref.kind()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            found = catalog.lookup(kind, &data_ref.name) => found,
        };

        match found {
            Ok(Some(_)) => data.insert(kind, &data_ref.name),
            Ok(None) => {
                return Err(Error::UnknownDataReference {
                    kind,
                    name: data_ref.name.clone(),
                });
            }
            Err(source) => {
                return Err(Error::Catalog {
                    kind,
                    name: data_ref.name.clone(),
                    source,
                });
            }
        }
    }

    Ok(EvaluationNamespace {
        var,
        local,
        network,
        store,
        data,
    })
}

fn evaluate_variables(doc: &ParsedDocument) -> Result<IndexMap<String, Value>> {
    let empty = Context::new();
    let mut vars = IndexMap::new();

    for variable in &doc.variables {
        let Some(default) = &variable.default else {
            continue;
        };
        let value = default
            .evaluate(&empty)
            .map_err(|e| Error::VariableEval {
                name: variable.name.clone(),
                message: e.to_string(),
            })?;
        vars.insert(variable.name.clone(), value);
    }

    Ok(vars)
}

fn evaluate_locals(
    doc: &ParsedDocument,
    vars: &IndexMap<String, Value>,
) -> Result<IndexMap<String, Value>> {
    let mut locals = IndexMap::new();
    let Some(block) = &doc.locals else {
        return Ok(locals);
    };

    let mut ctx = Context::new();
    ctx.declare_var("var", values_object(vars));

    for (name, expr) in &block.values {
        let value = expr.evaluate(&ctx).map_err(|e| Error::LocalEval {
            name: name.clone(),
            message: e.to_string(),
        })?;
        locals.insert(name.clone(), value);
    }

    Ok(locals)
}

fn values_object(values: &IndexMap<String, Value>) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    )
}

fn names_object(names: &BTreeMap<String, ResourceName>) -> Value {
    Value::Object(
        names
            .iter()
            .map(|(key, name)| (key.clone(), Value::String(name.to_string())))
            .collect(),
    )
}
