// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Document parsing and data types for kvmconf HCL files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hcl::eval::{Context, Evaluate};
use hcl::{Attribute, Block, Body, Expression, Structure, Value};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./document_test.rs"]
mod document_test;

/// Path reported for documents that were not read from disk.
const INLINE_SOURCE: &str = "<inline>";

/// Kind of resource a `data` block refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Network,
    Store,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Store => "store",
        })
    }
}

impl FromStr for DataKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "network" => Ok(Self::Network),
            "store" => Ok(Self::Store),
            other => Err(Error::UnsupportedDataKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Backend-specific attributes and nested blocks of a declaration.
///
/// The resolution pipeline never inspects these; they are handed to the
/// resource factories untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendAttributes {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, Expression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl BackendAttributes {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.blocks.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Expression> {
        self.attributes.get(key)
    }
}

/// A user-defined `variable` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub description: Option<String>,
    pub default: Option<Expression>,
}

/// The `locals` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals {
    pub values: IndexMap<String, Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDecl {
    pub name: String,
    pub attributes: BackendAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreDecl {
    pub name: String,
    pub attributes: BackendAttributes,
}

/// A `vm` block before its references are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct VmDecl {
    pub name: String,
    pub network: Option<Expression>,
    pub store: Option<Expression>,
    pub attributes: BackendAttributes,
}

/// Start/stop ordering of a cluster's members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lifecycle {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub start_order: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_order: Vec<String>,
}

/// A logical grouping of VMs.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDecl {
    pub name: String,
    /// The `vms` attribute.
    pub members: Option<Expression>,
    pub labels: BTreeMap<String, String>,
    pub lifecycle: Option<Lifecycle>,
}

/// A `data "<kind>" "<name>" {}` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRef {
    /// The kind label as written in the document.
    pub kind: String,
    pub name: String,
}

impl DataRef {
    pub fn new<K: Into<String>, N: Into<String>>(kind: K, name: N) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Interpret the kind label.
    pub fn kind(&self) -> Result<DataKind> {
        self.kind.parse()
    }
}

/// A complete kvmconf document, as written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub variables: Vec<Variable>,
    pub locals: Option<Locals>,
    pub networks: Vec<NetworkDecl>,
    pub stores: Vec<StoreDecl>,
    pub vms: Vec<VmDecl>,
    pub clusters: Vec<ClusterDecl>,
    pub data: Vec<DataRef>,

    /// Path to the file this was loaded from.
    pub source_path: Option<PathBuf>,
}

impl ParsedDocument {
    /// Parse a document from HCL source text.
    pub fn from_hcl<S: AsRef<str>>(source: S) -> Result<Self> {
        parse_document(source.as_ref(), Path::new(INLINE_SOURCE))
    }

    /// Load a document from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut doc = parse_document(&source, path)?;
        doc.source_path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Path used when reporting errors about this document.
    pub fn display_path(&self) -> PathBuf {
        self.source_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(INLINE_SOURCE))
    }

    pub fn vm(&self, name: &str) -> Option<&VmDecl> {
        self.vms.iter().find(|vm| vm.name == name)
    }
}

fn parse_document(source: &str, path: &Path) -> Result<ParsedDocument> {
    let body = hcl::parse(source).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Decoder { path }.document(body)
}

/// Turns a parsed HCL body into typed declarations.
struct Decoder<'a> {
    path: &'a Path,
}

impl Decoder<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::Decode {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn document(&self, body: Body) -> Result<ParsedDocument> {
        let mut doc = ParsedDocument::default();

        for structure in body.into_inner() {
            let block = match structure {
                Structure::Block(block) => block,
                Structure::Attribute(attr) => {
                    return Err(self.error(format!(
                        "unexpected top-level attribute {:?}",
                        attr.key.as_str()
                    )));
                }
            };

            match block.identifier.as_str() {
                "variable" => doc.variables.push(self.variable(block)?),
                "locals" => {
                    if doc.locals.is_some() {
                        return Err(self.error("duplicate locals block"));
                    }
                    doc.locals = Some(self.locals(block)?);
                }
                "network" => {
                    let [name] = self.labels::<1>(&block)?;
                    doc.networks.push(NetworkDecl {
                        name,
                        attributes: self.backend_attributes(block.body),
                    });
                }
                "store" => {
                    let [name] = self.labels::<1>(&block)?;
                    doc.stores.push(StoreDecl {
                        name,
                        attributes: self.backend_attributes(block.body),
                    });
                }
                "vm" => doc.vms.push(self.vm(block)?),
                "cluster" => doc.clusters.push(self.cluster(block)?),
                "data" => {
                    let [kind, name] = self.labels::<2>(&block)?;
                    if !block.body.into_inner().is_empty() {
                        return Err(self.error(format!("data.{kind}.{name}: body must be empty")));
                    }
                    doc.data.push(DataRef { kind, name });
                }
                other => {
                    return Err(self.error(format!("unsupported block type {other:?}")));
                }
            }
        }

        Ok(doc)
    }

    fn labels<const N: usize>(&self, block: &Block) -> Result<[String; N]> {
        let labels: Vec<String> = block
            .labels
            .iter()
            .map(|label| label.as_str().to_string())
            .collect();
        let found = labels.len();

        labels.try_into().map_err(|_| {
            self.error(format!(
                "{} block expects {N} label(s), found {found}",
                block.identifier.as_str()
            ))
        })
    }

    fn variable(&self, block: Block) -> Result<Variable> {
        let [name] = self.labels::<1>(&block)?;
        let mut variable = Variable {
            name,
            description: None,
            default: None,
        };

        for structure in block.body.into_inner() {
            match structure {
                Structure::Attribute(Attribute { key, expr }) => match key.as_str() {
                    "default" => variable.default = Some(expr),
                    "description" => {
                        let context = format!("var.{}.description", variable.name);
                        variable.description = Some(self.literal_string(&expr, &context)?);
                    }
                    other => {
                        return Err(self.error(format!(
                            "var.{}: unsupported argument {other:?}",
                            variable.name
                        )));
                    }
                },
                Structure::Block(inner) => {
                    return Err(self.error(format!(
                        "var.{}: unexpected block {:?}",
                        variable.name,
                        inner.identifier.as_str()
                    )));
                }
            }
        }

        Ok(variable)
    }

    fn locals(&self, block: Block) -> Result<Locals> {
        let [] = self.labels::<0>(&block)?;
        let mut locals = Locals::default();

        for structure in block.body.into_inner() {
            match structure {
                Structure::Attribute(Attribute { key, expr }) => {
                    locals.values.insert(key.as_str().to_string(), expr);
                }
                Structure::Block(inner) => {
                    return Err(self.error(format!(
                        "locals: unexpected block {:?}",
                        inner.identifier.as_str()
                    )));
                }
            }
        }

        Ok(locals)
    }

    fn vm(&self, block: Block) -> Result<VmDecl> {
        let [name] = self.labels::<1>(&block)?;
        let mut network = None;
        let mut store = None;
        let mut attributes = BackendAttributes::default();

        for structure in block.body.into_inner() {
            match structure {
                Structure::Attribute(Attribute { key, expr }) => match key.as_str() {
                    "network" => network = Some(expr),
                    "store" => store = Some(expr),
                    other => {
                        attributes.attributes.insert(other.to_string(), expr);
                    }
                },
                Structure::Block(inner) => attributes.blocks.push(inner),
            }
        }

        Ok(VmDecl {
            name,
            network,
            store,
            attributes,
        })
    }

    fn cluster(&self, block: Block) -> Result<ClusterDecl> {
        let [name] = self.labels::<1>(&block)?;
        let mut cluster = ClusterDecl {
            name,
            members: None,
            labels: BTreeMap::new(),
            lifecycle: None,
        };

        for structure in block.body.into_inner() {
            match structure {
                Structure::Attribute(Attribute { key, expr }) => match key.as_str() {
                    "vms" => cluster.members = Some(expr),
                    "labels" => {
                        let context = format!("cluster.{}.labels", cluster.name);
                        cluster.labels = self.literal_string_map(&expr, &context)?;
                    }
                    other => {
                        return Err(self.error(format!(
                            "cluster.{}: unsupported argument {other:?}",
                            cluster.name
                        )));
                    }
                },
                Structure::Block(inner) if inner.identifier.as_str() == "lifecycle" => {
                    if cluster.lifecycle.is_some() {
                        return Err(self.error(format!(
                            "cluster.{}: duplicate lifecycle block",
                            cluster.name
                        )));
                    }
                    cluster.lifecycle = Some(self.lifecycle(inner, &cluster.name)?);
                }
                Structure::Block(inner) => {
                    return Err(self.error(format!(
                        "cluster.{}: unexpected block {:?}",
                        cluster.name,
                        inner.identifier.as_str()
                    )));
                }
            }
        }

        Ok(cluster)
    }

    fn lifecycle(&self, block: Block, cluster: &str) -> Result<Lifecycle> {
        let [] = self.labels::<0>(&block)?;
        let mut lifecycle = Lifecycle::default();

        for structure in block.body.into_inner() {
            let Structure::Attribute(Attribute { key, expr }) = structure else {
                return Err(self.error(format!(
                    "cluster.{cluster}.lifecycle: unexpected nested block"
                )));
            };
            let context = format!("cluster.{cluster}.lifecycle.{}", key.as_str());
            match key.as_str() {
                "start_order" => lifecycle.start_order = self.literal_string_list(&expr, &context)?,
                "stop_order" => lifecycle.stop_order = self.literal_string_list(&expr, &context)?,
                other => {
                    return Err(self.error(format!(
                        "cluster.{cluster}.lifecycle: unsupported argument {other:?}"
                    )));
                }
            }
        }

        Ok(lifecycle)
    }

    fn backend_attributes(&self, body: Body) -> BackendAttributes {
        let mut attributes = BackendAttributes::default();
        for structure in body.into_inner() {
            match structure {
                Structure::Attribute(Attribute { key, expr }) => {
                    attributes.attributes.insert(key.as_str().to_string(), expr);
                }
                Structure::Block(inner) => attributes.blocks.push(inner),
            }
        }
        attributes
    }

    /// Evaluate an expression that may not reference anything.
    fn literal(&self, expr: &Expression, context: &str) -> Result<Value> {
        expr.evaluate(&Context::new())
            .map_err(|e| self.error(format!("{context}: {e}")))
    }

    fn literal_string(&self, expr: &Expression, context: &str) -> Result<String> {
        match self.literal(expr, context)? {
            Value::String(s) => Ok(s),
            _ => Err(self.error(format!("{context}: must be string"))),
        }
    }

    fn literal_string_list(&self, expr: &Expression, context: &str) -> Result<Vec<String>> {
        let Value::Array(items) = self.literal(expr, context)? else {
            return Err(self.error(format!("{context}: must be list of string")));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(self.error(format!("{context}: must be list of string"))),
            })
            .collect()
    }

    fn literal_string_map(
        &self,
        expr: &Expression,
        context: &str,
    ) -> Result<BTreeMap<String, String>> {
        let Value::Object(entries) = self.literal(expr, context)? else {
            return Err(self.error(format!("{context}: must be map of string")));
        };
        entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                _ => Err(self.error(format!("{context}.{key}: must be string"))),
            })
            .collect()
    }
}
