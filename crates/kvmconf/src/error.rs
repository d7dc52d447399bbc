// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for kvmconf operations.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::document::DataKind;

/// Convenience Result type with kvmconf Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by external collaborators (resource factories).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Kind of a named block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Network,
    Store,
    Vm,
    Cluster,
    Variable,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Store => "store",
            Self::Vm => "vm",
            Self::Cluster => "cluster",
            Self::Variable => "variable",
        })
    }
}

/// Declaration that owns a reference expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Vm(String),
    Cluster(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vm(name) => write!(f, "vm.{name}"),
            Self::Cluster(name) => write!(f, "cluster.{name}"),
        }
    }
}

/// Reference-carrying attribute of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Network,
    Store,
    Members,
    StartOrder,
    StopOrder,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Store => "store",
            Self::Members => "vms",
            Self::StartOrder => "lifecycle.start_order",
            Self::StopOrder => "lifecycle.stop_order",
        })
    }
}

/// Errors that can occur while loading and resolving a document.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Document is not valid HCL
    #[error("Failed to parse {path:?}: {message}")]
    #[diagnostic(code(kvmconf::parse), help("Check the HCL syntax of the document"))]
    Parse { path: PathBuf, message: String },

    /// Document is valid HCL but does not have the expected shape
    #[error("Invalid document {path:?}: {message}")]
    #[diagnostic(code(kvmconf::decode))]
    Decode { path: PathBuf, message: String },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(kvmconf::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("duplicate {kind} {name:?}")]
    #[diagnostic(
        code(kvmconf::duplicate_name),
        help("Each {kind} block must have a unique name")
    )]
    DuplicateName { kind: ResourceKind, name: String },

    #[error("{kind} with empty name")]
    #[diagnostic(code(kvmconf::empty_name))]
    EmptyName { kind: ResourceKind },

    #[error("var.{name}: {message}")]
    #[diagnostic(
        code(kvmconf::variable_eval),
        help("Variable defaults must be literal values and cannot reference other variables")
    )]
    VariableEval { name: String, message: String },

    #[error("local.{name}: {message}")]
    #[diagnostic(
        code(kvmconf::local_eval),
        help("Locals may only reference `var.*` values that have a default")
    )]
    LocalEval { name: String, message: String },

    /// A `data` block names a resource the catalog does not know about
    #[error("data.{kind}.{name}: not found in catalog")]
    #[diagnostic(
        code(kvmconf::unknown_data_reference),
        help("Create the {kind} first or declare it in this document instead")
    )]
    UnknownDataReference { kind: DataKind, name: String },

    #[error("unknown data type {kind:?} (supported: store, network)")]
    #[diagnostic(code(kvmconf::unsupported_data_kind))]
    UnsupportedDataKind { kind: String },

    /// Catalog lookup failed for a reason other than "not found"
    #[error("data.{kind}.{name}: catalog lookup failed")]
    #[diagnostic(code(kvmconf::catalog))]
    Catalog {
        kind: DataKind,
        name: String,
        #[source]
        source: CatalogError,
    },

    #[error("Load cancelled")]
    #[diagnostic(code(kvmconf::cancelled))]
    Cancelled,

    #[error("{owner}.{field}: missing attribute")]
    #[diagnostic(code(kvmconf::missing_attribute))]
    MissingAttribute { owner: Owner, field: Field },

    #[error("{owner}.{field}: {message}")]
    #[diagnostic(code(kvmconf::expression_eval))]
    ExpressionEval {
        owner: Owner,
        field: Field,
        message: String,
    },

    #[error("{owner}.{field}: must be {expected}")]
    #[diagnostic(code(kvmconf::type_mismatch))]
    TypeMismatch {
        owner: Owner,
        field: Field,
        expected: &'static str,
    },

    #[error("{owner}.{field}: unknown {} {value:?}", reference_noun(.field))]
    #[diagnostic(
        code(kvmconf::unknown_reference),
        help("Declare it in this document or add a matching `data` block")
    )]
    UnknownReference {
        owner: Owner,
        field: Field,
        value: String,
    },

    /// A resource factory rejected a resolved declaration
    #[error("{0}")]
    #[diagnostic(code(kvmconf::assembly))]
    Assembly(BoxError),

    /// Global settings could not be loaded
    #[error("Failed to load settings")]
    #[diagnostic(code(kvmconf::settings))]
    Settings(#[from] config::ConfigError),

    #[error("explicit settings path {0:?} not found")]
    #[diagnostic(code(kvmconf::settings_not_found))]
    SettingsNotFound(PathBuf),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(kvmconf::io_error))]
    Io(#[from] std::io::Error),
}

fn reference_noun(field: &Field) -> &'static str {
    match field {
        Field::Network => "network",
        Field::Store => "store",
        Field::Members | Field::StartOrder | Field::StopOrder => "vm",
    }
}
