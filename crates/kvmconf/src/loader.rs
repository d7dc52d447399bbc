// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Full load pipeline: parse, index, build namespace, resolve.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::assemble::{Resource, ResourceFactory, build_resources};
use crate::catalog::Catalog;
use crate::document::ParsedDocument;
use crate::index::SymbolIndex;
use crate::namespace::build_namespace;
use crate::resolve::{ResolvedDocument, resolve};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./loader_test.rs"]
mod loader_test;

/// Load and resolve the document at `path`.
pub async fn load<P, C>(path: P, catalog: &C, cancel: &CancellationToken) -> Result<ResolvedDocument>
where
    P: AsRef<Path>,
    C: Catalog + ?Sized,
{
    let path = path.as_ref();
    let path = dunce::canonicalize(path).map_err(|e| Error::ReadFailed {
        path: path.to_path_buf(),
        error: e,
    })?;

    let doc = ParsedDocument::load(&path)?;
    resolve_document(&doc, catalog, cancel).await
}

/// Load and resolve a document from HCL source text.
pub async fn load_str<C>(source: &str, catalog: &C, cancel: &CancellationToken) -> Result<ResolvedDocument>
where
    C: Catalog + ?Sized,
{
    let doc = ParsedDocument::from_hcl(source)?;
    resolve_document(&doc, catalog, cancel).await
}

/// Run indexing, namespace construction and resolution on a parsed document.
///
/// Each stage must succeed before the next one starts.
pub async fn resolve_document<C>(
    doc: &ParsedDocument,
    catalog: &C,
    cancel: &CancellationToken,
) -> Result<ResolvedDocument>
where
    C: Catalog + ?Sized,
{
    let index = SymbolIndex::build(doc)?;
    let namespace = build_namespace(doc, &index, catalog, cancel).await?;
    resolve(doc, &index, &namespace)
}

/// Load the document at `path` and construct its backend resources.
pub async fn load_resources<P, C, F>(
    path: P,
    catalog: &C,
    factory: &F,
    cancel: &CancellationToken,
) -> Result<Vec<Box<dyn Resource>>>
where
    P: AsRef<Path>,
    C: Catalog + ?Sized,
    F: ResourceFactory + ?Sized,
{
    let resolved = load(path, catalog, cancel).await?;
    build_resources(&resolved, factory)
}
