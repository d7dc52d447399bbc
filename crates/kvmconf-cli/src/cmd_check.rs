// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Validate a document against the catalog without creating anything.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Validate a document and its data references
#[derive(Debug, Args)]
pub struct CmdCheck {
    /// Document to check
    #[clap(short, long, default_value = kvmconf::DOCUMENT_FILENAME)]
    file: PathBuf,

    #[clap(flatten)]
    settings: crate::SettingsFlags,

    #[clap(flatten)]
    catalog: crate::CatalogFlags,
}

impl CmdCheck {
    pub async fn run(&mut self) -> Result<i32> {
        let settings = self.settings.load()?;
        let catalog = self.catalog.open(&settings).await?;
        let cancel = crate::interrupt_token();

        tracing::info!(file = %self.file.display(), "checking document");
        let resolved = kvmconf::load(&self.file, &*catalog, &cancel).await?;

        let path = resolved
            .source_path
            .as_ref()
            .unwrap_or(&self.file)
            .display()
            .to_string();

        println!("{} {}", "✓".green(), path.cyan());
        println!(
            "  {} network(s), {} store(s), {} vm(s), {} cluster(s)",
            resolved.networks.len(),
            resolved.stores.len(),
            resolved.vms.len(),
            resolved.clusters.len()
        );

        Ok(0)
    }
}
