// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `kvmconf show` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use kvmconf::{PlanFactory, PlannedResource, ResolvedDocument};
use miette::Result;

/// Display the resolved document
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Document to show
    #[clap(short, long, default_value = kvmconf::DOCUMENT_FILENAME)]
    file: PathBuf,

    /// Show the resources that would be created, with settings defaults applied
    #[clap(long)]
    plan: bool,

    /// Output format: table, yaml, json
    #[clap(long, default_value = "table")]
    format: String,

    #[clap(flatten)]
    settings: crate::SettingsFlags,

    #[clap(flatten)]
    catalog: crate::CatalogFlags,
}

impl CmdShow {
    pub async fn run(&mut self) -> Result<i32> {
        let settings = self.settings.load()?;
        let catalog = self.catalog.open(&settings).await?;
        let cancel = crate::interrupt_token();

        let resolved = kvmconf::load(&self.file, &*catalog, &cancel).await?;

        if self.plan {
            let planned = PlanFactory::new(&settings).plan(&resolved);
            match self.format.as_str() {
                "yaml" => print_yaml(&planned)?,
                "json" => print_json(&planned)?,
                _ => self.show_plan_table(&planned),
            }
        } else {
            match self.format.as_str() {
                "yaml" => print_yaml(&resolved)?,
                "json" => print_json(&resolved)?,
                _ => self.show_table(&resolved),
            }
        }

        Ok(0)
    }

    fn show_table(&self, doc: &ResolvedDocument) {
        if let Some(path) = &doc.source_path {
            println!("{} {}", "Document:".bold(), path.display().to_string().cyan());
            println!();
        }

        println!("{}", "Networks:".bold());
        print_names(doc.networks.iter().map(|n| n.name.as_str()));

        println!();
        println!("{}", "Stores:".bold());
        print_names(doc.stores.iter().map(|s| s.name.as_str()));

        println!();
        println!("{}", "Virtual Machines:".bold());
        if doc.vms.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, vm) in doc.vms.iter().enumerate() {
            println!(
                "  {}. {}  network={}  store={}",
                i + 1,
                vm.name.green(),
                vm.network.as_str().cyan(),
                vm.store.as_str().cyan()
            );
        }

        if !doc.clusters.is_empty() {
            println!();
            println!("{}", "Clusters:".bold());
            for cluster in &doc.clusters {
                println!("  {} [{}]", cluster.name.green(), cluster.members.join(", "));
                for (key, value) in &cluster.labels {
                    println!("     {}={}", key.dimmed(), value);
                }
                if let Some(lifecycle) = &cluster.lifecycle {
                    if !lifecycle.start_order.is_empty() {
                        println!("     start: {}", lifecycle.start_order.join(" -> ").yellow());
                    }
                    if !lifecycle.stop_order.is_empty() {
                        println!("     stop:  {}", lifecycle.stop_order.join(" -> ").yellow());
                    }
                }
            }
        }
    }

    fn show_plan_table(&self, planned: &[PlannedResource]) {
        println!("{}", "Planned Resources:".bold());
        println!();

        for (i, resource) in planned.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                resource.kind.to_string().yellow(),
                resource.name.green()
            );
            for (key, value) in &resource.properties {
                println!("     {} = {}", key.dimmed(), value);
            }
        }

        println!();
        println!("Total: {} resource(s)", planned.len());
    }
}

fn print_names<'a>(names: impl ExactSizeIterator<Item = &'a str>) {
    if names.len() == 0 {
        println!("  {}", "(none)".dimmed());
    }
    for (i, name) in names.enumerate() {
        println!("  {}. {}", i + 1, name.green());
    }
}

fn print_yaml<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_yaml::to_string(value)
        .map_err(|e| miette::miette!("Failed to render yaml: {e}"))?;
    print!("{out}");
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| miette::miette!("Failed to render json: {e}"))?;
    println!("{out}");
    Ok(())
}
