// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `kvmconf settings` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Display the effective global settings
#[derive(Debug, Args)]
pub struct CmdSettings {
    /// List the settings files that were consulted
    #[clap(long)]
    files: bool,

    /// Output format: yaml, json
    #[clap(long, default_value = "yaml")]
    format: String,

    #[clap(flatten)]
    settings: crate::SettingsFlags,
}

impl CmdSettings {
    pub async fn run(&mut self) -> Result<i32> {
        let settings = self.settings.load()?;

        if self.files {
            println!("{}", "Settings Files:".bold());
            let explicit = self.settings.settings.iter().cloned();
            for path in kvmconf::settings::default_search_paths()
                .into_iter()
                .chain(explicit)
            {
                let marker = if path.is_file() {
                    "found".green()
                } else {
                    "missing".dimmed()
                };
                println!("  {} [{}]", path.display(), marker);
            }
            println!();
        }

        let rendered = match self.format.as_str() {
            "json" => serde_json::to_string_pretty(&settings)
                .map_err(|e| miette::miette!("Failed to render json: {e}"))?,
            _ => serde_yaml::to_string(&settings)
                .map_err(|e| miette::miette!("Failed to render yaml: {e}"))?,
        };
        println!("{}", rendered.trim_end());

        Ok(0)
    }
}
