// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! kvmconf - Declarative KVM Environment Loader CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kvmconf::{Catalog, MemoryCatalog, Settings, SqliteCatalog};
use miette::Result;
use tokio_util::sync::CancellationToken;

mod cmd_check;
mod cmd_init;
mod cmd_settings;
mod cmd_show;

use cmd_check::CmdCheck;
use cmd_init::CmdInit;
use cmd_settings::CmdSettings;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "kvmconf",
    about = "Declarative KVM Environment Loader",
    version,
    long_about = "Load, validate and inspect HCL documents describing KVM networks, stores, VMs and clusters"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Global settings selection.
#[derive(Parser, Clone, Debug, Default)]
pub struct SettingsFlags {
    /// Settings file layered over the well-known locations
    #[clap(long = "settings", env = "KVMCONF_SETTINGS")]
    pub settings: Option<PathBuf>,
}

impl SettingsFlags {
    pub fn load(&self) -> Result<Settings> {
        Ok(Settings::load(self.settings.as_deref())?)
    }
}

/// Catalog selection for commands that resolve documents.
#[derive(Parser, Clone, Debug, Default)]
pub struct CatalogFlags {
    /// Catalog database (defaults to paths.db from settings)
    #[clap(long = "db", env = "KVMCONF_DB")]
    pub db: Option<PathBuf>,

    /// Resolve without a catalog; every data block is reported as unknown
    #[clap(long)]
    pub offline: bool,
}

impl CatalogFlags {
    pub async fn open(&self, settings: &Settings) -> Result<Box<dyn Catalog>> {
        if self.offline {
            tracing::info!("using empty in-memory catalog");
            return Ok(Box::new(MemoryCatalog::new()));
        }

        let path = match &self.db {
            Some(path) => path,
            None if !settings.paths.db.exists() => {
                tracing::warn!(
                    path = %settings.paths.db.display(),
                    "catalog database not found, data blocks cannot be validated"
                );
                return Ok(Box::new(MemoryCatalog::new()));
            }
            None => &settings.paths.db,
        };
        let catalog = SqliteCatalog::open(path)
            .await
            .map_err(|e| miette::miette!("Failed to open catalog {:?}: {e}", path))?;
        Ok(Box::new(catalog))
    }
}

/// Token cancelled when the process receives ctrl-c.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling load");
            child.cancel();
        }
    });
    token
}

#[derive(Subcommand)]
enum Command {
    /// Create a new kvmconf.hcl file
    Init(CmdInit),

    /// Validate a document and its data references
    Check(CmdCheck),

    /// Display the resolved document
    Show(CmdShow),

    /// Display the effective global settings
    Settings(CmdSettings),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Init(mut cmd) => cmd.run().await,
            Command::Check(mut cmd) => cmd.run().await,
            Command::Show(mut cmd) => cmd.run().await,
            Command::Settings(mut cmd) => cmd.run().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}
