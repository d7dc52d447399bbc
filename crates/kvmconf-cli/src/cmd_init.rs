// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `kvmconf init` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

#[cfg(test)]
#[path = "./cmd_init_test.rs"]
mod cmd_init_test;

/// Create a new kvmconf.hcl file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Directory to create file in
    #[clap(default_value = ".")]
    path: PathBuf,

    /// Name of the first VM
    #[clap(long, default_value = "vm1")]
    vm: String,

    /// Network the VM attaches to
    #[clap(long, default_value = "default")]
    network: String,

    /// Store holding the VM disks
    #[clap(long, default_value = "pool1")]
    store: String,

    /// Reference the network and store through data blocks instead of
    /// declaring them
    #[clap(long)]
    existing: bool,
}

impl CmdInit {
    pub async fn run(&mut self) -> Result<i32> {
        let doc_path = self.path.join(kvmconf::DOCUMENT_FILENAME);

        if doc_path.exists() {
            return Err(miette::miette!(
                "{} already exists at {:?}",
                kvmconf::DOCUMENT_FILENAME,
                doc_path
            ));
        }

        std::fs::write(&doc_path, self.template())
            .map_err(|e| miette::miette!("Failed to write {:?}: {e}", doc_path))?;

        println!("Created {} at {:?}", kvmconf::DOCUMENT_FILENAME, doc_path);
        println!();
        println!("Next steps:");
        println!("  1. Edit the file to describe your environment");
        println!("  2. Run 'kvmconf check' to validate it against the catalog");
        println!("  3. Run 'kvmconf show --plan' to preview the resources");

        Ok(0)
    }

    fn template(&self) -> String {
        let (resources, network_ref, store_ref) = if self.existing {
            (
                format!(
                    "# Resources managed outside this document\n\
                    data \"network\" \"{network}\" {{}}\n\
                    data \"store\" \"{store}\" {{}}\n",
                    network = self.network,
                    store = self.store,
                ),
                format!("data.network.{}", self.network),
                format!("data.store.{}", self.store),
            )
        } else {
            (
                format!(
                    "network \"{network}\" {{\n\
                    \x20 mode = \"nat\"\n\
                    }}\n\
                    \n\
                    store \"{store}\" {{\n\
                    \x20 path = \"/var/lib/kvmconf/{store}\"\n\
                    }}\n",
                    network = self.network,
                    store = self.store,
                ),
                format!("network.{}", self.network),
                format!("store.{}", self.store),
            )
        };

        format!(
            "# kvmconf environment document\n\
            \n\
            # variable \"bridge\" {{\n\
            #   description = \"Network used by every VM\"\n\
            #   default     = \"{network}\"\n\
            # }}\n\
            \n\
            {resources}\
            \n\
            vm \"{vm}\" {{\n\
            \x20 network = {network_ref}\n\
            \x20 store   = {store_ref}\n\
            \x20 cpu     = 2\n\
            \x20 memory  = \"2GiB\"\n\
            }}\n\
            \n\
            # cluster \"web\" {{\n\
            #   vms    = [\"{vm}\"]\n\
            #   labels = {{ tier = \"frontend\" }}\n\
            # }}\n",
            network = self.network,
            vm = self.vm,
        )
    }
}
