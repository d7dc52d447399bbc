// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

//! System-wide default settings.
//!
//! Settings are layered from built-in defaults and any TOML files found in
//! the well-known locations, later files overriding earlier ones:
//!
//! 1. `/etc/kvmconf/kvmconf.toml`
//! 2. `~/.config/kvmconf/config.toml`
//! 3. `~/.config/kvmconf/kvmconf.toml`
//! 4. `./kvmconf.toml`
//! 5. `./configs/kvmconf.toml`
//! 6. an explicit path given by the caller
//!
//! Per-resource defaults live under `defaults` sub-tables:
//!
//! ```toml
//! [vm.defaults]
//! cpu = 4
//!
//! [net.defaults]
//! type = "bridge"
//! ```
//!
//! Unknown keys are rejected rather than ignored. The result is an
//! immutable [`Settings`] value built once at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./settings_test.rs"]
mod settings_test;

/// Well-known filename for settings files.
pub const SETTINGS_FILENAME: &str = "kvmconf.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub meta: MetaSettings,
    pub paths: PathSettings,
    pub vm: Section<VmDefaults>,
    pub domain: Section<DomainDefaults>,
    pub disk: Section<DiskDefaults>,
    pub net: Section<NetDefaults>,
    pub graphics: Section<GraphicsDefaults>,
    pub qemu: QemuSettings,
}

/// A settings table whose values live under a `defaults` sub-table,
/// as in `[vm.defaults]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Section<T> {
    pub defaults: T,
}

impl<T> Section<T> {
    fn new(defaults: T) -> Self {
        Self { defaults }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetaSettings {
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
    /// Catalog database.
    pub db: PathBuf,
    pub images_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VmDefaults {
    pub cpu: u32,
    pub memory: String,
    pub disk: String,
    #[serde(default)]
    pub name_prefix: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DomainDefaults {
    pub machine: String,
    pub arch: String,
    pub domain_type: String,
    pub boot_device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiskDefaults {
    pub bus: String,
    pub format: String,
    pub target_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetDefaults {
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphicsDefaults {
    #[serde(rename = "type")]
    pub kind: String,
    pub listen: String,
    pub autoport: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QemuSettings {
    /// Short machine names mapped to versioned QEMU machine types.
    pub machine_aliases: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_default()
            .join(".local")
            .join("share")
            .join("kvmconf");

        Self {
            meta: MetaSettings { version: 1 },
            paths: PathSettings {
                db: data_dir.join("kvmconf.db"),
                images_dir: data_dir.join("images"),
            },
            vm: Section::new(VmDefaults {
                cpu: 2,
                memory: "2GiB".to_string(),
                disk: "20GiB".to_string(),
                name_prefix: String::new(),
                namespace: "default".to_string(),
            }),
            domain: Section::new(DomainDefaults {
                machine: "q35".to_string(),
                arch: "x86_64".to_string(),
                domain_type: "kvm".to_string(),
                boot_device: "hd".to_string(),
            }),
            disk: Section::new(DiskDefaults {
                bus: "virtio".to_string(),
                format: "qcow2".to_string(),
                target_prefix: "vd".to_string(),
            }),
            net: Section::new(NetDefaults {
                kind: "network".to_string(),
                model: "virtio".to_string(),
            }),
            graphics: Section::new(GraphicsDefaults {
                kind: "vnc".to_string(),
                listen: "0.0.0.0".to_string(),
                autoport: true,
            }),
            qemu: QemuSettings {
                machine_aliases: BTreeMap::from([
                    ("q35".to_string(), "pc-q35-9.2".to_string()),
                    ("pc".to_string(), "pc-i440fx-9.2".to_string()),
                ]),
            },
        }
    }
}

impl Settings {
    /// Load settings from the well-known locations plus an optional
    /// explicit file, which must exist when given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut paths = default_search_paths();
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Error::SettingsNotFound(path.to_path_buf()));
            }
            paths.push(path.to_path_buf());
        }
        Self::from_files(&paths)
    }

    /// Layer the given files, in order, over the built-in defaults.
    ///
    /// Files that do not exist are skipped.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }
            tracing::debug!(path = %path.display(), "loading settings");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Full QEMU machine type for a possibly aliased machine name.
    pub fn machine_type<'a>(&'a self, machine: &'a str) -> &'a str {
        self.qemu
            .machine_aliases
            .get(machine)
            .map(String::as_str)
            .unwrap_or(machine)
    }
}

/// Candidate settings files, lowest precedence first.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/kvmconf").join(SETTINGS_FILENAME)];

    if let Some(config_dir) = dirs::home_dir().map(|home| home.join(".config").join("kvmconf")) {
        paths.push(config_dir.join("config.toml"));
        paths.push(config_dir.join(SETTINGS_FILENAME));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(SETTINGS_FILENAME));
        paths.push(cwd.join("configs").join(SETTINGS_FILENAME));
    }

    paths
}
