//! Station configuration file (`tsm.toml`).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::channel::ChannelInfo;
use crate::error::ConfigError;

/// Default config file name looked up on the search path.
pub const CONFIG_FILE_NAME: &str = "tsm.toml";

/// Directories searched when no config file is given explicitly.
pub const CONFIG_SEARCH_DIRS: &[&str] = &[".", "~/dev/tsm", "~/etc"];

/// Whole configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TsmConfig {
    /// Station identity copied into every record.
    pub general: GeneralConfig,
    /// Channel tables.
    pub oids: OidsConfig,
}

/// Station identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralConfig {
    /// Station code.
    #[serde(default)]
    pub sta: String,
    /// Network code.
    #[serde(default)]
    pub net: String,
    /// Location code.
    #[serde(default)]
    pub loc: String,
}

/// Channel tables for every supported device family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OidsConfig {
    /// Static channels common to every model.
    #[serde(default)]
    pub emc_oids: Vec<ChannelInfo>,
    /// One entry per model group.
    #[serde(default)]
    pub device_groups: Vec<DeviceGroup>,
}

/// Channel tables for one model group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceGroup {
    /// OID that answers with a model name on devices of this group, `"0"` otherwise.
    pub group_oid: String,
    /// Group name.
    pub model_group: String,
    /// Model names reported by devices of this group.
    #[serde(default)]
    pub model_list: Vec<String>,

    /// Values that do not change for a given device and firmware.
    #[serde(default, rename = "static")]
    pub static_oids: Vec<ChannelInfo>,
    /// Status channels.
    #[serde(default)]
    pub status: Vec<ChannelInfo>,
    /// Measurement channels.
    #[serde(default)]
    pub measurements: Vec<ChannelInfo>,
    /// Alarm channels.
    #[serde(default)]
    pub alarms: Vec<ChannelInfo>,
    /// Fault channels.
    #[serde(default)]
    pub faults: Vec<ChannelInfo>,
}

impl DeviceGroup {
    /// Polled data channels in record order.
    pub fn data_channels(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.status
            .iter()
            .chain(&self.measurements)
            .chain(&self.alarms)
            .chain(&self.faults)
    }
}

impl TsmConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(s: &str, origin: &Path) -> Result<Self, ConfigError> {
        let cfg: TsmConfig = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and validates a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml_str(&s, path)?;
        info!(path = %path.display(), "using config file");
        Ok(cfg)
    }

    /// Loads `explicit` if given, otherwise the first `tsm.toml` on the search path.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let searched = search_paths();
                match searched.iter().find(|p| p.is_file()) {
                    Some(path) => Self::load_from(path),
                    None => Err(ConfigError::NotFound { searched }),
                }
            }
        }
    }

    /// Checks the invariants the poller relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oids.device_groups.is_empty() {
            return Err(ConfigError::Invalid("no device groups configured".into()));
        }

        let mut seen = HashSet::new();
        for group in &self.oids.device_groups {
            if !seen.insert(group.model_group.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate model group {:?}",
                    group.model_group
                )));
            }
            if group.group_oid.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "model group {:?} has no group_oid",
                    group.model_group
                )));
            }
            if group.data_channels().next().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "model group {:?} has no data channels",
                    group.model_group
                )));
            }
            let channels = self
                .oids
                .emc_oids
                .iter()
                .chain(&group.static_oids)
                .chain(group.data_channels());
            for chan in channels {
                if chan.oid.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "channel {:?} in model group {:?} has an empty oid",
                        chan.label, group.model_group
                    )));
                }
            }
        }
        Ok(())
    }

    /// OIDs answering with a model name, one per group, in config order.
    pub fn model_group_oids(&self) -> Vec<String> {
        self.oids
            .device_groups
            .iter()
            .map(|g| g.group_oid.clone())
            .collect()
    }

    /// Model name to model group.
    pub fn model_map(&self) -> HashMap<String, String> {
        self.oids
            .device_groups
            .iter()
            .flat_map(|g| {
                g.model_list
                    .iter()
                    .map(move |m| (m.clone(), g.model_group.clone()))
            })
            .collect()
    }

    /// Looks up a model group by name.
    pub fn device_group(&self, model_group: &str) -> Result<&DeviceGroup, ConfigError> {
        self.oids
            .device_groups
            .iter()
            .find(|g| g.model_group == model_group)
            .ok_or_else(|| ConfigError::UnknownModelGroup(model_group.to_string()))
    }
}

fn search_paths() -> Vec<PathBuf> {
    CONFIG_SEARCH_DIRS
        .iter()
        .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()).join(CONFIG_FILE_NAME))
        .collect()
}
