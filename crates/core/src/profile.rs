//! Device profile resolution.
//!
//! A [`DeviceProfile`] is resolved once, right after the device has told us
//! which model it is, and is then passed by value to everything that needs
//! per-model channel tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::channel::ChannelInfo;
use crate::config::{GeneralConfig, TsmConfig};
use crate::error::ConfigError;
use crate::interval::SampleInterval;

/// Answer a group OID gives when the device is not of that group.
pub const NOT_THIS_GROUP: &str = "0";

/// Channel tables for the identified device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProfile {
    /// Model name reported by the device.
    pub model: String,
    /// Model group the model belongs to.
    pub model_group: String,
    /// Identity channels: common ones first, then the group's own.
    pub static_channels: Vec<ChannelInfo>,
    /// Polled channels in record order.
    pub data_channels: Vec<ChannelInfo>,
}

impl DeviceProfile {
    /// Resolves the channel tables of `model_group`.
    pub fn resolve(cfg: &TsmConfig, model: &str, model_group: &str) -> Result<Self, ConfigError> {
        let group = cfg.device_group(model_group)?;
        Ok(Self {
            model: model.to_string(),
            model_group: group.model_group.clone(),
            static_channels: cfg
                .oids
                .emc_oids
                .iter()
                .chain(&group.static_oids)
                .cloned()
                .collect(),
            data_channels: group.data_channels().cloned().collect(),
        })
    }

    /// Picks the model from the answers to [`TsmConfig::model_group_oids`].
    ///
    /// Groups are tried in config order; the first group OID that answers
    /// with something other than `"0"` names the model.
    pub fn identify(cfg: &TsmConfig, answers: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let oids = cfg.model_group_oids();
        let model = oids
            .iter()
            .filter_map(|oid| answers.get(oid))
            .map(|v| v.trim())
            .find(|v| !v.is_empty() && *v != NOT_THIS_GROUP)
            .ok_or_else(|| ConfigError::ModelNotFound { oids: oids.clone() })?;

        let model_group = cfg
            .model_map()
            .remove(model)
            .ok_or_else(|| ConfigError::UnknownModel(model.to_string()))?;

        Self::resolve(cfg, model, &model_group)
    }

    /// Static identifiers.
    pub fn static_oids(&self) -> Vec<String> {
        self.static_channels.iter().map(|c| c.oid.clone()).collect()
    }

    /// Data identifiers in record order.
    pub fn data_oids(&self) -> Vec<String> {
        self.data_channels.iter().map(|c| c.oid.clone()).collect()
    }
}

/// Everything one poll session needs, fixed at start.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPlan {
    /// Record cadence.
    pub interval: SampleInterval,
    /// Station identity for records.
    pub station: GeneralConfig,
    /// Channel tables.
    pub profile: DeviceProfile,
    all_oids: Vec<String>,
}

impl PollPlan {
    /// Builds a plan; the profile must carry at least one data channel.
    pub fn new(
        interval: SampleInterval,
        station: GeneralConfig,
        profile: DeviceProfile,
    ) -> Result<Self, ConfigError> {
        if profile.data_channels.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "model group {:?} has no data channels to poll",
                profile.model_group
            )));
        }
        let mut all_oids = profile.static_oids();
        all_oids.extend(profile.data_oids());
        Ok(Self {
            interval,
            station,
            profile,
            all_oids,
        })
    }

    /// Static then data identifiers: what the sampler queries each tick.
    pub fn all_oids(&self) -> &[String] {
        &self.all_oids
    }

    /// Data channels in record order.
    pub fn data_channels(&self) -> &[ChannelInfo] {
        &self.profile.data_channels
    }

    /// Static channels, logged once per fresh run.
    pub fn static_channels(&self) -> &[ChannelInfo] {
        &self.profile.static_channels
    }
}
