use std::fs::File;

use pf_core::errors::*;
use pf_core::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::selector::Selector;

err_impl! {ConfigError,
    #[error("invalid monitor config: {0}")]
    Invalid(String),
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Which pods to watch, and how much each subscriber may buffer.
///
/// ```yaml
/// namespace: foo
/// labelSelector:
///   app: busybox
/// channelCapacity: 100
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub namespace: String,

    #[serde(default)]
    pub label_selector: Selector,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl MonitorConfig {
    pub fn new(namespace: &str, label_selector: Selector) -> MonitorConfig {
        MonitorConfig {
            namespace: namespace.into(),
            label_selector,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn load(filename: &str) -> anyhow::Result<MonitorConfig> {
        let config: MonitorConfig = serde_yaml::from_reader(File::open(filename)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EmptyResult {
        if self.namespace.trim().is_empty() {
            bail!(ConfigError::invalid("namespace must not be empty"));
        }

        // A zero-sized buffer would make every send a rendezvous, which tokio doesn't support
        if self.channel_capacity == 0 {
            bail!(ConfigError::invalid("channelCapacity must be at least 1"));
        }
        Ok(())
    }
}
