use serde::{Deserialize, Serialize};

use crate::params::{SinkParams, SourceParams, StatusParams};
use crate::scale::DEFAULT_DEVICE_COUNT;

/// Construction parameters for [`PsbCodec`](crate::PsbCodec).
///
/// Every field has a default, so a config file only needs to name what it
/// overrides:
///
/// ```
/// let config: psb_can::PsbConfig =
///     serde_json::from_str(r#"{ "device_count": 2, "source": { "u": 48.0 } }"#).unwrap();
/// assert_eq!(config.device_count, 2);
/// assert_eq!(config.source.i, 0.0);
/// assert!(config.status.remote_control);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsbConfig {
    pub device_count: u32,
    pub source: SourceParams,
    pub sink: SinkParams,
    pub status: StatusParams,
}

impl Default for PsbConfig {
    fn default() -> Self {
        Self {
            device_count: DEFAULT_DEVICE_COUNT,
            source: SourceParams::default(),
            sink: SinkParams::default(),
            status: StatusParams::default(),
        }
    }
}

impl PsbConfig {
    pub fn with_device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    pub fn with_source(mut self, source: SourceParams) -> Self {
        self.source = source;
        self
    }

    pub fn with_sink(mut self, sink: SinkParams) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_status(mut self, status: StatusParams) -> Self {
        self.status = status;
        self
    }
}
