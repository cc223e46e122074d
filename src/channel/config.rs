//! Channel configuration.

use crate::core::DEFAULT_MAX_FRAME_LEN;

/// Per-channel settings.
///
/// Neither value is negotiated; they only bound what this side accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Largest inbound payload accepted before the connection is treated as
    /// corrupt.
    pub max_frame_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ChannelConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::new()
    }
}

/// Builder for [`ChannelConfig`].
#[derive(Debug, Clone)]
pub struct ChannelConfigBuilder {
    config: ChannelConfig,
}

impl Default for ChannelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelConfigBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            config: ChannelConfig::default(),
        }
    }

    /// Set the maximum inbound payload size.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.config.max_frame_len = len;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ChannelConfig {
        self.config
    }
}
