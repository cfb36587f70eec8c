//! Configuration types and defaults

use rtcpipe_core::{RtcError, RtcResult};
use rtcpipe_media::{AudioBufferConfig, OpusConfig, VideoBufferConfig};
use serde::{Deserialize, Serialize};

/// Engine-wide configuration
///
/// Every field has a default, so a JSON document only needs the values it
/// changes:
///
/// ```rust
/// use rtcpipe::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "mtu": 1000, "video": { "capacity": 4 } }"#)?;
/// assert_eq!(config.mtu, 1000);
/// assert_eq!(config.video.capacity, 4);
/// assert_eq!(config.audio.frame_size, 960);
/// # Ok::<(), rtcpipe::RtcError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Largest RTP payload handed to the transport, in bytes
    pub mtu: usize,
    /// Video track buffer settings
    pub video: VideoBufferConfig,
    /// Audio track buffer settings
    pub audio: AudioBufferConfig,
    /// Opus encoder settings
    pub opus: OpusConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            mtu: 1200,
            video: VideoBufferConfig::default(),
            audio: AudioBufferConfig::default(),
            opus: OpusConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> RtcResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| RtcError::InvalidArgument {
            reason: format!("invalid engine configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> RtcResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RtcError::InvalidArgument {
            reason: e.to_string(),
        })
    }

    /// Check values the pipeline cannot work with
    pub fn validate(&self) -> RtcResult<()> {
        let invalid = |reason: &str| {
            Err(RtcError::InvalidArgument {
                reason: reason.to_string(),
            })
        };
        if self.mtu < 64 {
            return invalid("mtu must be at least 64 bytes");
        }
        if self.video.capacity == 0 {
            return invalid("video.capacity must be positive");
        }
        if self.audio.frame_size == 0 {
            return invalid("audio.frame_size must be positive");
        }
        if self.audio.max_buffered_samples < self.audio.frame_size {
            return invalid("audio.max_buffered_samples must hold at least one frame");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mtu, 1200);
        assert_eq!(config.video.capacity, 10);
        assert_eq!(config.audio.max_buffered_samples, 9600);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig {
            debug_logging: true,
            mtu: 1400,
            ..EngineConfig::default()
        };
        let parsed = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = EngineConfig::from_json("{ \"mtu\": \"big\" }").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        let err = EngineConfig::from_json(r#"{ "audio": { "frame_size": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("frame_size"));
    }
}
