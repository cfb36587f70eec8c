//! Error types for rtcpipe

use thiserror::Error;

/// Main error type for rtcpipe operations
#[derive(Error, Debug)]
pub enum RtcError {
    /// Invalid argument passed to an API call
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Reason the argument was rejected
        reason: String,
    },

    /// Media kind that cannot carry RTP media
    #[error("Unsupported media kind: {kind}")]
    UnsupportedMediaKind {
        /// Kind as given by the caller
        kind: String,
    },

    /// Malformed session description text
    #[error("SDP parse error at line {line}: {reason}")]
    SdpParse {
        /// 1-based line number in the SDP text
        line: usize,
        /// Reason for the parse failure
        reason: String,
    },

    /// Unsupported codec error
    #[error("Unsupported codec: {codec}")]
    UnsupportedCodec {
        /// Codec name
        codec: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Transport error
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// Media processing error
    #[error("Media processing error: {reason}")]
    Media {
        /// Reason for media error
        reason: String,
    },
}

impl RtcError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RtcError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            RtcError::UnsupportedMediaKind { .. } => "UNSUPPORTED_MEDIA_KIND",
            RtcError::SdpParse { .. } => "SDP_PARSE_ERROR",
            RtcError::UnsupportedCodec { .. } => "UNSUPPORTED_CODEC",
            RtcError::InvalidState { .. } => "INVALID_STATE",
            RtcError::Transport { .. } => "TRANSPORT_ERROR",
            RtcError::Media { .. } => "MEDIA_PROCESSING_ERROR",
        }
    }

    pub(crate) fn sdp(line: usize, reason: impl Into<String>) -> Self {
        RtcError::SdpParse {
            line,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate
pub type RtcResult<T> = std::result::Result<T, RtcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = RtcError::UnsupportedMediaKind {
            kind: "application".to_string(),
        };
        assert_eq!(err.error_code(), "UNSUPPORTED_MEDIA_KIND");
        assert_eq!(RtcError::sdp(3, "bad").error_code(), "SDP_PARSE_ERROR");
    }

    #[test]
    fn test_error_display() {
        let err = RtcError::sdp(7, "missing payload type");
        assert_eq!(
            err.to_string(),
            "SDP parse error at line 7: missing payload type"
        );
    }
}
