//! Media processing error types and handling
//!
//! Errors raised by the conversion contexts, track buffers and codec
//! wrappers. Buffer overflow is deliberately absent: full buffers drop.

use rtcpipe_core::RtcError;
use thiserror::Error;

/// Failure raised while converting, buffering, encoding or packetizing media
#[derive(Error, Debug)]
pub enum MediaError {
    /// Buffer, packetizer or registry settings that cannot be used
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong
        message: String,
    },

    /// Encoder rejected a frame
    #[error("{codec} encode error: {reason}")]
    EncodingFailed {
        /// Codec name
        codec: String,
        /// Message from the codec library
        reason: String,
    },

    /// Decoder rejected an access unit
    #[error("{codec} decode error: {reason}")]
    DecodingFailed {
        /// Codec name
        codec: String,
        /// Message from the codec library
        reason: String,
    },

    /// Frame of the wrong kind for a track or codec
    #[error("Wrong media kind: expected {expected}, got {actual}")]
    InvalidMediaType {
        /// Kind the receiver handles
        expected: String,
        /// Kind that was passed in
        actual: String,
    },

    /// Codec or pixel/sample format with no implementation here
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        /// Format name as negotiated or requested
        format: String,
    },

    /// Frame whose format differs from the one a context is bound to
    #[error("Format mismatch: expected {expected}, got {actual}")]
    FormatMismatch {
        /// Bound format
        expected: String,
        /// Format of the offending frame
        actual: String,
    },

    /// Plane or payload shorter or longer than its header implies
    #[error("Malformed frame data: {actual} bytes where {expected} were needed")]
    InvalidFrameData {
        /// Size implied by dimensions or headers
        expected: usize,
        /// Size actually present
        actual: usize,
    },

    /// Encoder or decoder could not be created
    #[error("Cannot create {codec} codec: {reason}")]
    CodecInitializationFailed {
        /// Codec name
        codec: String,
        /// Why it is unavailable
        reason: String,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Whether the stream can continue with the next frame
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MediaError::DecodingFailed { .. }
                | MediaError::InvalidFrameData { .. }
                | MediaError::FormatMismatch { .. }
        )
    }

    /// Coarse classification for callers that route errors
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::EncodingFailed { .. }
            | MediaError::DecodingFailed { .. }
            | MediaError::CodecInitializationFailed { .. } => ErrorCategory::Codec,
            MediaError::InvalidMediaType { .. }
            | MediaError::UnsupportedFormat { .. }
            | MediaError::FormatMismatch { .. } => ErrorCategory::Format,
            MediaError::InvalidFrameData { .. } => ErrorCategory::Data,
        }
    }
}

/// Classification returned by [`MediaError::category`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unusable settings
    Configuration,
    /// Codec library failures
    Codec,
    /// Kind or format disagreements
    Format,
    /// Malformed frame contents
    Data,
}

impl From<MediaError> for RtcError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedFormat { format } => RtcError::UnsupportedCodec { codec: format },
            MediaError::InvalidConfiguration { message } => {
                RtcError::InvalidArgument { reason: message }
            }
            other => RtcError::Media {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let codec_error = MediaError::CodecInitializationFailed {
            codec: "H265".to_string(),
            reason: "no encoder available".to_string(),
        };
        assert_eq!(codec_error.category(), ErrorCategory::Codec);
        assert!(!codec_error.is_recoverable());

        let mismatch = MediaError::FormatMismatch {
            expected: "f32/48000/2".to_string(),
            actual: "s16/16000/1".to_string(),
        };
        assert_eq!(mismatch.category(), ErrorCategory::Format);
        assert!(mismatch.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = MediaError::InvalidFrameData {
            expected: 1024,
            actual: 512,
        };
        assert_eq!(
            error.to_string(),
            "Malformed frame data: 512 bytes where 1024 were needed"
        );
    }

    #[test]
    fn test_into_rtc_error() {
        let err: RtcError = MediaError::UnsupportedFormat {
            format: "VP9".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "UNSUPPORTED_CODEC");

        let err: RtcError = MediaError::DecodingFailed {
            codec: "opus".to_string(),
            reason: "corrupt".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "MEDIA_PROCESSING_ERROR");
    }
}
