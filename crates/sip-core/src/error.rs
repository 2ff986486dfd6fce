//! Error types for wire format handling.

use thiserror::Error;

/// Errors raised while decoding a [`SipHeader`](crate::SipHeader) from bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before the full header could be read.
    #[error("truncated header: need {needed} bytes, have {have}")]
    Truncated {
        /// Bytes required for a complete header
        needed: usize,
        /// Bytes actually available
        have: usize,
    },

    /// The message type octet is outside the known vocabulary.
    #[error("unknown message type octet {0}")]
    InvalidMessageType(u8),

    /// The method octet is outside the known vocabulary.
    #[error("unknown method octet {0}")]
    InvalidMethod(u8),
}
