//! Error types for the finwire dialog client

use thiserror::Error;

/// Errors that can occur while encoding, decoding or exchanging messages.
///
/// Field validity is deliberately *not* part of this taxonomy: an over-long
/// field still serializes, and callers query
/// [`Element::is_valid`](crate::element::Element::is_valid) separately.
/// [`Error::FieldConstraint`] only appears when a caller opts into
/// enforcement via `require_valid`.
#[derive(Debug, Error)]
pub enum Error {
    /// A field value exceeds its declared format constraints and the caller
    /// asked for validity to be enforced
    #[error("field value exceeds its format constraints: {0}")]
    FieldConstraint(String),

    /// A single field could not be decoded
    #[error("malformed {kind} field: {reason}")]
    MalformedField {
        /// Field kind that failed to decode (e.g. "numeric", "binary")
        kind: &'static str,
        /// What was wrong with the raw bytes
        reason: String,
    },

    /// A segment could not be split into fields or lacks a usable header
    #[error("malformed segment: {0}")]
    MalformedSegment(String),

    /// A segment carried a version number no registered schema covers
    #[error("unknown segment version {version} for segment {id}")]
    UnknownSegmentVersion {
        /// Segment ID whose version table was consulted
        id: String,
        /// The unrecognized version number
        version: u32,
    },

    /// A whole message failed structural validation (framing, envelope)
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A well-formed response did not contain the expected result segment
    #[error("malformed response: expected segment {0}")]
    ExpectedSegment(&'static str),

    /// The bank rejected the message with an error acknowledgement
    #[error("rejected by bank: code {code}: {text}")]
    Rejected {
        /// Acknowledgement code (9xxx range)
        code: u32,
        /// Acknowledgement text as sent by the bank
        text: String,
    },

    /// The configured protocol version is not one this client speaks
    #[error("unsupported protocol version {version}; supported versions are 220 and 300")]
    UnsupportedVersion {
        /// The version the configuration asked for
        version: u32,
    },

    /// The dialog has been finished; no further operations are permitted
    #[error("dialog is closed")]
    DialogClosed,

    /// An operation was invoked in a dialog state that does not allow it
    #[error("cannot {operation} while dialog is {state}")]
    InvalidState {
        /// The operation that was attempted
        operation: &'static str,
        /// Name of the state the dialog was in
        state: &'static str,
    },

    /// Signing, encryption or decryption failed
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// The transport collaborator failed; wrapped verbatim, never retried
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an opaque transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport(Box::new(err))
    }
}

/// Result type alias for finwire operations
pub type Result<T> = std::result::Result<T, Error>;
