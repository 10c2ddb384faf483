//! Error types for the bookpipe crate.
//!
//! This module defines the errors that can occur while decoding stream
//! events, persisting batches to the order store, and building snapshots,
//! including transport failures from the price oracle.

use thiserror::Error as ThisError;

/// The main error type for this crate
#[derive(Debug, ThisError)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A decoded order failed validation
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// I/O failure in the journal or data directory
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A journal record could not be encoded or decoded
    #[error("record codec error: {0}")]
    Record(#[from] bincode::Error),

    /// A journal frame failed length or checksum validation
    #[error("corrupt journal frame at offset {offset}: {detail}")]
    CorruptFrame {
        /// Byte offset of the frame within the journal file
        offset: u64,
        /// What failed to validate
        detail: String,
    },

    /// HTTP request to the price oracle failed
    #[error("oracle request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Price oracle returned a non-success response
    #[error("oracle error ({status}): {message}")]
    Oracle {
        /// HTTP status code
        status: u16,
        /// Error message from the oracle
        message: String,
    },

    /// Symbol is unknown to the price oracle
    #[error("unknown symbol: {0}")]
    SymbolNotFound(String),

    /// Stream subscription failure (unknown or already-claimed partition)
    #[error("stream error: {0}")]
    Stream(String),

    /// Invalid configuration (bad URL, zero batch size)
    #[error("configuration error: {0}")]
    Config(String),

    /// A batch flush failed after exhausting the retry policy
    #[error("flush failed after {attempts} attempts: {source}")]
    FlushExhausted {
        /// Number of insert attempts made, including the first
        attempts: u32,
        /// The store error from the final attempt
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Check if this error is transient (retrying later may succeed)
    ///
    /// The flush path only retries transient store failures; anything
    /// else fails the batch on the first attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Record(_)
                | Error::CorruptFrame { .. }
                | Error::Http(_)
                | Error::Oracle { .. }
                | Error::Stream(_)
                | Error::FlushExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_order_display() {
        let err = Error::InvalidOrder("empty symbol".to_string());
        assert!(err.to_string().contains("empty symbol"));
    }

    #[test]
    fn test_corrupt_frame_display() {
        let err = Error::CorruptFrame {
            offset: 128,
            detail: "checksum mismatch".to_string(),
        };
        assert!(err.to_string().contains("128"));
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_flush_exhausted_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = Error::FlushExhausted {
            attempts: 4,
            source: Box::new(Error::Io(io)),
        };
        assert!(err.to_string().contains("4"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Stream("partition gone".to_string()).is_transient());
        assert!(!Error::SymbolNotFound("FOOBAR".to_string()).is_transient());
        assert!(!Error::InvalidOrder("bad price".to_string()).is_transient());
    }
}
