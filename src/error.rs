// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Error taxonomy for the Maus/MauZ codecs.
//!
//! Every fallible operation in this crate returns [`MauError`], a flat enum
//! rather than a tree of per-component error types: the component boundaries
//! in this crate (wire framing, options, crypto pipeline, archive) all fail
//! into the same small set of externally meaningful outcomes, so splitting
//! them the way a larger system would only adds indirection without adding
//! information at the call site.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MauError>;

/// The kinds of failure a container or archive operation can produce.
///
/// `BadPassword` is the one variant callers are expected to recover from:
/// the producing instance stays usable and a fresh key may be retried.
/// Every other variant leaves the instance unusable for further reads or
/// writes (see [`crate::policy::classify`]).
#[derive(Debug, Error)]
pub enum MauError {
    #[error("invalid container data: {0}")]
    InvalidData(String),

    #[error("unsupported format version {found} (supported {min}..={max})")]
    UnsupportedVersion { found: u16, min: u16, max: u16 },

    #[error("unknown format option {0:?}")]
    UnknownOption(String),

    #[error("contradictory options: {0}")]
    ContradictoryOptions(String),

    #[error("option {key} has the wrong parameter shape: {detail}")]
    ParamShape { key: String, detail: String },

    #[error("incorrect password or corrupt envelope")]
    BadPassword,

    #[error("checksum mismatch after decompression")]
    BadChecksum,

    #[error("unknown cipher algorithm {0:?}")]
    UnknownCipher(String),

    #[error("unsupported key size {bits} bits for {algorithm}")]
    UnsupportedKeySize { algorithm: String, bits: u16 },

    #[error("signature verification failed")]
    SignatureMismatch,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid operation for current state: {0}")]
    InvalidState(String),
}

impl MauError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        MauError::InvalidData(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        MauError::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_password_display_does_not_leak_detail() {
        let err = MauError::BadPassword;
        assert_eq!(err.to_string(), "incorrect password or corrupt envelope");
    }

    #[test]
    fn io_error_wraps_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: MauError = io.into();
        assert!(matches!(err, MauError::Io(_)));
    }
}
