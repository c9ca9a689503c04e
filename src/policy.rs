// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Error propagation policy: which failures are retryable, which
//! poison only the entry that produced them, and which poison the whole
//! artifact.

use crate::error::MauError;

/// How far a given error's effect should propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The instance stays usable; the caller may retry the operation
    /// (currently only `decrypt()` with a different password).
    Retryable,
    /// Poisons the entry that produced it; sibling archive entries remain
    /// readable.
    EntryFatal,
    /// Poisons the whole container or archive.
    ArchiveFatal,
}

/// Classify an error by how far its effect should propagate.
///
/// `UnknownOption` and `ContradictoryOptions` are archive-fatal by default
/// here; callers decoding a single archive entry whose filename happens to
/// be encrypted should downgrade those two to `EntryFatal` themselves, since
/// this function has no way to know which artifact it was raised from.
pub fn classify(err: &MauError) -> Severity {
    match err {
        MauError::BadPassword => Severity::Retryable,
        MauError::SignatureMismatch => Severity::Retryable,
        _ => Severity::ArchiveFatal,
    }
}

/// Downgrade the severity of option-grammar errors raised while decoding an
/// archive entry whose filename is itself encrypted.
pub fn classify_entry(err: &MauError, filename_encrypted: bool) -> Severity {
    match err {
        MauError::UnknownOption(_) | MauError::ContradictoryOptions(_) if filename_encrypted => {
            Severity::EntryFatal
        }
        other => classify(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_password_is_retryable() {
        assert_eq!(classify(&MauError::BadPassword), Severity::Retryable);
    }

    #[test]
    fn invalid_data_is_archive_fatal() {
        assert_eq!(
            classify(&MauError::InvalidData("bad magic".into())),
            Severity::ArchiveFatal
        );
    }

    #[test]
    fn contradictory_options_downgrade_for_encrypted_filename_entries() {
        let err = MauError::ContradictoryOptions("DEF+NK".into());
        assert_eq!(classify_entry(&err, true), Severity::EntryFatal);
        assert_eq!(classify_entry(&err, false), Severity::ArchiveFatal);
    }
}
