// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Filename and archive-path validation.

use crate::error::{MauError, Result};

const MAX_FILENAME_BYTES: usize = 256;
const MAX_ARCHIVE_PATH_BYTES: usize = 65535;

fn is_control_or_delete(c: char) -> bool {
    let cp = c as u32;
    (0x00..=0x1F).contains(&cp) || (0x7F..=0x9F).contains(&cp)
}

fn is_allowed_whitespace(c: char) -> bool {
    matches!(c, '\u{09}' | '\u{0A}' | '\u{0B}' | '\u{0C}' | '\u{0D}' | '\u{20}')
}

/// Validate a single filename: 1..256 UTF-8 bytes, no disallowed
/// control characters, no unpaired surrogates, at least one non-whitespace
/// code point, not `.` or `..`, no `/`.
pub fn validate_filename(name: &str) -> Result<()> {
    let byte_len = name.len();
    if byte_len == 0 || byte_len > MAX_FILENAME_BYTES {
        return Err(MauError::invalid_data(format!(
            "filename must be 1..={MAX_FILENAME_BYTES} UTF-8 bytes, got {byte_len}"
        )));
    }
    if name == "." || name == ".." {
        return Err(MauError::invalid_data("filename may not be \".\" or \"..\""));
    }
    if name.contains('/') {
        return Err(MauError::invalid_data("filename may not contain '/'"));
    }

    let mut has_non_whitespace = false;
    for c in name.chars() {
        if is_control_or_delete(c) && !is_allowed_whitespace(c) {
            return Err(MauError::invalid_data(format!(
                "filename contains disallowed control byte U+{:04X}",
                c as u32
            )));
        }
        if !c.is_whitespace() {
            has_non_whitespace = true;
        }
    }
    if !has_non_whitespace {
        return Err(MauError::invalid_data(
            "filename must contain at least one non-whitespace code point",
        ));
    }

    Ok(())
}

/// Outcome of validating an archive path: whether it names a regular entry
/// or an empty directory (trailing `/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    EmptyDir,
}

/// Validate an archive-relative path. The manifest path
/// `/Manifest.dat` is validated separately via [`validate_manifest_path`]
/// since it intentionally breaks the no-leading-slash rule.
pub fn validate_archive_path(path: &str) -> Result<PathKind> {
    if path.is_empty() || path.len() > MAX_ARCHIVE_PATH_BYTES {
        return Err(MauError::invalid_data(format!(
            "archive path must be 1..={MAX_ARCHIVE_PATH_BYTES} UTF-8 bytes, got {}",
            path.len()
        )));
    }
    if path.starts_with('/') {
        return Err(MauError::invalid_data("archive path may not have a leading '/'"));
    }

    let is_empty_dir = path.ends_with('/');
    if is_empty_dir {
        if path.len() > 255 {
            return Err(MauError::invalid_data(
                "empty-directory path (including trailing '/') must be <= 255 bytes",
            ));
        }
        let stem = &path[..path.len() - 1];
        if stem.is_empty() {
            return Err(MauError::invalid_data("empty-directory path must have a non-empty name"));
        }
        for segment in stem.split('/') {
            if segment.is_empty() {
                return Err(MauError::invalid_data("archive path may not contain doubled '/'"));
            }
            validate_filename(segment)?;
        }
        return Ok(PathKind::EmptyDir);
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.is_empty() {
        return Err(MauError::invalid_data("archive path must have at least one segment"));
    }
    for segment in &segments {
        if segment.is_empty() {
            return Err(MauError::invalid_data(
                "archive path may not have empty, leading, trailing, or doubled '/'",
            ));
        }
        validate_filename(segment)?;
    }

    Ok(PathKind::File)
}

pub const MANIFEST_PATH: &str = "/Manifest.dat";

/// The manifest entry's path bypasses the leading-slash rule but is
/// otherwise subject to the usual uniqueness checks.
pub fn validate_manifest_path(path: &str) -> Result<()> {
    if path != MANIFEST_PATH {
        return Err(MauError::invalid_data(format!(
            "manifest path must be exactly {MANIFEST_PATH:?}"
        )));
    }
    Ok(())
}

/// Checks the archive-wide uniqueness rules: no two entries share
/// a path, and no file path is a strict prefix (on `/` boundaries) of
/// another file or directory path.
pub fn check_path_uniqueness<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let all: Vec<&str> = paths.into_iter().collect();
    for (i, a) in all.iter().enumerate() {
        for (j, b) in all.iter().enumerate() {
            if i == j {
                continue;
            }
            if a == b {
                return Err(MauError::invalid_data(format!("duplicate archive path {a:?}")));
            }
            if is_strict_segment_prefix(a, b) {
                return Err(MauError::invalid_data(format!(
                    "path {a:?} is a prefix of path {b:?}"
                )));
            }
        }
    }
    Ok(())
}

fn is_strict_segment_prefix(prefix: &str, whole: &str) -> bool {
    if prefix == whole || whole.len() <= prefix.len() {
        return false;
    }
    whole.starts_with(prefix)
        && (prefix.ends_with('/') || whole.as_bytes()[prefix.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_boundary_256_passes_257_fails() {
        let ok = "a".repeat(256);
        assert!(validate_filename(&ok).is_ok());
        let bad = "a".repeat(257);
        assert!(validate_filename(&bad).is_err());
    }

    #[test]
    fn filename_empty_fails() {
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn filename_all_whitespace_fails() {
        assert!(validate_filename("   \t").is_err());
    }

    #[test]
    fn filename_dot_and_dotdot_fail() {
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("..").is_err());
    }

    #[test]
    fn filename_with_tab_passes() {
        assert!(validate_filename("a\tb").is_ok());
    }

    #[test]
    fn filename_rejects_slash() {
        assert!(validate_filename("a/b").is_err());
    }

    #[test]
    fn empty_dir_path_255_passes_256_fails() {
        // "255 bytes including the trailing /"
        let stem = "a".repeat(254);
        let path_255 = format!("{stem}/");
        assert_eq!(path_255.len(), 255);
        assert_eq!(validate_archive_path(&path_255).unwrap(), PathKind::EmptyDir);

        let stem_too_long = "a".repeat(255);
        let path_256 = format!("{stem_too_long}/");
        assert_eq!(path_256.len(), 256);
        assert!(validate_archive_path(&path_256).is_err());
    }

    #[test]
    fn archive_path_rejects_leading_trailing_doubled_slash() {
        assert!(validate_archive_path("/a/b").is_err());
        assert!(validate_archive_path("a//b").is_err());
    }

    #[test]
    fn archive_path_splits_into_valid_segments() {
        assert_eq!(validate_archive_path("a/b.txt").unwrap(), PathKind::File);
    }

    #[test]
    fn file_path_prefix_of_directory_path_is_rejected() {
        let err = check_path_uniqueness(["a/b", "a/b/c.txt"]);
        assert!(err.is_err());
    }

    #[test]
    fn sibling_paths_are_accepted() {
        assert!(check_path_uniqueness(["a/b.txt", "a/c.txt"]).is_ok());
    }

    #[test]
    fn manifest_path_bypasses_leading_slash_rule() {
        assert!(validate_manifest_path(MANIFEST_PATH).is_ok());
        assert!(validate_manifest_path("Manifest.dat").is_err());
    }
}
