// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! FormatOptions: the ordered, length-prefixed set of typed
//! options that annotate a Maus stream. The set of recognized keys is
//! small and closed, so it is modeled as a tagged enum rather than through
//! any form of inheritance.

use std::io::{Read, Write};

use crate::error::{MauError, Result};
use crate::path;
use crate::primitives::{CipherAlgorithm, HashAlgorithm};
use crate::wire;

/// A recognized option key, or `Unknown` carrying the raw key string for
/// diagnostics (unknown keys are always a hard error, but keeping the text
/// around makes that error readable).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatKey {
    Name,
    Nk,
    Def,
    Lzma,
    Ver,
    Del,
    Ers,
    ModTime,
    Kom,
    Hash,
    RsaSig,
    DsaSig,
    EcdsaSig,
    RsaSch,
    Unknown(String),
}

impl FormatKey {
    pub fn wire_str(&self) -> &str {
        match self {
            FormatKey::Name => "Name",
            FormatKey::Nk => "NK",
            FormatKey::Def => "DEF",
            FormatKey::Lzma => "LZMA",
            FormatKey::Ver => "Ver",
            FormatKey::Del => "DeL",
            FormatKey::Ers => "Ers",
            FormatKey::ModTime => "Mod",
            FormatKey::Kom => "Kom",
            FormatKey::Hash => "Hash",
            FormatKey::RsaSig => "RSAsig",
            FormatKey::DsaSig => "DSAsig",
            FormatKey::EcdsaSig => "ECDSAsig",
            FormatKey::RsaSch => "RSAsch",
            FormatKey::Unknown(raw) => raw,
        }
    }

    pub fn from_wire_str(s: &str) -> FormatKey {
        match s {
            "Name" => FormatKey::Name,
            "NK" => FormatKey::Nk,
            "DEF" => FormatKey::Def,
            "LZMA" => FormatKey::Lzma,
            "Ver" => FormatKey::Ver,
            "DeL" => FormatKey::Del,
            "Ers" => FormatKey::Ers,
            "Mod" => FormatKey::ModTime,
            "Kom" => FormatKey::Kom,
            "Hash" => FormatKey::Hash,
            "RSAsig" => FormatKey::RsaSig,
            "DSAsig" => FormatKey::DsaSig,
            "ECDSAsig" => FormatKey::EcdsaSig,
            "RSAsch" => FormatKey::RsaSch,
            other => FormatKey::Unknown(other.to_string()),
        }
    }

    /// Sort priority within a serialized collection: compression selector
    /// and `Ver`/`Hash` come first so a streaming reader can make
    /// incremental decisions.
    fn serialize_priority(&self) -> u8 {
        match self {
            FormatKey::Nk | FormatKey::Def | FormatKey::Lzma => 0,
            FormatKey::Ver => 1,
            FormatKey::Hash => 2,
            _ => 3,
        }
    }
}

/// One parsed option: key, version, and its ordered parameter blobs.
///
/// Two entries are "the same" iff key, version, and parameter bytes match
/// exactly — which is exactly what `#[derive(PartialEq)]` gives here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    pub key: FormatKey,
    pub version: u16,
    pub parameters: Vec<Vec<u8>>,
}

fn pack_i64(v: i64) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

fn unpack_i64(b: &[u8]) -> Result<i64> {
    let arr: [u8; 8] = b
        .try_into()
        .map_err(|_| MauError::ParamShape {
            key: "i64 parameter".into(),
            detail: format!("expected 8 bytes, got {}", b.len()),
        })?;
    Ok(i64::from_le_bytes(arr))
}

fn pack_u16(v: u16) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

fn unpack_u16(b: &[u8]) -> Result<u16> {
    let arr: [u8; 2] = b
        .try_into()
        .map_err(|_| MauError::ParamShape {
            key: "u16 parameter".into(),
            detail: format!("expected 2 bytes, got {}", b.len()),
        })?;
    Ok(u16::from_le_bytes(arr))
}

/// `Name` doubles as a plain filename and, inside an archive entry, an
/// archive-relative path. A value containing `/` is validated as an archive path; one
/// without is validated as a plain filename, so a top-level Maus stream
/// never accidentally accepts a `/`.
fn validate_name_value(name: &str) -> Result<()> {
    if name.contains('/') {
        path::validate_archive_path(name)?;
    } else {
        path::validate_filename(name)?;
    }
    Ok(())
}

impl FormatEntry {
    pub fn name(path: &str) -> Result<Self> {
        validate_name_value(path)?;
        Ok(Self {
            key: FormatKey::Name,
            version: 1,
            parameters: vec![path.as_bytes().to_vec()],
        })
    }

    pub fn no_compression() -> Self {
        Self { key: FormatKey::Nk, version: 1, parameters: vec![] }
    }

    pub fn deflate() -> Self {
        Self { key: FormatKey::Def, version: 1, parameters: vec![] }
    }

    pub fn lzma() -> Self {
        Self { key: FormatKey::Lzma, version: 1, parameters: vec![] }
    }

    pub fn cipher(algo: CipherAlgorithm, bits: u16) -> Self {
        Self {
            key: FormatKey::Ver,
            version: 1,
            parameters: vec![algo.wire_name().as_bytes().to_vec(), pack_u16(bits)],
        }
    }

    pub fn decompressed_len(len: i64) -> Self {
        Self { key: FormatKey::Del, version: 1, parameters: vec![pack_i64(len)] }
    }

    pub fn created(ticks: i64) -> Self {
        Self { key: FormatKey::Ers, version: 1, parameters: vec![pack_i64(ticks)] }
    }

    pub fn modified(ticks: i64) -> Self {
        Self { key: FormatKey::ModTime, version: 1, parameters: vec![pack_i64(ticks)] }
    }

    pub fn comment(text: &str) -> Self {
        Self {
            key: FormatKey::Kom,
            version: 1,
            parameters: vec![text.as_bytes().to_vec()],
        }
    }

    pub fn hash(algo: HashAlgorithm) -> Self {
        Self {
            key: FormatKey::Hash,
            version: 1,
            parameters: vec![algo.wire_name().as_bytes().to_vec()],
        }
    }

    pub fn rsa_wrapped_key(wrapped: Vec<u8>) -> Self {
        Self { key: FormatKey::RsaSch, version: 1, parameters: vec![wrapped] }
    }

    pub fn signature(key: FormatKey, blob: Vec<u8>, key_id: Option<Vec<u8>>) -> Self {
        let mut parameters = vec![blob];
        if let Some(id) = key_id {
            parameters.push(id);
        }
        Self { key, version: 1, parameters }
    }

    /// Validate this entry's parameter arity/shape against its recognized
    /// schema. Does not perform cross-entry (mutual exclusion) checks; see
    /// [`FormatCollection::validate`].
    pub fn validate_shape(&self) -> Result<()> {
        let bad_shape = |detail: &str| {
            Err(MauError::ParamShape {
                key: self.key.wire_str().to_string(),
                detail: detail.to_string(),
            })
        };
        match &self.key {
            FormatKey::Name => {
                if self.parameters.len() != 1 {
                    return bad_shape("Name takes exactly one parameter");
                }
                let name = std::str::from_utf8(&self.parameters[0])
                    .map_err(|_| MauError::invalid_data("Name parameter is not valid UTF-8"))?;
                validate_name_value(name)?;
            }
            FormatKey::Nk | FormatKey::Def | FormatKey::Lzma => {
                if !self.parameters.is_empty() {
                    return bad_shape("takes no parameters");
                }
            }
            FormatKey::Ver => {
                if self.parameters.len() != 2 {
                    return bad_shape("Ver takes exactly two parameters (algorithm, bits)");
                }
                let algo_name = std::str::from_utf8(&self.parameters[0])
                    .map_err(|_| MauError::invalid_data("Ver algorithm name is not valid UTF-8"))?;
                let algo = CipherAlgorithm::from_wire_name(algo_name)
                    .ok_or_else(|| MauError::UnknownCipher(algo_name.to_string()))?;
                let bits = unpack_u16(&self.parameters[1])?;
                if algo.block_len(bits).is_none() {
                    return Err(MauError::UnsupportedKeySize {
                        algorithm: algo_name.to_string(),
                        bits,
                    });
                }
            }
            FormatKey::Del | FormatKey::Ers | FormatKey::ModTime => {
                if self.parameters.len() != 1 {
                    return bad_shape("takes exactly one i64 parameter");
                }
                unpack_i64(&self.parameters[0])?;
            }
            FormatKey::Kom => {
                if self.parameters.len() != 1 {
                    return bad_shape("Kom takes exactly one parameter");
                }
            }
            FormatKey::Hash => {
                if self.parameters.len() != 1 {
                    return bad_shape("Hash takes exactly one parameter");
                }
                let name = std::str::from_utf8(&self.parameters[0])
                    .map_err(|_| MauError::invalid_data("Hash selector is not valid UTF-8"))?;
                if HashAlgorithm::from_wire_name(name).is_none() {
                    return Err(MauError::invalid_data(format!("unknown hash selector {name:?}")));
                }
            }
            FormatKey::RsaSig | FormatKey::DsaSig | FormatKey::EcdsaSig => {
                if !(1..=2).contains(&self.parameters.len()) {
                    return bad_shape("signature options take one or two parameters");
                }
            }
            FormatKey::RsaSch => {
                if self.parameters.len() != 1 {
                    return bad_shape("RSAsch takes exactly one parameter");
                }
            }
            FormatKey::Unknown(raw) => return Err(MauError::UnknownOption(raw.clone())),
        }
        Ok(())
    }

    pub fn as_i64_param(&self) -> Result<i64> {
        unpack_i64(&self.parameters[0])
    }

    pub fn as_name(&self) -> Result<String> {
        String::from_utf8(self.parameters[0].clone())
            .map_err(|e| MauError::invalid_data(format!("non-UTF-8 Name: {e}")))
    }

    pub fn as_cipher(&self) -> Result<(CipherAlgorithm, u16)> {
        let algo_name = std::str::from_utf8(&self.parameters[0])
            .map_err(|_| MauError::invalid_data("Ver algorithm name is not valid UTF-8"))?;
        let algo = CipherAlgorithm::from_wire_name(algo_name)
            .ok_or_else(|| MauError::UnknownCipher(algo_name.to_string()))?;
        let bits = unpack_u16(&self.parameters[1])?;
        Ok((algo, bits))
    }

    pub fn as_hash(&self) -> Result<HashAlgorithm> {
        let name = std::str::from_utf8(&self.parameters[0])
            .map_err(|_| MauError::invalid_data("Hash selector is not valid UTF-8"))?;
        HashAlgorithm::from_wire_name(name)
            .ok_or_else(|| MauError::invalid_data(format!("unknown hash selector {name:?}")))
    }
}

/// An ordered collection of [`FormatEntry`] values with a `u16` count
/// prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatCollection(Vec<FormatEntry>);

impl FormatCollection {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, entry: FormatEntry) {
        if !self.0.contains(&entry) {
            self.0.push(entry);
        }
    }

    pub fn entries(&self) -> &[FormatEntry] {
        &self.0
    }

    pub fn get(&self, key: &FormatKey) -> Option<&FormatEntry> {
        self.0.iter().find(|e| &e.key == key)
    }

    pub fn get_all(&self, key: &FormatKey) -> Vec<&FormatEntry> {
        self.0.iter().filter(|e| &e.key == key).collect()
    }

    pub fn remove(&mut self, key: &FormatKey) {
        self.0.retain(|e| &e.key != key);
    }

    /// Parse a wire-encoded `FormatCollection`. Dedupes byte-identical
    /// repeats of the same entry as it goes; does not yet run the
    /// cross-entry contradiction checks (call [`Self::validate`]
    /// afterward, which callers always must do before trusting the
    /// collection).
    pub fn parse(r: &mut impl Read) -> Result<Self> {
        let count = wire::read_u16(r)?;
        let mut out = Self::new();
        for _ in 0..count {
            let key_bytes = wire::read_len8_bytes(r)?;
            if key_bytes.is_empty() {
                return Err(MauError::invalid_data("empty format option key"));
            }
            let key_str = String::from_utf8(key_bytes)
                .map_err(|e| MauError::invalid_data(format!("non-UTF-8 option key: {e}")))?;
            let key = FormatKey::from_wire_str(&key_str);
            let version = wire::read_u16(r)?;
            let param_count = wire::read_u16(r)?;
            let mut parameters = Vec::with_capacity(param_count as usize);
            for _ in 0..param_count {
                parameters.push(wire::read_len16_bytes(r)?);
            }
            let entry = FormatEntry { key, version, parameters };
            entry.validate_shape()?;
            out.push(entry);
        }
        Ok(out)
    }

    pub fn serialize(&self, w: &mut impl Write) -> Result<()> {
        let mut entries: Vec<&FormatEntry> = self.0.iter().collect();
        entries.sort_by_key(|e| e.key.serialize_priority());

        wire::write_u16(w, entries.len() as u16)?;
        for entry in entries {
            wire::write_len8_bytes(w, entry.key.wire_str().as_bytes())?;
            wire::write_u16(w, entry.version)?;
            wire::write_u16(w, entry.parameters.len() as u16)?;
            for param in &entry.parameters {
                wire::write_len16_bytes(w, param)?;
            }
        }
        Ok(())
    }

    /// Cross-entry contradiction checks: at most one of
    /// `{NK, DEF, LZMA}`; at most one distinct value for `Name`, `Ver`, and
    /// `Hash` (byte-identical duplicates were already collapsed by
    /// [`Self::push`]/[`Self::parse`], so surviving duplicates here are by
    /// definition contradictory).
    pub fn validate(&self) -> Result<()> {
        let compression_variants = [FormatKey::Nk, FormatKey::Def, FormatKey::Lzma]
            .iter()
            .filter(|k| self.get(k).is_some())
            .count();
        if compression_variants > 1 {
            return Err(MauError::ContradictoryOptions(
                "NK, DEF, and LZMA are mutually exclusive".into(),
            ));
        }
        if self.get_all(&FormatKey::Name).len() > 1 {
            return Err(MauError::ContradictoryOptions(
                "multiple Name options with different values".into(),
            ));
        }
        if self.get_all(&FormatKey::Ver).len() > 1 {
            return Err(MauError::ContradictoryOptions(
                "multiple Ver options with different values".into(),
            ));
        }
        if self.get_all(&FormatKey::Hash).len() > 1 {
            return Err(MauError::ContradictoryOptions(
                "multiple Hash options with different values".into(),
            ));
        }
        Ok(())
    }

    pub fn compression(&self) -> Compression {
        if self.get(&FormatKey::Def).is_some() {
            Compression::Deflate
        } else if self.get(&FormatKey::Lzma).is_some() {
            Compression::Lzma
        } else {
            Compression::None
        }
    }

    pub fn cipher(&self) -> Result<Option<(CipherAlgorithm, u16)>> {
        self.get(&FormatKey::Ver).map(|e| e.as_cipher()).transpose()
    }

    pub fn hash_algorithm(&self) -> Result<Option<HashAlgorithm>> {
        self.get(&FormatKey::Hash).map(|e| e.as_hash()).transpose()
    }

    pub fn name(&self) -> Result<Option<String>> {
        self.get(&FormatKey::Name).map(|e| e.as_name()).transpose()
    }

    pub fn decompressed_len(&self) -> Result<Option<i64>> {
        self.get(&FormatKey::Del).map(|e| e.as_i64_param()).transpose()
    }

    pub fn created_ticks(&self) -> Result<Option<i64>> {
        self.get(&FormatKey::Ers).map(|e| e.as_i64_param()).transpose()
    }

    pub fn modified_ticks(&self) -> Result<Option<i64>> {
        self.get(&FormatKey::ModTime).map(|e| e.as_i64_param()).transpose()
    }

    pub fn rsa_wrapped_key(&self) -> Option<&[u8]> {
        self.get(&FormatKey::RsaSch).map(|e| e.parameters[0].as_slice())
    }
}

/// Selected compression transform (derived from `{NK, DEF, LZMA}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Deflate,
    Lzma,
}

/// Convert a .NET-style tick count (100ns units since `0001-01-01`) to Unix
/// seconds. The wire value itself is never altered by this crate; this is
/// purely a convenience for callers of `Ers`/`Mod` who want an ordinary
/// Rust time representation.
pub fn ticks_to_unix_seconds(ticks: i64) -> i64 {
    const TICKS_PER_SECOND: i64 = 10_000_000;
    const EPOCH_DELTA_SECONDS: i64 = 62_135_596_800; // 0001-01-01 -> 1970-01-01
    ticks / TICKS_PER_SECOND - EPOCH_DELTA_SECONDS
}

/// Same conversion as [`ticks_to_unix_seconds`], returned as a UTC timestamp
/// for callers who want to print or compare dates rather than do arithmetic
/// on raw seconds.
pub fn ticks_to_datetime(ticks: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(ticks_to_unix_seconds(ticks), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_bytes() {
        let mut coll = FormatCollection::new();
        coll.push(FormatEntry::deflate());
        coll.push(FormatEntry::name("hello.txt").unwrap());
        coll.validate().unwrap();

        let mut buf = Vec::new();
        coll.serialize(&mut buf).unwrap();
        let mut cur = std::io::Cursor::new(buf);
        let parsed = FormatCollection::parse(&mut cur).unwrap();
        parsed.validate().unwrap();

        assert_eq!(parsed.name().unwrap().as_deref(), Some("hello.txt"));
        assert_eq!(parsed.compression(), Compression::Deflate);
    }

    #[test]
    fn byte_identical_duplicates_are_collapsed() {
        let mut coll = FormatCollection::new();
        coll.push(FormatEntry::name("a.txt").unwrap());
        coll.push(FormatEntry::name("a.txt").unwrap());
        assert_eq!(coll.entries().len(), 1);
        coll.validate().unwrap();
    }

    #[test]
    fn conflicting_name_values_are_contradictory() {
        let mut coll = FormatCollection::new();
        coll.push(FormatEntry::name("a.txt").unwrap());
        coll.push(FormatEntry::name("b.txt").unwrap());
        assert!(coll.validate().is_err());
    }

    #[test]
    fn def_and_nk_together_are_contradictory() {
        let mut coll = FormatCollection::new();
        coll.push(FormatEntry::deflate());
        coll.push(FormatEntry::no_compression());
        assert!(coll.validate().is_err());
    }

    #[test]
    fn unknown_key_is_rejected_at_parse_time() {
        let mut buf = Vec::new();
        wire::write_u16(&mut buf, 1).unwrap();
        wire::write_len8_bytes(&mut buf, b"Bogus").unwrap();
        wire::write_u16(&mut buf, 1).unwrap();
        wire::write_u16(&mut buf, 0).unwrap();
        let mut cur = std::io::Cursor::new(buf);
        let err = FormatCollection::parse(&mut cur).unwrap_err();
        assert!(matches!(err, MauError::UnknownOption(_)));
    }

    #[test]
    fn name_accepts_archive_relative_path_with_slash() {
        let entry = FormatEntry::name("a/b.txt").unwrap();
        assert_eq!(entry.as_name().unwrap(), "a/b.txt");
    }

    #[test]
    fn name_rejects_leading_slash() {
        assert!(FormatEntry::name("/a/b.txt").is_err());
    }

    #[test]
    fn ticks_convert_to_expected_unix_seconds() {
        // .NET DateTime(2001, 1, 1, 0, 0, 0, DateTimeKind.Utc).Ticks
        let ticks = 630_822_816_000_000_000i64;
        assert_eq!(ticks_to_unix_seconds(ticks), 978_307_200);
    }

    #[test]
    fn ticks_convert_to_expected_datetime() {
        use chrono::{Datelike, Timelike};
        let ticks = 630_822_816_000_000_000i64;
        let dt = ticks_to_datetime(ticks).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2001, 1, 1));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }
}
