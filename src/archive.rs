// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! MauZArchive: the multi-entry archive format layered on top
//! of [`crate::container`]. Each entry is itself a complete Maus stream;
//! the archive adds an entry table, a cross-referenced offset table, an
//! optional whole-archive encryption envelope, encrypted-filename
//! placeholders, and an optional signed manifest.
//!
//! [`MauZWriter`] buffers the whole archive body in memory before sealing,
//! the same discipline [`crate::container::MausWriter`] uses and for the
//! same reason: `totalSize` and `metaoffset` aren't known until the
//! body is written. [`MauZReader`] reads the underlying source fully once
//! (never requiring seeks on the underlying stream while parsing only
//! rules out positional reads mid-parse, not an initial buffered slurp)
//! and then parses/cross-checks from that buffer.

use std::io::{Cursor, Read};

use crate::container::{MausReader, MausWriter, SealedMaus};
use crate::crypto::pipeline::{self, CryptoPipeline, EncryptParams};
use crate::error::{MauError, Result};
use crate::options::{Compression, FormatCollection, FormatEntry, FormatKey};
use crate::path::{self, PathKind};
use crate::primitives::{reference, CipherAlgorithm, HashAlgorithm, VerifyOutcome};
use crate::signature::{self, SigningKey, VerifyingKey};
use crate::wire;

pub const MAGIC: [u8; 4] = *b"mAuZ";
pub const MIN_VERSION: u16 = 100;
pub const MAX_VERSION: u16 = 100;

const ENTRY_PREFIX: &[u8; 4] = b"\x03dat";
const OFFSET_TABLE_PREFIX: &[u8; 4] = b"\x03VER";
const OFFSET_RECORD_PREFIX: &[u8; 4] = b"\x03ver";
const MANIFEST_TAG: &[u8; 4] = b"\x03SIG";
const MANIFEST_RECORD_TAG: &[u8; 4] = b"\x03sig";

fn wire_path(id: i64, real_path: &str, placeholder: bool) -> String {
    if placeholder {
        format!("//V{id}")
    } else {
        real_path.to_string()
    }
}

struct PendingEntry {
    /// The path the caller asked for — always the real one, even when
    /// `placeholder` means the wire encoding hides it behind `//V<id>`.
    path: String,
    sealed: SealedMaus,
    placeholder: bool,
}

struct WholeArchiveEncryption {
    cipher: CipherAlgorithm,
    bits: u16,
    password: Vec<u8>,
    iterations: u32,
}

struct ArchiveSignatureSpec {
    key_variant: FormatKey,
    signing_key: SigningKey,
    key_id: Option<Vec<u8>>,
}

/// Builder for a MauZ archive. Entries are sealed (as complete Maus
/// streams) as they're added; [`Self::seal`] assembles the entry table,
/// offset table, optional manifest, and optional whole-archive envelope.
pub struct MauZWriter {
    hash: HashAlgorithm,
    options: FormatCollection,
    pending: Vec<PendingEntry>,
    encryption: Option<WholeArchiveEncryption>,
    manifest: bool,
    archive_signature: Option<ArchiveSignatureSpec>,
}

impl MauZWriter {
    pub fn new(hash: HashAlgorithm) -> Self {
        Self {
            hash,
            options: FormatCollection::new(),
            pending: Vec::new(),
            encryption: None,
            manifest: false,
            archive_signature: None,
        }
    }

    /// Request a signed manifest entry without necessarily
    /// adding an archive-level digital signature — the manifest alone still
    /// gives per-entry tamper detection on open. Implied by
    /// [`Self::with_archive_signature`].
    pub fn with_manifest(mut self) -> Self {
        self.manifest = true;
        self
    }

    /// Encrypt the whole archive (entry table, offset table, and all
    /// entries) behind one password, rather than per entry.
    pub fn with_whole_archive_encryption(
        mut self,
        cipher: CipherAlgorithm,
        bits: u16,
        password: Vec<u8>,
        iterations: u32,
    ) -> Self {
        self.encryption = Some(WholeArchiveEncryption { cipher, bits, password, iterations });
        self
    }

    /// Sign the archive: on [`Self::seal`], a manifest entry listing every
    /// other entry's `mac` is appended, and a signature option covering the
    /// concatenation of those `mac` values plus the archive's own options
    /// bytes is added to the archive options.
    pub fn with_archive_signature(
        mut self,
        key_variant: FormatKey,
        signing_key: SigningKey,
        key_id: Option<Vec<u8>>,
    ) -> Self {
        self.archive_signature = Some(ArchiveSignatureSpec { key_variant, signing_key, key_id });
        self
    }

    /// Add a file entry. `maus` should be configured (compression,
    /// encryption, timestamps, ...) but not yet sealed; this method
    /// overwrites its `Name` with `archive_path` and seals it. Whether the
    /// wire path ends up a `//V<id>` placeholder is determined entirely by
    /// whether `maus` turns out encrypted.
    pub fn add_file(&mut self, archive_path: &str, maus: MausWriter, payload: &[u8]) -> Result<()> {
        let kind = path::validate_archive_path(archive_path)?;
        if kind != PathKind::File {
            return Err(MauError::invalid_data(
                "add_file requires a file path, not a trailing-slash directory path",
            ));
        }
        let placeholder = maus.is_encrypted();
        let sealed = maus.with_name(archive_path).seal(payload)?;
        self.pending.push(PendingEntry { path: archive_path.to_string(), sealed, placeholder });
        Ok(())
    }

    /// Add an empty-directory entry: path ends in `/`, payload is
    /// the single byte `/`, uncompressed, no timestamps.
    pub fn add_empty_dir(&mut self, archive_path: &str) -> Result<()> {
        let kind = path::validate_archive_path(archive_path)?;
        if kind != PathKind::EmptyDir {
            return Err(MauError::invalid_data("add_empty_dir requires a trailing-slash path"));
        }
        let maus = MausWriter::new().with_compression(Compression::None).with_name(archive_path);
        let sealed = maus.seal(b"/")?;
        self.pending.push(PendingEntry { path: archive_path.to_string(), sealed, placeholder: false });
        Ok(())
    }

    /// Same as [`Self::add_empty_dir`] but with its filename hidden behind
    /// the whole-entry encryption the directory's own Maus container
    /// carries, per the `//V<id>` placeholder exception.
    pub fn add_empty_dir_encrypted(
        &mut self,
        archive_path: &str,
        cipher: CipherAlgorithm,
        bits: u16,
        password: Vec<u8>,
        iterations: u32,
    ) -> Result<()> {
        let kind = path::validate_archive_path(archive_path)?;
        if kind != PathKind::EmptyDir {
            return Err(MauError::invalid_data("add_empty_dir_encrypted requires a trailing-slash path"));
        }
        let maus = MausWriter::new()
            .with_compression(Compression::None)
            .with_hash(self.hash)
            .with_password_encryption(cipher, bits, password, iterations)
            .with_name(archive_path);
        let sealed = maus.seal(b"/")?;
        self.pending.push(PendingEntry { path: archive_path.to_string(), sealed, placeholder: true });
        Ok(())
    }

    fn build_manifest(&self, hash: HashAlgorithm) -> Result<PendingEntry> {
        let mut payload = Vec::new();
        payload.extend_from_slice(MANIFEST_TAG);
        wire::write_i64(&mut payload, self.pending.len() as i64)?;
        for (idx, entry) in self.pending.iter().enumerate() {
            let id = idx as i64;
            payload.extend_from_slice(MANIFEST_RECORD_TAG);
            wire::write_i64(&mut payload, id)?;
            wire::write_len8_string(&mut payload, &wire_path(id, &entry.path, entry.placeholder))?;
            wire::write_len16_bytes(&mut payload, &entry.sealed.mac)?;
        }
        let sealed = MausWriter::new()
            .with_compression(Compression::None)
            .with_hash(hash)
            .seal(&payload)?;
        Ok(PendingEntry { path: path::MANIFEST_PATH.to_string(), sealed, placeholder: false })
    }

    /// Assemble and return the complete archive byte stream.
    pub fn seal(mut self) -> Result<Vec<u8>> {
        if self.pending.is_empty() {
            return Err(MauError::invalid_state("archive must contain at least one entry"));
        }
        tracing::debug!(
            entries = self.pending.len(),
            encrypted = self.encryption.is_some(),
            manifest = self.manifest,
            "sealing archive"
        );
        path::check_path_uniqueness(self.pending.iter().map(|e| e.path.as_str()))?;

        if self.manifest || self.archive_signature.is_some() {
            let manifest = self.build_manifest(self.hash)?;
            self.pending.push(manifest);
        }

        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        wire::write_u16(&mut buf, MIN_VERSION)?;
        let total_size_pos = buf.len();
        wire::write_i64(&mut buf, 0)?;

        let mut options = self.options.clone();
        if let Some(enc) = &self.encryption {
            options.push(FormatEntry::cipher(enc.cipher, enc.bits));
            options.push(FormatEntry::hash(self.hash));
        }
        if let Some(sig) = &self.archive_signature {
            let mut pre_image = Vec::new();
            for entry in &self.pending {
                pre_image.extend_from_slice(&entry.sealed.mac);
            }
            let mut opts_bytes = Vec::new();
            options.serialize(&mut opts_bytes)?;
            pre_image.extend_from_slice(&opts_bytes);
            let digest = reference::hash_function(self.hash).digest(&pre_image);
            let blob = signature::sign(&sig.signing_key, self.hash, &digest)?;
            options.push(FormatEntry::signature(sig.key_variant.clone(), blob, sig.key_id.clone()));
        }
        options.validate()?;
        options.serialize(&mut buf)?;

        if let Some(enc) = &self.encryption {
            let mut envelope_buf = Vec::new();
            FormatCollection::new().serialize(&mut envelope_buf)?;
            let offsets = write_entries_region(&mut envelope_buf, &self.pending)?;
            let meta_pos = write_offset_list(&mut envelope_buf, &offsets)?;
            wire::write_i64(&mut envelope_buf, meta_pos)?;

            let block_cipher = reference::block_cipher(enc.cipher, enc.bits)?;
            let pipe = CryptoPipeline::new(block_cipher);
            CryptoPipeline::validate_iterations(enc.iterations)?;
            let params =
                EncryptParams { password: &enc.password, iterations: enc.iterations, hash: self.hash };
            let envelope = pipe.encrypt(&params, &envelope_buf)?;

            wire::write_i64(&mut buf, (enc.iterations - pipeline::MIN_ITERATIONS) as i64)?;
            buf.extend_from_slice(&envelope.mac);
            buf.extend_from_slice(&envelope.salt);
            buf.extend_from_slice(&envelope.iv);
            buf.extend_from_slice(&envelope.ciphertext);
        } else {
            let offsets = write_entries_region(&mut buf, &self.pending)?;
            let meta_pos = write_offset_list(&mut buf, &offsets)?;
            wire::write_i64(&mut buf, meta_pos)?;
        }

        let total_size = buf.len() as i64;
        buf[total_size_pos..total_size_pos + 8].copy_from_slice(&total_size.to_le_bytes());
        Ok(buf)
    }
}

/// `entryCount` followed by `count * MauZEntryRecord`, writing
/// directly into `buf` so recorded offsets land in whatever coordinate
/// system `buf` already represents (absolute file position, or position
/// within a decrypted envelope).
fn write_entries_region(buf: &mut Vec<u8>, pending: &[PendingEntry]) -> Result<Vec<(i64, String, i64)>> {
    wire::write_i64(buf, pending.len() as i64)?;
    let mut offsets = Vec::with_capacity(pending.len());
    for (idx, entry) in pending.iter().enumerate() {
        let id = idx as i64;
        let path = wire_path(id, &entry.path, entry.placeholder);
        let entry_offset = buf.len() as i64;
        buf.extend_from_slice(ENTRY_PREFIX);
        wire::write_i64(buf, id)?;
        wire::write_len8_string(buf, &path)?;
        buf.extend_from_slice(&entry.sealed.bytes);
        offsets.push((id, path, entry_offset));
    }
    Ok(offsets)
}

fn write_offset_list(buf: &mut Vec<u8>, offsets: &[(i64, String, i64)]) -> Result<i64> {
    let meta_pos = buf.len() as i64;
    buf.extend_from_slice(OFFSET_TABLE_PREFIX);
    for (id, path, offset) in offsets {
        buf.extend_from_slice(OFFSET_RECORD_PREFIX);
        wire::write_i64(buf, *id)?;
        wire::write_len8_string(buf, path)?;
        wire::write_i64(buf, *offset)?;
    }
    Ok(meta_pos)
}

struct EntryRecord {
    id: i64,
    wire_path: String,
    maus: MausReader,
    byte_offset: usize,
}

/// Read-side state mirroring [`crate::container::ReadState`]: a whole-archive
/// encrypted instance starts `KeyNeeded` and transitions once on a
/// successful [`MauZReader::decrypt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    KeyNeeded,
    Decrypted,
}

struct EncryptedFraming {
    cipher: CipherAlgorithm,
    bits: u16,
    iterations: u32,
    mac: Vec<u8>,
    salt: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
}

pub struct MauZReader {
    version: u16,
    total_size: i64,
    options: FormatCollection,
    encrypted_options: Option<FormatCollection>,
    hash: HashAlgorithm,
    encrypted: Option<EncryptedFraming>,
    entries: Vec<EntryRecord>,
    state: ReadState,
}

/// Read `entryCount` entries, then the `"\x03VER"`-tagged offset table, then
/// the trailing `metaoffset` field, all from `cur` (which walks `coord`, the
/// byte slice offsets are measured against — the whole file for a plain
/// archive, or the decrypted envelope for an encrypted one).
fn parse_entries_region(
    coord: &[u8],
    cur: &mut Cursor<&[u8]>,
) -> Result<(Vec<EntryRecord>, Vec<(i64, String, i64)>, i64)> {
    let entry_count = wire::read_i64(cur)?;
    if entry_count < 0 {
        return Err(MauError::invalid_data("negative entryCount"));
    }
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let byte_offset = cur.position() as usize;
        let mut prefix = [0u8; 4];
        cur.read_exact(&mut prefix)?;
        if &prefix != ENTRY_PREFIX {
            return Err(MauError::invalid_data("expected entry prefix \\x03dat"));
        }
        let id = wire::read_i64(cur)?;
        let wire_path = wire::read_len8_string(cur)?;
        let maus = MausReader::parse(cur)?;
        entries.push(EntryRecord { id, wire_path, maus, byte_offset });
    }

    let offset_table_start = cur.position() as usize;
    let mut tag = [0u8; 4];
    cur.read_exact(&mut tag)?;
    if &tag != OFFSET_TABLE_PREFIX {
        return Err(MauError::invalid_data("expected offset table prefix \\x03VER"));
    }
    let mut offset_table = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let mut prefix = [0u8; 4];
        cur.read_exact(&mut prefix)?;
        if &prefix != OFFSET_RECORD_PREFIX {
            return Err(MauError::invalid_data("expected offset record prefix \\x03ver"));
        }
        let id = wire::read_i64(cur)?;
        let path = wire::read_len8_string(cur)?;
        let offset = wire::read_i64(cur)?;
        offset_table.push((id, path, offset));
    }
    let metaoffset = wire::read_i64(cur)?;
    if metaoffset as usize != offset_table_start {
        return Err(MauError::invalid_data("metaoffset does not match offset table position"));
    }

    validate_cross_references(coord, &entries, &offset_table)?;
    Ok((entries, offset_table, metaoffset))
}

/// Cross-reference check: every id 0..N-1 appears exactly once in both tables,
/// and every offset-table entry points at a byte position that begins with
/// `\x03dat`.
fn validate_cross_references(
    coord: &[u8],
    entries: &[EntryRecord],
    offset_table: &[(i64, String, i64)],
) -> Result<()> {
    if entries.len() != offset_table.len() {
        return Err(MauError::invalid_data("entry list and offset table lengths differ"));
    }
    let n = entries.len() as i64;

    let mut seen_entry_ids = std::collections::HashSet::new();
    for e in entries {
        if !(0..n).contains(&e.id) || !seen_entry_ids.insert(e.id) {
            return Err(MauError::invalid_data(format!("duplicate or out-of-range entry id {}", e.id)));
        }
    }

    let mut seen_offset_ids = std::collections::HashSet::new();
    for (id, _, offset) in offset_table {
        if !(0..n).contains(id) || !seen_offset_ids.insert(*id) {
            return Err(MauError::invalid_data(format!("duplicate or out-of-range offset id {id}")));
        }
        let off = *offset as usize;
        if off + ENTRY_PREFIX.len() > coord.len() || &coord[off..off + ENTRY_PREFIX.len()] != ENTRY_PREFIX {
            return Err(MauError::invalid_data("offset does not point at an entry prefix"));
        }
    }

    if seen_entry_ids != seen_offset_ids {
        return Err(MauError::invalid_data("entry list and offset table disagree on ids present"));
    }

    path::check_path_uniqueness(entries.iter().map(|e| e.wire_path.as_str()))?;
    Ok(())
}

impl MauZReader {
    pub fn parse(r: &mut impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        Self::parse_buffer(buf)
    }

    fn parse_buffer(buf: Vec<u8>) -> Result<Self> {
        let mut cur = Cursor::new(&buf[..]);
        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(MauError::invalid_data("bad MauZ magic"));
        }
        let version = wire::read_u16(&mut cur)?;
        if version < MIN_VERSION || version > MAX_VERSION {
            return Err(MauError::UnsupportedVersion { found: version, min: MIN_VERSION, max: MAX_VERSION });
        }
        let total_size = wire::read_i64(&mut cur)?;
        if total_size < 0 || total_size as usize != buf.len() {
            return Err(MauError::invalid_data("totalSize does not match archive length"));
        }

        let options = FormatCollection::parse(&mut cur)?;
        options.validate()?;
        let hash = options.hash_algorithm()?.unwrap_or(HashAlgorithm::Sha256);
        let cipher_spec = options.cipher()?;

        if let Some((cipher, bits)) = cipher_spec {
            let len_or_kdf = wire::read_i64(&mut cur)?;
            let max_stored = (pipeline::MAX_ITERATIONS - pipeline::MIN_ITERATIONS) as i64;
            if len_or_kdf < 0 || len_or_kdf > max_stored {
                return Err(MauError::invalid_data("PBKDF2 count field out of range"));
            }
            let iterations = pipeline::MIN_ITERATIONS + len_or_kdf as u32;
            let mac = wire::read_exact_vec(&mut cur, hash.output_len())?;
            let key_len = cipher.key_len(bits).ok_or_else(|| MauError::UnsupportedKeySize {
                algorithm: cipher.wire_name().to_string(),
                bits,
            })?;
            let block_len = cipher.block_len(bits).ok_or_else(|| MauError::UnsupportedKeySize {
                algorithm: cipher.wire_name().to_string(),
                bits,
            })?;
            let salt = wire::read_exact_vec(&mut cur, key_len)?;
            let iv = wire::read_exact_vec(&mut cur, block_len)?;
            let pos = cur.position() as usize;
            let ciphertext = buf[pos..].to_vec();

            Ok(Self {
                version,
                total_size,
                options,
                encrypted_options: None,
                hash,
                encrypted: Some(EncryptedFraming { cipher, bits, iterations, mac, salt, iv, ciphertext }),
                entries: Vec::new(),
                state: ReadState::KeyNeeded,
            })
        } else {
            let (entries, _offsets, _metaoffset) = parse_entries_region(&buf, &mut cur)?;
            let mut reader = Self {
                version,
                total_size,
                options,
                encrypted_options: None,
                hash,
                encrypted: None,
                entries,
                state: ReadState::Decrypted,
            };
            reader.verify_manifest()?;
            Ok(reader)
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn total_size(&self) -> i64 {
        self.total_size
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.is_some()
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    pub fn options(&self) -> &FormatCollection {
        &self.options
    }

    /// Attempt to unlock a whole-archive-encrypted instance. Stays in
    /// `KeyNeeded` on `BadPassword` so the caller can retry.
    pub fn decrypt(&mut self, password: &[u8]) -> Result<()> {
        if self.state != ReadState::KeyNeeded {
            return Err(MauError::invalid_state("decrypt() called outside KeyNeeded"));
        }
        let enc = self.encrypted.as_ref().expect("KeyNeeded implies encrypted framing");
        let block_cipher = reference::block_cipher(enc.cipher, enc.bits)?;
        let pipe = CryptoPipeline::new(block_cipher);
        let plaintext = match pipe.decrypt(
            password,
            enc.iterations,
            self.hash,
            &enc.salt,
            &enc.iv,
            &enc.mac,
            &enc.ciphertext,
        ) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "whole-archive decryption failed");
                return Err(e);
            }
        };

        let mut cur = Cursor::new(&plaintext[..]);
        let encrypted_options = FormatCollection::parse(&mut cur)?;
        encrypted_options.validate()?;
        let (entries, _offsets, _metaoffset) = parse_entries_region(&plaintext, &mut cur)?;

        self.encrypted_options = Some(encrypted_options);
        self.entries = entries;
        self.state = ReadState::Decrypted;
        self.verify_manifest()?;
        Ok(())
    }

    fn entries_requiring_decrypted_state(&self) -> Result<&[EntryRecord]> {
        if self.state != ReadState::Decrypted {
            return Err(MauError::invalid_state("entries unavailable before decrypt()"));
        }
        Ok(&self.entries)
    }

    /// Iterate entries in id order: `(id, wire_path, is_manifest)`.
    pub fn entries(&self) -> Result<Vec<(i64, &str, bool)>> {
        Ok(self
            .entries_requiring_decrypted_state()?
            .iter()
            .map(|e| (e.id, e.wire_path.as_str(), e.wire_path == path::MANIFEST_PATH))
            .collect())
    }

    fn find(&self, id: i64) -> Result<&EntryRecord> {
        self.entries_requiring_decrypted_state()?
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| MauError::invalid_data(format!("no entry with id {id}")))
    }

    pub fn entry(&self, id: i64) -> Result<&MausReader> {
        Ok(&self.find(id)?.maus)
    }

    fn find_mut(&mut self, id: i64) -> Result<&mut EntryRecord> {
        if self.state != ReadState::Decrypted {
            return Err(MauError::invalid_state("entries unavailable before decrypt()"));
        }
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| MauError::invalid_data(format!("no entry with id {id}")))
    }

    pub fn entry_mut(&mut self, id: i64) -> Result<&mut MausReader> {
        Ok(&mut self.find_mut(id)?.maus)
    }

    /// The real path for an entry: its own `Name` option if one is present
    /// (always true except for the manifest, which carries none), falling
    /// back to the wire path otherwise. Resolves a `//V<id>` placeholder
    /// once that entry has been decrypted.
    pub fn real_path(&self, id: i64) -> Result<String> {
        let rec = self.find(id)?;
        Ok(rec.maus.name()?.unwrap_or_else(|| rec.wire_path.clone()))
    }

    pub fn byte_offset(&self, id: i64) -> Result<usize> {
        Ok(self.find(id)?.byte_offset)
    }

    /// step 7: if a manifest entry is present, every `mac` it records
    /// must match the referenced entry's own `mac` exactly, or the whole
    /// archive is refused.
    fn verify_manifest(&self) -> Result<()> {
        let manifest = match self.entries.iter().find(|e| e.wire_path == path::MANIFEST_PATH) {
            Some(m) => m,
            None => return Ok(()),
        };
        let last_id = self.entries.len() as i64 - 1;
        if manifest.id != last_id {
            return Err(MauError::invalid_data("manifest entry must be the last id in the archive"));
        }
        if manifest.maus.is_encrypted() {
            return Err(MauError::invalid_data("manifest entry must not itself be encrypted"));
        }
        let payload = manifest.maus.payload()?;
        let mut cur = Cursor::new(payload);
        let mut tag = [0u8; 4];
        cur.read_exact(&mut tag)?;
        if &tag != MANIFEST_TAG {
            return Err(MauError::invalid_data("manifest payload missing \\x03SIG tag"));
        }
        let sig_count = wire::read_i64(&mut cur)?;
        if sig_count != last_id {
            return Err(MauError::invalid_data(
                "manifest record count does not match the number of non-manifest entries",
            ));
        }
        for _ in 0..sig_count {
            let mut rec_tag = [0u8; 4];
            cur.read_exact(&mut rec_tag)?;
            if &rec_tag != MANIFEST_RECORD_TAG {
                return Err(MauError::invalid_data("manifest record missing \\x03sig tag"));
            }
            let id = wire::read_i64(&mut cur)?;
            let _path = wire::read_len8_string(&mut cur)?;
            let recorded_mac = wire::read_len16_bytes(&mut cur)?;
            let referenced = self
                .entries
                .iter()
                .find(|e| e.id == id)
                .ok_or_else(|| MauError::invalid_data(format!("manifest references unknown id {id}")))?;
            if referenced.maus.mac() != recorded_mac.as_slice() {
                return Err(MauError::invalid_data(format!(
                    "manifest mac mismatch for entry id {id}: archive has been tampered with"
                )));
            }
        }
        Ok(())
    }

    /// Verify the archive-level signature option against `key`.
    /// Reports `NoSignature` rather than erroring when the archive wasn't
    /// signed.
    pub fn verify_archive_signature(&self, key: &VerifyingKey) -> Result<VerifyOutcome> {
        let entry = self
            .options
            .get(&FormatKey::RsaSig)
            .or_else(|| self.options.get(&FormatKey::DsaSig))
            .or_else(|| self.options.get(&FormatKey::EcdsaSig));
        let entry = match entry {
            Some(e) => e,
            None => return Ok(VerifyOutcome::NoSignature),
        };

        let mut without_sig = self.options.clone();
        without_sig.remove(&FormatKey::RsaSig);
        without_sig.remove(&FormatKey::DsaSig);
        without_sig.remove(&FormatKey::EcdsaSig);

        let mut entries = self.entries_requiring_decrypted_state()?.iter().collect::<Vec<_>>();
        entries.sort_by_key(|e| e.id);

        let mut pre_image = Vec::new();
        for e in entries {
            pre_image.extend_from_slice(e.maus.mac());
        }
        let mut opts_bytes = Vec::new();
        without_sig.serialize(&mut opts_bytes)?;
        pre_image.extend_from_slice(&opts_bytes);

        let digest = reference::hash_function(self.hash).digest(&pre_image);
        let outcome = signature::verify(key, self.hash, &digest, &entry.parameters[0])?;
        if outcome != VerifyOutcome::Verified {
            tracing::warn!(?outcome, "archive signature did not verify");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Compression;

    #[test]
    fn two_entries_round_trip_with_manifest() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256);
        writer
            .add_file("a/b.txt", MausWriter::new().with_compression(Compression::None), b"x")
            .unwrap();
        writer
            .add_file("a/c.txt", MausWriter::new().with_compression(Compression::None), b"y")
            .unwrap();

        let mut rng = rand::rngs::OsRng;
        let private = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = rsa::RsaPublicKey::from(&private);
        let writer = writer.with_archive_signature(
            FormatKey::RsaSig,
            SigningKey::Rsa(Box::new(private)),
            None,
        );
        let bytes = writer.seal().unwrap();

        let mut cur = Cursor::new(bytes);
        let reader = MauZReader::parse(&mut cur).unwrap();
        assert!(!reader.is_encrypted());

        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 3); // two files + manifest
        assert_eq!(entries[0], (0, "a/b.txt", false));
        assert_eq!(entries[1], (1, "a/c.txt", false));
        assert_eq!(entries[2].0, 2);
        assert!(entries[2].2);

        assert_eq!(reader.entry(0).unwrap().payload().unwrap(), b"x");
        assert_eq!(reader.entry(1).unwrap().payload().unwrap(), b"y");

        let outcome = reader.verify_archive_signature(&VerifyingKey::Rsa(Box::new(public))).unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);
    }

    #[test]
    fn whole_archive_threefish_encryption_round_trips() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha512).with_whole_archive_encryption(
            CipherAlgorithm::Threefish,
            1024,
            b"whole archive password".to_vec(),
            9001,
        );
        writer
            .add_file("plain.txt", MausWriter::new().with_compression(Compression::None), b"uncompressed")
            .unwrap();
        writer
            .add_file("zipped.bin", MausWriter::new().with_compression(Compression::Lzma), b"lzma payload here")
            .unwrap();
        let bytes = writer.seal().unwrap();

        let mut cur = Cursor::new(bytes);
        let mut reader = MauZReader::parse(&mut cur).unwrap();
        assert!(reader.is_encrypted());
        assert_eq!(reader.state(), ReadState::KeyNeeded);

        reader.decrypt(b"whole archive password").unwrap();
        assert_eq!(reader.state(), ReadState::Decrypted);

        let entries = reader.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(reader.real_path(0).unwrap(), "plain.txt");
        assert_eq!(reader.entry(0).unwrap().payload().unwrap(), b"uncompressed");
        assert_eq!(reader.entry(1).unwrap().payload().unwrap(), b"lzma payload here");
    }

    #[test]
    fn tampering_envelope_yields_bad_password() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256).with_whole_archive_encryption(
            CipherAlgorithm::Aes,
            256,
            b"pw".to_vec(),
            9001,
        );
        writer.add_file("a.txt", MausWriter::new(), b"hello").unwrap();
        let mut bytes = writer.seal().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let mut cur = Cursor::new(bytes);
        let mut reader = MauZReader::parse(&mut cur).unwrap();
        let err = reader.decrypt(b"pw").unwrap_err();
        assert!(matches!(err, MauError::BadPassword));
        assert_eq!(reader.state(), ReadState::KeyNeeded);
    }

    #[test]
    fn encrypted_filename_is_replaced_by_placeholder() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256);
        let entry_maus = MausWriter::new().with_password_encryption(
            CipherAlgorithm::Aes,
            256,
            b"entry password".to_vec(),
            9001,
        );
        writer.add_file("private.doc", entry_maus, b"shh").unwrap();
        let bytes = writer.seal().unwrap();

        let mut cur = Cursor::new(bytes);
        let reader = MauZReader::parse(&mut cur).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries[0], (0, "//V0", false));

        let mut entry_reader_owner = reader;
        entry_reader_owner.entry_mut(0).unwrap().decrypt(b"entry password").unwrap();
        assert_eq!(entry_reader_owner.real_path(0).unwrap(), "private.doc");
        assert_eq!(entry_reader_owner.entry(0).unwrap().payload().unwrap(), b"shh");
    }

    #[test]
    fn manifest_tamper_after_seal_is_rejected() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256);
        writer.add_file("a.txt", MausWriter::new(), b"original").unwrap();
        let mut rng = rand::rngs::OsRng;
        let private = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let writer =
            writer.with_archive_signature(FormatKey::RsaSig, SigningKey::Rsa(Box::new(private)), None);
        let mut bytes = writer.seal().unwrap();

        // Flip a byte inside entry 0's ciphertext region (it's uncompressed,
        // unencrypted, so this lands in its raw payload bytes).
        let marker = b"original";
        let pos = bytes.windows(marker.len()).position(|w| w == marker).unwrap();
        bytes[pos] ^= 0xFF;

        let mut cur = Cursor::new(bytes);
        let err = MauZReader::parse(&mut cur).unwrap_err();
        assert!(matches!(err, MauError::BadChecksum) || matches!(err, MauError::InvalidData(_)));
    }

    #[test]
    fn duplicate_paths_are_rejected_at_seal_time() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256);
        writer.add_file("a.txt", MausWriter::new(), b"one").unwrap();
        writer.add_file("a.txt", MausWriter::new(), b"two").unwrap();
        assert!(writer.seal().is_err());
    }

    #[test]
    fn file_path_prefix_of_directory_path_rejected_at_seal_time() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256);
        writer.add_file("a/b", MausWriter::new(), b"file").unwrap();
        writer.add_empty_dir("a/b/c/").unwrap();
        assert!(writer.seal().is_err());
    }

    #[test]
    fn empty_archive_is_rejected() {
        let writer = MauZWriter::new(HashAlgorithm::Sha256);
        assert!(writer.seal().is_err());
    }

    #[test]
    fn offset_table_cross_references_entry_prefixes() {
        let mut writer = MauZWriter::new(HashAlgorithm::Sha256);
        writer.add_file("a.txt", MausWriter::new(), b"alpha").unwrap();
        writer.add_file("b.txt", MausWriter::new(), b"beta").unwrap();
        let bytes = writer.seal().unwrap();

        let mut cur = Cursor::new(bytes);
        let reader = MauZReader::parse(&mut cur).unwrap();
        for (id, _, _) in reader.entries().unwrap() {
            let off = reader.byte_offset(id).unwrap();
            // byte_offset() is only meaningful relative to the original
            // buffer; re-derive that here via total_size as a sanity bound.
            assert!(off < reader.total_size() as usize);
        }
    }
}
