// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! MausContainer: the single-file compressed, optionally
//! encrypted and signed stream format. [`MausWriter`] is a builder that
//! buffers the whole body in memory before sealing, following a "buffer the
//! envelope" discipline — callers never need to know `compressedLen` up
//! front. [`MausReader`] parses the fixed framing eagerly and defers
//! anything requiring a key to an explicit `decrypt`/`decrypt_with_rsa`
//! call, matching a `Fresh → HeaderParsed → KeyNeeded → Decrypted` read
//! state progression (the `Reading`/`Closed`/`Writing`/`Sealed` states are
//! folded into "payload available" / "bytes produced", since this crate
//! buffers rather than streams).

use std::io::{Cursor, Read, Write};

use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroize;

use crate::crypto::pipeline::{self, CryptoPipeline, EncryptParams};
use crate::error::{MauError, Result};
use crate::options::{Compression, FormatCollection, FormatEntry, FormatKey};
use crate::primitives::{reference, CipherAlgorithm, CompressionCodec, HashAlgorithm, VerifyOutcome};
use crate::signature::{self, SigningKey, VerifyingKey};
use crate::wire;

pub const MAGIC: [u8; 4] = *b"mAuS";
pub const MIN_VERSION: u16 = 100;
pub const MAX_VERSION: u16 = 100;

fn codec_for(c: Compression) -> Box<dyn CompressionCodec> {
    match c {
        Compression::None => Box::new(reference::Identity),
        Compression::Deflate => Box::new(reference::Deflate),
        Compression::Lzma => Box::new(reference::Lzma),
    }
}

fn compression_entry(c: Compression) -> Option<FormatEntry> {
    match c {
        Compression::None => None,
        Compression::Deflate => Some(FormatEntry::deflate()),
        Compression::Lzma => Some(FormatEntry::lzma()),
    }
}

struct PasswordEncryption {
    cipher: CipherAlgorithm,
    bits: u16,
    password: Vec<u8>,
    iterations: u32,
}

struct SignatureSpec {
    key_variant: FormatKey,
    signing_key: SigningKey,
    key_id: Option<Vec<u8>>,
}

/// Builder for a single Maus stream. Settable fields mirror the `Fresh` /
/// `Writing` states; calling [`Self::seal`] consumes the builder,
/// matching the one-way `Writing → Sealed` transition.
pub struct MausWriter {
    compression: Compression,
    hash: HashAlgorithm,
    hash_explicit: bool,
    name: Option<String>,
    created_ticks: Option<i64>,
    modified_ticks: Option<i64>,
    comment: Option<String>,
    encryption: Option<PasswordEncryption>,
    rsa_escrow: Option<(Box<RsaPublicKey>, HashAlgorithm)>,
    signature: Option<SignatureSpec>,
}

/// The sealed byte stream plus the `mac` field it carries (the plaintext
/// checksum, or the HMAC when encrypted) — the value a MauZ manifest
/// records per entry.
pub struct SealedMaus {
    pub bytes: Vec<u8>,
    pub mac: Vec<u8>,
}

impl MausWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::None,
            hash: HashAlgorithm::Sha256,
            hash_explicit: false,
            name: None,
            created_ticks: None,
            modified_ticks: None,
            comment: None,
            encryption: None,
            rsa_escrow: None,
            signature: None,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self.hash_explicit = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_created_ticks(mut self, ticks: i64) -> Self {
        self.created_ticks = Some(ticks);
        self
    }

    pub fn with_modified_ticks(mut self, ticks: i64) -> Self {
        self.modified_ticks = Some(ticks);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_password_encryption(
        mut self,
        cipher: CipherAlgorithm,
        bits: u16,
        password: Vec<u8>,
        iterations: u32,
    ) -> Self {
        self.encryption = Some(PasswordEncryption { cipher, bits, password, iterations });
        self
    }

    /// Additionally wrap the derived envelope key for `recipient` (`RSAsch`):
    /// a second way into the same envelope that doesn't need the
    /// password. Requires [`Self::with_password_encryption`] to already be
    /// set, since the key being escrowed is the one PBKDF2 derives.
    pub fn with_rsa_escrow(mut self, recipient: RsaPublicKey, wrap_hash: HashAlgorithm) -> Self {
        self.rsa_escrow = Some((Box::new(recipient), wrap_hash));
        self
    }

    /// Whether [`Self::seal`] will produce an encrypted envelope. Archive
    /// builders need this before sealing: it decides whether the wire path
    /// is replaced with a `//V<id>` placeholder.
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn with_signature(
        mut self,
        key_variant: FormatKey,
        signing_key: SigningKey,
        key_id: Option<Vec<u8>>,
    ) -> Self {
        self.signature = Some(SignatureSpec { key_variant, signing_key, key_id });
        self
    }

    pub fn seal(self, payload: &[u8]) -> Result<SealedMaus> {
        if self.rsa_escrow.is_some() && self.encryption.is_none() {
            return Err(MauError::invalid_state(
                "RSAsch escrow requires with_password_encryption to be configured",
            ));
        }
        tracing::debug!(
            payload_len = payload.len(),
            compression = ?self.compression,
            encrypted = self.encryption.is_some(),
            "sealing Maus container"
        );

        let codec = codec_for(self.compression);
        let compressed = codec.encode(payload).map_err(MauError::Io)?;
        let hash_fn = reference::hash_function(self.hash);
        let checksum = hash_fn.digest(payload);

        let mut out = wire::buffer_writer();

        match &self.encryption {
            None => {
                let mut primary = FormatCollection::new();
                if let Some(entry) = compression_entry(self.compression) {
                    primary.push(entry);
                }
                if self.hash_explicit {
                    primary.push(FormatEntry::hash(self.hash));
                }
                if let Some(name) = &self.name {
                    primary.push(FormatEntry::name(name)?);
                }
                if let Some(ticks) = self.created_ticks {
                    primary.push(FormatEntry::created(ticks));
                }
                if let Some(ticks) = self.modified_ticks {
                    primary.push(FormatEntry::modified(ticks));
                }
                if let Some(comment) = &self.comment {
                    primary.push(FormatEntry::comment(comment));
                }

                let mac = checksum;
                if let Some(sig) = &self.signature {
                    let digest = hash_fn.digest(&mac);
                    let blob = signature::sign(&sig.signing_key, self.hash, &digest)?;
                    primary.push(FormatEntry::signature(
                        sig.key_variant.clone(),
                        blob,
                        sig.key_id.clone(),
                    ));
                }
                primary.validate()?;

                out.write_all(&MAGIC)?;
                wire::write_u16(&mut out, MIN_VERSION)?;
                primary.serialize(&mut out)?;
                wire::write_i64(&mut out, compressed.len() as i64)?;
                wire::write_i64(&mut out, payload.len() as i64)?;
                out.write_all(&mac)?;
                out.write_all(&compressed)?;

                Ok(SealedMaus { bytes: out.into_inner(), mac })
            }
            Some(enc) => {
                let mut secondary = FormatCollection::new();
                if let Some(name) = &self.name {
                    secondary.push(FormatEntry::name(name)?);
                }
                if let Some(ticks) = self.created_ticks {
                    secondary.push(FormatEntry::created(ticks));
                }
                if let Some(ticks) = self.modified_ticks {
                    secondary.push(FormatEntry::modified(ticks));
                }
                if let Some(comment) = &self.comment {
                    secondary.push(FormatEntry::comment(comment));
                }
                secondary.push(FormatEntry::decompressed_len(payload.len() as i64));
                secondary.validate()?;

                let mut plaintext_envelope = Vec::new();
                secondary.serialize(&mut plaintext_envelope)?;
                plaintext_envelope.extend_from_slice(&checksum);
                plaintext_envelope.extend_from_slice(&compressed);

                let block_cipher = reference::block_cipher(enc.cipher, enc.bits)?;
                let pipe = CryptoPipeline::new(block_cipher);
                CryptoPipeline::validate_iterations(enc.iterations)?;
                let params = EncryptParams {
                    password: &enc.password,
                    iterations: enc.iterations,
                    hash: self.hash,
                };
                let (mut key, envelope) = pipe.encrypt_with_escrow(&params, &plaintext_envelope)?;

                let mut primary = FormatCollection::new();
                if let Some(entry) = compression_entry(self.compression) {
                    primary.push(entry);
                }
                primary.push(FormatEntry::cipher(enc.cipher, enc.bits));
                primary.push(FormatEntry::hash(self.hash));

                if let Some((recipient, wrap_hash)) = &self.rsa_escrow {
                    let wrapped = signature::rsa_wrap_key(recipient, *wrap_hash, &key)?;
                    primary.push(FormatEntry::rsa_wrapped_key(wrapped));
                }
                key.zeroize();

                if let Some(sig) = &self.signature {
                    let digest = hash_fn.digest(&envelope.mac);
                    let blob = signature::sign(&sig.signing_key, self.hash, &digest)?;
                    primary.push(FormatEntry::signature(
                        sig.key_variant.clone(),
                        blob,
                        sig.key_id.clone(),
                    ));
                }
                primary.validate()?;

                out.write_all(&MAGIC)?;
                wire::write_u16(&mut out, MIN_VERSION)?;
                primary.serialize(&mut out)?;
                wire::write_i64(&mut out, envelope.ciphertext.len() as i64)?;
                wire::write_i64(&mut out, (enc.iterations - pipeline::MIN_ITERATIONS) as i64)?;
                out.write_all(&envelope.mac)?;
                out.write_all(&envelope.salt)?;
                out.write_all(&envelope.iv)?;
                out.write_all(&envelope.ciphertext)?;

                Ok(SealedMaus { bytes: out.into_inner(), mac: envelope.mac })
            }
        }
    }
}

impl Default for MausWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-side state, matching the subset of the container's state machine
/// relevant to a buffered (non-streaming) reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    KeyNeeded,
    Decrypted,
}

struct EncryptedFraming {
    cipher: CipherAlgorithm,
    bits: u16,
    iterations: u32,
    salt: Vec<u8>,
    iv: Vec<u8>,
}

pub struct MausReader {
    version: u16,
    primary: FormatCollection,
    hash: HashAlgorithm,
    mac: Vec<u8>,
    unencrypted_declared_len: Option<i64>,
    encrypted: Option<EncryptedFraming>,
    body: Vec<u8>,
    secondary: Option<FormatCollection>,
    payload: Option<Vec<u8>>,
    state: ReadState,
}

fn decompress_and_verify(
    hash: HashAlgorithm,
    primary: &FormatCollection,
    compressed: &[u8],
    checksum: &[u8],
    declared_len: Option<i64>,
) -> Result<Vec<u8>> {
    let codec = codec_for(primary.compression());
    let mut decompressed = codec.decode(compressed).map_err(MauError::Io)?;
    let actual = reference::hash_function(hash).digest(&decompressed);
    if actual != checksum {
        return Err(MauError::BadChecksum);
    }
    if let Some(declared) = declared_len {
        let declared = declared.max(0) as usize;
        if declared > decompressed.len() {
            return Err(MauError::BadChecksum);
        }
        decompressed.truncate(declared);
    }
    Ok(decompressed)
}

impl MausReader {
    /// Parse the fixed framing (magic/version/primary options/lengths/mac,
    /// and — if encrypted — salt/IV). Decryption, if needed, is deferred.
    pub fn parse(r: &mut impl Read) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(MauError::invalid_data("bad Maus magic"));
        }
        let version = wire::read_u16(r)?;
        if version < MIN_VERSION || version > MAX_VERSION {
            return Err(MauError::UnsupportedVersion { found: version, min: MIN_VERSION, max: MAX_VERSION });
        }

        let primary = FormatCollection::parse(r)?;
        primary.validate()?;

        let comp_len = wire::read_i64(r)?;
        if comp_len < 0 {
            return Err(MauError::invalid_data("compLen may not be negative"));
        }
        let len_or_kdf = wire::read_i64(r)?;

        let hash = primary.hash_algorithm()?.unwrap_or(HashAlgorithm::Sha256);
        let mac = wire::read_exact_vec(r, hash.output_len())?;

        let cipher_spec = primary.cipher()?;
        if let Some((cipher, bits)) = cipher_spec {
            let max_stored = (pipeline::MAX_ITERATIONS - pipeline::MIN_ITERATIONS) as i64;
            if len_or_kdf < 0 || len_or_kdf > max_stored {
                return Err(MauError::invalid_data("PBKDF2 count field out of range"));
            }
            let iterations = pipeline::MIN_ITERATIONS + len_or_kdf as u32;
            let key_len = cipher
                .key_len(bits)
                .ok_or_else(|| MauError::UnsupportedKeySize { algorithm: cipher.wire_name().to_string(), bits })?;
            let block_len = cipher
                .block_len(bits)
                .ok_or_else(|| MauError::UnsupportedKeySize { algorithm: cipher.wire_name().to_string(), bits })?;
            let salt = wire::read_exact_vec(r, key_len)?;
            let iv = wire::read_exact_vec(r, block_len)?;
            let ciphertext = wire::read_exact_vec(r, comp_len as usize)?;

            Ok(Self {
                version,
                primary,
                hash,
                mac,
                unencrypted_declared_len: None,
                encrypted: Some(EncryptedFraming { cipher, bits, iterations, salt, iv }),
                body: ciphertext,
                secondary: None,
                payload: None,
                state: ReadState::KeyNeeded,
            })
        } else {
            if len_or_kdf < 1 {
                return Err(MauError::invalid_data("decompressedLen must be >= 1 when unencrypted"));
            }
            let compressed = wire::read_exact_vec(r, comp_len as usize)?;
            let payload = decompress_and_verify(hash, &primary, &compressed, &mac, Some(len_or_kdf))?;

            Ok(Self {
                version,
                primary,
                hash,
                mac,
                unencrypted_declared_len: Some(len_or_kdf),
                encrypted: None,
                body: compressed,
                secondary: None,
                payload: Some(payload),
                state: ReadState::Decrypted,
            })
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.is_some()
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    pub fn primary_options(&self) -> &FormatCollection {
        &self.primary
    }

    pub fn secondary_options(&self) -> Option<&FormatCollection> {
        self.secondary.as_ref()
    }

    /// The `mac` field exactly as it appears on the wire: the plaintext
    /// checksum for an unencrypted stream, the HMAC for an encrypted one —
    /// also the canonical pre-image a signature is computed over.
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// Best-effort filename: secondary options (once decrypted) take
    /// precedence, falling back to primary (the only place it can live for
    /// an unencrypted stream).
    pub fn name(&self) -> Result<Option<String>> {
        if let Some(secondary) = &self.secondary {
            if let Some(name) = secondary.name()? {
                return Ok(Some(name));
            }
        }
        self.primary.name()
    }

    pub fn payload(&self) -> Result<&[u8]> {
        self.payload
            .as_deref()
            .ok_or_else(|| MauError::invalid_state("payload unavailable before decrypt()"))
    }

    fn finish_decryption(&mut self, plaintext: Vec<u8>) -> Result<()> {
        let mut cur = Cursor::new(plaintext);
        let secondary = FormatCollection::parse(&mut cur)?;
        secondary.validate()?;
        let checksum = wire::read_exact_vec(&mut cur, self.hash.output_len())?;
        let pos = cur.position() as usize;
        let compressed = cur.into_inner().split_off(pos);

        let declared = secondary.decompressed_len()?;
        let payload = decompress_and_verify(self.hash, &self.primary, &compressed, &checksum, declared)?;

        self.secondary = Some(secondary);
        self.payload = Some(payload);
        self.state = ReadState::Decrypted;
        Ok(())
    }

    /// Attempt decryption with a password. On `BadPassword` the reader stays
    /// in `KeyNeeded` so the caller may retry with a different password.
    pub fn decrypt(&mut self, password: &[u8]) -> Result<()> {
        if self.state != ReadState::KeyNeeded {
            return Err(MauError::invalid_state("decrypt() called outside KeyNeeded"));
        }
        let enc = self.encrypted.as_ref().expect("KeyNeeded implies encrypted framing");
        let block_cipher = reference::block_cipher(enc.cipher, enc.bits)?;
        let pipe = CryptoPipeline::new(block_cipher);
        let plaintext =
            match pipe.decrypt(password, enc.iterations, self.hash, &enc.salt, &enc.iv, &self.mac, &self.body) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, "Maus container decryption failed");
                    return Err(e);
                }
            };
        self.finish_decryption(plaintext)
    }

    /// Attempt decryption by unwrapping the envelope key via an `RSAsch`
    /// entry and an RSA private key, instead of a password.
    pub fn decrypt_with_rsa(&mut self, private: &RsaPrivateKey) -> Result<()> {
        if self.state != ReadState::KeyNeeded {
            return Err(MauError::invalid_state("decrypt_with_rsa() called outside KeyNeeded"));
        }
        let enc = self.encrypted.as_ref().expect("KeyNeeded implies encrypted framing");
        let wrapped = self
            .primary
            .rsa_wrapped_key()
            .ok_or_else(|| MauError::invalid_data("no RSAsch option present on this stream"))?
            .to_vec();
        let key = signature::rsa_unwrap_key(private, self.hash, &wrapped)?;
        let block_cipher = reference::block_cipher(enc.cipher, enc.bits)?;
        let pipe = CryptoPipeline::new(block_cipher);
        let plaintext = pipe.decrypt_with_key(&key, self.hash, &enc.iv, &self.mac, &self.body)?;
        self.finish_decryption(plaintext)
    }

    /// Verify a `*sig` option against `key`, or report `NoSignature` if none
    /// is present.
    pub fn verify_signature(&self, key: &VerifyingKey) -> Result<VerifyOutcome> {
        let entry = self
            .primary
            .get(&FormatKey::RsaSig)
            .or_else(|| self.primary.get(&FormatKey::DsaSig))
            .or_else(|| self.primary.get(&FormatKey::EcdsaSig));
        let entry = match entry {
            Some(e) => e,
            None => return Ok(VerifyOutcome::NoSignature),
        };
        let digest = reference::hash_function(self.hash).digest(&self.mac);
        let outcome = signature::verify(key, self.hash, &digest, &entry.parameters[0])?;
        if outcome != VerifyOutcome::Verified {
            tracing::warn!(?outcome, "Maus container signature did not verify");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Compression;

    #[test]
    fn plain_deflate_round_trip_matches_scenario() {
        let sealed = MausWriter::new()
            .with_compression(Compression::Deflate)
            .with_name("hello.txt")
            .with_created_ticks(630_822_816_000_000_000)
            .with_modified_ticks(630_822_816_000_000_000)
            .seal(b"Hello, world!")
            .unwrap();

        assert_eq!(
            hex::encode(&sealed.mac),
            "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );

        let mut cur = Cursor::new(sealed.bytes);
        let reader = MausReader::parse(&mut cur).unwrap();
        assert!(!reader.is_encrypted());
        assert_eq!(reader.payload().unwrap(), b"Hello, world!");
        assert_eq!(reader.name().unwrap().as_deref(), Some("hello.txt"));
        assert_eq!(reader.mac(), sealed.mac.as_slice());
    }

    #[test]
    fn aes256_password_round_trip_matches_scenario() {
        let sealed = MausWriter::new()
            .with_hash(HashAlgorithm::Sha256)
            .with_name("secret.bin")
            .with_password_encryption(CipherAlgorithm::Aes, 256, b"pw".to_vec(), 9001)
            .seal(&[1, 2, 3, 4])
            .unwrap();

        assert_eq!(sealed.mac.len(), 32);

        let mut cur = Cursor::new(sealed.bytes);
        let mut reader = MausReader::parse(&mut cur).unwrap();
        assert!(reader.is_encrypted());
        assert_eq!(reader.state(), ReadState::KeyNeeded);

        let err = reader.decrypt(b"px").unwrap_err();
        assert!(matches!(err, MauError::BadPassword));
        assert_eq!(reader.state(), ReadState::KeyNeeded);

        reader.decrypt(b"pw").unwrap();
        assert_eq!(reader.state(), ReadState::Decrypted);
        assert_eq!(reader.payload().unwrap(), &[1, 2, 3, 4]);
        assert_eq!(reader.name().unwrap().as_deref(), Some("secret.bin"));
    }

    #[test]
    fn rsa_escrow_unlocks_without_password() {
        let mut rng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let sealed = MausWriter::new()
            .with_password_encryption(CipherAlgorithm::Aes, 256, b"correct horse".to_vec(), 9001)
            .with_rsa_escrow(public, HashAlgorithm::Sha256)
            .seal(b"escrowed payload")
            .unwrap();

        let mut cur = Cursor::new(sealed.bytes);
        let mut reader = MausReader::parse(&mut cur).unwrap();
        reader.decrypt_with_rsa(&private).unwrap();
        assert_eq!(reader.payload().unwrap(), b"escrowed payload");
    }

    #[test]
    fn signed_stream_verifies() {
        let mut rng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let sealed = MausWriter::new()
            .with_signature(FormatKey::RsaSig, SigningKey::Rsa(Box::new(private)), None)
            .seal(b"signed payload")
            .unwrap();

        let mut cur = Cursor::new(sealed.bytes);
        let reader = MausReader::parse(&mut cur).unwrap();
        let outcome = reader.verify_signature(&VerifyingKey::Rsa(Box::new(public))).unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);
    }

    #[test]
    fn contradictory_options_are_rejected_before_payload_is_touched() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        wire::write_u16(&mut buf, MIN_VERSION).unwrap();

        let mut primary = FormatCollection::new();
        primary.push(FormatEntry::deflate());
        primary.push(FormatEntry::no_compression());
        // validate() would already reject this; bypass it to model a
        // maliciously crafted primary the way scenario 6 describes.
        let mut primary_bytes = Vec::new();
        wire::write_u16(&mut primary_bytes, 2).unwrap();
        for entry in primary.entries() {
            wire::write_len8_bytes(&mut primary_bytes, entry.key.wire_str().as_bytes()).unwrap();
            wire::write_u16(&mut primary_bytes, entry.version).unwrap();
            wire::write_u16(&mut primary_bytes, 0).unwrap();
        }
        buf.extend_from_slice(&primary_bytes);

        let mut cur = Cursor::new(buf);
        let err = MausReader::parse(&mut cur).unwrap_err();
        assert!(matches!(err, MauError::ContradictoryOptions(_)));
    }

    #[test]
    fn shorter_declared_length_truncates_excess() {
        let codec = reference::Deflate;
        let compressed = codec.encode(b"Hello, world!").unwrap();
        let checksum = reference::hash_function(HashAlgorithm::Sha256).digest(b"Hello, world!");
        let primary = {
            let mut c = FormatCollection::new();
            c.push(FormatEntry::deflate());
            c
        };
        let result =
            decompress_and_verify(HashAlgorithm::Sha256, &primary, &compressed, &checksum, Some(5)).unwrap();
        assert_eq!(result, b"Hello");
    }

    #[test]
    fn longer_declared_length_is_bad_checksum() {
        let codec = reference::Deflate;
        let compressed = codec.encode(b"Hello, world!").unwrap();
        let checksum = reference::hash_function(HashAlgorithm::Sha256).digest(b"Hello, world!");
        let primary = {
            let mut c = FormatCollection::new();
            c.push(FormatEntry::deflate());
            c
        };
        let err =
            decompress_and_verify(HashAlgorithm::Sha256, &primary, &compressed, &checksum, Some(999)).unwrap_err();
        assert!(matches!(err, MauError::BadChecksum));
    }
}
