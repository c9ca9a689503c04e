// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! The encrypt/decrypt pipeline itself: PBKDF2 key derivation, CBC over a
//! pluggable block cipher, PKCS7 padding, and HMAC authentication.
//!
//! `decrypt` resolves "verify HMAC" and "unpad" into one concrete ordering:
//! the ciphertext is CBC-decrypted in full, padding is validated first (an invalid pad value
//! or non-uniform padding bytes is treated as a password failure without
//! ever computing the HMAC), and only once the padding is valid is the HMAC
//! computed over the unpadded bytes and compared in constant time. A tag
//! mismatch at that point is reported identically to a padding failure, so
//! neither timing nor the error type leaks which check actually failed.

use hmac::{Hmac, Mac};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{MauError, Result};
use crate::primitives::reference;
use crate::primitives::{BlockCipher, HashAlgorithm, PasswordKdf, SecureRandom};

/// Minimum PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 9001;
/// Maximum actual iteration count representable on the wire.
pub const MAX_ITERATIONS: u32 = 9001 + 2_147_474_646;

pub struct EncryptParams<'a> {
    pub password: &'a [u8],
    pub iterations: u32,
    pub hash: HashAlgorithm,
}

/// Bundles the pieces a caller needs to write into the Maus/MauZ framing
/// around an encrypted envelope.
pub struct EncryptedEnvelope {
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    pub mac: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// A configured password→key→CBC→HMAC pipeline bound to one cipher variant.
/// Hash selection is passed per-call since the same pipeline instance may
/// authenticate streams using different hash selectors across calls (it
/// holds no hash-specific state itself).
pub struct CryptoPipeline {
    cipher: Box<dyn BlockCipher>,
    kdf: Box<dyn PasswordKdf>,
    rng: Box<dyn SecureRandom>,
}

impl CryptoPipeline {
    pub fn new(cipher: Box<dyn BlockCipher>) -> Self {
        Self {
            cipher,
            kdf: Box::new(reference::Pbkdf2),
            rng: Box::new(reference::OsSecureRandom),
        }
    }

    pub fn with_primitives(
        cipher: Box<dyn BlockCipher>,
        kdf: Box<dyn PasswordKdf>,
        rng: Box<dyn SecureRandom>,
    ) -> Self {
        Self { cipher, kdf, rng }
    }

    pub fn block_len(&self) -> usize {
        self.cipher.block_len()
    }

    pub fn key_len(&self) -> usize {
        self.cipher.key_len()
    }

    pub fn validate_iterations(iterations: u32) -> Result<()> {
        if iterations < MIN_ITERATIONS {
            return Err(MauError::invalid_data(format!(
                "PBKDF2 iterations must be >= {MIN_ITERATIONS}, got {iterations}"
            )));
        }
        Ok(())
    }

    fn derive_key(&self, password: &[u8], salt: &[u8], iterations: u32, hash: HashAlgorithm) -> Vec<u8> {
        self.kdf.derive(hash, password, salt, iterations, self.key_len())
    }

    /// Encrypt `plaintext` (already compressed/assembled step 4,
    /// i.e. `secondary ‖ checksum ‖ compressed`) and authenticate it.
    pub fn encrypt(&self, params: &EncryptParams, plaintext: &[u8]) -> Result<EncryptedEnvelope> {
        let (mut key, envelope) = self.encrypt_with_escrow(params, plaintext)?;
        key.zeroize();
        Ok(envelope)
    }

    /// Same as [`Self::encrypt`] but also returns the derived key, for the
    /// `RSAsch` path where that same key is additionally wrapped for a
    /// recipient's RSA public key. The caller is
    /// responsible for zeroizing the returned key once it has been wrapped.
    pub fn encrypt_with_escrow(
        &self,
        params: &EncryptParams,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, EncryptedEnvelope)> {
        if params.password.is_empty() {
            return Err(MauError::invalid_data("password must be at least 1 byte"));
        }
        Self::validate_iterations(params.iterations)?;

        let mut salt = vec![0u8; self.key_len()];
        self.rng.fill(&mut salt);

        let key = self.derive_key(params.password, &salt, params.iterations, params.hash);
        let (iv, mac, ciphertext) = self.encrypt_with_key(&key, params.hash, plaintext)?;
        Ok((key, EncryptedEnvelope { salt, iv, mac, ciphertext }))
    }

    /// Decrypt and authenticate an envelope. Returns the unpadded plaintext
    /// (`secondary ‖ checksum ‖ compressed`) on success, or `BadPassword`
    /// for any padding or MAC failure.
    pub fn decrypt(
        &self,
        password: &[u8],
        iterations: u32,
        hash: HashAlgorithm,
        salt: &[u8],
        iv: &[u8],
        mac: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let key = self.derive_key(password, salt, iterations, hash);
        self.decrypt_with_key(&key, hash, iv, mac, ciphertext)
    }

    /// Encrypt directly under an already-final symmetric key rather than a
    /// password — the path used by `RSAsch`, where the key itself arrives
    /// wrapped for a recipient instead of being derived via PBKDF2.
    pub fn encrypt_with_key(
        &self,
        key: &[u8],
        hash: HashAlgorithm,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        let mut iv = vec![0u8; self.block_len()];
        self.rng.fill(&mut iv);

        let mac = compute_mac(hash, key, plaintext);
        let padded = pkcs7_pad(plaintext, self.block_len());
        let mut encryptor = self.cipher.new_encryptor(key, &iv)?;
        let ciphertext = encryptor.encrypt(padded)?;
        Ok((iv, mac, ciphertext))
    }

    pub fn decrypt_with_key(
        &self,
        key: &[u8],
        hash: HashAlgorithm,
        iv: &[u8],
        mac: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let mut decryptor = self.cipher.new_decryptor(key, iv)?;
        let padded = decryptor.decrypt(ciphertext.to_vec())?;

        let unpadded = match pkcs7_unpad(&padded, self.block_len()) {
            Some(bytes) => bytes,
            None => return Err(MauError::BadPassword),
        };

        let expected = compute_mac(hash, key, &unpadded);
        if !mac_eq(&expected, mac) {
            return Err(MauError::BadPassword);
        }
        Ok(unpadded)
    }

    pub fn random_key(&self) -> Vec<u8> {
        let mut key = vec![0u8; self.key_len()];
        self.rng.fill(&mut key);
        key
    }
}

/// PKCS7-pad `data` for `block_len`: one full block of padding is always
/// appended, even when `data.len()` is already a multiple of `block_len`.
pub fn pkcs7_pad(data: &[u8], block_len: usize) -> Vec<u8> {
    let pad_len = block_len - (data.len() % block_len);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    out
}

/// Validate and strip PKCS7 padding. Returns `None` for any shape that
/// isn't valid padding: empty input, length not a multiple of `block_len`,
/// a pad-length byte outside `1..=block_len`, or non-uniform padding bytes.
pub fn pkcs7_unpad(data: &[u8], block_len: usize) -> Option<Vec<u8>> {
    if data.is_empty() || data.len() % block_len != 0 {
        return None;
    }
    let pad_len = *data.last().unwrap() as usize;
    if pad_len == 0 || pad_len > block_len || pad_len > data.len() {
        return None;
    }
    let split_at = data.len() - pad_len;
    let (content, padding) = data.split_at(split_at);
    if padding.iter().any(|&b| b as usize != pad_len) {
        return None;
    }
    Some(content.to_vec())
}

fn compute_mac(hash: HashAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    macro_rules! run {
        ($digest_ty:ty) => {{
            let mut mac = Hmac::<$digest_ty>::new_from_slice(key)
                .expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }};
    }
    match hash {
        HashAlgorithm::Sha224 => run!(sha2::Sha224),
        HashAlgorithm::Sha256 => run!(sha2::Sha256),
        HashAlgorithm::Sha384 => run!(sha2::Sha384),
        HashAlgorithm::Sha512 => run!(sha2::Sha512),
        HashAlgorithm::Sha3_224 => run!(sha3::Sha3_224),
        HashAlgorithm::Sha3_256 => run!(sha3::Sha3_256),
        HashAlgorithm::Sha3_384 => run!(sha3::Sha3_384),
        HashAlgorithm::Sha3_512 => run!(sha3::Sha3_512),
        HashAlgorithm::Whirlpool => run!(whirlpool::Whirlpool),
    }
}

/// Constant-time tag comparison.
fn mac_eq(expected: &[u8], actual: &[u8]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    bool::from(expected.ct_eq(actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::CipherAlgorithm;

    fn aes256_pipeline() -> CryptoPipeline {
        CryptoPipeline::new(reference::block_cipher(CipherAlgorithm::Aes, 256).unwrap())
    }

    #[test]
    fn pkcs7_always_appends_full_block_when_aligned() {
        let data = vec![0u8; 32];
        let padded = pkcs7_pad(&data, 16);
        assert_eq!(padded.len(), 48);
        assert!(padded[32..].iter().all(|&b| b == 16));
    }

    #[test]
    fn pkcs7_round_trips() {
        for len in [0usize, 1, 15, 16, 17, 31, 32] {
            let data = vec![0x42u8; len];
            let padded = pkcs7_pad(&data, 16);
            assert_eq!(padded.len() % 16, 0);
            let unpadded = pkcs7_unpad(&padded, 16).unwrap();
            assert_eq!(unpadded, data);
        }
    }

    #[test]
    fn pkcs7_rejects_out_of_range_pad_byte() {
        let mut bogus = vec![0u8; 16];
        bogus[15] = 0; // pad length of 0 is invalid
        assert!(pkcs7_unpad(&bogus, 16).is_none());

        let mut bogus2 = vec![0u8; 16];
        bogus2[15] = 17; // exceeds block length
        assert!(pkcs7_unpad(&bogus2, 16).is_none());
    }

    #[test]
    fn pkcs7_rejects_non_uniform_padding() {
        let mut bogus = vec![0u8; 16];
        bogus[15] = 4;
        bogus[14] = 3; // should also be 4
        bogus[13] = 4;
        bogus[12] = 4;
        assert!(pkcs7_unpad(&bogus, 16).is_none());
    }

    #[test]
    fn round_trip_with_correct_password_succeeds() {
        let pipeline = aes256_pipeline();
        let params = EncryptParams {
            password: b"correct horse battery staple",
            iterations: MIN_ITERATIONS,
            hash: HashAlgorithm::Sha256,
        };
        let plaintext = b"some secondary options, a checksum, and compressed bytes".to_vec();
        let envelope = pipeline.encrypt(&params, &plaintext).unwrap();

        let round = pipeline
            .decrypt(
                params.password,
                params.iterations,
                params.hash,
                &envelope.salt,
                &envelope.iv,
                &envelope.mac,
                &envelope.ciphertext,
            )
            .unwrap();
        assert_eq!(round, plaintext);
    }

    #[test]
    fn wrong_password_yields_bad_password_not_bad_checksum() {
        let pipeline = aes256_pipeline();
        let params = EncryptParams {
            password: b"right password",
            iterations: MIN_ITERATIONS,
            hash: HashAlgorithm::Sha256,
        };
        let plaintext = b"payload bytes".to_vec();
        let envelope = pipeline.encrypt(&params, &plaintext).unwrap();

        let err = pipeline
            .decrypt(
                b"wrong password",
                params.iterations,
                params.hash,
                &envelope.salt,
                &envelope.iv,
                &envelope.mac,
                &envelope.ciphertext,
            )
            .unwrap_err();
        assert!(matches!(err, MauError::BadPassword));
    }

    #[test]
    fn tampered_ciphertext_yields_bad_password() {
        let pipeline = aes256_pipeline();
        let params = EncryptParams {
            password: b"a password",
            iterations: MIN_ITERATIONS,
            hash: HashAlgorithm::Sha256,
        };
        let plaintext = b"payload bytes to authenticate".to_vec();
        let mut envelope = pipeline.encrypt(&params, &plaintext).unwrap();
        let last = envelope.ciphertext.len() - 1;
        envelope.ciphertext[last] ^= 0xFF;

        let err = pipeline
            .decrypt(
                params.password,
                params.iterations,
                params.hash,
                &envelope.salt,
                &envelope.iv,
                &envelope.mac,
                &envelope.ciphertext,
            )
            .unwrap_err();
        assert!(matches!(err, MauError::BadPassword));
    }

    #[test]
    fn iterations_below_minimum_are_rejected() {
        assert!(CryptoPipeline::validate_iterations(9000).is_err());
        assert!(CryptoPipeline::validate_iterations(9001).is_ok());
    }
}
