// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Capability interfaces the core consumes instead of implementing
//! primitive cryptography itself. Concrete implementations live in [`super::reference`]; callers
//! may supply their own by implementing these traits directly, the same way
//! `KeyBackend` implementations plug into a backend registry.

use crate::error::Result;

/// One of the hash functions the `Hash` option may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Whirlpool,
}

impl HashAlgorithm {
    pub fn wire_name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "SHA224",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
            HashAlgorithm::Sha3_224 => "SHA3-224",
            HashAlgorithm::Sha3_256 => "SHA3-256",
            HashAlgorithm::Sha3_384 => "SHA3-384",
            HashAlgorithm::Sha3_512 => "SHA3-512",
            HashAlgorithm::Whirlpool => "Whirlpool",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Some(match name {
            "SHA224" => HashAlgorithm::Sha224,
            "SHA256" => HashAlgorithm::Sha256,
            "SHA384" => HashAlgorithm::Sha384,
            "SHA512" => HashAlgorithm::Sha512,
            "SHA3-224" => HashAlgorithm::Sha3_224,
            "SHA3-256" => HashAlgorithm::Sha3_256,
            "SHA3-384" => HashAlgorithm::Sha3_384,
            "SHA3-512" => HashAlgorithm::Sha3_512,
            "Whirlpool" => HashAlgorithm::Whirlpool,
            _ => return None,
        })
    }

    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha224 | HashAlgorithm::Sha3_224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Sha384 | HashAlgorithm::Sha3_384 => 48,
            HashAlgorithm::Sha512 | HashAlgorithm::Sha3_512 | HashAlgorithm::Whirlpool => 64,
        }
    }
}

/// One of the block ciphers the `Ver` option may select, together with its
/// key size in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    Aes,
    Twofish,
    Threefish,
}

impl CipherAlgorithm {
    pub fn wire_name(self) -> &'static str {
        match self {
            CipherAlgorithm::Aes => "AES",
            CipherAlgorithm::Twofish => "Twofish",
            CipherAlgorithm::Threefish => "Threefish",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Some(match name {
            "AES" => CipherAlgorithm::Aes,
            "Twofish" => CipherAlgorithm::Twofish,
            "Threefish" => CipherAlgorithm::Threefish,
            _ => return None,
        })
    }

    /// Block length in bytes for a given key-size-in-bits variant. Returns
    /// `None` for a (algorithm, bits) pair that doesn't exist.
    pub fn block_len(self, bits: u16) -> Option<usize> {
        match self {
            CipherAlgorithm::Aes | CipherAlgorithm::Twofish => match bits {
                128 | 192 | 256 => Some(16),
                _ => None,
            },
            CipherAlgorithm::Threefish => match bits {
                256 => Some(32),
                512 => Some(64),
                1024 => Some(128),
                _ => None,
            },
        }
    }

    pub fn key_len(self, bits: u16) -> Option<usize> {
        self.block_len(bits).map(|_| (bits as usize) / 8)
    }
}

/// A hash-streaming session.
pub trait Hasher {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// Constructs [`Hasher`] sessions for one fixed algorithm.
pub trait HashFunction: Send + Sync {
    fn new_hasher(&self) -> Box<dyn Hasher>;
    fn algorithm(&self) -> HashAlgorithm;

    fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        let mut h = self.new_hasher();
        h.update(bytes);
        h.finalize()
    }
}

/// One direction of a CBC session over a fixed block cipher.
pub trait CbcEncryptor {
    /// Encrypts `plaintext` (which must already be a multiple of the block
    /// length) in place and returns it.
    fn encrypt(&mut self, plaintext: Vec<u8>) -> Result<Vec<u8>>;
}

pub trait CbcDecryptor {
    /// Decrypts `ciphertext` (which must be a multiple of the block length)
    /// in place and returns it. Padding is the caller's concern.
    fn decrypt(&mut self, ciphertext: Vec<u8>) -> Result<Vec<u8>>;
}

/// Constructs CBC sessions for one fixed block cipher/key-size variant.
pub trait BlockCipher: Send + Sync {
    fn algorithm(&self) -> CipherAlgorithm;
    fn key_bits(&self) -> u16;
    fn block_len(&self) -> usize;
    fn key_len(&self) -> usize;

    fn new_encryptor(&self, key: &[u8], iv: &[u8]) -> Result<Box<dyn CbcEncryptor>>;
    fn new_decryptor(&self, key: &[u8], iv: &[u8]) -> Result<Box<dyn CbcDecryptor>>;
}

/// `PBKDF2(selectedHash, password, salt, iterations, outLen)`.
pub trait PasswordKdf: Send + Sync {
    fn derive(
        &self,
        hash: HashAlgorithm,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        out_len: usize,
    ) -> Vec<u8>;
}

/// `encode`/`decode` byte-stream transforms for {Deflate, LZMA, Identity}.
pub trait CompressionCodec: Send + Sync {
    fn encode(&self, input: &[u8]) -> std::io::Result<Vec<u8>>;
    fn decode(&self, input: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Outcome of an `AsymmetricVerifier::verify` call. Verification never
/// raises for a normal wrong-key/wrong-signature outcome; only
/// malformed input does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Unverified,
    NoSignature,
    KeyMismatch,
}

pub trait AsymmetricSigner {
    fn sign(&self, hash: HashAlgorithm, digest: &[u8]) -> Result<Vec<u8>>;
}

pub trait AsymmetricVerifier {
    fn verify(&self, hash: HashAlgorithm, digest: &[u8], signature: &[u8]) -> VerifyOutcome;
}

/// A cryptographically secure random byte source, injected rather than
/// reached for globally so tests can substitute a deterministic one.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}
