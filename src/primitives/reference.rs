// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Default implementations of the capability traits in [`super::traits`],
//! wired to real RustCrypto-family crates. None of these are required by
//! the core: a caller may inject an entirely different [`BlockCipher`] or
//! [`HashFunction`], the way a `KeyBackend` consumer can swap a keyring
//! backend for a hardware one. These exist so the crate works end to end
//! without the caller wiring up primitives themselves.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use digest::Digest;

use super::traits::{
    BlockCipher, CbcDecryptor, CbcEncryptor, CipherAlgorithm, CompressionCodec, HashAlgorithm,
    HashFunction, Hasher, PasswordKdf, SecureRandom,
};
use crate::error::{MauError, Result};

struct DigestHasher<D>(D);

impl<D: Digest + Send + 'static> Hasher for DigestHasher<D> {
    fn update(&mut self, bytes: &[u8]) {
        Digest::update(&mut self.0, bytes);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

macro_rules! sha_family_hash {
    ($struct_name:ident, $digest_ty:ty, $algo:expr) => {
        pub struct $struct_name;

        impl HashFunction for $struct_name {
            fn new_hasher(&self) -> Box<dyn Hasher> {
                Box::new(DigestHasher(<$digest_ty>::new()))
            }

            fn algorithm(&self) -> HashAlgorithm {
                $algo
            }
        }
    };
}

sha_family_hash!(Sha224Hash, sha2::Sha224, HashAlgorithm::Sha224);
sha_family_hash!(Sha256Hash, sha2::Sha256, HashAlgorithm::Sha256);
sha_family_hash!(Sha384Hash, sha2::Sha384, HashAlgorithm::Sha384);
sha_family_hash!(Sha512Hash, sha2::Sha512, HashAlgorithm::Sha512);
sha_family_hash!(Sha3_224Hash, sha3::Sha3_224, HashAlgorithm::Sha3_224);
sha_family_hash!(Sha3_256Hash, sha3::Sha3_256, HashAlgorithm::Sha3_256);
sha_family_hash!(Sha3_384Hash, sha3::Sha3_384, HashAlgorithm::Sha3_384);
sha_family_hash!(Sha3_512Hash, sha3::Sha3_512, HashAlgorithm::Sha3_512);
sha_family_hash!(WhirlpoolHash, whirlpool::Whirlpool, HashAlgorithm::Whirlpool);

/// Resolve a [`HashAlgorithm`] selector to its reference implementation.
pub fn hash_function(algo: HashAlgorithm) -> Box<dyn HashFunction> {
    match algo {
        HashAlgorithm::Sha224 => Box::new(Sha224Hash),
        HashAlgorithm::Sha256 => Box::new(Sha256Hash),
        HashAlgorithm::Sha384 => Box::new(Sha384Hash),
        HashAlgorithm::Sha512 => Box::new(Sha512Hash),
        HashAlgorithm::Sha3_224 => Box::new(Sha3_224Hash),
        HashAlgorithm::Sha3_256 => Box::new(Sha3_256Hash),
        HashAlgorithm::Sha3_384 => Box::new(Sha3_384Hash),
        HashAlgorithm::Sha3_512 => Box::new(Sha3_512Hash),
        HashAlgorithm::Whirlpool => Box::new(WhirlpoolHash),
    }
}

/// A CBC session bound to one concrete RustCrypto block-cipher type.
///
/// Only whole blocks pass through here; PKCS7 padding is applied by
/// [`crate::crypto::pipeline`] before encryption and validated after
/// decryption, since the wire format's "invalid padding == `BadPassword`"
/// rule needs to fold into the HMAC check rather than raise its own error.
struct GenericEncryptor<E>(E);
struct GenericDecryptor<D>(D);

macro_rules! cbc_cipher {
    ($struct_name:ident, $inner:ty, $algo:expr, $bits:expr, $block_len:expr, $key_len:expr) => {
        pub struct $struct_name;

        impl BlockCipher for $struct_name {
            fn algorithm(&self) -> CipherAlgorithm {
                $algo
            }

            fn key_bits(&self) -> u16 {
                $bits
            }

            fn block_len(&self) -> usize {
                $block_len
            }

            fn key_len(&self) -> usize {
                $key_len
            }

            fn new_encryptor(&self, key: &[u8], iv: &[u8]) -> Result<Box<dyn CbcEncryptor>> {
                let enc = cbc::Encryptor::<$inner>::new_from_slices(key, iv)
                    .map_err(|_| MauError::invalid_data("bad key/iv length for cipher"))?;
                Ok(Box::new(GenericEncryptor(enc)))
            }

            fn new_decryptor(&self, key: &[u8], iv: &[u8]) -> Result<Box<dyn CbcDecryptor>> {
                let dec = cbc::Decryptor::<$inner>::new_from_slices(key, iv)
                    .map_err(|_| MauError::invalid_data("bad key/iv length for cipher"))?;
                Ok(Box::new(GenericDecryptor(dec)))
            }
        }

        impl CbcEncryptor for GenericEncryptor<cbc::Encryptor<$inner>> {
            fn encrypt(&mut self, plaintext: Vec<u8>) -> Result<Vec<u8>> {
                self.0
                    .clone()
                    .encrypt_padded_vec_mut::<NoPadding>(&plaintext)
                    .map_err(|_| MauError::invalid_data("plaintext not block-aligned"))
            }
        }

        impl CbcDecryptor for GenericDecryptor<cbc::Decryptor<$inner>> {
            fn decrypt(&mut self, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
                self.0
                    .clone()
                    .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
                    .map_err(|_| MauError::invalid_data("ciphertext not block-aligned"))
            }
        }
    };
}

cbc_cipher!(Aes128Cbc, aes::Aes128, CipherAlgorithm::Aes, 128, 16, 16);
cbc_cipher!(Aes192Cbc, aes::Aes192, CipherAlgorithm::Aes, 192, 16, 24);
cbc_cipher!(Aes256Cbc, aes::Aes256, CipherAlgorithm::Aes, 256, 16, 32);
cbc_cipher!(
    Twofish128Cbc,
    twofish::Twofish128,
    CipherAlgorithm::Twofish,
    128,
    16,
    16
);
cbc_cipher!(
    Twofish192Cbc,
    twofish::Twofish192,
    CipherAlgorithm::Twofish,
    192,
    16,
    24
);
cbc_cipher!(
    Twofish256Cbc,
    twofish::Twofish256,
    CipherAlgorithm::Twofish,
    256,
    16,
    32
);
cbc_cipher!(
    Threefish256Cbc,
    threefish::Threefish256,
    CipherAlgorithm::Threefish,
    256,
    32,
    32
);
cbc_cipher!(
    Threefish512Cbc,
    threefish::Threefish512,
    CipherAlgorithm::Threefish,
    512,
    64,
    64
);
cbc_cipher!(
    Threefish1024Cbc,
    threefish::Threefish1024,
    CipherAlgorithm::Threefish,
    1024,
    128,
    128
);

/// Resolve a (algorithm, key-bits) pair to its reference [`BlockCipher`].
pub fn block_cipher(algo: CipherAlgorithm, bits: u16) -> Result<Box<dyn BlockCipher>> {
    use CipherAlgorithm::*;
    Ok(match (algo, bits) {
        (Aes, 128) => Box::new(Aes128Cbc),
        (Aes, 192) => Box::new(Aes192Cbc),
        (Aes, 256) => Box::new(Aes256Cbc),
        (Twofish, 128) => Box::new(Twofish128Cbc),
        (Twofish, 192) => Box::new(Twofish192Cbc),
        (Twofish, 256) => Box::new(Twofish256Cbc),
        (Threefish, 256) => Box::new(Threefish256Cbc),
        (Threefish, 512) => Box::new(Threefish512Cbc),
        (Threefish, 1024) => Box::new(Threefish1024Cbc),
        (algo, bits) => {
            return Err(MauError::UnsupportedKeySize {
                algorithm: algo.wire_name().to_string(),
                bits,
            })
        }
    })
}

/// PBKDF2 over the selected hash, via `pbkdf2::pbkdf2_hmac`.
pub struct Pbkdf2;

impl PasswordKdf for Pbkdf2 {
    fn derive(
        &self,
        hash: HashAlgorithm,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        out_len: usize,
    ) -> Vec<u8> {
        let mut out = vec![0u8; out_len];
        macro_rules! run {
            ($hash_ty:ty) => {
                pbkdf2::pbkdf2_hmac::<$hash_ty>(password, salt, iterations, &mut out)
            };
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
        out
    }
}

/// No-op codec for the `NK` option.
pub struct Identity;

impl CompressionCodec for Identity {
    fn encode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

/// DEFLATE via `flate2` (the `DEF` option).
pub struct Deflate;

impl CompressionCodec for Deflate {
    fn encode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        use flate2::write::DeflateEncoder;
        use flate2::Compression;
        use std::io::Write;
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(input)?;
        enc.finish()
    }

    fn decode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        use flate2::write::DeflateDecoder;
        use std::io::Write;
        let mut dec = DeflateDecoder::new(Vec::new());
        dec.write_all(input)?;
        dec.finish()
    }
}

/// LZMA via `lzma-rs` (the `LZMA` option, dictionary capped at 64 MiB by the
/// caller before this is reached).
pub struct Lzma;

impl CompressionCodec for Lzma {
    fn encode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        lzma_rs::lzma_compress(&mut std::io::Cursor::new(input), &mut out)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(out)
    }

    fn decode(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        lzma_rs::lzma_decompress(&mut std::io::Cursor::new(input), &mut out)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(out)
    }
}

/// `rand::rngs::OsRng` as the injected [`SecureRandom`].
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill(&self, buf: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_digest() {
        let h = hash_function(HashAlgorithm::Sha256);
        let digest = h.digest(b"Hello, world!");
        assert_eq!(digest.len(), 32);
        // SHA-256("Hello, world!")
        assert_eq!(
            hex::encode(digest),
            "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );
    }

    #[test]
    fn pbkdf2_output_length_matches_request() {
        let kdf = Pbkdf2;
        let derived = kdf.derive(HashAlgorithm::Sha256, b"pw", b"salt", 9001, 32);
        assert_eq!(derived.len(), 32);
    }

    #[test]
    fn aes256_cbc_round_trips_full_blocks() {
        let cipher = block_cipher(CipherAlgorithm::Aes, 256).unwrap();
        let key = vec![0x11u8; 32];
        let iv = vec![0x22u8; 16];
        let plaintext = vec![0x33u8; 32]; // two full blocks
        let mut enc = cipher.new_encryptor(&key, &iv).unwrap();
        let ciphertext = enc.encrypt(plaintext.clone()).unwrap();
        assert_eq!(ciphertext.len(), 32);
        let mut dec = cipher.new_decryptor(&key, &iv).unwrap();
        let round = dec.decrypt(ciphertext).unwrap();
        assert_eq!(round, plaintext);
    }

    #[test]
    fn unknown_key_size_is_rejected() {
        let err = block_cipher(CipherAlgorithm::Aes, 64).unwrap_err();
        assert!(matches!(err, MauError::UnsupportedKeySize { .. }));
    }

    #[test]
    fn deflate_round_trips() {
        let codec = Deflate;
        let input = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = codec.encode(&input).unwrap();
        let round = codec.decode(&compressed).unwrap();
        assert_eq!(round, input);
    }

    #[test]
    fn lzma_round_trips() {
        let codec = Lzma;
        let input = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = codec.encode(&input).unwrap();
        let round = codec.decode(&compressed).unwrap();
        assert_eq!(round, input);
    }

    #[test]
    fn identity_passes_bytes_through() {
        let codec = Identity;
        let input = b"Hello, world!".to_vec();
        assert_eq!(codec.decode(&codec.encode(&input).unwrap()).unwrap(), input);
    }
}
