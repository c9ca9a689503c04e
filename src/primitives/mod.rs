// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Layer boundary between the codecs and the primitive cryptography/
//! compression they consume.

pub mod reference;
pub mod traits;

pub use traits::{
    AsymmetricSigner, AsymmetricVerifier, BlockCipher, CbcDecryptor, CbcEncryptor,
    CipherAlgorithm, CompressionCodec, HashAlgorithm, HashFunction, Hasher, PasswordKdf,
    SecureRandom, VerifyOutcome,
};
