// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! CryptoPipeline: password-based key derivation, CBC encryption,
//! PKCS7 padding, and HMAC authentication, composed into the single
//! encrypt/decrypt pipeline the Maus envelope uses.

pub mod pipeline;

pub use pipeline::{CryptoPipeline, EncryptParams};
