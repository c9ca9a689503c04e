// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! # mauz-codec
//!
//! A pair of coupled binary container codecs: "Maus", a single-file
//! compressed/encrypted stream format, and "MauZ", a multi-entry archive
//! format layered on top of it. Together they provide compression,
//! authenticated encryption, optional digital signatures, and structured
//! metadata for file-like payloads.
//!
//! ## Quick Start
//!
//! ```rust
//! use mauz_codec::container::MausWriter;
//! use mauz_codec::options::Compression;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sealed = MausWriter::new()
//!     .with_compression(Compression::Deflate)
//!     .with_name("hello.txt")
//!     .seal(b"Hello, world!")?;
//!
//! let mut cur = std::io::Cursor::new(sealed.bytes);
//! let reader = mauz_codec::container::MausReader::parse(&mut cur)?;
//! assert_eq!(reader.payload()?, b"Hello, world!");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`container`] - the Maus single-file stream codec
//! - [`archive`] - the MauZ multi-entry archive built on top of it
//! - [`options`] - the typed `FormatCollection`/`FormatEntry` option system
//! - [`crypto::pipeline`] - PBKDF2 + CBC + HMAC encryption pipeline
//! - [`signature`] - RSA-PSS/DSA/ECDSA signing and verification, RSA-OAEP key wrap
//! - [`primitives`] - pluggable hash/cipher/compression/KDF/RNG capability traits
//! - [`path`] - filename and archive-path validation rules
//! - [`policy`] - severity classification for validation failures
//! - [`error`] - the crate's flat [`error::MauError`] enum
//! - [`wire`] - little-endian primitive and length-prefixed byte/string codecs

pub mod archive;
pub mod container;
pub mod crypto;
pub mod error;
pub mod options;
pub mod path;
pub mod policy;
pub mod primitives;
pub mod signature;
pub mod wire;

pub use archive::{MauZReader, MauZWriter};
pub use container::{MausReader, MausWriter, SealedMaus};
pub use error::{MauError, Result};
