// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! SignatureAdapter: abstracts RSA/DSA/ECDSA signing and verification
//! over an already-computed hash digest, and encodes/parses the in-format
//! signature payload (the `RSAsig`/`DSAsig`/`ECDSAsig` option parameters).
//!
//! RSA is also used for `RSAsch`, the RSA-wrapped symmetric key used to
//! hand a container's derived key to a recipient without a shared password;
//! that encryption-only use keeps OAEP. Signing uses RSA-PSS instead — see
//! the note on [`sign`] for why.

use dsa::SigningKey as DsaSigningKey;
use dsa::VerifyingKey as DsaVerifyingKey;
use p256::ecdsa::{SigningKey as EcdsaSigningKey, VerifyingKey as EcdsaVerifyingKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::error::{MauError, Result};
use crate::primitives::{HashAlgorithm, VerifyOutcome};

/// Which asymmetric scheme produced/consumes a signature blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Rsa,
    Dsa,
    Ecdsa,
}

/// A key capable of producing one of the three signature schemes.
pub enum SigningKey {
    Rsa(Box<RsaPrivateKey>),
    Dsa(Box<DsaSigningKey>),
    Ecdsa(Box<EcdsaSigningKey>),
}

/// A key capable of verifying one of the three signature schemes.
pub enum VerifyingKey {
    Rsa(Box<RsaPublicKey>),
    Dsa(Box<DsaVerifyingKey>),
    Ecdsa(Box<EcdsaVerifyingKey>),
}

fn require_sha2(hash: HashAlgorithm) -> Result<()> {
    match hash {
        HashAlgorithm::Sha224
        | HashAlgorithm::Sha256
        | HashAlgorithm::Sha384
        | HashAlgorithm::Sha512 => Ok(()),
        other => Err(MauError::invalid_data(format!(
            "{:?} is not supported as a signature digest; use a SHA-2 variant",
            other
        ))),
    }
}

/// Sign `digest` (the hash already computed over the canonical pre-image —
/// the HMAC for encrypted streams, the plaintext checksum otherwise) with
/// `key`.
///
/// RSA signatures use RSA-PSS rather than OAEP: OAEP has no verification
/// half and cannot serve as a signature scheme, so it is reserved for the
/// encryption-only `RSAsch` key-wrapping use. PSS is the padding scheme
/// actually meant for signing, so `verify` below can check what `sign`
/// produced.
pub fn sign(key: &SigningKey, hash: HashAlgorithm, digest: &[u8]) -> Result<Vec<u8>> {
    require_sha2(hash)?;
    match key {
        SigningKey::Rsa(private) => sign_rsa_pss(private, hash, digest),
        SigningKey::Dsa(signing) => signing
            .sign_prehash(digest)
            .map(|sig: dsa::Signature| sig.to_der().to_vec())
            .map_err(|e| MauError::invalid_data(format!("DSA signing failed: {e}"))),
        SigningKey::Ecdsa(signing) => {
            let sig: p256::ecdsa::Signature = signing
                .sign_prehash(digest)
                .map_err(|e| MauError::invalid_data(format!("ECDSA signing failed: {e}")))?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
    }
}

fn sign_rsa_pss(private: &RsaPrivateKey, hash: HashAlgorithm, digest: &[u8]) -> Result<Vec<u8>> {
    macro_rules! pss_sign {
        ($digest_ty:ty) => {{
            let signing_key = rsa::pss::SigningKey::<$digest_ty>::new(private.clone());
            signing_key
                .sign_prehash(digest)
                .map(|sig: rsa::pss::Signature| sig.to_vec())
                .map_err(|e| MauError::invalid_data(format!("RSA-PSS signing failed: {e}")))
        }};
    }
    match hash {
        HashAlgorithm::Sha224 => pss_sign!(sha2::Sha224),
        HashAlgorithm::Sha256 => pss_sign!(sha2::Sha256),
        HashAlgorithm::Sha384 => pss_sign!(sha2::Sha384),
        HashAlgorithm::Sha512 => pss_sign!(sha2::Sha512),
        _ => unreachable!("require_sha2 already rejected this"),
    }
}

/// Verify `signature_blob` over `digest`. Never raises for a normal
/// wrong-key/forged-signature outcome — malformed input (wrong digest
/// algorithm requested) is the only error path.
pub fn verify(
    key: &VerifyingKey,
    hash: HashAlgorithm,
    digest: &[u8],
    signature_blob: &[u8],
) -> Result<VerifyOutcome> {
    require_sha2(hash)?;
    let verified = match key {
        VerifyingKey::Rsa(public) => verify_rsa_pss(public, hash, digest, signature_blob),
        VerifyingKey::Dsa(verifying) => dsa::Signature::from_der(signature_blob)
            .ok()
            .map(|sig| verifying.verify_prehash(digest, &sig).is_ok())
            .unwrap_or(false),
        VerifyingKey::Ecdsa(verifying) => p256::ecdsa::Signature::from_der(signature_blob)
            .ok()
            .map(|sig| verifying.verify_prehash(digest, &sig).is_ok())
            .unwrap_or(false),
    };
    Ok(if verified {
        VerifyOutcome::Verified
    } else {
        VerifyOutcome::Unverified
    })
}

fn verify_rsa_pss(public: &RsaPublicKey, hash: HashAlgorithm, digest: &[u8], sig: &[u8]) -> bool {
    macro_rules! pss_verify {
        ($digest_ty:ty) => {{
            let verifying_key = rsa::pss::VerifyingKey::<$digest_ty>::new(public.clone());
            rsa::pss::Signature::try_from(sig)
                .ok()
                .map(|sig| verifying_key.verify_prehash(digest, &sig).is_ok())
                .unwrap_or(false)
        }};
    }
    match hash {
        HashAlgorithm::Sha224 => pss_verify!(sha2::Sha224),
        HashAlgorithm::Sha256 => pss_verify!(sha2::Sha256),
        HashAlgorithm::Sha384 => pss_verify!(sha2::Sha384),
        HashAlgorithm::Sha512 => pss_verify!(sha2::Sha512),
        _ => false,
    }
}

/// `RSAsch` key wrap: encrypt a symmetric key for a recipient's RSA public
/// key with OAEP, the encryption-only padding scheme suited to key wrapping
/// rather than signing.
pub fn rsa_wrap_key(
    public: &RsaPublicKey,
    hash: HashAlgorithm,
    symmetric_key: &[u8],
) -> Result<Vec<u8>> {
    require_sha2(hash)?;
    let mut rng = rand::rngs::OsRng;
    macro_rules! wrap {
        ($digest_ty:ty) => {
            public
                .encrypt(&mut rng, Oaep::new::<$digest_ty>(), symmetric_key)
                .map_err(|e| MauError::invalid_data(format!("RSA-OAEP wrap failed: {e}")))
        };
    }
    match hash {
        HashAlgorithm::Sha224 => wrap!(sha2::Sha224),
        HashAlgorithm::Sha256 => wrap!(sha2::Sha256),
        HashAlgorithm::Sha384 => wrap!(sha2::Sha384),
        HashAlgorithm::Sha512 => wrap!(sha2::Sha512),
        _ => unreachable!("require_sha2 already rejected this"),
    }
}

pub fn rsa_unwrap_key(
    private: &RsaPrivateKey,
    hash: HashAlgorithm,
    wrapped: &[u8],
) -> Result<Vec<u8>> {
    require_sha2(hash)?;
    macro_rules! unwrap {
        ($digest_ty:ty) => {
            private
                .decrypt(Oaep::new::<$digest_ty>(), wrapped)
                .map_err(|_| MauError::BadPassword)
        };
    }
    match hash {
        HashAlgorithm::Sha224 => unwrap!(sha2::Sha224),
        HashAlgorithm::Sha256 => unwrap!(sha2::Sha256),
        HashAlgorithm::Sha384 => unwrap!(sha2::Sha384),
        HashAlgorithm::Sha512 => unwrap!(sha2::Sha512),
        _ => unreachable!("require_sha2 already rejected this"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn rsa_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    #[test]
    fn rsa_pss_round_trip_verifies() {
        let (private, public) = rsa_keypair();
        let digest = crate::primitives::reference::hash_function(HashAlgorithm::Sha256)
            .digest(b"canonical pre-image");
        let sig = sign(&SigningKey::Rsa(Box::new(private)), HashAlgorithm::Sha256, &digest).unwrap();
        let outcome = verify(
            &VerifyingKey::Rsa(Box::new(public)),
            HashAlgorithm::Sha256,
            &digest,
            &sig,
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);
    }

    #[test]
    fn rsa_pss_wrong_digest_is_unverified_not_an_error() {
        let (private, public) = rsa_keypair();
        let digest = vec![0xAAu8; 32];
        let other_digest = vec![0xBBu8; 32];
        let sig = sign(&SigningKey::Rsa(Box::new(private)), HashAlgorithm::Sha256, &digest).unwrap();
        let outcome = verify(
            &VerifyingKey::Rsa(Box::new(public)),
            HashAlgorithm::Sha256,
            &other_digest,
            &sig,
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::Unverified);
    }

    #[test]
    fn ecdsa_round_trip_verifies() {
        let signing = EcdsaSigningKey::random(&mut OsRng);
        let verifying = EcdsaVerifyingKey::from(&signing);
        let digest = vec![0x11u8; 32];
        let sig = sign(&SigningKey::Ecdsa(Box::new(signing)), HashAlgorithm::Sha256, &digest).unwrap();
        let outcome = verify(
            &VerifyingKey::Ecdsa(Box::new(verifying)),
            HashAlgorithm::Sha256,
            &digest,
            &sig,
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);
    }

    #[test]
    fn rsa_oaep_wrap_round_trips() {
        let (private, public) = rsa_keypair();
        let symmetric_key = vec![0x55u8; 32];
        let wrapped = rsa_wrap_key(&public, HashAlgorithm::Sha256, &symmetric_key).unwrap();
        let unwrapped = rsa_unwrap_key(&private, HashAlgorithm::Sha256, &wrapped).unwrap();
        assert_eq!(unwrapped, symmetric_key);
    }

    #[test]
    fn non_sha2_digest_is_rejected_for_signing() {
        let (private, _public) = rsa_keypair();
        let err = sign(&SigningKey::Rsa(Box::new(private)), HashAlgorithm::Whirlpool, &[0u8; 64])
            .unwrap_err();
        assert!(matches!(err, MauError::InvalidData(_)));
    }
}
