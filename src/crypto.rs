// src/crypto.rs
// Ed25519 helpers for originator headers and bets. Keys and signatures
// travel as raw bytes (hex on the wire); malformed input never verifies.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Verify a signature over `msg` using `pubkey` (32 bytes) and signature bytes.
pub fn verify_bytes(pubkey: &[u8], msg: &[u8], sig_bytes: &[u8]) -> bool {
    let Ok(pubkey_array) = <&[u8; 32]>::try_from(pubkey) else {
        return false;
    };
    let Ok(vk) = VerifyingKey::from_bytes(pubkey_array) else {
        return false;
    };
    let Ok(sig_array) = <&[u8; 64]>::try_from(sig_bytes) else {
        return false;
    };
    let sig = Signature::from_bytes(sig_array);
    vk.verify(msg, &sig).is_ok()
}

/// Sign `msg`, returning `(pubkey, signature)` bytes.
pub fn sign_bytes(key: &SigningKey, msg: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let sig: Signature = key.sign(msg);
    (
        key.verifying_key().to_bytes().to_vec(),
        sig.to_bytes().to_vec(),
    )
}

pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Rebuild a signing key from its 32-byte secret seed.
pub fn signing_key_from_seed(seed: &[u8]) -> Option<SigningKey> {
    <&[u8; 32]>::try_from(seed).ok().map(SigningKey::from_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = generate_signing_key();
        let (pubkey, sig) = sign_bytes(&key, b"payload");
        assert!(verify_bytes(&pubkey, b"payload", &sig));
        assert!(!verify_bytes(&pubkey, b"other", &sig));
        assert!(!verify_bytes(&pubkey[..31], b"payload", &sig));
        assert!(!verify_bytes(&pubkey, b"payload", &sig[..63]));
    }

    #[test]
    fn test_key_from_seed_is_stable() {
        let a = signing_key_from_seed(&[7u8; 32]).unwrap();
        let b = signing_key_from_seed(&[7u8; 32]).unwrap();
        assert_eq!(a.verifying_key(), b.verifying_key());
        assert!(signing_key_from_seed(&[7u8; 31]).is_none());
    }
}
