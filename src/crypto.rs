//! Symmetric primitives used by the envelope codec: AES-CBC (V2) and
//! AES-GCM (V3), plus secure IV generation.
//!
//! CBC-with-PKCS7 and GCM are composed directly from the `aes`/`cbc`/
//! `cipher`/`aes-gcm` crates, the way WebCrypto's AES-CBC and AES-GCM
//! operations do. Key material is 16 or 32 bytes (AES-128 or AES-256);
//! both ciphers dispatch on the secret's length rather than committing
//! to one key size.

use aes::{Aes128, Aes256};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use cipher::block_padding::{Pkcs7, UnpadError};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand_core::{OsRng, RngCore};

use crate::error::CodecFailure;

pub const GCM_IV_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;
pub const CBC_IV_LEN: usize = 16;

/// Decrypt a CBC/PKCS7 ciphertext with an externally-supplied IV.
///
/// `key` must be 16 or 32 bytes. Fails with `InvalidPayload` on an
/// unsupported key length, a ciphertext length that is not a multiple of
/// the block size, or a padding error — all indistinguishable to a caller.
pub fn aes_cbc_decrypt(ciphertext: &[u8], iv: &[u8; CBC_IV_LEN], key: &[u8]) -> Result<Vec<u8>, CodecFailure> {
    match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CodecFailure::InvalidPayload)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|UnpadError| CodecFailure::InvalidPayload),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CodecFailure::InvalidPayload)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|UnpadError| CodecFailure::InvalidPayload),
        _ => Err(CodecFailure::InvalidPayload),
    }
}

/// Encrypt plaintext with CBC/PKCS7. The caller prepends the IV when
/// assembling a V2-format envelope; this primitive returns ciphertext only.
///
/// Panics if `key` is not 16 or 32 bytes; callers only ever pass a
/// `Key::secret` that has already round-tripped through key-store
/// validation.
pub fn aes_cbc_encrypt(plaintext: &[u8], iv: &[u8; CBC_IV_LEN], key: &[u8]) -> Vec<u8> {
    match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .expect("key/iv length already validated")
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .expect("key/iv length already validated")
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        n => panic!("unsupported AES key length: {n}"),
    }
}

/// Encrypt with AES-GCM. `key` must be 16 or 32 bytes. Returns
/// `ciphertext || tag` (tag is 16 bytes).
pub fn aes_gcm_encrypt(plaintext: &[u8], iv: &[u8; GCM_IV_LEN], key: &[u8]) -> Result<Vec<u8>, CodecFailure> {
    let nonce = Nonce::from_slice(iv);
    match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| CodecFailure::InvalidPayload)?
            .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
            .map_err(|_| CodecFailure::InvalidPayload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| CodecFailure::InvalidPayload)?
            .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
            .map_err(|_| CodecFailure::InvalidPayload),
        _ => Err(CodecFailure::InvalidPayload),
    }
}

/// Decrypt `combined = iv(12) || ciphertext || tag(16)` with AES-GCM.
/// `key` must be 16 or 32 bytes.
pub fn aes_gcm_decrypt(combined: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecFailure> {
    if combined.len() < GCM_IV_LEN + GCM_TAG_LEN {
        return Err(CodecFailure::InvalidPayload);
    }
    let (iv, rest) = combined.split_at(GCM_IV_LEN);
    let nonce = Nonce::from_slice(iv);
    match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| CodecFailure::InvalidPayload)?
            .decrypt(nonce, Payload { msg: rest, aad: &[] })
            .map_err(|_| CodecFailure::InvalidPayload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| CodecFailure::InvalidPayload)?
            .decrypt(nonce, Payload { msg: rest, aad: &[] })
            .map_err(|_| CodecFailure::InvalidPayload),
        _ => Err(CodecFailure::InvalidPayload),
    }
}

/// Generate `n` bytes from the platform CSPRNG. Used for fresh IVs.
pub fn generate_iv(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbc_round_trips() {
        let key = [7u8; 16];
        let iv = [3u8; CBC_IV_LEN];
        let plaintext = b"a well-formed identity payload";
        let ct = aes_cbc_encrypt(plaintext, &iv, &key);
        let pt = aes_cbc_decrypt(&ct, &iv, &key).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn cbc_rejects_bad_padding() {
        let key = [7u8; 16];
        let iv = [3u8; CBC_IV_LEN];
        let mut ct = aes_cbc_encrypt(b"hello world hello", &iv, &key);
        let last = ct.len() - 1;
        ct[last] ^= 0xFF;
        assert_eq!(aes_cbc_decrypt(&ct, &iv, &key), Err(CodecFailure::InvalidPayload));
    }

    #[test]
    fn gcm_round_trips() {
        let key = [9u8; 16];
        let iv: [u8; GCM_IV_LEN] = generate_iv(GCM_IV_LEN).try_into().unwrap();
        let plaintext = b"gcm payload";
        let ct = aes_gcm_encrypt(plaintext, &iv, &key).unwrap();
        assert_eq!(ct.len(), plaintext.len() + GCM_TAG_LEN);

        let mut combined = iv.to_vec();
        combined.extend_from_slice(&ct);
        let pt = aes_gcm_decrypt(&combined, &key).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn gcm_tamper_fails() {
        let key = [9u8; 16];
        let iv: [u8; GCM_IV_LEN] = generate_iv(GCM_IV_LEN).try_into().unwrap();
        let ct = aes_gcm_encrypt(b"tamper me", &iv, &key).unwrap();
        let mut combined = iv.to_vec();
        combined.extend_from_slice(&ct);
        let last = combined.len() - 1;
        combined[last] ^= 0x01;
        assert_eq!(aes_gcm_decrypt(&combined, &key), Err(CodecFailure::InvalidPayload));
    }

    #[test]
    fn generate_iv_produces_requested_length_and_varies() {
        let a = generate_iv(GCM_IV_LEN);
        let b = generate_iv(GCM_IV_LEN);
        assert_eq!(a.len(), GCM_IV_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn cbc_round_trips_with_256_bit_key() {
        let key = [7u8; 32];
        let iv = [3u8; CBC_IV_LEN];
        let plaintext = b"a well-formed identity payload";
        let ct = aes_cbc_encrypt(plaintext, &iv, &key);
        let pt = aes_cbc_decrypt(&ct, &iv, &key).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn gcm_round_trips_with_256_bit_key() {
        let key = [9u8; 32];
        let iv: [u8; GCM_IV_LEN] = generate_iv(GCM_IV_LEN).try_into().unwrap();
        let plaintext = b"gcm payload";
        let ct = aes_gcm_encrypt(plaintext, &iv, &key).unwrap();
        let mut combined = iv.to_vec();
        combined.extend_from_slice(&ct);
        assert_eq!(aes_gcm_decrypt(&combined, &key).unwrap(), plaintext);
    }

    #[test]
    fn unsupported_key_length_is_invalid_payload() {
        let key = [1u8; 24];
        let iv = [0u8; CBC_IV_LEN];
        assert_eq!(aes_cbc_decrypt(&[], &iv, &key), Err(CodecFailure::InvalidPayload));
    }
}
