//! Advertising token codec: version dispatch, V2 (AES-CBC) and V3 (AES-GCM)
//! envelope parsing and decryption.
//!
//! Each format decrypts in two nested stages: an outer pass keyed by the
//! master key recovers a header that names the site key, and an inner pass
//! keyed by that site key recovers the identity. Version/scope dispatch
//! happens before either stage, from a header parse over the raw bytes.

use base64::Engine as _;
use tracing::{debug, warn};

use crate::bytes::ByteReader;
use crate::crypto::{aes_cbc_decrypt, aes_gcm_decrypt, CBC_IV_LEN};
use crate::error::{CodecFailure, DecryptionStatus};
use crate::keystore::KeyStore;
use crate::response::DecryptionResponse;
use crate::scope::{decode_scope, IdentityScope};

const V2_VERSION: u8 = 2;
const V3_VERSION: u8 = 112;

pub(crate) fn decrypt_token(
    bytes: &[u8],
    keys: &dyn KeyStore,
    now_ms: i64,
    scope: IdentityScope,
) -> DecryptionResponse {
    if bytes.len() < 2 {
        return DecryptionResponse::failure(DecryptionStatus::InvalidPayload);
    }

    let result = if bytes[0] == V2_VERSION {
        decrypt_v2(bytes, keys, now_ms)
    } else if bytes[1] == V3_VERSION {
        decrypt_v3(bytes, keys, now_ms, scope)
    } else {
        debug!(first_byte = bytes[0], second_byte = bytes[1], "token version not recognized");
        return DecryptionResponse::failure(DecryptionStatus::VersionNotSupported);
    };

    match result {
        Ok(resp) => resp,
        Err(failure) => {
            warn!(status = %DecryptionStatus::from(failure), "token decrypt failed");
            DecryptionResponse::failure(failure.into())
        }
    }
}

fn decrypt_v2(bytes: &[u8], keys: &dyn KeyStore, now_ms: i64) -> Result<DecryptionResponse, CodecFailure> {
    let mut r = ByteReader::new(bytes);
    let version = r.read_u8()?;
    debug_assert_eq!(version, V2_VERSION);

    let master_key_id = r.read_i32()? as i64;
    let master_iv: [u8; CBC_IV_LEN] = r.read_array()?;
    let master_ciphertext = r.rest_slice();

    let master_key = keys.try_get_key(master_key_id).ok_or(CodecFailure::NotAuthorizedForKey)?;
    let master_plaintext = aes_cbc_decrypt(master_ciphertext.as_slice(), &master_iv, &master_key.secret)?;

    let mut mr = ByteReader::new(&master_plaintext);
    let expires_ms = mr.read_i64()?;
    let site_key_id = mr.read_i32()? as i64;
    let identity_iv: [u8; CBC_IV_LEN] = mr.read_array()?;
    let identity_ciphertext = mr.rest_slice();

    let site_key = keys.try_get_key(site_key_id).ok_or(CodecFailure::NotAuthorizedForKey)?;
    let identity_plaintext = aes_cbc_decrypt(identity_ciphertext.as_slice(), &identity_iv, &site_key.secret)?;

    let mut ir = ByteReader::new(&identity_plaintext);
    let site_id = ir.read_i32()?;
    let id_length = ir.read_i32()?;
    if id_length < 0 || id_length as usize > ir.remaining() {
        return Err(CodecFailure::InvalidPayload);
    }
    let uid_bytes = ir.read_bytes(id_length as usize)?;
    let uid = String::from_utf8(uid_bytes.to_vec()).map_err(|_| CodecFailure::InvalidPayload)?;
    let _privacy_bits = ir.read_i32()?;
    let established_ms = ir.read_i64()?;

    if expires_ms < now_ms {
        return Ok(DecryptionResponse::expired(established_ms, site_id, site_key.site_id));
    }
    Ok(DecryptionResponse::success(uid, established_ms, site_id, site_key.site_id))
}

fn decrypt_v3(
    bytes: &[u8],
    keys: &dyn KeyStore,
    now_ms: i64,
    scope: IdentityScope,
) -> Result<DecryptionResponse, CodecFailure> {
    let mut r = ByteReader::new(bytes);
    let prefix = r.read_u8()?;
    if decode_scope(prefix) != scope {
        return Err(CodecFailure::InvalidIdentityScope);
    }

    let version = r.read_u8()?;
    if version != V3_VERSION {
        return Err(CodecFailure::VersionNotSupported);
    }

    let master_key_id = r.read_i32()? as i64;
    let master_blob = r.rest_slice();

    let master_key = keys.try_get_key(master_key_id).ok_or(CodecFailure::NotAuthorizedForKey)?;
    let master_plaintext = aes_gcm_decrypt(master_blob.as_slice(), &master_key.secret)?;

    let mut mr = ByteReader::new(&master_plaintext);
    let expires_ms = mr.read_i64()?;
    let _created_ms = mr.read_i64()?;
    let _operator_site_id = mr.read_i32()?;
    let _operator_type = mr.read_u8()?;
    let _operator_version = mr.read_i32()?;
    let _operator_key_id = mr.read_i32()?;
    let site_key_id = mr.read_i32()? as i64;
    let site_blob = mr.rest_slice();

    let site_key = keys.try_get_key(site_key_id).ok_or(CodecFailure::NotAuthorizedForKey)?;
    let site_plaintext = aes_gcm_decrypt(site_blob.as_slice(), &site_key.secret)?;

    let mut sr = ByteReader::new(&site_plaintext);
    let site_id = sr.read_i32()?;
    let _publisher_id = sr.read_i64()?;
    let _publisher_key_id = sr.read_i32()?;
    let _privacy_bits = sr.read_i32()?;
    let established_ms = sr.read_i64()?;
    let _refreshed_ms = sr.read_i64()?;
    let raw_id_bytes = sr.rest();

    if expires_ms < now_ms {
        return Ok(DecryptionResponse::expired(established_ms, site_id, site_key.site_id));
    }
    let uid = base64::engine::general_purpose::STANDARD.encode(raw_id_bytes);
    Ok(DecryptionResponse::success(uid, established_ms, site_id, site_key.site_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{InMemoryKeyStore, Key};
    use crate::scope::{encode_prefix, IdentityScope, PayloadType};

    fn v2_token(
        master_key: &Key,
        site_key: &Key,
        site_id: i32,
        uid: &str,
        established_ms: i64,
        expires_ms: i64,
    ) -> Vec<u8> {
        let mut identity = Vec::new();
        identity.extend_from_slice(&site_id.to_be_bytes());
        identity.extend_from_slice(&(uid.len() as i32).to_be_bytes());
        identity.extend_from_slice(uid.as_bytes());
        identity.extend_from_slice(&0i32.to_be_bytes()); // privacy_bits
        identity.extend_from_slice(&established_ms.to_be_bytes());

        let identity_iv = [1u8; CBC_IV_LEN];
        let identity_ct = crate::crypto::aes_cbc_encrypt(&identity, &identity_iv, &site_key.secret);

        let mut master = Vec::new();
        master.extend_from_slice(&expires_ms.to_be_bytes());
        master.extend_from_slice(&(site_key.id as i32).to_be_bytes());
        master.extend_from_slice(&identity_iv);
        master.extend_from_slice(&identity_ct);

        let master_iv = [2u8; CBC_IV_LEN];
        let master_ct = crate::crypto::aes_cbc_encrypt(&master, &master_iv, &master_key.secret);

        let mut token = vec![2u8];
        token.extend_from_slice(&(master_key.id as i32).to_be_bytes());
        token.extend_from_slice(&master_iv);
        token.extend_from_slice(&master_ct);
        token
    }

    fn v3_token(
        master_key: &Key,
        site_key: &Key,
        scope: IdentityScope,
        site_id: i32,
        raw_id: &[u8],
        established_ms: i64,
        expires_ms: i64,
    ) -> Vec<u8> {
        let mut site_plain = Vec::new();
        site_plain.extend_from_slice(&site_id.to_be_bytes());
        site_plain.extend_from_slice(&0i64.to_be_bytes()); // publisher_id
        site_plain.extend_from_slice(&0i32.to_be_bytes()); // publisher_key_id
        site_plain.extend_from_slice(&0i32.to_be_bytes()); // privacy_bits
        site_plain.extend_from_slice(&established_ms.to_be_bytes());
        site_plain.extend_from_slice(&0i64.to_be_bytes()); // refreshed_ms
        site_plain.extend_from_slice(raw_id);

        let site_iv = [4u8; 12];
        let site_ct = crate::crypto::aes_gcm_encrypt(&site_plain, &site_iv, &site_key.secret).unwrap();
        let mut site_blob = site_iv.to_vec();
        site_blob.extend_from_slice(&site_ct);

        let mut master_plain = Vec::new();
        master_plain.extend_from_slice(&expires_ms.to_be_bytes());
        master_plain.extend_from_slice(&0i64.to_be_bytes()); // created_ms
        master_plain.extend_from_slice(&0i32.to_be_bytes()); // operator_site_id
        master_plain.push(0); // operator_type
        master_plain.extend_from_slice(&0i32.to_be_bytes()); // operator_version
        master_plain.extend_from_slice(&0i32.to_be_bytes()); // operator_key_id
        master_plain.extend_from_slice(&(site_key.id as i32).to_be_bytes());
        master_plain.extend_from_slice(&site_blob);

        let master_iv = [5u8; 12];
        let master_ct = crate::crypto::aes_gcm_encrypt(&master_plain, &master_iv, &master_key.secret).unwrap();
        let mut master_blob = master_iv.to_vec();
        master_blob.extend_from_slice(&master_ct);

        let mut token = vec![encode_prefix(PayloadType::AdvertisingTokenV3, scope), V3_VERSION];
        token.extend_from_slice(&(master_key.id as i32).to_be_bytes());
        token.extend_from_slice(&master_blob);
        token
    }

    fn keys() -> (Key, Key, InMemoryKeyStore) {
        let master = Key::new(1, 0, vec![1u8; 16], 0, 0, i64::MAX);
        let site = Key::new(2, 42, vec![2u8; 16], 0, 0, i64::MAX);
        let store = InMemoryKeyStore::new(vec![master.clone(), site.clone()], 0, i64::MAX);
        (master, site, store)
    }

    #[test]
    fn v2_happy_path() {
        let (master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let token = v2_token(&master, &site, 42, "testuid", 1_609_459_200_000, now + 60_000);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::Success);
        assert_eq!(resp.uid.as_deref(), Some("testuid"));
        assert_eq!(resp.site_id, Some(42));
    }

    #[test]
    fn v2_expired_keeps_metadata_but_clears_uid() {
        let (master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let token = v2_token(&master, &site, 42, "testuid", 1_609_459_200_000, now - 1);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::ExpiredToken);
        assert!(resp.uid.is_none());
        assert_eq!(resp.site_id, Some(42));
    }

    #[test]
    fn v3_happy_path_base64_encodes_raw_id() {
        let (master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let raw_id = [0xABu8; 16];
        let token = v3_token(&master, &site, IdentityScope::Uid2, 42, &raw_id, 0, now + 60_000);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::Success);
        use base64::Engine as _;
        assert_eq!(resp.uid, Some(base64::engine::general_purpose::STANDARD.encode(raw_id)));
    }

    #[test]
    fn v3_scope_mismatch_rejected_before_key_lookup() {
        let (master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let token = v3_token(&master, &site, IdentityScope::Euid, 42, &[0u8; 16], 0, now + 60_000);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::InvalidIdentityScope);
    }

    #[test]
    fn unknown_master_key_reports_not_authorized() {
        let (_master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let bogus_master = Key::new(999, 0, vec![9u8; 16], 0, 0, i64::MAX);
        let token = v3_token(&bogus_master, &site, IdentityScope::Uid2, 42, &[0u8; 16], 0, now + 60_000);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::NotAuthorizedForKey);
    }

    #[test]
    fn expired_with_unknown_master_key_reports_not_authorized_not_expired() {
        let (_master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let bogus_master = Key::new(999, 0, vec![9u8; 16], 0, 0, i64::MAX);
        let token = v2_token(&bogus_master, &site, 42, "x", 0, now - 1);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::NotAuthorizedForKey);
    }

    #[test]
    fn dispatch_v2_wins_regardless_of_byte_one() {
        let buf = vec![2u8, 0xFF, 0, 0];
        let (_m, _s, store) = keys();
        let resp = decrypt_token(&buf, &store, 0, IdentityScope::Uid2);
        // too short to be a real token, but it must have entered the V2 path
        // (InvalidPayload), not VersionNotSupported.
        assert_eq!(resp.status, DecryptionStatus::InvalidPayload);
    }

    #[test]
    fn too_short_buffer_is_invalid_payload() {
        let (_m, _s, store) = keys();
        let resp = decrypt_token(&[2u8], &store, 0, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::InvalidPayload);
    }

    #[test]
    fn expiry_boundary_equal_is_success() {
        let (master, site, store) = keys();
        let now = 1_700_000_000_000i64;
        let token = v2_token(&master, &site, 42, "x", 0, now);
        let resp = decrypt_token(&token, &store, now, IdentityScope::Uid2);
        assert_eq!(resp.status, DecryptionStatus::Success);
    }
}
