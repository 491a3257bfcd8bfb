//! Data payload encryption/decryption: V3 output envelopes, V2/V3 input
//! decryption.

use base64::Engine as _;
use tracing::warn;
use zeroize::Zeroizing;

use crate::bytes::ByteReader;
use crate::crypto::{aes_cbc_decrypt, aes_gcm_decrypt, aes_gcm_encrypt, generate_iv, CBC_IV_LEN};
use crate::error::{CodecFailure, DecryptionStatus, InvocationError};
use crate::keystore::KeyStore;
use crate::response::{DataResponse, EncryptDataRequest};
use crate::scope::{decode_scope, encode_prefix, is_data_v3_prefix, IdentityScope, PayloadType};
use crate::token::decrypt_token;

const V2_DATA_PAYLOAD_TYPE: u8 = 128;
const V2_DATA_VERSION: u8 = 1;
const V3_VERSION: u8 = 112;

pub(crate) fn encrypt_data(
    request: EncryptDataRequest,
    keys: Option<&dyn KeyStore>,
    scope: IdentityScope,
) -> Result<DataResponse, InvocationError> {
    let data = request.data.as_ref().ok_or(InvocationError::MissingData)?;

    let resolved = match resolve_site_key(&request, keys, scope) {
        Ok(r) => r,
        Err(ResolveError::Status(status)) => return Ok(DataResponse::failure(status)),
        Err(ResolveError::Invocation(e)) => return Err(e),
    };

    let iv: [u8; 12] = request.initialization_vector.unwrap_or_else(|| {
        generate_iv(12).try_into().expect("generate_iv(12) returns 12 bytes")
    });

    let mut inner = Vec::with_capacity(12 + data.len());
    inner.extend_from_slice(&request.now_ms.to_be_bytes());
    inner.extend_from_slice(&resolved.site_id.to_be_bytes());
    inner.extend_from_slice(data);

    let ciphertext = match aes_gcm_encrypt(&inner, &iv, &resolved.key_secret) {
        Ok(c) => c,
        Err(_) => return Ok(DataResponse::failure(DecryptionStatus::EncryptionFailure)),
    };

    let mut envelope = Vec::with_capacity(18 + ciphertext.len());
    envelope.push(encode_prefix(PayloadType::DataV3, scope));
    envelope.push(V3_VERSION);
    envelope.extend_from_slice(&(resolved.key_id as i32).to_be_bytes());
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ciphertext);

    let encoded = base64::engine::general_purpose::STANDARD.encode(envelope);
    Ok(DataResponse {
        status: DecryptionStatus::Success,
        payload: Some(encoded.into_bytes()),
        encrypted_at: Some(request.now_ms),
    })
}

struct ResolvedSiteKey {
    key_id: i64,
    site_id: i32,
    key_secret: Zeroizing<Vec<u8>>,
}

/// Either of the two error channels [`resolve_site_key`] can fail with: a
/// data-driven [`DecryptionStatus`] or a programmer-error [`InvocationError`].
enum ResolveError {
    Status(DecryptionStatus),
    Invocation(InvocationError),
}

/// Key resolution precedence: an explicit `request.key` always wins; only in
/// its absence is `site_id`/`advertising_token` consulted, and only then is
/// passing both at once a conflict.
fn resolve_site_key(
    request: &EncryptDataRequest,
    keys: Option<&dyn KeyStore>,
    scope: IdentityScope,
) -> Result<ResolvedSiteKey, ResolveError> {
    if let Some(key) = &request.key {
        if !key.is_active(request.now_ms) {
            return Err(ResolveError::Status(DecryptionStatus::KeyInactive));
        }
        return Ok(ResolvedSiteKey { key_id: key.id, site_id: key.site_id, key_secret: key.secret.clone() });
    }

    if request.site_id.is_some() && request.advertising_token.is_some() {
        return Err(ResolveError::Invocation(InvocationError::ConflictingKeySource));
    }

    let keys = keys.ok_or(ResolveError::Status(DecryptionStatus::NotInitialized))?;
    if !keys.is_valid(request.now_ms) {
        return Err(ResolveError::Status(DecryptionStatus::KeysNotSynced));
    }

    let site_key_site_id = if let Some(site_id) = request.site_id {
        site_id
    } else if let Some(token) = &request.advertising_token {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(token)
            .map_err(|_| ResolveError::Status(DecryptionStatus::TokenDecryptFailure))?;
        let resp = decrypt_token(&raw, keys, request.now_ms, scope);
        if resp.status != DecryptionStatus::Success {
            return Err(ResolveError::Status(DecryptionStatus::TokenDecryptFailure));
        }
        resp.site_key_site_id.ok_or(ResolveError::Status(DecryptionStatus::TokenDecryptFailure))?
    } else {
        return Err(ResolveError::Status(DecryptionStatus::NotAuthorizedForKey));
    };

    let key = keys
        .try_get_active_site_key(site_key_site_id, request.now_ms)
        .ok_or(ResolveError::Status(DecryptionStatus::NotAuthorizedForKey))?;
    Ok(ResolvedSiteKey { key_id: key.id, site_id: key.site_id, key_secret: key.secret })
}

pub(crate) fn decrypt_data(bytes: &[u8], keys: &dyn KeyStore, scope: IdentityScope) -> DataResponse {
    if bytes.is_empty() {
        return DataResponse::failure(DecryptionStatus::InvalidPayload);
    }

    let result = if is_data_v3_prefix(bytes[0]) {
        decrypt_data_v3(bytes, keys, scope)
    } else {
        decrypt_data_v2(bytes, keys)
    };

    match result {
        Ok(resp) => resp,
        Err(failure) => {
            warn!(status = %DecryptionStatus::from(failure), "data decrypt failed");
            DataResponse::failure(failure.into())
        }
    }
}

fn decrypt_data_v2(bytes: &[u8], keys: &dyn KeyStore) -> Result<DataResponse, CodecFailure> {
    let mut r = ByteReader::new(bytes);
    let payload_type = r.read_u8()?;
    if payload_type != V2_DATA_PAYLOAD_TYPE {
        return Err(CodecFailure::InvalidPayloadType);
    }
    let version = r.read_u8()?;
    if version != V2_DATA_VERSION {
        return Err(CodecFailure::VersionNotSupported);
    }
    let encrypted_at_ms = r.read_i64()?;
    let _site_id = r.read_i32()?;
    let key_id = r.read_i32()? as i64;
    let iv: [u8; CBC_IV_LEN] = r.read_array()?;
    let ciphertext = r.rest_slice();

    let key = keys.try_get_key(key_id).ok_or(CodecFailure::NotAuthorizedForKey)?;
    let plaintext = aes_cbc_decrypt(ciphertext.as_slice(), &iv, &key.secret)?;
    Ok(DataResponse::success(plaintext, encrypted_at_ms))
}

fn decrypt_data_v3(bytes: &[u8], keys: &dyn KeyStore, scope: IdentityScope) -> Result<DataResponse, CodecFailure> {
    let mut r = ByteReader::new(bytes);
    let prefix = r.read_u8()?;
    if decode_scope(prefix) != scope {
        return Err(CodecFailure::InvalidIdentityScope);
    }
    let version = r.read_u8()?;
    if version != V3_VERSION {
        return Err(CodecFailure::VersionNotSupported);
    }
    let key_id = r.read_i32()? as i64;
    let combined = r.rest_slice();

    let key = keys.try_get_key(key_id).ok_or(CodecFailure::NotAuthorizedForKey)?;
    let plaintext = aes_gcm_decrypt(combined.as_slice(), &key.secret)?;

    let mut pr = ByteReader::new(&plaintext);
    let encrypted_at_ms = pr.read_i64()?;
    let _site_id = pr.read_i32()?;
    let data = pr.rest().to_vec();
    Ok(DataResponse::success(data, encrypted_at_ms))
}
