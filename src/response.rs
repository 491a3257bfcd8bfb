//! Public response and request shapes returned from / passed into the codec.

use crate::error::DecryptionStatus;
use crate::keystore::Key;

/// Result of [`crate::Uid2Client::decrypt_token`].
///
/// Only `Success` and `ExpiredToken` populate the identity fields; every
/// other status carries `status` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionResponse {
    pub status: DecryptionStatus,
    pub uid: Option<String>,
    pub established: Option<i64>,
    pub site_id: Option<i32>,
    pub site_key_site_id: Option<i32>,
}

impl DecryptionResponse {
    pub(crate) fn failure(status: DecryptionStatus) -> Self {
        Self { status, uid: None, established: None, site_id: None, site_key_site_id: None }
    }

    pub(crate) fn success(uid: String, established: i64, site_id: i32, site_key_site_id: i32) -> Self {
        Self {
            status: DecryptionStatus::Success,
            uid: Some(uid),
            established: Some(established),
            site_id: Some(site_id),
            site_key_site_id: Some(site_key_site_id),
        }
    }

    pub(crate) fn expired(established: i64, site_id: i32, site_key_site_id: i32) -> Self {
        Self {
            status: DecryptionStatus::ExpiredToken,
            uid: None,
            established: Some(established),
            site_id: Some(site_id),
            site_key_site_id: Some(site_key_site_id),
        }
    }
}

/// Result of [`crate::Uid2Client::encrypt_data`] and
/// [`crate::Uid2Client::decrypt_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataResponse {
    pub status: DecryptionStatus,
    pub payload: Option<Vec<u8>>,
    pub encrypted_at: Option<i64>,
}

impl DataResponse {
    pub(crate) fn failure(status: DecryptionStatus) -> Self {
        Self { status, payload: None, encrypted_at: None }
    }

    pub(crate) fn success(payload: Vec<u8>, encrypted_at: i64) -> Self {
        Self { status: DecryptionStatus::Success, payload: Some(payload), encrypted_at: Some(encrypted_at) }
    }
}

/// Request for [`crate::Uid2Client::encrypt_data`].
///
/// `data` is `Option` rather than a bare `Vec<u8>` so that an omitted
/// payload (as opposed to an empty one) is a distinguishable invocation
/// error ([`crate::InvocationError::MissingData`]). Exactly one of `key`,
/// `site_id`, `advertising_token` should drive key resolution.
#[derive(Default)]
pub struct EncryptDataRequest {
    pub data: Option<Vec<u8>>,
    pub key: Option<Key>,
    pub site_id: Option<i32>,
    pub advertising_token: Option<String>,
    pub initialization_vector: Option<[u8; 12]>,
    pub now_ms: i64,
}
