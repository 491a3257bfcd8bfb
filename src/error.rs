//! Error types for the UID2 core codec.
//!
//! Two distinct channels: response statuses (data-driven, never escape as
//! exceptions) and invocation errors (programmer mistakes in how the API
//! is called).

use core::fmt;

/// Outcome taxonomy for [`crate::Uid2Client::decrypt_token`] and the data
/// payload operations. Every call returns one of these inside a response
/// struct rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionStatus {
    Success,
    NotInitialized,
    InvalidPayload,
    InvalidPayloadType,
    VersionNotSupported,
    NotAuthorizedForKey,
    InvalidIdentityScope,
    ExpiredToken,
    KeysNotSynced,
    KeyInactive,
    EncryptionFailure,
    TokenDecryptFailure,
}

impl fmt::Display for DecryptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::NotInitialized => "not initialized",
            Self::InvalidPayload => "invalid payload",
            Self::InvalidPayloadType => "invalid payload type",
            Self::VersionNotSupported => "version not supported",
            Self::NotAuthorizedForKey => "not authorized for key",
            Self::InvalidIdentityScope => "invalid identity scope",
            Self::ExpiredToken => "expired token",
            Self::KeysNotSynced => "keys not synced",
            Self::KeyInactive => "key inactive",
            Self::EncryptionFailure => "encryption failure",
            Self::TokenDecryptFailure => "token decrypt failure",
        };
        write!(f, "{}", s)
    }
}

/// Misuse of [`crate::Uid2Client::encrypt_data`] that is a programmer error,
/// never a `DecryptionStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// `data` was not provided.
    MissingData,
    /// Both `site_id` and `advertising_token` were provided; exactly one
    /// key-resolution path may be used.
    ConflictingKeySource,
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingData => write!(f, "encrypt_data request is missing `data`"),
            Self::ConflictingKeySource => {
                write!(f, "encrypt_data request set both `site_id` and `advertising_token`")
            }
        }
    }
}

impl std::error::Error for InvocationError {}

/// Internal parse/decrypt failure. Never escapes the crate — every call
/// site maps it to the corresponding [`DecryptionStatus`] before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFailure {
    InvalidPayload,
    InvalidPayloadType,
    VersionNotSupported,
    NotAuthorizedForKey,
    InvalidIdentityScope,
}

impl fmt::Display for CodecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidPayload => "invalid payload",
            Self::InvalidPayloadType => "invalid payload type",
            Self::VersionNotSupported => "version not supported",
            Self::NotAuthorizedForKey => "not authorized for key",
            Self::InvalidIdentityScope => "invalid identity scope",
        };
        write!(f, "{}", s)
    }
}

impl From<CodecFailure> for DecryptionStatus {
    fn from(e: CodecFailure) -> Self {
        match e {
            CodecFailure::InvalidPayload => DecryptionStatus::InvalidPayload,
            CodecFailure::InvalidPayloadType => DecryptionStatus::InvalidPayloadType,
            CodecFailure::VersionNotSupported => DecryptionStatus::VersionNotSupported,
            CodecFailure::NotAuthorizedForKey => DecryptionStatus::NotAuthorizedForKey,
            CodecFailure::InvalidIdentityScope => DecryptionStatus::InvalidIdentityScope,
        }
    }
}
