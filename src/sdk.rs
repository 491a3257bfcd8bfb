//! Public facade over the token and data codecs.
//!
//! This module defines the **frozen** public interface. Everything else
//! (`bytes`, `crypto`, `token`, `data`) is an internal implementation detail
//! and may change without notice behind this facade.

use crate::data::{decrypt_data, encrypt_data};
use crate::error::InvocationError;
use crate::keystore::KeyStore;
use crate::response::{DataResponse, DecryptionResponse, EncryptDataRequest};
use crate::scope::{decode_scope, IdentityScope};
use crate::token::decrypt_token as decrypt_token_impl;

/// Codec entry point, parameterized by the deployment [`IdentityScope`]
/// chosen once at construction and never mutated.
///
/// Stateless beyond that scope: every operation takes the key store and the
/// current time as explicit arguments, so a single `Uid2Client` can be
/// shared across threads as long as its `KeyStore` is `Send + Sync`.
pub struct Uid2Client {
    scope: IdentityScope,
}

impl Uid2Client {
    pub fn new(scope: IdentityScope) -> Self {
        Self { scope }
    }

    /// Decrypt an advertising token (V2 or V3). `raw` is the decoded
    /// envelope bytes — callers base64-decode text-wire tokens themselves.
    pub fn decrypt_token(&self, raw: &[u8], keys: &dyn KeyStore, now_ms: i64) -> DecryptionResponse {
        decrypt_token_impl(raw, keys, now_ms, self.scope)
    }

    /// Encrypt a data payload for a site, producing a base64-encoded V3
    /// envelope. See [`EncryptDataRequest`] for key-resolution precedence.
    pub fn encrypt_data(
        &self,
        request: EncryptDataRequest,
        keys: Option<&dyn KeyStore>,
    ) -> Result<DataResponse, InvocationError> {
        encrypt_data(request, keys, self.scope)
    }

    /// Decrypt a V2 or V3 data payload envelope.
    pub fn decrypt_data(&self, raw: &[u8], keys: &dyn KeyStore) -> DataResponse {
        decrypt_data(raw, keys, self.scope)
    }
}

// ---------------------------------------------------------------------------
// Inspection utility (ops/debugging, no secrets, no decryption)
// ---------------------------------------------------------------------------

/// Wire metadata extracted from a token without decrypting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub version_byte: u8,
    pub is_v3: bool,
    pub scope: Option<IdentityScope>,
    pub total_bytes: usize,
}

/// Inspect a token's version and scope without performing any key lookup
/// or decryption. Useful for logging and operational tooling — reveals no
/// secret information.
pub fn describe_token(bytes: &[u8]) -> Option<TokenInfo> {
    if bytes.len() < 2 {
        return None;
    }
    if bytes[0] == 2 {
        return Some(TokenInfo { version_byte: bytes[0], is_v3: false, scope: None, total_bytes: bytes.len() });
    }
    if bytes[1] == 112 {
        return Some(TokenInfo {
            version_byte: bytes[1],
            is_v3: true,
            scope: Some(decode_scope(bytes[0])),
            total_bytes: bytes.len(),
        });
    }
    None
}
