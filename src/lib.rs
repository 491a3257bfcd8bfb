//! # UID2 Core
//!
//! Token codec for the UID2 identity framework: decrypts opaque advertising
//! tokens into a user identifier, and encrypts/decrypts site-scoped data
//! payloads. Implements both binary envelope generations — V2 (AES-CBC with
//! a manually-carried IV) and V3 (AES-GCM AEAD) — with the nested
//! master-key/site-key decryption both formats require.
//!
//! ## Quick Start
//!
//! ```
//! use uid2_core::{Uid2Client, IdentityScope, KeyStore, InMemoryKeyStore, Key};
//!
//! let keys = InMemoryKeyStore::new(vec![], 0, 60_000);
//! let client = Uid2Client::new(IdentityScope::Uid2);
//! let response = client.decrypt_token(&[0u8], &keys, 0);
//! assert!(!matches!(response.status, uid2_core::DecryptionStatus::Success));
//! ```
//!
//! ## What's NOT provided
//!
//! - Key refresh, persistence, or rotation policy (see [`KeyStore`])
//! - HTTP transport to the UID2 operator
//! - Token issuance

#![deny(unsafe_code)]

mod bytes;
mod crypto;
mod data;
mod error;
mod keystore;
mod response;
mod scope;
mod token;

mod sdk;

pub use error::{DecryptionStatus, InvocationError};
pub use keystore::{InMemoryKeyStore, Key, KeyStore};
pub use response::{DataResponse, DecryptionResponse, EncryptDataRequest};
pub use scope::IdentityScope;
pub use sdk::{describe_token, TokenInfo, Uid2Client};

#[doc(hidden)]
pub mod internal {
    pub use crate::bytes::{ByteReader, ByteSlice, ByteWriter};
    pub use crate::crypto::{aes_cbc_decrypt, aes_cbc_encrypt, aes_gcm_decrypt, aes_gcm_encrypt, generate_iv};
}
