//! Cryptographic utilities for xasset business payloads
//!
//! The HTTP-level request signature lives in [`crate::auth`]; this module
//! covers the account-level ECDSA signature that proves a business action
//! (creating, granting or transferring an asset) was authorized by the
//! holder of an account key.
//!
//! # Examples
//!
//! ```
//! use xasset_sdk::crypto::{sign_message, verify_message, EcdsaKeyPair};
//!
//! # fn example() -> xasset_sdk::Result<()> {
//! let account = EcdsaKeyPair::generate()?;
//! let signature = sign_message(&account.private_key, b"hello world")?;
//! assert!(verify_message(&account.public_key, &signature, b"hello world")?);
//! # Ok(())
//! # }
//! ```

pub mod ecdsa;


pub use ecdsa::{
    hash_sha256, parse_private_key, parse_public_key, sign_message, sign_nonce, verify_message,
    EcdsaKeyPair,
};
