//! # xasset SDK
//!
//! Client-side core for the xasset digital asset service.
//!
//! ## Features
//!
//! - **Request signing**: `bce-auth-v1` HMAC-SHA256 `Authorization` tokens over a canonical request
//! - **Verification**: token parsing, expiry and signature checks for the receiving side
//! - **Identifiers**: nonces, random ids and packed asset ids
//! - **Account signatures**: ECDSA (P-256) over business payloads with JSON-encoded keys
//! - **HTTP client**: signed form `POST`s with response envelope handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xasset_sdk::{gen_asset_id, XassetClient, XassetConfig};
//! use xasset_sdk::crypto::{sign_nonce, EcdsaKeyPair};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = XassetConfig::from_env()?;
//!     let app_id = config.credentials.as_ref().map(|c| c.app_id).unwrap_or_default();
//!     let client = XassetClient::new(config)?;
//!
//!     let account = EcdsaKeyPair::generate()?;
//!     let (nonce, sign) = sign_nonce(&account.private_key)?;
//!     let asset_id = gen_asset_id(app_id);
//!
//!     let body = xasset_sdk::client::encode_form([
//!         ("asset_id", asset_id.to_string()),
//!         ("nonce", nonce.to_string()),
//!         ("sign", sign),
//!         ("pkey", account.public_key),
//!     ]);
//!     let result = client.post("/xasset/horae/v1/publish", &body).await?;
//!     println!("{} {}", result.http_code, result.body);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;

// Re-exports for convenience
pub use auth::{AuthorizationToken, CanonicalRequest, Credentials, SignOptions, Signer, Verifier};
pub use client::{BaseResponse, RequestResult, XassetClient};
pub use config::XassetConfig;
pub use crypto::EcdsaKeyPair;
pub use error::{Result, XassetError};
pub use id::{gen_asset_id, gen_nonce, IdGenerator};

/// Current version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(auth::AUTH_VERSION, "bce-auth-v1");
    }

    #[test]
    fn test_sign_then_verify_through_reexports() {
        let credentials = Credentials::new(1, "AK", "SK");
        let signer = Signer::new(credentials.clone(), SignOptions::default());
        let mut request = http::Request::get("http://www.example.com/path?x=1")
            .header("host", "www.example.com")
            .body(())
            .unwrap();
        signer.authorize(&mut request).unwrap();
        assert!(Verifier::new(credentials).verify(&request).is_ok());
    }

    #[test]
    fn test_asset_id_carries_app_id() {
        let asset_id = gen_asset_id(110380);
        assert_eq!(asset_id & 0xFFFFF, 110380);
    }
}
