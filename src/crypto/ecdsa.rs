//! ECDSA signatures over application payloads
//!
//! Account keys travel as JSON objects whose coordinates are decimal integers:
//!
//! ```text
//! {"Curvname":"P-256","X":<dec>,"Y":<dec>,"D":<dec>}
//! ```
//!
//! `D` is present only in private keys. Messages are hashed with SHA-256 and
//! the digest is signed directly; signatures are DER-encoded `(r, s)` pairs
//! rendered as lower-case hex.

use crate::{Result, XassetError};
use ethereum_types::U256;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};

/// The only curve accepted in key JSON
pub const CURVE_NAME: &str = "P-256";

const COORDINATE_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct JsonKey {
    #[serde(rename = "Curvname")]
    curve_name: String,
    #[serde(rename = "X")]
    x: Box<RawValue>,
    #[serde(rename = "Y")]
    y: Box<RawValue>,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    d: Option<Box<RawValue>>,
}

impl JsonKey {
    fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Err(XassetError::invalid_key("key is empty"));
        }
        let key: JsonKey = serde_json::from_str(json)
            .map_err(|e| XassetError::invalid_key(format!("key is not valid JSON: {}", e)))?;
        if key.curve_name != CURVE_NAME {
            return Err(XassetError::invalid_key(format!(
                "unsupported curve {}",
                key.curve_name
            )));
        }
        Ok(key)
    }

    fn from_parts(verifying_key: &VerifyingKey, secret: Option<&SigningKey>) -> Result<Self> {
        let point = verifying_key.to_encoded_point(false);
        let bytes = point.as_bytes();
        let d = secret
            .map(|key| decimal_raw(&key.to_bytes()))
            .transpose()?;
        Ok(Self {
            curve_name: CURVE_NAME.to_string(),
            x: decimal_raw(&bytes[1..1 + COORDINATE_LEN])?,
            y: decimal_raw(&bytes[1 + COORDINATE_LEN..])?,
            d,
        })
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        let mut sec1 = Vec::with_capacity(1 + 2 * COORDINATE_LEN);
        sec1.push(0x04);
        sec1.extend_from_slice(&coordinate(&self.x)?);
        sec1.extend_from_slice(&coordinate(&self.y)?);
        VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|_| XassetError::invalid_key("public point is not on the curve"))
    }
}

/// Decimal JSON number to a 32-byte big-endian coordinate
fn coordinate(raw: &RawValue) -> Result<[u8; COORDINATE_LEN]> {
    let text = raw.get().trim_matches('"');
    let value = U256::from_dec_str(text)
        .map_err(|_| XassetError::invalid_key(format!("bad key component {}", text)))?;
    let mut bytes = [0u8; COORDINATE_LEN];
    value.to_big_endian(&mut bytes);
    Ok(bytes)
}

fn decimal_raw(bytes: &[u8]) -> Result<Box<RawValue>> {
    Ok(RawValue::from_string(U256::from_big_endian(bytes).to_string())?)
}

/// A freshly generated account keypair in JSON form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaKeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl EcdsaKeyPair {
    /// Generate a random P-256 keypair
    pub fn generate() -> Result<Self> {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(&signing_key)
    }

    /// Serialize an existing key
    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self> {
        Ok(Self {
            private_key: private_key_to_json(signing_key)?,
            public_key: public_key_to_json(signing_key.verifying_key())?,
        })
    }
}

/// Parse a private key; the embedded public point must match `D`
pub fn parse_private_key(json: &str) -> Result<SigningKey> {
    let key = JsonKey::parse(json)?;
    let d = key
        .d
        .as_deref()
        .ok_or_else(|| XassetError::invalid_key("private key has no D component"))?;
    let signing_key = SigningKey::from_slice(&coordinate(d)?)
        .map_err(|_| XassetError::invalid_key("private scalar out of range"))?;
    if key.verifying_key()? != *signing_key.verifying_key() {
        return Err(XassetError::invalid_key(
            "public point does not match private scalar",
        ));
    }
    Ok(signing_key)
}

/// Parse a public key
pub fn parse_public_key(json: &str) -> Result<VerifyingKey> {
    JsonKey::parse(json)?.verifying_key()
}

/// Serialize a private key, including its public point
pub fn private_key_to_json(key: &SigningKey) -> Result<String> {
    let json = JsonKey::from_parts(key.verifying_key(), Some(key))?;
    Ok(serde_json::to_string(&json)?)
}

/// Serialize a public key
pub fn public_key_to_json(key: &VerifyingKey) -> Result<String> {
    let json = JsonKey::from_parts(key, None)?;
    Ok(serde_json::to_string(&json)?)
}

/// SHA-256 of `data`
pub fn hash_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Sign `message` with a JSON private key and return the hex DER signature
pub fn sign_message(private_key: &str, message: &[u8]) -> Result<String> {
    let signing_key = parse_private_key(private_key)?;
    let digest = hash_sha256(message);
    let signature: Signature = signing_key
        .sign_prehash(&digest)
        .map_err(|e| XassetError::invalid_key(format!("ecdsa sign failed: {}", e)))?;
    Ok(hex::encode(signature.to_der().as_bytes()))
}

/// Verify a hex DER signature over `message`.
///
/// Malformed keys or signature encodings are errors; a well-formed signature
/// that does not match yields `Ok(false)`.
pub fn verify_message(public_key: &str, signature: &str, message: &[u8]) -> Result<bool> {
    let verifying_key = parse_public_key(public_key)?;
    let der = hex::decode(signature)
        .map_err(|_| XassetError::invalid_signature("signature is not hex"))?;
    let signature = Signature::from_der(&der)
        .map_err(|_| XassetError::invalid_signature("signature is not DER encoded"))?;
    let digest = hash_sha256(message);
    Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
}

/// Mint a nonce and sign its decimal form, the proof of key ownership that
/// accompanies business calls
pub fn sign_nonce(private_key: &str) -> Result<(i64, String)> {
    let nonce = crate::id::gen_nonce();
    let signature = sign_message(private_key, nonce.to_string().as_bytes())?;
    Ok((nonce, signature))
}
