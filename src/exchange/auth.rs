//! Request authentication for the BTCTurk API.
//!
//! Authenticated endpoints expect three headers:
//! - `X-PCK`: the API public key,
//! - `X-Stamp`: a millisecond nonce,
//! - `X-Signature`: base64 HMAC-SHA256 of `public_key + nonce`, keyed
//!   with the base64-decoded private key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// One set of authentication headers, valid for a single request.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// `X-PCK` value.
    pub public_key: String,
    /// `X-Stamp` value.
    pub nonce: String,
    /// `X-Signature` value.
    pub signature: String,
}

impl AuthHeaders {
    /// Header name/value pairs in request order.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("X-PCK", self.public_key.as_str()),
            ("X-Stamp", self.nonce.as_str()),
            ("X-Signature", self.signature.as_str()),
        ]
    }
}

/// Sign a request with the given credentials and an explicit nonce.
pub fn sign_with_nonce(
    public_key: &str,
    private_key: &str,
    nonce: &str,
) -> Result<AuthHeaders, ExchangeError> {
    let secret = BASE64
        .decode(private_key)
        .map_err(|e| ExchangeError::Auth(format!("private key is not valid base64: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(&secret)
        .map_err(|e| ExchangeError::Auth(format!("invalid HMAC key: {e}")))?;
    mac.update(public_key.as_bytes());
    mac.update(nonce.as_bytes());

    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(AuthHeaders {
        public_key: public_key.to_string(),
        nonce: nonce.to_string(),
        signature,
    })
}

/// Sign a request using the current wall clock as the nonce.
pub fn sign(public_key: &str, private_key: &str) -> Result<AuthHeaders, ExchangeError> {
    let nonce = chrono::Utc::now().timestamp_millis().to_string();
    sign_with_nonce(public_key, private_key, &nonce)
}
