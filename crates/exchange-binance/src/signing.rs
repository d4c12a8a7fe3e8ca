//! HMAC-SHA256 request signing for `USER_DATA` endpoints.

use crate::error::{BinanceError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API key header expected on signed requests.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// API credentials. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    secret: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &mask(&self.api_key))
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// # Errors
    /// Returns [`BinanceError::Configuration`] if either credential is empty.
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let secret = secret.into();
        if api_key.trim().is_empty() || secret.trim().is_empty() {
            return Err(BinanceError::Configuration(
                "API key and secret must both be set".to_string(),
            ));
        }
        Ok(Self { api_key, secret })
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex-encoded HMAC-SHA256 of the exact query string sent on the wire.
    ///
    /// # Errors
    /// Returns [`BinanceError::Configuration`] if the key is rejected by HMAC.
    pub fn sign(&self, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| BinanceError::Configuration(format!("Invalid key length: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn mask(key: &str) -> String {
    if key.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &key[..4])
}
