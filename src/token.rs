//! CSRF tokens for action link URLs
//!
//! A token is the HMAC-SHA256 of the link path under the service key, hex
//! encoded so it is URL safe without escaping.
use crate::{
    error::{ActionLinkError, Result},
    utils,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct CsrfTokenGenerator {
    key: String,
}

impl CsrfTokenGenerator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Generator with a freshly generated key.
    pub fn generate() -> Result<Self> {
        let key = utils::new_uuid_to_bech32("csrf")
            .map_err(|e| ActionLinkError::Config(format!("failed to generate CSRF key: {e}")))?;
        Ok(Self::new(key))
    }

    fn mac(&self, value: &str) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|e| ActionLinkError::Config(format!("invalid CSRF key: {e}")))?;
        mac.update(value.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    pub fn get(&self, value: &str) -> Result<String> {
        Ok(hex::encode(self.mac(value)?))
    }

    pub fn validate(&self, token: &str, value: &str) -> bool {
        let Ok(given) = hex::decode(token) else {
            return false;
        };
        match self.mac(value) {
            Ok(expected) => expected.as_slice().ct_eq(given.as_slice()).into(),
            Err(_) => false,
        }
    }
}
