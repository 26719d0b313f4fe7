//! Operator authorization adapters.
//!
//! The operator routes take a bearer credential.  With a key configured,
//! [`SharedKeyGate`] accepts exactly that key; without one the server
//! runs [`AllowAll`] and logs a warning at startup.
//!
//! The key is never compared directly.  Both sides are reduced to
//! `HMAC-SHA256(key, CONTEXT)` and checked with the constant-time
//! `hmac_sha256::HMAC::verify`, so the comparison time does not depend on
//! where the candidate first differs or on its length.

use crate::app::ports::OperatorGate;

const CONTEXT: &[u8] = b"gatelink operator v1";

/// Accepts every request.
pub struct AllowAll;

impl OperatorGate for AllowAll {
    fn authorize(&self, _credential: Option<&str>) -> bool {
        true
    }
}

pub struct SharedKeyGate {
    expected: [u8; 32],
}

impl SharedKeyGate {
    pub fn new(key: &str) -> Self {
        Self {
            expected: hmac_sha256::HMAC::mac(CONTEXT, key.as_bytes()),
        }
    }
}

impl OperatorGate for SharedKeyGate {
    fn authorize(&self, credential: Option<&str>) -> bool {
        match credential {
            Some(candidate) => {
                hmac_sha256::HMAC::verify(CONTEXT, candidate.as_bytes(), &self.expected)
            }
            None => false,
        }
    }
}
