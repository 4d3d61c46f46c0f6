//! Time-based one-time codes (RFC 6238)

use hmac::{Hmac, Mac};
use sha1::Sha1;

const PERIOD_SECS: u64 = 30;
const DIGITS: u32 = 6;

/// Six-digit HMAC-SHA1 codes over 30 second steps
#[derive(Clone)]
pub struct Totp {
    secret: Vec<u8>,
}

impl Totp {
    /// `secret` is used as raw key bytes, not base32
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Code for the step containing `unix_secs`
    pub fn at(&self, unix_secs: u64) -> String {
        let counter = unix_secs / PERIOD_SECS;
        // HMAC accepts keys of any length
        let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(&self.secret) else {
            return String::new();
        };
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = usize::from(digest[digest.len() - 1] & 0x0f);
        let binary = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        format!("{:0width$}", binary % 10u32.pow(DIGITS), width = DIGITS as usize)
    }

    pub fn now(&self) -> String {
        let secs = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.at(secs)
    }
}
