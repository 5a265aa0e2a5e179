// Cache keys derived from user input. Tokens and user names never appear in plaintext;
// everything identifying is folded into a salted digest of bounded length.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const DIGEST_BYTES: usize = 16;

#[derive(Clone)]
pub struct CacheKeyHasher {
    salt: String,
}

impl fmt::Debug for CacheKeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKeyHasher")
            .field("salt", &"<redacted>")
            .finish()
    }
}

impl CacheKeyHasher {
    pub fn new(salt: impl Into<String>) -> Self {
        CacheKeyHasher { salt: salt.into() }
    }

    /// Hex encoded HMAC-SHA256 over the NUL separated parts, truncated to 16 bytes.
    pub fn digest(&self, parts: &[&str]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.salt.as_bytes())
            .expect("HMAC can take key of any size");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                mac.update(&[0]);
            }
            mac.update(part.as_bytes());
        }
        let bytes = mac.finalize().into_bytes();
        hex::encode(&bytes[..DIGEST_BYTES])
    }

    /// Key for the full-year response of one account on one platform.
    pub fn contributions_key(
        &self,
        platform: &str,
        user: &str,
        organization: Option<&str>,
        year: i32,
        credential: &str,
    ) -> String {
        let year = year.to_string();
        let digest = self.digest(&[
            platform,
            user,
            organization.unwrap_or_default(),
            &year,
            credential,
        ]);
        format!("{platform}-contributions:{year}:{digest}")
    }

    /// Namespace for listings whose visibility depends on the credential.
    pub fn credential_scope(&self, credential: &str) -> String {
        self.digest(&["credential", credential])
    }
}
