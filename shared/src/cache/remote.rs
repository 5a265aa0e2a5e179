use super::{CacheStore, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis backed store. Keys are written as `<prefix>:<key>` with `SET .. EX`.
#[derive(Clone)]
pub struct RedisCacheStore {
    client: redis::Client,
    prefix: String,
}

impl RedisCacheStore {
    pub fn new(url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(RedisCacheStore {
            client,
            prefix: prefix.to_string(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }
}

// Redis expiry has second granularity. Round up so nothing is stored without a TTL.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<Vec<u8>> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(self.namespaced(key), value, ttl_seconds(ttl))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_prefixed() {
        let store = RedisCacheStore::new("redis://127.0.0.1:6379/", "contributions").unwrap();
        assert_eq!(
            store.namespaced("github-contributions:2024:abcd"),
            "contributions:github-contributions:2024:abcd"
        );
    }

    #[test]
    fn test_ttl_rounding() {
        assert_eq!(ttl_seconds(Duration::from_secs(0)), 1);
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_millis(60_500)), 61);
    }

    #[test]
    fn test_invalid_url() {
        assert!(RedisCacheStore::new("definitely not redis", "p").is_err());
    }
}
