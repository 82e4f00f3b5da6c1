use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use app_core::error::AppError;
use async_trait::async_trait;
use bb8_redis::redis::AsyncCommands;
use bb8_redis::{RedisConnectionManager, bb8, redis};

/// Server-side storage for per-browser session values.
///
/// A session is identified by the opaque id carried in the session cookie and
/// holds a small map of string values. Every write refreshes the session TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads a value without removing it.
    async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, AppError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), AppError>;

    /// Reads and removes a value in one step. A second `pop` of the same key
    /// returns `None`.
    async fn pop(&self, sid: &str, key: &str) -> Result<Option<String>, AppError>;

    /// Drops every value of the session.
    async fn clear(&self, sid: &str) -> Result<(), AppError>;
}

// Longer TTLs are clamped so expiry times stay representable.
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    values: HashMap<String, String>,
    expires_at: Instant,
}

struct Sessions {
    entries: HashMap<String, Entry>,
    next_sweep: Instant,
}

/// Process-local [`SessionStore`]. The touched session is checked for expiry
/// on every access; the rest are swept at most once per minute.
pub struct SessionMemory {
    ttl: Duration,
    sessions: Mutex<Sessions>,
}

impl SessionMemory {
    pub fn new(ttl: Duration) -> Self {
        let sessions = Sessions { entries: HashMap::new(), next_sweep: Instant::now() + SWEEP_INTERVAL };
        Self { ttl: ttl.min(MAX_TTL), sessions: Mutex::new(sessions) }
    }

    fn with_session<T>(&self, sid: &str, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> Result<T, AppError> {
        let mut sessions = self.sessions.lock().map_err(|_| {
            tracing::error!("session store lock poisoned");
            AppError::Internal
        })?;

        let now = Instant::now();
        if now >= sessions.next_sweep {
            sessions.entries.retain(|_, entry| entry.expires_at > now);
            sessions.next_sweep = now + SWEEP_INTERVAL;
        } else if sessions.entries.get(sid).is_some_and(|entry| entry.expires_at <= now) {
            sessions.entries.remove(sid);
        }

        Ok(f(&mut sessions.entries))
    }
}

#[async_trait]
impl SessionStore for SessionMemory {
    async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, AppError> {
        self.with_session(sid, |sessions| sessions.get(sid).and_then(|entry| entry.values.get(key).cloned()))
    }

    async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), AppError> {
        let expires_at = Instant::now() + self.ttl;
        self.with_session(sid, |sessions| {
            let entry = sessions
                .entry(sid.to_string())
                .or_insert_with(|| Entry { values: HashMap::new(), expires_at });
            entry.values.insert(key.to_string(), value.to_string());
            entry.expires_at = expires_at;
        })
    }

    async fn pop(&self, sid: &str, key: &str) -> Result<Option<String>, AppError> {
        self.with_session(sid, |sessions| sessions.get_mut(sid).and_then(|entry| entry.values.remove(key)))
    }

    async fn clear(&self, sid: &str) -> Result<(), AppError> {
        self.with_session(sid, |sessions| {
            sessions.remove(sid);
        })
    }
}

/// Redis-backed [`SessionStore`]. Each session is one hash under
/// `session:{sid}` with a TTL.
pub struct SessionRedis {
    pool: bb8::Pool<RedisConnectionManager>,
    ttl_secs: i64,
}

impl SessionRedis {
    pub fn new(pool: bb8::Pool<RedisConnectionManager>, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        Self { pool, ttl_secs }
    }

    fn key(sid: &str) -> String {
        format!("session:{sid}")
    }
}

#[async_trait]
impl SessionStore for SessionRedis {
    async fn get(&self, sid: &str, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.hget(Self::key(sid), key).await?;
        Ok(value)
    }

    async fn set(&self, sid: &str, key: &str, value: &str) -> Result<(), AppError> {
        let session_key = Self::key(sid);
        let mut conn = self.pool.get().await?;
        let _: () = redis::pipe()
            .atomic()
            .hset(&session_key, key, value)
            .ignore()
            .expire(&session_key, self.ttl_secs)
            .ignore()
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }

    async fn pop(&self, sid: &str, key: &str) -> Result<Option<String>, AppError> {
        let session_key = Self::key(sid);
        let mut conn = self.pool.get().await?;
        let (value,): (Option<String>,) = redis::pipe()
            .atomic()
            .hget(&session_key, key)
            .hdel(&session_key, key)
            .ignore()
            .query_async(&mut *conn)
            .await?;
        Ok(value)
    }

    async fn clear(&self, sid: &str) -> Result<(), AppError> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(Self::key(sid)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::*;

    use super::*;

    fn store() -> SessionMemory {
        SessionMemory::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_memory_set_and_get() {
        let store = store();
        store.set("sid-1", "oauth_state", "nonce").await.unwrap();

        assert_eq!(store.get("sid-1", "oauth_state").await.unwrap(), Some("nonce".to_string()));
        assert_eq!(store.get("sid-1", "user_data").await.unwrap(), None);
        assert_eq!(store.get("sid-2", "oauth_state").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_set_overwrites() {
        let store = store();
        store.set("sid-1", "oauth_state", "first").await.unwrap();
        store.set("sid-1", "oauth_state", "second").await.unwrap();

        assert_eq!(store.get("sid-1", "oauth_state").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_memory_pop_is_single_use() {
        let store = store();
        store.set("sid-1", "oauth_state", "nonce").await.unwrap();

        assert_eq!(store.pop("sid-1", "oauth_state").await.unwrap(), Some("nonce".to_string()));
        assert_eq!(store.pop("sid-1", "oauth_state").await.unwrap(), None);
        assert_eq!(store.pop("unknown", "oauth_state").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_clear() {
        let store = store();
        store.set("sid-1", "user_data", "{}").await.unwrap();
        store.set("sid-1", "redirect_path", "/home").await.unwrap();
        store.set("sid-2", "user_data", "{}").await.unwrap();

        store.clear("sid-1").await.unwrap();
        store.clear("never-existed").await.unwrap();

        assert_eq!(store.get("sid-1", "user_data").await.unwrap(), None);
        assert_eq!(store.get("sid-1", "redirect_path").await.unwrap(), None);
        assert_eq!(store.get("sid-2", "user_data").await.unwrap(), Some("{}".to_string()));
    }

    #[tokio::test]
    async fn test_memory_expired_session_is_gone() {
        let store = SessionMemory::new(Duration::ZERO);
        store.set("sid-1", "user_data", "{}").await.unwrap();

        assert_eq!(store.get("sid-1", "user_data").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_huge_ttl_is_clamped() {
        let store = SessionMemory::new(Duration::from_secs(u64::MAX));
        store.set("sid-1", "oauth_state", "nonce").await.unwrap();

        assert_eq!(store.ttl, MAX_TTL);
        assert_eq!(store.get("sid-1", "oauth_state").await.unwrap(), Some("nonce".to_string()));
    }

    #[tokio::test]
    async fn test_memory_sweep_drops_other_expired_sessions() {
        let store = SessionMemory::new(Duration::ZERO);
        store.set("stale-1", "oauth_state", "a").await.unwrap();
        store.set("stale-2", "oauth_state", "b").await.unwrap();
        assert_eq!(store.sessions.lock().unwrap().entries.len(), 2);

        store.sessions.lock().unwrap().next_sweep = Instant::now();
        store.get("other", "oauth_state").await.unwrap();

        assert!(store.sessions.lock().unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn test_mock_store_error() {
        let mut mock = MockSessionStore::new();
        mock.expect_pop()
            .with(eq("sid-1"), eq("oauth_state"))
            .times(1)
            .returning(|_, _| Err(AppError::Internal));

        assert!(matches!(mock.pop("sid-1", "oauth_state").await, Err(AppError::Internal)));
    }

    #[test]
    fn test_redis_key_format() {
        assert_eq!(SessionRedis::key("abc"), "session:abc");
    }
}
