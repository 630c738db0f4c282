#![allow(clippy::must_use_candidate)]

//! In-memory exact-match cache for chat completion responses
//!
//! Entries are keyed by a SHA-256 fingerprint of the fields that determine a
//! completion: model, messages, sampling parameters, safety prompt and seed.
//! Each entry lives for the configured TTL at most and is dropped earlier if
//! left unread for half of it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use mini_moka::sync::Cache;
use mistral_config::CacheConfig;
use mistral_core::{ChatCompletionRequest, Content, Role};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// The request could not be serialized into a key
    #[error("serialization: {0}")]
    Serialization(String),
}

/// Fields hashed into a cache key, in hashing order
///
/// Floats are hashed by bit pattern so non-finite values stay distinct from
/// an absent field.
#[derive(Serialize)]
struct KeyFields<'a> {
    model: &'a str,
    messages: Vec<(Role, &'a Content)>,
    temperature: Option<u64>,
    top_p: Option<u64>,
    max_tokens: Option<u32>,
    safe_prompt: bool,
    random_seed: Option<u64>,
}

/// Compute the cache key for a chat completion request
///
/// Returns 64 lowercase hex characters. Requests differing in any hashed
/// field, message order included, produce different keys.
///
/// # Errors
///
/// Returns an error if the request cannot be serialized
pub fn cache_key(request: &ChatCompletionRequest) -> Result<String, CacheError> {
    let fields = KeyFields {
        model: &request.model,
        messages: request.messages.iter().map(|m| (m.role, &m.content)).collect(),
        temperature: request.temperature.map(f64::to_bits),
        top_p: request.top_p.map(f64::to_bits),
        max_tokens: request.max_tokens,
        safe_prompt: request.safe_prompt,
        random_seed: request.random_seed,
    };

    let json = serde_json::to_vec(&fields).map_err(|e| CacheError::Serialization(e.to_string()))?;
    Ok(format!("{:x}", Sha256::digest(&json)))
}

/// Whether responses to this request may be cached
///
/// Streaming responses are never cached.
pub const fn is_cacheable(request: &ChatCompletionRequest) -> bool {
    !request.stream
}

/// Stored value plus its access bookkeeping
struct Slot<V> {
    value: V,
    created: Instant,
    /// Nanoseconds after `created` of the last hit
    last_read: AtomicU64,
}

impl<V> Slot<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            created: Instant::now(),
            last_read: AtomicU64::new(0),
        }
    }

    /// Record a read unless the entry is already past either deadline
    fn touch(&self, ttl: Duration, idle: Duration) -> bool {
        let age = self.created.elapsed();
        if age >= ttl {
            return false;
        }

        let last_read = Duration::from_nanos(self.last_read.load(Ordering::Acquire));
        if age.saturating_sub(last_read) >= idle {
            return false;
        }

        let age_nanos = u64::try_from(age.as_nanos()).unwrap_or(u64::MAX);
        self.last_read.fetch_max(age_nanos, Ordering::AcqRel);
        true
    }
}

/// Response cache with absolute and sliding expiry
///
/// A disabled cache accepts every call and stores nothing.
#[derive(Clone)]
pub struct ResponseCache<V> {
    entries: Option<Cache<String, Arc<Slot<V>>>>,
    ttl: Duration,
    idle: Duration,
}

impl<V> ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self::with_ttl(config.ttl(), config.max_entries)
    }

    /// Enabled cache with the given lifetime and capacity
    ///
    /// Entries unread for half of `ttl` expire early.
    pub fn with_ttl(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            entries: Some(entries),
            ttl,
            idle: ttl / 2,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            entries: None,
            ttl: Duration::ZERO,
            idle: Duration::ZERO,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Look up a cached response
    ///
    /// A hit restarts the entry's idle window.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.as_ref()?;
        let owned = key.to_owned();

        let hit = match entries.get(&owned) {
            Some(slot) if slot.touch(self.ttl, self.idle) => Some(slot.value.clone()),
            Some(_) => {
                entries.invalidate(&owned);
                None
            }
            None => None,
        };

        if hit.is_some() {
            tracing::debug!(cache_key = fingerprint(key), "cache hit");
        } else {
            tracing::debug!(cache_key = fingerprint(key), "cache miss");
        }

        hit
    }

    /// Store a successful response
    pub fn put(&self, key: &str, value: V) {
        if let Some(entries) = &self.entries {
            entries.insert(key.to_owned(), Arc::new(Slot::new(value)));
            tracing::debug!(cache_key = fingerprint(key), "cached response");
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.invalidate_all();
            tracing::debug!("cache cleared");
        }
    }
}

impl<V> std::fmt::Debug for ResponseCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.entries.is_some())
            .finish_non_exhaustive()
    }
}

/// Short key prefix for logs
fn fingerprint(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use mistral_core::Message;

    use super::*;

    fn request(text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::new("mistral-small-latest", vec![Message::user(text)])
    }

    #[test]
    fn key_is_deterministic_hex() {
        let a = cache_key(&request("hi")).unwrap();
        let b = cache_key(&request("hi")).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_depends_on_hashed_fields() {
        let base = cache_key(&request("hi")).unwrap();

        assert_ne!(base, cache_key(&request("bye")).unwrap());
        assert_ne!(base, cache_key(&request("hi").with_random_seed(1)).unwrap());
        assert_ne!(base, cache_key(&request("hi").with_temperature(0.0)).unwrap());
        assert_ne!(base, cache_key(&request("hi").with_safe_prompt(true)).unwrap());

        let other_model = ChatCompletionRequest {
            model: "mistral-large-latest".to_owned(),
            ..request("hi")
        };
        assert_ne!(base, cache_key(&other_model).unwrap());

        let system = ChatCompletionRequest::new("mistral-small-latest", vec![Message::system("hi")]);
        assert_ne!(base, cache_key(&system).unwrap());
    }

    #[test]
    fn non_finite_floats_keep_distinct_keys() {
        let unset = cache_key(&request("hi")).unwrap();
        let nan = cache_key(&request("hi").with_temperature(f64::NAN)).unwrap();
        let inf = cache_key(&request("hi").with_top_p(f64::INFINITY)).unwrap();

        assert_ne!(unset, nan);
        assert_ne!(unset, inf);
        assert_ne!(nan, cache_key(&request("hi").with_top_p(f64::NAN)).unwrap());
    }

    #[test]
    fn seeds_give_distinct_keys() {
        let one = cache_key(&request("hi").with_random_seed(1)).unwrap();
        let two = cache_key(&request("hi").with_random_seed(2)).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn message_order_matters() {
        let ab = ChatCompletionRequest::new("m", vec![Message::user("a"), Message::user("b")]);
        let ba = ChatCompletionRequest::new("m", vec![Message::user("b"), Message::user("a")]);
        assert_ne!(cache_key(&ab).unwrap(), cache_key(&ba).unwrap());
    }

    #[test]
    fn stream_flag_not_hashed() {
        let mut streaming = request("hi");
        streaming.stream = true;
        assert_eq!(cache_key(&request("hi")).unwrap(), cache_key(&streaming).unwrap());
    }

    #[test]
    fn streaming_not_cacheable() {
        let mut req = request("hi");
        assert!(is_cacheable(&req));
        req.stream = true;
        assert!(!is_cacheable(&req));
    }

    #[test]
    fn put_then_get() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(60), 10);
        assert_eq!(cache.get("k"), None);

        cache.put("k", "v".to_owned());
        assert_eq!(cache.get("k"), Some("v".to_owned()));
    }

    #[test]
    fn disabled_cache_is_noop() {
        let cache = ResponseCache::new(&CacheConfig::default());
        assert!(!cache.is_enabled());

        cache.put("k", 1_u32);
        assert_eq!(cache.get("k"), None);
        cache.clear();
    }

    #[test]
    fn enabled_from_config() {
        let config = CacheConfig {
            enabled: true,
            ..CacheConfig::default()
        };
        let cache = ResponseCache::new(&config);
        cache.put("k", 1_u32);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(60), 10);
        cache.put("a", 1_u32);
        cache.put("b", 2_u32);

        cache.clear();

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn idle_entries_expire_at_half_ttl() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(1), 10);
        cache.put("k", 1_u32);

        thread::sleep(Duration::from_millis(700));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn reads_extend_until_absolute_ttl() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(1), 10);
        cache.put("k", 1_u32);

        for _ in 0..3 {
            thread::sleep(Duration::from_millis(250));
            assert_eq!(cache.get("k"), Some(1));
        }

        thread::sleep(Duration::from_millis(400));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn each_read_restarts_idle_window() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(2), 10);
        cache.put("k", 1_u32);

        // Idle window is 1s; reads every 600ms keep the entry alive past it
        for _ in 0..3 {
            thread::sleep(Duration::from_millis(600));
            assert_eq!(cache.get("k"), Some(1));
        }

        thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn concurrent_access() {
        let cache = Arc::new(ResponseCache::with_ttl(Duration::from_secs(60), 1000));

        thread::scope(|scope| {
            for worker in 0..8_u32 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    for i in 0..50_u32 {
                        let key = format!("{worker}-{i}");
                        cache.put(&key, i);
                        assert_eq!(cache.get(&key), Some(i));
                    }
                });
            }
        });

        assert_eq!(cache.get("7-49"), Some(49));
    }
}
