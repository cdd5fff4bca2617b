//! Bounded response cache placed in front of the request executor.
//!
//! Responses are keyed by [`RequestSignature`]: the method, the normalized URL, and the
//! canonical JSON form of the caller's custom parameters. Request bodies are not part of the
//! key, so only read calls should be routed through the cache. Entries never expire on their
//! own; [`ResponseCache::clear`] is the only way to drop stale data besides eviction.

mod store;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	cache::store::LruStore,
	error::ConfigError,
	obs::{self, CacheEvent},
	pipeline::Method,
};

/// Cache key derived from a request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestSignature {
	method: Method,
	url: String,
	custom_parameters: String,
}
impl RequestSignature {
	/// Builds a signature; `custom_parameters` is folded in by its canonical JSON form.
	pub fn new(method: Method, url: &Url, custom_parameters: &Value) -> Self {
		Self { method, url: url.as_str().to_owned(), custom_parameters: custom_parameters.to_string() }
	}

	/// HTTP method.
	pub fn method(&self) -> Method {
		self.method
	}

	/// Normalized URL.
	pub fn url(&self) -> &str {
		&self.url
	}
}

/// Hit, miss, and eviction counters.
#[derive(Debug, Default)]
pub struct CacheStats {
	hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
}
impl CacheStats {
	/// Calls answered from the cache.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Calls that had to run.
	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}

	/// Entries dropped to respect the capacity.
	pub fn evictions(&self) -> u64 {
		self.evictions.load(Ordering::Relaxed)
	}

	fn record(&self, event: CacheEvent) {
		let counter = match event {
			CacheEvent::Hit => &self.hits,
			CacheEvent::Miss => &self.misses,
			CacheEvent::Evict => &self.evictions,
		};

		counter.fetch_add(1, Ordering::Relaxed);
		obs::record_cache_event(event);
	}
}

/// Memoizes successful responses, bounded by a maximum entry count.
#[derive(Debug)]
pub struct ResponseCache {
	store: Mutex<LruStore>,
	stats: CacheStats,
}
impl ResponseCache {
	/// Creates an empty cache holding at most `max_entries` responses.
	pub fn new(max_entries: usize) -> Result<Self, ConfigError> {
		if max_entries == 0 {
			return Err(ConfigError::ZeroCacheCapacity);
		}

		Ok(Self { store: Mutex::new(LruStore::new(max_entries)), stats: CacheStats::default() })
	}

	/// Returns the stored response for the signature, or runs `perform` and stores its result.
	///
	/// Failures are returned as-is and never stored. The lock is not held while `perform`
	/// runs, so concurrent misses on one signature may each reach the server.
	pub async fn call<F, Fut>(
		&self,
		method: Method,
		url: &Url,
		custom_parameters: &Value,
		perform: F,
	) -> Result<Value>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Value>>,
	{
		let signature = RequestSignature::new(method, url, custom_parameters);

		if let Some(response) = self.lookup(&signature) {
			return Ok(response);
		}

		let response = perform().await?;

		self.insert(signature, response.clone());

		Ok(response)
	}

	/// Returns a stored response and refreshes its recency.
	pub fn lookup(&self, signature: &RequestSignature) -> Option<Value> {
		let response = self.store.lock().touch(signature);

		self.stats.record(if response.is_some() { CacheEvent::Hit } else { CacheEvent::Miss });

		response
	}

	/// Stores a response, returning the signature evicted to make room, if any.
	pub fn insert(&self, signature: RequestSignature, response: Value) -> Option<RequestSignature> {
		let evicted = self.store.lock().insert(signature, response);

		if evicted.is_some() {
			self.stats.record(CacheEvent::Evict);
		}

		evicted
	}

	/// Returns `true` if a response is stored for the signature, without touching recency.
	pub fn contains(&self, signature: &RequestSignature) -> bool {
		self.store.lock().peek(signature).is_some()
	}

	/// Last access instant of a stored response.
	pub fn last_accessed(&self, signature: &RequestSignature) -> Option<OffsetDateTime> {
		self.store.lock().peek(signature).map(|entry| entry.last_accessed)
	}

	/// Drops every stored response.
	pub fn clear(&self) {
		self.store.lock().clear();
	}

	/// Number of stored responses.
	pub fn size(&self) -> usize {
		self.store.lock().len()
	}

	/// Capacity bound.
	pub fn max_entries(&self) -> usize {
		self.store.lock().max_entries()
	}

	/// Hit, miss, and eviction counters.
	pub fn stats(&self) -> &CacheStats {
		&self.stats
	}
}
