//! Bounded signature-to-response map with least-recently-accessed eviction.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, cache::RequestSignature};

#[derive(Clone, Debug)]
pub(crate) struct CacheEntry {
	pub(crate) response: Value,
	pub(crate) last_accessed: OffsetDateTime,
	recency: u64,
}

/// Lock-free core of the response cache; callers wrap it in one mutex.
#[derive(Debug)]
pub(crate) struct LruStore {
	entries: HashMap<RequestSignature, CacheEntry>,
	max_entries: usize,
	clock: u64,
}
impl LruStore {
	pub(crate) fn new(max_entries: usize) -> Self {
		Self { entries: HashMap::new(), max_entries, clock: 0 }
	}

	pub(crate) fn max_entries(&self) -> usize {
		self.max_entries
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn clear(&mut self) {
		self.entries.clear();
	}

	pub(crate) fn peek(&self, signature: &RequestSignature) -> Option<&CacheEntry> {
		self.entries.get(signature)
	}

	/// Returns the stored response and marks the entry as most recently accessed.
	pub(crate) fn touch(&mut self, signature: &RequestSignature) -> Option<Value> {
		let recency = self.tick();
		let entry = self.entries.get_mut(signature)?;

		entry.recency = recency;
		entry.last_accessed = OffsetDateTime::now_utc();

		Some(entry.response.clone())
	}

	/// Inserts or replaces an entry, evicting at most one entry to stay within bounds.
	pub(crate) fn insert(
		&mut self,
		signature: RequestSignature,
		response: Value,
	) -> Option<RequestSignature> {
		let recency = self.tick();

		self.entries.insert(
			signature,
			CacheEntry { response, last_accessed: OffsetDateTime::now_utc(), recency },
		);

		if self.entries.len() > self.max_entries { self.evict_oldest() } else { None }
	}

	fn evict_oldest(&mut self) -> Option<RequestSignature> {
		let oldest = self
			.entries
			.iter()
			.min_by_key(|(_, entry)| entry.recency)
			.map(|(signature, _)| signature.clone())?;

		self.entries.remove(&oldest);

		Some(oldest)
	}

	fn tick(&mut self) -> u64 {
		self.clock += 1;

		self.clock
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::pipeline::Method;

	fn signature(path: &str) -> RequestSignature {
		let url = Url::parse(&format!("https://crm.example.com/{path}"))
			.expect("Signature URL fixture should parse.");

		RequestSignature::new(Method::Get, &url, &Value::Null)
	}

	#[test]
	fn replacing_an_entry_never_evicts() {
		let mut store = LruStore::new(1);

		assert!(store.insert(signature("a"), json!(1)).is_none());
		assert!(store.insert(signature("a"), json!(2)).is_none());
		assert_eq!(store.len(), 1);
		assert_eq!(store.touch(&signature("a")), Some(json!(2)));
	}

	#[test]
	fn touch_refreshes_recency_and_timestamp() {
		let mut store = LruStore::new(2);

		store.insert(signature("a"), json!("a"));

		let before = store.peek(&signature("a")).map(|entry| entry.last_accessed);

		store.insert(signature("b"), json!("b"));
		store.touch(&signature("a"));

		assert!(store.peek(&signature("a")).map(|entry| entry.last_accessed) >= before);
		assert_eq!(store.insert(signature("c"), json!("c")), Some(signature("b")));
		assert!(store.touch(&signature("missing")).is_none());
	}
}
