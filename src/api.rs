//! Resource-operation facade over the request pipeline.
//!
//! [`SuiteCrm`] builds URLs and payloads for every operation and hands them to the
//! [`RequestExecutor`]. Read operations go through the optional [`ResponseCache`]; writes
//! always reach the server.

mod attachments;
mod document;
mod modules;
mod records;
mod relationships;

pub use document::*;
pub use modules::*;
pub use records::*;
pub use relationships::*;

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	cache::ResponseCache,
	config::ClientConfig,
	error::ConfigError,
	http::CrmHttpClient,
	oauth::TransportErrorMapper,
	pipeline::{Method, RequestExecutor, TokenManager},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestSuiteCrm = SuiteCrm<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// SuiteCRM API client.
pub struct SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<ClientConfig>,
	executor: RequestExecutor<C, M>,
	cache: Option<Arc<ResponseCache>>,
}
impl<C, M> SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an uncached client that reuses the caller-provided transport and mapper.
	pub fn with_http_client(
		config: ClientConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let http_client = http_client.into();
		let mapper = mapper.into();
		let tokens = Arc::new(TokenManager::new(&config, http_client.clone(), mapper.clone())?);

		Ok(Self {
			config: Arc::new(config),
			executor: RequestExecutor::new(tokens, http_client, mapper),
			cache: None,
		})
	}

	/// Attaches a response cache sized by the configured capacity.
	pub fn cached(self) -> Result<Self> {
		let cache = ResponseCache::new(self.config.cache_capacity)?;

		Ok(self.with_cache(Arc::new(cache)))
	}

	/// Attaches an existing response cache.
	pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token manager shared by every call of this client.
	pub fn tokens(&self) -> &Arc<TokenManager<C, M>> {
		self.executor.tokens()
	}

	/// Attached response cache, if any.
	pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
		self.cache.as_ref()
	}

	/// Empties the response cache; no-op for uncached clients.
	pub fn clear_cache(&self) {
		if let Some(cache) = &self.cache {
			cache.clear();
		}
	}

	/// Number of cached responses; `0` for uncached clients.
	pub fn cache_size(&self) -> usize {
		self.cache.as_ref().map_or(0, |cache| cache.size())
	}

	/// Issues a raw call through the executor, bypassing the cache.
	pub async fn execute(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<Value> {
		self.executor.execute(method, url, body).await
	}

	/// Issues a `GET`, answered from the cache when one is attached.
	pub(crate) async fn read(&self, url: &Url, custom_parameters: Value) -> Result<Value> {
		match &self.cache {
			Some(cache) =>
				cache
					.call(Method::Get, url, &custom_parameters, || {
						self.executor.execute(Method::Get, url, None)
					})
					.await,
			None => self.executor.execute(Method::Get, url, None).await,
		}
	}

	/// Builds `{base}{api prefix}{path}/{segments...}` with each segment percent-encoded.
	pub(crate) fn endpoint(&self, path: &str, segments: &[&str]) -> Result<Url> {
		let mut url = self.config.api_url(path)?;

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidEndpoint {
				url: self.config.endpoint_base.to_string(),
				reason: "URL cannot carry path segments",
			})?
			.extend(segments);

		Ok(url)
	}
}
#[cfg(feature = "reqwest")]
impl SuiteCrm<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an uncached client with a reqwest transport built from `config`.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Self::with_http_client(config, http_client, ReqwestTransportErrorMapper)
	}
}
impl<C, M> Debug for SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SuiteCrm")
			.field("endpoint_base", &self.config.endpoint_base.as_str())
			.field("executor", &self.executor)
			.field("cache_size", &self.cache_size())
			.finish()
	}
}

/// Appends `key=value` pairs and raw fragments as a query string, preserving order.
pub(crate) fn set_query(url: &mut Url, parts: &[String]) {
	if parts.is_empty() {
		url.set_query(None);
	} else {
		url.set_query(Some(&parts.join("&")));
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	fn client() -> ReqwestSuiteCrm {
		let config = ClientConfig::builder("https://crm.example.com/", "client", "secret")
			.cache_capacity(4)
			.build()
			.expect("Config fixture should be valid.");

		ReqwestSuiteCrm::new(config).expect("Client should build.")
	}

	#[test]
	fn endpoints_escape_segments() {
		let url = client()
			.endpoint("/V8/module", &["Accounts", "a b/c"])
			.expect("Endpoint should build.");

		assert_eq!(url.as_str(), "https://crm.example.com/legacy/Api/V8/module/Accounts/a%20b%2Fc");
	}

	#[test]
	fn cache_helpers_are_noops_without_a_cache() {
		let client = client();

		client.clear_cache();

		assert_eq!(client.cache_size(), 0);
		assert!(client.cache().is_none());

		let client = client.cached().expect("Cache should attach.");

		assert_eq!(client.cache().map(|cache| cache.max_entries()), Some(4));
	}

	#[test]
	fn query_parts_keep_brackets() {
		let mut url = Url::parse("https://crm.example.com/x").expect("URL fixture should parse.");

		set_query(&mut url, &["fields[Accounts]=name,email".into(), "page[number]=1".into()]);

		assert_eq!(url.as_str(), "https://crm.example.com/x?fields[Accounts]=name,email&page[number]=1");
	}
}
