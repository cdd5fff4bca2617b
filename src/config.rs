//! Client configuration: validated values, builder, and file/environment loaders.
//!
//! Configuration is resolved once, before the token manager is constructed. Values can be
//! assembled in code through [`ClientConfigBuilder`], read from a TOML file with
//! [`ClientConfig::from_file`], or pulled from `SUITECRM_*` environment variables with
//! [`ClientConfig::from_env`]. Every path ends in [`ClientConfigBuilder::build`], so the same
//! validation applies regardless of the source.

// std
use std::{env, fs, path::Path};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Default bound on the number of cached responses.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
/// Default window before expiry in which a token is already treated as expired.
pub const DEFAULT_EXPIRY_LEEWAY: Duration = Duration::seconds(30);
/// Largest accepted expiry leeway.
pub const MAX_EXPIRY_LEEWAY: Duration = Duration::days(1);
/// User agent sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("suitecrm-client/", env!("CARGO_PKG_VERSION"));

/// URL layout of the CRM's REST API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiLayout {
	/// SuiteCRM 8.x, which serves the API below `/legacy`.
	#[default]
	Suite8,
	/// SuiteCRM 7.x.
	Suite7,
}
impl ApiLayout {
	/// Path prefix shared by every API route.
	pub const fn prefix(self) -> &'static str {
		match self {
			ApiLayout::Suite8 => "/legacy/Api",
			ApiLayout::Suite7 => "/Api",
		}
	}
}
impl FromStr for ApiLayout {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"suite8" | "8" | "v8" => Ok(Self::Suite8),
			"suite7" | "7" | "v7" => Ok(Self::Suite7),
			_ => Err(ConfigError::InvalidValue { field: "api_layout", value: s.to_owned() }),
		}
	}
}

/// How client credentials are presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Form POST body parameters for `client_id`/`client_secret`.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Immutable, validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL of the CRM instance (no trailing API path).
	pub endpoint_base: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
	/// Whether TLS certificates are verified.
	pub verify_tls: bool,
	/// REST API layout.
	pub api_layout: ApiLayout,
	/// Client authentication method for the token endpoint.
	pub client_auth: ClientAuthMethod,
	/// Tokens closer than this to expiry are treated as expired.
	pub expiry_leeway: Duration,
	/// Maximum number of cached responses.
	pub cache_capacity: usize,
	/// User agent header value.
	pub user_agent: String,
}
impl ClientConfig {
	/// Creates a builder for the three mandatory settings.
	pub fn builder(
		endpoint_base: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> ClientConfigBuilder {
		ClientConfigBuilder::new(endpoint_base, client_id, client_secret)
	}

	/// Parses a TOML document.
	///
	/// ```toml
	/// url = "https://crm.example.com"
	/// client_id = "3d3c..."
	/// client_secret = "..."
	/// verify_tls = true
	/// api_layout = "suite8"
	/// ```
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let file: ConfigFile = toml::from_str(raw)?;

		file.into_builder().build()
	}

	/// Reads and parses a TOML configuration file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_toml_str(&raw)
	}

	/// Reads `SUITECRM_*` variables from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Builds a configuration from any key lookup, using the `SUITECRM_*` variable names.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |key: &'static str, field: &'static str| {
			lookup(key).filter(|v| !v.trim().is_empty()).ok_or(ConfigError::MissingField { field })
		};
		let mut builder = ClientConfigBuilder::new(
			required("SUITECRM_URL", "url")?,
			required("SUITECRM_CLIENT_ID", "client_id")?,
			required("SUITECRM_CLIENT_SECRET", "client_secret")?,
		);

		if let Some(raw) = lookup("SUITECRM_VERIFY_TLS") {
			builder = builder.verify_tls(parse_bool("verify_tls", &raw)?);
		}
		if let Some(raw) = lookup("SUITECRM_API_LAYOUT") {
			builder = builder.api_layout(raw.parse()?);
		}
		if let Some(raw) = lookup("SUITECRM_CACHE_CAPACITY") {
			builder = builder.cache_capacity(parse_number("cache_capacity", &raw)?);
		}
		if let Some(raw) = lookup("SUITECRM_EXPIRY_LEEWAY_SECS") {
			let secs: i64 = parse_number("expiry_leeway_secs", &raw)?;

			builder = builder.expiry_leeway(Duration::seconds(secs));
		}

		builder.build()
	}

	/// Token endpoint used for the client-credentials exchange.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		self.api_url("/access_token")
	}

	/// JSON:API module endpoint.
	pub fn module_url(&self) -> Result<Url, ConfigError> {
		self.api_url("/V8/module")
	}

	/// Joins `path` below the API prefix of the configured layout.
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		let raw = format!(
			"{}{}{}",
			self.endpoint_base.as_str().trim_end_matches('/'),
			self.api_layout.prefix(),
			path
		);

		Url::parse(&raw).map_err(|source| ConfigError::UnparsableEndpoint { source })
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	endpoint_base: String,
	client_id: String,
	client_secret: String,
	verify_tls: bool,
	api_layout: ApiLayout,
	client_auth: ClientAuthMethod,
	expiry_leeway: Duration,
	cache_capacity: usize,
	user_agent: String,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults for every optional setting.
	pub fn new(
		endpoint_base: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			endpoint_base: endpoint_base.into(),
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			verify_tls: true,
			api_layout: ApiLayout::default(),
			client_auth: ClientAuthMethod::default(),
			expiry_leeway: DEFAULT_EXPIRY_LEEWAY,
			cache_capacity: DEFAULT_CACHE_CAPACITY,
			user_agent: DEFAULT_USER_AGENT.into(),
		}
	}

	/// Enables or disables TLS certificate verification.
	pub fn verify_tls(mut self, verify: bool) -> Self {
		self.verify_tls = verify;

		self
	}

	/// Overrides the API layout.
	pub fn api_layout(mut self, layout: ApiLayout) -> Self {
		self.api_layout = layout;

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Overrides the expiry leeway; negative values are clamped to zero.
	///
	/// [`ClientConfigBuilder::build`] rejects values above [`MAX_EXPIRY_LEEWAY`].
	pub fn expiry_leeway(mut self, leeway: Duration) -> Self {
		self.expiry_leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Overrides the response cache capacity.
	pub fn cache_capacity(mut self, capacity: usize) -> Self {
		self.cache_capacity = capacity;

		self
	}

	/// Overrides the user agent.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let endpoint_base = parse_endpoint(self.endpoint_base.trim())?;

		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingField { field: "client_id" });
		}

		let client_secret = TokenSecret::new(self.client_secret);

		if client_secret.is_blank() {
			return Err(ConfigError::MissingField { field: "client_secret" });
		}
		if self.cache_capacity == 0 {
			return Err(ConfigError::ZeroCacheCapacity);
		}
		if self.expiry_leeway > MAX_EXPIRY_LEEWAY {
			return Err(ConfigError::InvalidValue {
				field: "expiry_leeway_secs",
				value: self.expiry_leeway.whole_seconds().to_string(),
			});
		}

		Ok(ClientConfig {
			endpoint_base,
			client_id: self.client_id.trim().to_owned(),
			client_secret,
			verify_tls: self.verify_tls,
			api_layout: self.api_layout,
			client_auth: self.client_auth,
			expiry_leeway: self.expiry_leeway,
			cache_capacity: self.cache_capacity,
			user_agent: self.user_agent,
		})
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
	url: String,
	client_id: String,
	client_secret: String,
	#[serde(default)]
	verify_tls: Option<bool>,
	#[serde(default)]
	api_layout: Option<ApiLayout>,
	#[serde(default)]
	client_auth: Option<ClientAuthMethod>,
	#[serde(default)]
	expiry_leeway_secs: Option<i64>,
	#[serde(default)]
	cache_capacity: Option<usize>,
	#[serde(default)]
	user_agent: Option<String>,
}
impl ConfigFile {
	fn into_builder(self) -> ClientConfigBuilder {
		let mut builder = ClientConfigBuilder::new(self.url, self.client_id, self.client_secret);

		if let Some(verify) = self.verify_tls {
			builder = builder.verify_tls(verify);
		}
		if let Some(layout) = self.api_layout {
			builder = builder.api_layout(layout);
		}
		if let Some(method) = self.client_auth {
			builder = builder.client_auth(method);
		}
		if let Some(secs) = self.expiry_leeway_secs {
			builder = builder.expiry_leeway(Duration::seconds(secs));
		}
		if let Some(capacity) = self.cache_capacity {
			builder = builder.cache_capacity(capacity);
		}
		if let Some(agent) = self.user_agent {
			builder = builder.user_agent(agent);
		}

		builder
	}
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
	if raw.is_empty() {
		return Err(ConfigError::MissingField { field: "url" });
	}

	let url = Url::parse(raw).map_err(|source| ConfigError::UnparsableEndpoint { source })?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::InvalidEndpoint {
			url: raw.to_owned(),
			reason: "scheme must be http or https",
		});
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(ConfigError::InvalidEndpoint {
			url: raw.to_owned(),
			reason: "query strings and fragments are not allowed",
		});
	}

	Ok(url)
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidValue { field, value: raw.to_owned() }),
	}
}

fn parse_number<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
	T: FromStr,
{
	raw.trim().parse().map_err(|_| ConfigError::InvalidValue { field, value: raw.to_owned() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_applies_defaults() {
		let config = ClientConfig::builder("https://crm.example.com/", "client", "secret")
			.build()
			.expect("Minimal config should be valid.");

		assert!(config.verify_tls);
		assert_eq!(config.api_layout, ApiLayout::Suite8);
		assert_eq!(config.client_auth, ClientAuthMethod::ClientSecretPost);
		assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
		assert_eq!(config.expiry_leeway, DEFAULT_EXPIRY_LEEWAY);
		assert_eq!(
			config.token_url().expect("Token URL should join.").as_str(),
			"https://crm.example.com/legacy/Api/access_token"
		);
	}

	#[test]
	fn suite7_layout_drops_legacy_prefix() {
		let config = ClientConfig::builder("https://crm.example.com/crm", "client", "secret")
			.api_layout(ApiLayout::Suite7)
			.build()
			.expect("Suite7 config should be valid.");

		assert_eq!(
			config.module_url().expect("Module URL should join.").as_str(),
			"https://crm.example.com/crm/Api/V8/module"
		);
	}

	#[test]
	fn builder_rejects_invalid_values() {
		assert!(matches!(
			ClientConfig::builder("ftp://crm.example.com", "client", "secret").build(),
			Err(ConfigError::InvalidEndpoint { .. })
		));
		assert!(matches!(
			ClientConfig::builder("https://crm.example.com?x=1", "client", "secret").build(),
			Err(ConfigError::InvalidEndpoint { .. })
		));
		assert!(matches!(
			ClientConfig::builder("https://crm.example.com", " ", "secret").build(),
			Err(ConfigError::MissingField { field: "client_id" })
		));
		assert!(matches!(
			ClientConfig::builder("https://crm.example.com", "client", "").build(),
			Err(ConfigError::MissingField { field: "client_secret" })
		));
		assert!(matches!(
			ClientConfig::builder("https://crm.example.com", "client", "secret")
				.cache_capacity(0)
				.build(),
			Err(ConfigError::ZeroCacheCapacity)
		));
	}

	#[test]
	fn toml_loader_reads_optional_settings() {
		let config = ClientConfig::from_toml_str(
			r#"
url = "http://localhost:8080"
client_id = "cid"
client_secret = "csecret"
verify_tls = false
api_layout = "suite7"
client_auth = "client_secret_basic"
expiry_leeway_secs = 5
cache_capacity = 10
"#,
		)
		.expect("TOML config should parse.");

		assert!(!config.verify_tls);
		assert_eq!(config.api_layout, ApiLayout::Suite7);
		assert_eq!(config.client_auth, ClientAuthMethod::ClientSecretBasic);
		assert_eq!(config.expiry_leeway, Duration::seconds(5));
		assert_eq!(config.cache_capacity, 10);
	}

	#[test]
	fn oversized_leeway_is_rejected() {
		let err = ClientConfig::from_toml_str(
			"url = \"https://crm.example.com\"\nclient_id = \"a\"\nclient_secret = \"b\"\nexpiry_leeway_secs = 9223372036854775807\n",
		)
		.expect_err("Unbounded leeways should be rejected.");

		assert!(matches!(err, ConfigError::InvalidValue { field: "expiry_leeway_secs", .. }));

		let config = ClientConfig::builder("https://crm.example.com", "client", "secret")
			.expiry_leeway(MAX_EXPIRY_LEEWAY)
			.build()
			.expect("The largest accepted leeway should build.");

		assert_eq!(config.expiry_leeway, MAX_EXPIRY_LEEWAY);
		assert!(matches!(
			ClientConfig::builder("https://crm.example.com", "client", "secret")
				.expiry_leeway(MAX_EXPIRY_LEEWAY + Duration::SECOND)
				.build(),
			Err(ConfigError::InvalidValue { field: "expiry_leeway_secs", .. })
		));
	}

	#[test]
	fn toml_loader_rejects_unknown_keys() {
		let err = ClientConfig::from_toml_str(
			"url = \"https://crm.example.com\"\nclient_id = \"a\"\nclient_secret = \"b\"\npassword = \"c\"\n",
		)
		.expect_err("Unknown keys should be rejected.");

		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn lookup_loader_uses_prefixed_variables() {
		let vars = HashMap::from([
			("SUITECRM_URL", "https://crm.example.com"),
			("SUITECRM_CLIENT_ID", "env-client"),
			("SUITECRM_CLIENT_SECRET", "env-secret"),
			("SUITECRM_VERIFY_TLS", "no"),
			("SUITECRM_API_LAYOUT", "7"),
			("SUITECRM_CACHE_CAPACITY", "3"),
		]);
		let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
			.expect("Environment lookup should produce a config.");

		assert_eq!(config.client_id, "env-client");
		assert!(!config.verify_tls);
		assert_eq!(config.api_layout, ApiLayout::Suite7);
		assert_eq!(config.cache_capacity, 3);

		let err = ClientConfig::from_lookup(|_| None).expect_err("Missing URL should fail.");

		assert!(matches!(err, ConfigError::MissingField { field: "url" }));

		let err = ClientConfig::from_lookup(|key| match key {
			"SUITECRM_VERIFY_TLS" => Some("maybe".into()),
			_ => vars.get(key).map(|v| v.to_string()),
		})
		.expect_err("Unparsable booleans should fail.");

		assert!(matches!(err, ConfigError::InvalidValue { field: "verify_tls", .. }));
	}
}
