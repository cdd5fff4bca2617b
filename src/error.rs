//! Client-level error types shared across the pipeline, cache, and facade.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary token endpoint failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Legacy query could not be translated into a filter.
	#[error(transparent)]
	Filter(#[from] crate::filter::FilterError),

	/// Client credentials were rejected by the token endpoint.
	#[error("Client authentication failed: {reason}.")]
	Authentication {
		/// Server- or client-supplied reason string.
		reason: String,
	},
	/// A freshly issued token was rejected again, or the session was revoked earlier.
	#[error("Access token was rejected after a refresh; the client credentials have been revoked.")]
	AuthenticationRevoked,
	/// The token handed out right after a refresh was already expired locally.
	#[error("Access token expired again immediately after a refresh.")]
	TokenExpiredAfterRefresh,
	/// Server rejected the request as malformed (HTTP 400).
	#[error("Request was rejected as malformed: {body}.")]
	MalformedRequest {
		/// Raw response body.
		body: String,
	},
	/// Server could not execute the query shape (HTTP 400 with a database failure).
	#[error("Query could not be executed by the server: {message}.")]
	Query {
		/// Raw response body describing the failure.
		message: String,
	},
	/// The requested record or relationship does not exist (HTTP 404).
	#[error("Resource not found: {url}.")]
	NotFound {
		/// URL that produced the 404.
		url: String,
	},
	/// Any other non-success status.
	#[error("Server responded with HTTP {status}: {body}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Response payload did not match the expected shape.
	#[error("Unable to decode {context} payload.")]
	Decode {
		/// What was being decoded.
		context: &'static str,
		/// Structured decoding failure with the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` for kinds that must terminate the current operation without a retry.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::Authentication { .. }
				| Self::AuthenticationRevoked
				| Self::TokenExpiredAfterRefresh
				| Self::MalformedRequest { .. }
		)
	}

	/// Returns `true` when the error invalidated the shared session.
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication { .. } | Self::AuthenticationRevoked)
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Endpoint base URL is invalid.
	#[error("Endpoint URL `{url}` is invalid: {reason}.")]
	InvalidEndpoint {
		/// Offending URL.
		url: String,
		/// Why it was rejected.
		reason: &'static str,
	},
	/// Endpoint URL could not be parsed.
	#[error("Endpoint URL cannot be parsed.")]
	UnparsableEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required setting was empty or absent.
	#[error("Configuration value `{field}` is required.")]
	MissingField {
		/// Name of the missing setting.
		field: &'static str,
	},
	/// A setting had a value outside its accepted range.
	#[error("Configuration value `{field}` is invalid: {value}.")]
	InvalidValue {
		/// Name of the setting.
		field: &'static str,
		/// Rejected raw value.
		value: String,
	},
	/// Response cache capacity must allow at least one entry.
	#[error("Cache capacity must be at least 1.")]
	ZeroCacheCapacity,
	/// Configuration file could not be read.
	#[error("Configuration file `{path}` could not be read.")]
	Read {
		/// Path that failed.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration file is not valid TOML for this client.
	#[error("Configuration file is not valid.")]
	Parse(#[from] toml::de::Error),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary token endpoint failures (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Server- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint kind being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the server.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint kind being called.
		endpoint: Endpoint,
	},
	/// Transport reported a failure without a structured error.
	#[error("HTTP client error occurred while calling the {endpoint} endpoint: {message}.")]
	Other {
		/// Endpoint kind being called.
		endpoint: Endpoint,
		/// Transport-supplied message.
		message: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Remote endpoint families the client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// OAuth 2.0 token endpoint.
	Token,
	/// JSON:API resource endpoint.
	Resource,
}
impl Endpoint {
	/// Returns a stable label for messages and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Token => "token",
			Endpoint::Resource => "resource",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
