//! Client-credentials token exchange built on the `oauth2` crate, plus transport error mapping.

pub mod classify;

pub use classify::*;
pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenRecord, TokenRecordBuilderError},
	config::{ClientAuthMethod, ClientConfig},
	error::{ConfigError, Endpoint, TransientError, TransportError},
	http::{CrmHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type ExchangeTokenResponse = oauth2::basic::BasicTokenResponse;

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { endpoint, message }.into(),
			_ => TransportError::Other { endpoint, message: "unrecognized transport failure".into() }
				.into(),
		}
	}
}

/// Performs `grant_type=client_credentials` exchanges against the configured token endpoint.
pub(crate) struct TokenExchange<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	expiry_leeway: Duration,
}
impl<C, M> TokenExchange<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		config: &ClientConfig,
		credential: &Credential,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::from_url(config.token_url()?);
		let mut oauth_client = BasicClient::new(ClientId::new(credential.client_id.clone()))
			.set_client_secret(ClientSecret::new(credential.client_secret.expose().to_owned()))
			.set_token_uri(token_url);

		if matches!(config.client_auth, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { oauth_client, http_client, error_mapper, expiry_leeway: config.expiry_leeway })
	}

	/// Requests a new access token; `serial` is stamped onto the resulting record.
	pub(crate) async fn client_credentials(&self, serial: u64) -> Result<TokenRecord> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_token_response(response, serial, self.expiry_leeway)
	}
}

fn map_token_response(
	response: ExchangeTokenResponse,
	serial: u64,
	expiry_leeway: Duration,
) -> Result<TokenRecord> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let lifetime = Duration::seconds(expires_in);

	#[cfg(feature = "tracing")]
	if lifetime <= expiry_leeway {
		tracing::warn!(
			expires_in,
			expiry_leeway_secs = expiry_leeway.whole_seconds(),
			"Token lifetime does not exceed the expiry leeway, so it is expired on arrival."
		);
	}
	#[cfg(not(feature = "tracing"))]
	let _ = expiry_leeway;

	TokenRecord::builder()
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(lifetime)
		.serial(serial)
		.build()
		.map_err(|err| match err {
			TokenRecordBuilderError::ExpiryOutOfRange => ConfigError::ExpiresInOutOfRange.into(),
			TokenRecordBuilderError::MissingAccessToken | TokenRecordBuilderError::MissingExpiry =>
				ConfigError::MissingExpiresIn.into(),
		})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(Endpoint::Token, meta_ref, error),
		RequestTokenError::Parse(_, body) if meta_status(meta_ref) == Some(401) =>
			Error::Authentication { reason: body_reason(&body) },
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	let mut ctx = TokenErrorContext::new().with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let message = match response.error_description() {
		Some(description) => format!("token endpoint returned an OAuth error: {description}"),
		None => format!("token endpoint returned an OAuth error: {}", response.error().as_ref()),
	};

	match classify_token_error(&ctx) {
		TokenErrorKind::InvalidClient => Error::Authentication { reason: message },
		TokenErrorKind::Transient => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return match endpoint {
			Endpoint::Token => TransientError::TokenEndpoint {
				message: "request timed out while calling the token endpoint".into(),
				status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
				retry_after: meta_retry_after(meta),
			}
			.into(),
			Endpoint::Resource => TransportError::Timeout { endpoint }.into(),
		};
	}

	TransportError::network(endpoint, err).into()
}

fn body_reason(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() { "token endpoint answered HTTP 401".into() } else { truncate_preview(text) }
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
