//! One logical resource call with a single authorization retry.
//!
//! [`RequestExecutor::execute`] presents the held bearer token, and absorbs exactly one
//! authorization problem per call: a token that is already expired locally, or a `401` from
//! the server. Either way the token is refreshed once and the call is retried once. A second
//! local expiry yields [`Error::TokenExpiredAfterRefresh`]; a `401` after the refresh revokes
//! the session and yields [`Error::AuthenticationRevoked`]. Remaining statuses are classified
//! without retrying.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::{ConfigError, Endpoint},
	http::{CrmHttpClient, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::{self, OpKind, OpOutcome, OpSpan},
	pipeline::{Method, TokenManager},
};

/// Marker the server embeds in `400` bodies when it could not run the query.
pub const DATABASE_FAILURE_MARKER: &str = "Database failure";

const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Issues authenticated resource calls on behalf of the facade.
pub struct RequestExecutor<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tokens: Arc<TokenManager<C, M>>,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> RequestExecutor<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an executor sharing `tokens` with any other executor of the same client.
	pub fn new(tokens: Arc<TokenManager<C, M>>, http_client: Arc<C>, error_mapper: Arc<M>) -> Self {
		Self { tokens, http_client, error_mapper }
	}

	/// Token manager backing this executor.
	pub fn tokens(&self) -> &Arc<TokenManager<C, M>> {
		&self.tokens
	}

	/// Performs `method` against `url` and decodes the JSON response.
	///
	/// An empty success body decodes to [`Value::Null`].
	pub async fn execute(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<Value> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, method.as_str());

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.execute_with_retry(method, url, body)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn execute_with_retry(
		&self,
		method: Method,
		url: &Url,
		body: Option<&Value>,
	) -> Result<Value> {
		let mut token = self.tokens.get_or_refresh_token().await?;
		let mut refreshed = false;

		loop {
			if token.is_expired_at(OffsetDateTime::now_utc(), self.tokens.expiry_leeway()) {
				if refreshed {
					return Err(Error::TokenExpiredAfterRefresh);
				}

				self.tokens.mark_expired(token.serial);

				token = self.tokens.refresh_after(token.serial).await?;
				refreshed = true;

				continue;
			}

			let response = self.send(method, url, body, &token).await?;

			if response.status().as_u16() == 401 {
				if refreshed {
					self.tokens.revoke();

					return Err(Error::AuthenticationRevoked);
				}

				token = self.tokens.refresh_after(token.serial).await?;
				refreshed = true;

				continue;
			}

			return decode_response(url, response);
		}
	}

	async fn send(
		&self,
		method: Method,
		url: &Url,
		body: Option<&Value>,
		token: &TokenRecord,
	) -> Result<HttpResponse> {
		let mut builder = oauth2::http::Request::builder()
			.method(method.as_http())
			.uri(url.as_str())
			.header(AUTHORIZATION, token.bearer_header())
			.header(ACCEPT, JSON_API_MEDIA_TYPE);
		let payload = match body {
			Some(body) => {
				builder = builder.header(CONTENT_TYPE, "application/json");

				body.to_string().into_bytes()
			},
			None => Vec::new(),
		};
		let request: HttpRequest = builder.body(payload).map_err(ConfigError::from)?;
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());

		handle.call(request).await.map_err(|err| {
			self.error_mapper.map_transport_error(Endpoint::Resource, slot.take().as_ref(), err)
		})
	}
}
impl<C, M> Debug for RequestExecutor<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor").field("tokens", &self.tokens).finish()
	}
}

/// Maps a non-`401` response onto the decoded payload or a typed error.
pub(crate) fn decode_response(url: &Url, response: HttpResponse) -> Result<Value> {
	let status = response.status().as_u16();
	let body = response.body();

	match status {
		200..=299 => decode_body(body),
		400 => {
			let text = String::from_utf8_lossy(body).into_owned();

			if text.contains(DATABASE_FAILURE_MARKER) {
				Err(Error::Query { message: text })
			} else {
				Err(Error::MalformedRequest { body: text })
			}
		},
		404 => Err(Error::NotFound { url: url.to_string() }),
		_ => Err(Error::Status { status, body: String::from_utf8_lossy(body).into_owned() }),
	}
}

fn decode_body(body: &[u8]) -> Result<Value> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { context: "response", source })
}
