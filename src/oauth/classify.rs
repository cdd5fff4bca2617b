//! Classification of token endpoint failures.
//!
//! The context keeps only primitive data (status code and OAuth fields) so the rules stay
//! independent from the HTTP transport in use. Exact OAuth codes win over hints found in the
//! error description, which win over the HTTP status.

/// Outcome categories for a failed client-credentials exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// The server rejected the client credentials; retrying cannot help.
	InvalidClient,
	/// Failure is temporary and may be retried by the caller.
	Transient,
}

/// Data gathered about a failed token request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// HTTP status code returned by the token endpoint, when available.
	pub http_status: Option<u16>,
	/// Server-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Server-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
}
impl TokenErrorContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}
}

/// Classifies a token endpoint failure.
pub fn classify_token_error(ctx: &TokenErrorContext) -> TokenErrorKind {
	ctx.oauth_error
		.as_deref()
		.and_then(match_exact_value)
		.or_else(|| ctx.error_description.as_deref().and_then(match_exact_value))
		.or_else(|| classify_description(ctx.error_description.as_deref()))
		.unwrap_or_else(|| classify_status(ctx.http_status))
}

const BODY_PREVIEW_LIMIT: usize = 256;

pub(crate) fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn match_exact_value(value: &str) -> Option<TokenErrorKind> {
	const REJECTED: [&str; 7] = [
		"invalid_client",
		"unauthorized_client",
		"invalid_grant",
		"access_denied",
		"invalid_request",
		"invalid_scope",
		"unsupported_grant_type",
	];
	const TRANSIENT: [&str; 2] = ["temporarily_unavailable", "server_error"];

	if REJECTED.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(TokenErrorKind::InvalidClient)
	} else if TRANSIENT.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(TokenErrorKind::Transient)
	} else {
		None
	}
}

fn classify_description(description: Option<&str>) -> Option<TokenErrorKind> {
	let lowered = description?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_client") || text.contains("client authentication failed") =>
			Some(TokenErrorKind::InvalidClient),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400 | 401 | 403) => TokenErrorKind::InvalidClient,
		_ => TokenErrorKind::Transient,
	}
}
