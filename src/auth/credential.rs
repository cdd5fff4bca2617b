//! The shared credential and the session states it moves through.

// self
use crate::{
	_prelude::*,
	auth::{secret::TokenSecret, token::TokenRecord},
	config::ClientConfig,
};

/// Session lifecycle owned by the token manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
	/// No token has been requested yet.
	NoSession,
	/// A token is held and believed usable.
	Authenticated,
	/// The held token was observed to be expired and must be refreshed before use.
	Expired,
	/// Credentials were rejected; no further calls may be issued.
	Revoked,
}
impl SessionState {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionState::NoSession => "no_session",
			SessionState::Authenticated => "authenticated",
			SessionState::Expired => "expired",
			SessionState::Revoked => "revoked",
		}
	}
}
impl Display for SessionState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Client credentials plus the currently issued token.
///
/// A credential is immutable once published; the token manager swaps in a new value
/// whenever the token changes.
#[derive(Clone, Debug)]
pub struct Credential {
	/// Base URL of the CRM instance.
	pub endpoint_base: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
	/// Whether TLS certificates are verified.
	pub verify_tls: bool,
	/// Token issued for these credentials, if any.
	pub token: Option<TokenRecord>,
}
impl Credential {
	/// Builds a token-less credential from the client configuration.
	pub fn from_config(config: &ClientConfig) -> Self {
		Self {
			endpoint_base: config.endpoint_base.clone(),
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			verify_tls: config.verify_tls,
			token: None,
		}
	}

	/// Returns a copy of this credential carrying `token`.
	pub fn with_token(&self, token: Option<TokenRecord>) -> Self {
		Self { token, ..self.clone() }
	}
}
