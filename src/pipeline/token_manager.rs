//! Session state machine for the shared client credential.
//!
//! [`TokenManager`] owns the only live [`Credential`] and moves it through
//! [`SessionState`]: `NoSession` until the first exchange, `Authenticated` while a token is
//! held, `Expired` once a caller observed local expiry, and `Revoked` after the token
//! endpoint rejected the client or a fresh token was refused again. Token acquisition is
//! serialized behind one async guard. Every issued token carries a serial number, so a caller
//! that waited on the guard can tell whether the token it saw was already replaced and reuse
//! the newer one instead of calling the token endpoint a second time.

mod metrics;

pub use metrics::TokenMetrics;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{Credential, SessionState, TokenRecord},
	config::ClientConfig,
	http::CrmHttpClient,
	oauth::{TokenExchange, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

struct Session {
	state: SessionState,
	credential: Arc<Credential>,
}

/// Owns the login, refresh, and revocation lifecycle of the shared credential.
pub struct TokenManager<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	exchange: TokenExchange<C, M>,
	session: Mutex<Session>,
	acquire_guard: AsyncMutex<()>,
	serials: AtomicU64,
	expiry_leeway: Duration,
	metrics: Arc<TokenMetrics>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager in the `NoSession` state.
	pub fn new(config: &ClientConfig, http_client: Arc<C>, error_mapper: Arc<M>) -> Result<Self> {
		let credential = Credential::from_config(config);
		let exchange = TokenExchange::new(config, &credential, http_client, error_mapper)?;

		Ok(Self {
			exchange,
			session: Mutex::new(Session {
				state: SessionState::NoSession,
				credential: Arc::new(credential),
			}),
			acquire_guard: AsyncMutex::new(()),
			serials: AtomicU64::new(0),
			expiry_leeway: config.expiry_leeway,
			metrics: Default::default(),
		})
	}

	/// Current session state.
	pub fn state(&self) -> SessionState {
		self.session.lock().state
	}

	/// Snapshot of the live credential.
	pub fn credential(&self) -> Arc<Credential> {
		self.session.lock().credential.clone()
	}

	/// Shared acquisition counters.
	pub fn metrics(&self) -> Arc<TokenMetrics> {
		self.metrics.clone()
	}

	/// Window before expiry in which tokens already count as expired.
	pub fn expiry_leeway(&self) -> Duration {
		self.expiry_leeway
	}

	/// Returns the held token, logging in or refreshing first when the session requires it.
	///
	/// The token is returned as held; local expiry is checked by the caller right before use.
	pub async fn get_or_refresh_token(&self) -> Result<TokenRecord> {
		let (state, token) = self.snapshot();

		match (state, token) {
			(SessionState::Revoked, _) => Err(Error::AuthenticationRevoked),
			(SessionState::Authenticated, Some(token)) => Ok(token),
			(_, token) => self.acquire(token.map(|token| token.serial), false).await,
		}
	}

	/// Fetches a new token unconditionally.
	///
	/// Fails with [`Error::Authentication`] when the client credentials are rejected; the
	/// manager never retries on its own.
	pub async fn force_refresh(&self) -> Result<TokenRecord> {
		self.acquire(None, true).await
	}

	/// Replaces the token with serial `observed`, or returns the newer token if another caller
	/// already replaced it.
	pub async fn refresh_after(&self, observed: u64) -> Result<TokenRecord> {
		self.acquire(Some(observed), false).await
	}

	/// Records that the token with serial `serial` was found expired.
	///
	/// Returns `false` when that token is no longer the live one.
	pub fn mark_expired(&self, serial: u64) -> bool {
		let mut session = self.session.lock();
		let is_live = session.credential.token.as_ref().is_some_and(|token| token.serial == serial);

		if is_live && session.state == SessionState::Authenticated {
			session.state = SessionState::Expired;

			return true;
		}

		false
	}

	/// Moves the session to `Revoked` and drops the held token.
	pub fn revoke(&self) {
		let mut session = self.session.lock();

		session.state = SessionState::Revoked;
		session.credential = Arc::new(session.credential.with_token(None));
	}

	/// Pulls the held token's expiry to now without touching the session state.
	///
	/// The next request observes the expiry lazily and runs one refresh. Returns `false` when
	/// no token is held.
	pub fn expire_token(&self) -> bool {
		let mut session = self.session.lock();
		let Some(mut token) = session.credential.token.clone() else {
			return false;
		};

		token.expires_at = OffsetDateTime::now_utc();
		session.credential = Arc::new(session.credential.with_token(Some(token)));

		true
	}

	fn snapshot(&self) -> (SessionState, Option<TokenRecord>) {
		let session = self.session.lock();

		(session.state, session.credential.token.clone())
	}

	async fn acquire(&self, observed: Option<u64>, force: bool) -> Result<TokenRecord> {
		let _singleflight = self.acquire_guard.lock().await;
		let (state, current) = self.snapshot();

		if state == SessionState::Revoked {
			return Err(Error::AuthenticationRevoked);
		}
		let reusable = if !force && state == SessionState::Authenticated {
			current.filter(|token| Some(token.serial) != observed)
		} else {
			None
		};

		if let Some(current) = reusable {
			self.metrics.record_reuse();

			return Ok(current);
		}

		let kind = if state == SessionState::NoSession { OpKind::Login } else { OpKind::Refresh };
		let span = OpSpan::new(kind, "acquire");

		obs::record_op_outcome(kind, OpOutcome::Attempt);

		let serial = self.serials.fetch_add(1, Ordering::Relaxed) + 1;
		let result = span.instrument(self.exchange.client_credentials(serial)).await;

		match result {
			Ok(token) => {
				{
					let mut session = self.session.lock();

					session.state = SessionState::Authenticated;
					session.credential = Arc::new(session.credential.with_token(Some(token.clone())));
				}

				match kind {
					OpKind::Login => self.metrics.record_login(),
					_ => self.metrics.record_refresh(),
				}

				obs::record_op_outcome(kind, OpOutcome::Success);

				Ok(token)
			},
			Err(err) => {
				if err.is_authentication() {
					self.revoke();
				}

				self.metrics.record_failure();
				obs::record_op_outcome(kind, OpOutcome::Failure);

				Err(err)
			},
		}
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("state", &self.state())
			.field("expiry_leeway", &self.expiry_leeway)
			.finish()
	}
}
