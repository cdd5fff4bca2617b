//! Issued access token records, lifecycle helpers, and builders.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Lifecycle status for a token record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token can still be presented to the resource endpoint.
	Active,
	/// Token reached its expiry instant (leeway included).
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the relative expiry lands outside the representable date range.
	#[error("Expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Bearer token issued by the client-credentials exchange.
///
/// `serial` is stamped by the token manager and grows with every issued token, which lets
/// concurrent callers tell whether the token they observed has already been replaced.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Issued-at instant recorded when the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from issued_at plus expires_in.
	pub expires_at: OffsetDateTime,
	/// Monotonic issue counter assigned by the token manager.
	pub serial: u64,
}
impl TokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Computes the lifecycle status at `instant`, treating `leeway` as already elapsed.
	///
	/// A leeway that pushes `instant` past the representable range counts as expired.
	pub fn status_at(&self, instant: OffsetDateTime, leeway: Duration) -> TokenStatus {
		match instant.checked_add(leeway) {
			Some(deadline) if deadline < self.expires_at => TokenStatus::Active,
			_ => TokenStatus::Expired,
		}
	}

	/// Returns `true` if the record is expired at `instant` once `leeway` is applied.
	pub fn is_expired_at(&self, instant: OffsetDateTime, leeway: Duration) -> bool {
		matches!(self.status_at(instant, leeway), TokenStatus::Expired)
	}

	/// Formats the `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("serial", &self.serial)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	serial: u64,
}
impl TokenRecordBuilder {
	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issue serial.
	pub fn serial(mut self, serial: u64) -> Self {
		self.serial = serial;

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord { access_token, issued_at, expires_at, serial: self.serial })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_honors_leeway() {
		let record = TokenRecord::builder()
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed for status checks.");
		let before = macros::datetime!(2025-01-01 00:59 UTC);

		assert_eq!(record.status_at(before, Duration::ZERO), TokenStatus::Active);
		assert_eq!(record.status_at(before, Duration::seconds(60)), TokenStatus::Expired);
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 01:00 UTC), Duration::ZERO),
			TokenStatus::Expired
		);
	}

	#[test]
	fn builder_handles_relative_expiry_and_serial() {
		let record = TokenRecord::builder()
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.serial(7)
			.build()
			.expect("Token record builder should support relative expiry calculations.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(record.serial, 7);
		assert_eq!(record.bearer_header(), "Bearer secret");
	}

	#[test]
	fn builder_requires_token_and_expiry() {
		assert_eq!(
			TokenRecord::builder().expires_in(Duration::minutes(1)).build().unwrap_err(),
			TokenRecordBuilderError::MissingAccessToken
		);
		assert_eq!(
			TokenRecord::builder().access_token("a").build().unwrap_err(),
			TokenRecordBuilderError::MissingExpiry
		);
	}

	#[test]
	fn out_of_range_values_never_overflow() {
		let issued_at = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(
			TokenRecord::builder()
				.access_token("a")
				.issued_at(issued_at)
				.expires_in(Duration::seconds(1_000_000_000_000))
				.build()
				.unwrap_err(),
			TokenRecordBuilderError::ExpiryOutOfRange
		);

		let record = TokenRecord::builder()
			.access_token("a")
			.issued_at(issued_at)
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token record should build.");

		assert_eq!(record.status_at(issued_at, Duration::MAX), TokenStatus::Expired);
		assert_eq!(record.status_at(issued_at, Duration::seconds(i64::MAX)), TokenStatus::Expired);
	}

	#[test]
	fn debug_redacts_access_token() {
		let record = TokenRecord::builder()
			.access_token("very-secret")
			.expires_in(Duration::minutes(5))
			.build()
			.expect("Token record should build.");

		assert!(!format!("{record:?}").contains("very-secret"));
	}
}
