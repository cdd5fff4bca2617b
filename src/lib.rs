//! SuiteCRM API client with a self-healing OAuth 2.0 pipeline, one-shot token refresh, and a
//! bounded LRU response cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod bean;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod pipeline;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{api::ReqwestSuiteCrm, config::ClientConfig, http::ReqwestHttpClient};

	/// Client id used by test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-id";
	/// Client secret used by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "client-secret";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a configuration pointing at `base_url` with the fixture credentials.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder(base_url, TEST_CLIENT_ID, TEST_CLIENT_SECRET)
			.verify_tls(false)
			.build()
			.expect("Test configuration should be valid.")
	}

	/// Constructs an uncached client for `config` backed by the insecure test transport.
	pub fn build_reqwest_test_client(config: ClientConfig) -> ReqwestSuiteCrm {
		ReqwestSuiteCrm::with_http_client(
			config,
			test_reqwest_http_client(),
			crate::oauth::ReqwestTransportErrorMapper,
		)
		.expect("Test client should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
