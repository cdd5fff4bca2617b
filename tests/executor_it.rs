#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use suitecrm_client::{
	_preludet::*,
	api::ReqwestSuiteCrm,
	auth::SessionState,
	config::ClientConfig,
	error::ConfigError,
	pipeline::Method,
	serde_json::{Value, json},
};

const TOKEN_PATH: &str = "/legacy/Api/access_token";
const RECORD_PATH: &str = "/legacy/Api/V8/module/Accounts/acc-1";

fn token_body(access_token: &str, expires_in: i64) -> String {
	json!({ "access_token": access_token, "token_type": "bearer", "expires_in": expires_in })
		.to_string()
}

fn record_url(server: &MockServer) -> Url {
	Url::parse(&server.url(RECORD_PATH)).expect("Record URL should parse.")
}

fn build_client(server: &MockServer) -> ReqwestSuiteCrm {
	build_reqwest_test_client(test_config(&server.base_url()))
}

async fn mock_token<'a>(
	server: &'a MockServer,
	access_token: &str,
	expires_in: i64,
) -> httpmock::Mock<'a> {
	let body = token_body(access_token, expires_in);

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("grant_type=client_credentials")
				.body_includes("client_id=client-id");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

async fn mock_record<'a>(server: &'a MockServer, status: u16, body: &str) -> httpmock::Mock<'a> {
	let body = body.to_owned();

	server
		.mock_async(|when, then| {
			when.method(GET).path(RECORD_PATH);
			then.status(status).header("content-type", "application/vnd.api+json").body(body);
		})
		.await
}

#[tokio::test]
async fn first_call_logs_in_and_presents_bearer_token() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-login", 3600).await;
	let record = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(RECORD_PATH)
				.header("authorization", "Bearer token-login")
				.header("accept", "application/vnd.api+json");
			then.status(200)
				.header("content-type", "application/vnd.api+json")
				.body("{\"data\":{\"type\":\"Accounts\",\"id\":\"acc-1\"}}");
		})
		.await;

	assert_eq!(client.tokens().state(), SessionState::NoSession);

	let first = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect("Authenticated call should succeed.");
	let second = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect("Second call should reuse the token.");

	assert_eq!(first["data"]["id"], "acc-1");
	assert_eq!(first, second);
	assert_eq!(client.tokens().state(), SessionState::Authenticated);
	assert_eq!(client.tokens().metrics().logins(), 1);
	assert_eq!(client.tokens().metrics().refreshes(), 0);

	token.assert_calls_async(1).await;
	record.assert_calls_async(2).await;
}

#[tokio::test]
async fn json_bodies_carry_content_type() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-write", 3600).await;
	let write = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/legacy/Api/V8/module")
				.header("content-type", "application/json")
				.json_body(json!({ "data": { "type": "Accounts", "id": "acc-1" } }));
			then.status(200).body("");
		})
		.await;
	let url = Url::parse(&server.url("/legacy/Api/V8/module")).expect("Module URL should parse.");
	let response = client
		.execute(
			Method::Patch,
			&url,
			Some(&json!({ "data": { "type": "Accounts", "id": "acc-1" } })),
		)
		.await
		.expect("Write should succeed.");

	assert_eq!(response, Value::Null);

	token.assert_async().await;
	write.assert_async().await;
}

#[tokio::test]
async fn expired_token_is_refreshed_once_before_the_call() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-expiring", 3600).await;
	let record = mock_record(&server, 200, "{\"data\":[]}").await;

	client.execute(Method::Get, &record_url(&server), None).await.expect("Login should succeed.");

	assert!(client.tokens().expire_token());

	client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect("Call after expiry should refresh and succeed.");

	assert_eq!(client.tokens().metrics().logins(), 1);
	assert_eq!(client.tokens().metrics().refreshes(), 1);
	assert_eq!(client.tokens().state(), SessionState::Authenticated);

	token.assert_calls_async(2).await;
	record.assert_calls_async(2).await;
}

#[tokio::test]
async fn repeated_unauthorized_revokes_the_session() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-rejected", 3600).await;
	let record = mock_record(&server, 401, "{\"errors\":[{\"title\":\"Unauthorized\"}]}").await;
	let err = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect_err("A second 401 should be fatal.");

	assert!(matches!(err, Error::AuthenticationRevoked));
	assert!(err.is_fatal());
	assert_eq!(client.tokens().state(), SessionState::Revoked);

	token.assert_calls_async(2).await;
	record.assert_calls_async(2).await;

	let err = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect_err("Revoked sessions must refuse further calls.");

	assert!(matches!(err, Error::AuthenticationRevoked));

	token.assert_calls_async(2).await;
	record.assert_calls_async(2).await;
}

#[tokio::test]
async fn rejected_client_credentials_fail_without_retry() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"Client authentication failed\"}",
			);
		})
		.await;
	let record = mock_record(&server, 200, "{\"data\":[]}").await;
	let err = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect_err("Invalid client credentials should surface.");

	assert!(matches!(err, Error::Authentication { .. }));
	assert_eq!(client.tokens().state(), SessionState::Revoked);
	assert_eq!(client.tokens().metrics().failures(), 1);

	token.assert_calls_async(1).await;
	record.assert_calls_async(0).await;
}

#[tokio::test]
async fn lifetime_shorter_than_leeway_stops_after_one_refresh() {
	let server = MockServer::start_async().await;
	let config = ClientConfig::builder(server.base_url(), TEST_CLIENT_ID, TEST_CLIENT_SECRET)
		.expiry_leeway(Duration::hours(1))
		.build()
		.expect("Config should be valid.");
	let client = build_reqwest_test_client(config);
	let token = mock_token(&server, "token-short", 60).await;
	let record = mock_record(&server, 200, "{\"data\":[]}").await;
	let err = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect_err("A token that is expired on arrival should be fatal.");

	assert!(matches!(err, Error::TokenExpiredAfterRefresh));

	token.assert_calls_async(2).await;
	record.assert_calls_async(0).await;
}

#[tokio::test]
async fn oversized_token_lifetimes_are_rejected() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-forever", 1_000_000_000_000).await;
	let record = mock_record(&server, 200, "{\"data\":[]}").await;
	let err = client
		.tokens()
		.get_or_refresh_token()
		.await
		.expect_err("Lifetimes beyond the calendar range should be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::ExpiresInOutOfRange)));
	assert_eq!(client.tokens().state(), SessionState::NoSession);

	let err = client
		.execute(Method::Get, &record_url(&server), None)
		.await
		.expect_err("Requests should surface the same failure.");

	assert!(matches!(err, Error::Config(ConfigError::ExpiresInOutOfRange)));
	assert_eq!(client.tokens().metrics().failures(), 2);

	token.assert_calls_async(2).await;
	record.assert_calls_async(0).await;
}

#[tokio::test]
async fn statuses_map_to_typed_errors() {
	let cases: [(u16, &str); 4] = [
		(400, "{\"errors\":{\"detail\":\"Bad field\"}}"),
		(400, "{\"errors\":{\"detail\":\"Database failure. Please refer to the logs.\"}}"),
		(404, "{\"errors\":{\"title\":\"Not found\"}}"),
		(500, "upstream exploded"),
	];

	for (status, body) in cases {
		let server = MockServer::start_async().await;
		let client = build_client(&server);
		let _token = mock_token(&server, "token-status", 3600).await;
		let record = mock_record(&server, status, body).await;
		let err = client
			.execute(Method::Get, &record_url(&server), None)
			.await
			.expect_err("Non-success statuses should fail.");

		match (status, &err) {
			(400, Error::Query { message }) => assert!(message.contains("Database failure")),
			(400, Error::MalformedRequest { body }) => assert!(body.contains("Bad field")),
			(404, Error::NotFound { url }) => assert!(url.ends_with(RECORD_PATH)),
			(500, Error::Status { status, body }) => {
				assert_eq!(*status, 500);
				assert_eq!(body, "upstream exploded");
			},
			_ => panic!("Unexpected mapping for HTTP {status}: {err:?}."),
		}

		// Classified failures never trigger a refresh.
		assert_eq!(client.tokens().state(), SessionState::Authenticated);

		record.assert_calls_async(1).await;
	}
}

#[tokio::test]
async fn concurrent_first_calls_log_in_once() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-shared", 3600).await;
	let record = mock_record(&server, 200, "{\"data\":[]}").await;
	let url = record_url(&server);
	let (first, second, third) = tokio::join!(
		client.execute(Method::Get, &url, None),
		client.execute(Method::Get, &url, None),
		client.execute(Method::Get, &url, None),
	);

	first.expect("First concurrent call should succeed.");
	second.expect("Second concurrent call should succeed.");
	third.expect("Third concurrent call should succeed.");

	assert_eq!(client.tokens().metrics().logins(), 1);
	assert_eq!(client.tokens().metrics().reuses(), 2);

	token.assert_calls_async(1).await;
	record.assert_calls_async(3).await;
}

#[tokio::test]
async fn concurrent_expired_calls_refresh_once() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token = mock_token(&server, "token-shared", 3600).await;
	let record = mock_record(&server, 200, "{\"data\":[]}").await;
	let url = record_url(&server);

	client.execute(Method::Get, &url, None).await.expect("Login should succeed.");

	assert!(client.tokens().expire_token());

	let (first, second, third) = tokio::join!(
		client.execute(Method::Get, &url, None),
		client.execute(Method::Get, &url, None),
		client.execute(Method::Get, &url, None),
	);

	first.expect("First concurrent call should succeed.");
	second.expect("Second concurrent call should succeed.");
	third.expect("Third concurrent call should succeed.");

	assert_eq!(client.tokens().metrics().logins(), 1);
	assert_eq!(client.tokens().metrics().refreshes(), 1);
	assert_eq!(client.tokens().state(), SessionState::Authenticated);

	token.assert_calls_async(2).await;
	record.assert_calls_async(4).await;
}
