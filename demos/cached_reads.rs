//! Lists accounts twice through a cached client backed by a mock SuiteCRM instance; the second
//! page is answered from the response cache.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use suitecrm_client::{
	api::{ListRequest, ReqwestSuiteCrm, SortOrder},
	config::ClientConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/legacy/Api/access_token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let list_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/legacy/Api/V8/module/Accounts");
			then.status(200).header("content-type", "application/vnd.api+json").body(
				"{\"data\":[{\"type\":\"Accounts\",\"id\":\"a1\",\"attributes\":{\"name\":\"Acme\"}}]}",
			);
		})
		.await;
	let config = ClientConfig::builder(server.base_url(), "demo-client", "super-secret")
		.cache_capacity(16)
		.build()?;
	let client = ReqwestSuiteCrm::new(config)?.cached()?;
	let request = ListRequest::new().fields(["name"]).sort_by("name", SortOrder::Ascending);

	for _ in 0..2 {
		let page = client.get_bean_list("Accounts", &request).await?;

		for bean in &page.entry_list {
			println!("{bean}");
		}
	}

	println!("Cached responses: {}.", client.cache_size());

	token_mock.assert_async().await;
	list_mock.assert_async().await;

	Ok(())
}
