//! JSON:API response shapes returned by the resource endpoints.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// One resource object: `{"type": ..., "id": ..., "attributes": {...}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
	/// Module name of the record.
	#[serde(rename = "type")]
	pub kind: String,
	/// Record identifier; empty for metadata objects without one.
	#[serde(default)]
	pub id: String,
	/// Field values.
	#[serde(default)]
	pub attributes: Map<String, Value>,
}

/// Pagination links; only presence matters.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Links {
	/// Link to the next page.
	#[serde(default)]
	pub next: Option<Value>,
	/// Link to the previous page.
	#[serde(default)]
	pub prev: Option<Value>,
}

/// Top-level document wrapping `data`.
#[derive(Clone, Debug, Deserialize)]
pub struct Document<T> {
	/// Primary data.
	pub data: T,
	/// Pagination links.
	#[serde(default)]
	pub links: Links,
}

/// Decodes `value`, reporting the failing JSON path on error.
pub(crate) fn decode<T>(context: &'static str, value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { context, source })
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn list_documents_decode_with_optional_links() {
		let doc: Document<Vec<ResourceObject>> = decode(
			"list",
			json!({
				"data": [{ "type": "Accounts", "id": "1", "attributes": { "name": "Acme" } }],
				"links": { "next": "/page2", "prev": null }
			}),
		)
		.expect("List document should decode.");

		assert_eq!(doc.data[0].attributes["name"], "Acme");
		assert!(doc.links.next.is_some());
		assert!(doc.links.prev.is_none());
	}

	#[test]
	fn decode_errors_name_the_path() {
		let err = decode::<Document<Vec<ResourceObject>>>("list", json!({ "data": [{ "type": 5 }] }))
			.expect_err("Numeric type should fail.");

		match err {
			Error::Decode { context, source } => {
				assert_eq!(context, "list");
				assert_eq!(source.path().to_string(), "data[0].type");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}
}
