//! Module metadata operations.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	api::{Document, ResourceObject, SuiteCrm, document},
	http::CrmHttpClient,
	oauth::TransportErrorMapper,
};

const VENDOR_PREFIXES: [&str; 5] = ["AM_", "AOS_", "AOR_", "AOK_", "FP_"];

/// One module exposed by the instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModuleInfo {
	/// Module name as used in URLs, e.g. `AOS_Products`.
	pub module_key: String,
	/// Human label derived from the key, e.g. `Products`.
	pub module_label: String,
	/// Remaining metadata as returned by the server.
	pub attributes: Map<String, Value>,
}

/// Field definitions of one module.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModuleFields {
	/// Module name.
	pub module: String,
	/// Field name to definition.
	pub module_fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct ModulesData {
	attributes: BTreeMap<String, Map<String, Value>>,
}

impl<C, M> SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Lists the modules available to the client.
	pub async fn get_available_modules(&self) -> Result<Vec<ModuleInfo>> {
		let url = self.endpoint("/V8/meta/modules", &[])?;
		let response = self.read(&url, Value::Null).await?;
		let doc: Document<ModulesData> = document::decode("modules", response)?;

		Ok(doc
			.data
			.attributes
			.into_iter()
			.map(|(module_key, mut attributes)| {
				attributes.remove("label");

				ModuleInfo { module_label: module_label(&module_key), module_key, attributes }
			})
			.collect())
	}

	/// Returns field definitions of `module`, restricted to `fields` when non-empty.
	pub async fn get_module_fields(&self, module: &str, fields: &[&str]) -> Result<ModuleFields> {
		let url = self.endpoint("/V8/meta/fields", &[module])?;
		let response = self.read(&url, serde_json::json!(fields)).await?;
		let doc: Document<ResourceObject> = document::decode("module fields", response)?;
		let mut module_fields = doc.data.attributes;

		if !fields.is_empty() {
			module_fields.retain(|name, _| fields.contains(&name.as_str()));
		}

		Ok(ModuleFields { module: module.to_owned(), module_fields })
	}
}

/// Derives a display label from a module key.
///
/// Vendor prefixes are removed, underscores become spaces, and the first letter is
/// upper-cased: `AOS_Product_Categories` becomes `Product Categories`.
pub fn module_label(module_key: &str) -> String {
	let stripped =
		VENDOR_PREFIXES.iter().fold(module_key.to_owned(), |key, prefix| key.replace(prefix, ""));
	let spaced = stripped.replace('_', " ");
	let mut chars = spaced.chars();

	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
