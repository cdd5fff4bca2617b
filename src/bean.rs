//! Record payloads exchanged with the module endpoints.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, api::ResourceObject};

/// Field map of a related record, with its `id` folded in.
pub type RelatedRecord = Map<String, Value>;

/// One record of a module: field values plus any related records fetched with it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bean {
	module: String,
	fields: Map<String, Value>,
	relationships: BTreeMap<String, Vec<RelatedRecord>>,
}
impl Bean {
	/// Creates an unsaved record of `module`.
	pub fn new(module: impl Into<String>) -> Self {
		Self { module: module.into(), ..Default::default() }
	}

	/// Builds a record from a JSON:API resource object.
	pub fn from_resource(resource: ResourceObject) -> Self {
		let mut bean = Self::new(resource.kind);

		bean.fields = resource.attributes;
		bean.set_id(resource.id);

		bean
	}

	/// Module the record belongs to.
	pub fn module(&self) -> &str {
		&self.module
	}

	/// Record identifier, `None` until the record is saved.
	pub fn id(&self) -> Option<&str> {
		self.fields.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
	}

	/// Sets the record identifier.
	pub fn set_id(&mut self, id: impl Into<String>) {
		self.fields.insert("id".into(), Value::String(id.into()));
	}

	/// Returns a field value.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field)
	}

	/// Returns a field value as a string slice, if it is a string.
	pub fn get_str(&self, field: &str) -> Option<&str> {
		self.get(field).and_then(Value::as_str)
	}

	/// Sets a field value.
	pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		self.fields.insert(field.into(), value.into());

		self
	}

	/// Related records stored under `name`.
	pub fn relationship(&self, name: &str) -> Option<&[RelatedRecord]> {
		self.relationships.get(name).map(Vec::as_slice)
	}

	/// All relationships, keyed by related module name.
	pub fn relationships(&self) -> &BTreeMap<String, Vec<RelatedRecord>> {
		&self.relationships
	}

	/// Stores related records under `name`, folding each record's `id` into its fields.
	pub fn set_relationship<I>(&mut self, name: impl Into<String>, records: I)
	where
		I: IntoIterator<Item = ResourceObject>,
	{
		let records = records
			.into_iter()
			.map(|record| {
				let mut fields = record.attributes;

				fields.insert("id".into(), Value::String(record.id));

				fields
			})
			.collect();

		self.relationships.insert(name.into(), records);
	}

	/// All fields, `id` included.
	pub fn fields(&self) -> &Map<String, Value> {
		&self.fields
	}

	/// Field names, `id` included.
	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	/// Fields without `id`, as sent in create and update payloads.
	pub fn attributes(&self) -> Map<String, Value> {
		self.fields
			.iter()
			.filter(|(name, _)| *name != "id")
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect()
	}

	/// Fields as `{"name": ..., "value": ...}` pairs.
	pub fn name_value_list(&self) -> Vec<Value> {
		self.fields
			.iter()
			.map(|(name, value)| serde_json::json!({ "name": name, "value": value }))
			.collect()
	}

	/// Fields as a JSON object.
	pub fn to_json(&self) -> Value {
		Value::Object(self.fields.clone())
	}
}
impl Display for Bean {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		writeln!(f, "{}", self.module)?;

		for (name, value) in &self.fields {
			match value {
				Value::String(text) => writeln!(f, "\t{name}: {text}")?,
				other => writeln!(f, "\t{name}: {other}")?,
			}
		}

		Ok(())
	}
}
