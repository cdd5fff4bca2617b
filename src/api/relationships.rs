//! Relationship reads and writes.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	api::{BeanList, Document, ResourceObject, Sort, SortOrder, SuiteCrm, document, set_query},
	bean::Bean,
	filter::Filter,
	http::CrmHttpClient,
	oauth::TransportErrorMapper,
	pipeline::Method,
};

/// Options for [`SuiteCrm::get_relationships`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationshipRequest {
	/// Return the relationship payload as-is instead of fetching every related record.
	pub only_relationship_fields: bool,
	/// Link names to resolve on each fetched record.
	pub links: Vec<String>,
	/// Legacy query translated into a filter.
	pub filter: Option<String>,
	/// One-based page number.
	pub page_number: Option<u32>,
	/// Page size.
	pub page_size: Option<u32>,
	/// Sort key.
	pub sort: Option<Sort>,
}
impl RelationshipRequest {
	/// Returns the related objects without fetching them individually.
	pub fn only_relationship_fields(mut self) -> Self {
		self.only_relationship_fields = true;

		self
	}

	/// Resolves `links` on every fetched record.
	pub fn links<I, S>(mut self, links: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.links = links.into_iter().map(Into::into).collect();

		self
	}

	/// Filters with a legacy query.
	pub fn filter(mut self, legacy_query: impl Into<String>) -> Self {
		self.filter = Some(legacy_query.into());

		self
	}

	/// Selects a page.
	pub fn page(mut self, number: u32, size: u32) -> Self {
		self.page_number = Some(number);
		self.page_size = Some(size);

		self
	}

	/// Sorts by `field`.
	pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
		self.sort = Some(Sort { field: field.into(), order });

		self
	}

	fn query(&self) -> Result<Vec<String>> {
		let mut query = Vec::new();

		if let Some(sort) = &self.sort {
			query.push(sort.to_query());
		}
		if let Some(legacy) = &self.filter {
			query.push(Filter::from_legacy_query(legacy)?.to_filter_string());
		}
		if let Some(number) = self.page_number {
			query.push(format!("page[number]={number}"));
		}
		if let Some(size) = self.page_size {
			query.push(format!("page[size]={size}"));
		}

		Ok(query)
	}
}

impl<C, M> SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Lists records of `related` linked to the record `id` of `module`.
	pub async fn get_relationships(
		&self,
		module: &str,
		id: &str,
		related: &str,
		request: &RelationshipRequest,
	) -> Result<BeanList> {
		let doc = self.relationship_objects(module, id, related, &request.query()?).await?;
		let entries = if request.only_relationship_fields {
			doc.data.into_iter().map(Bean::from_resource).collect()
		} else {
			let links = request.links.iter().map(String::as_str).collect::<Vec<_>>();
			let mut entries = Vec::with_capacity(doc.data.len());

			for object in &doc.data {
				entries.push(self.get_bean(&object.kind, &object.id, &[], &links).await?);
			}

			entries
		};

		Ok(BeanList::from_page(entries, request.page_number, request.page_size, &doc.links))
	}

	/// Links each of `related_ids` of module `related` to the record `id` of `module`.
	///
	/// Issues one call per related record and returns the responses in order.
	pub async fn set_relationship(
		&self,
		module: &str,
		id: &str,
		related: &str,
		related_ids: &[&str],
	) -> Result<Vec<Value>> {
		let url = self.endpoint("/V8/module", &[module, id, "relationships"])?;
		let mut responses = Vec::with_capacity(related_ids.len());

		for related_id in related_ids {
			let body = json!({ "data": { "type": related, "id": related_id } });

			responses.push(self.execute(Method::Post, &url, Some(&body)).await?);
		}

		Ok(responses)
	}

	/// Unlinks each `(related module, related id)` pair from the record `id` of `module`.
	pub async fn delete_relationship(
		&self,
		module: &str,
		id: &str,
		related: &[(&str, &str)],
	) -> Result<Vec<Value>> {
		let mut responses = Vec::with_capacity(related.len());

		for (related_module, related_id) in related {
			let link = related_module.to_lowercase();
			let url =
				self.endpoint("/V8/module", &[module, id, "relationships", link.as_str(), *related_id])?;

			responses.push(self.execute(Method::Delete, &url, None).await?);
		}

		Ok(responses)
	}

	pub(crate) async fn relationship_objects(
		&self,
		module: &str,
		id: &str,
		related: &str,
		query: &[String],
	) -> Result<Document<Vec<ResourceObject>>> {
		let link = related.to_lowercase();
		let mut url = self.endpoint("/V8/module", &[module, id, "relationships", link.as_str()])?;

		set_query(&mut url, query);

		let response = self.read(&url, Value::Null).await?;

		document::decode("relationship list", response)
	}
}
