//! Record reads and writes.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	api::{Document, Links, ResourceObject, SuiteCrm, document, set_query},
	bean::Bean,
	filter::Filter,
	http::CrmHttpClient,
	oauth::TransportErrorMapper,
	pipeline::Method,
};

/// Sort direction for list requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
	/// Smallest first.
	Ascending,
	/// Largest first.
	#[default]
	Descending,
}

/// Sort key for list requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
	/// Field to sort by.
	pub field: String,
	/// Direction.
	pub order: SortOrder,
}
impl Sort {
	pub(crate) fn to_query(&self) -> String {
		match self.order {
			SortOrder::Ascending => format!("sort={}", self.field),
			SortOrder::Descending => format!("sort=-{}", self.field),
		}
	}
}

/// Options for [`SuiteCrm::get_bean_list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListRequest {
	/// Fields to return; empty returns every field.
	pub fields: Vec<String>,
	/// Legacy query translated into a filter.
	pub filter: Option<String>,
	/// One-based page number.
	pub page_number: Option<u32>,
	/// Page size.
	pub page_size: Option<u32>,
	/// Sort key.
	pub sort: Option<Sort>,
}
impl ListRequest {
	/// First page, server-side page size, no fields, filter, or sort.
	pub fn new() -> Self {
		Self { fields: Vec::new(), filter: None, page_number: Some(1), page_size: None, sort: None }
	}

	/// Restricts the returned fields.
	pub fn fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields = fields.into_iter().map(Into::into).collect();

		self
	}

	/// Filters with a legacy query such as `accounts.name = 'Acme'`.
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
}
impl Default for ListRequest {
	fn default() -> Self {
		Self::new()
	}
}

/// One page of records.
#[derive(Clone, Debug, PartialEq)]
pub struct BeanList {
	/// Records of the page.
	pub entry_list: Vec<Bean>,
	/// Number of records on the page.
	pub result_count: usize,
	/// Previous page number, when the server links one.
	pub previous_offset: Option<u32>,
	/// Requested page number.
	pub current_offset: Option<u32>,
	/// Next page number, when the server links one.
	pub next_offset: Option<u32>,
	/// Requested page size.
	pub current_limit: Option<u32>,
}
impl BeanList {
	pub(crate) fn from_page(
		entry_list: Vec<Bean>,
		page_number: Option<u32>,
		page_size: Option<u32>,
		links: &Links,
	) -> Self {
		let page = page_number.unwrap_or(1);

		Self {
			result_count: entry_list.len(),
			entry_list,
			previous_offset: links.prev.as_ref().map(|_| page.saturating_sub(1)),
			current_offset: page_number,
			next_offset: links.next.as_ref().map(|_| page.saturating_add(1)),
			current_limit: page_size,
		}
	}
}

impl<C, M> SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Fetches one record.
	///
	/// `fields` restricts the returned fields. For each name in `links`, the related records
	/// are fetched too and stored on the bean under their module name.
	pub async fn get_bean(
		&self,
		module: &str,
		id: &str,
		fields: &[&str],
		links: &[&str],
	) -> Result<Bean> {
		let mut url = self.endpoint("/V8/module", &[module, id])?;

		if !fields.is_empty() {
			set_query(&mut url, &[format!("fields[{module}]={}", fields.join(","))]);
		}

		let response = self.read(&url, Value::Null).await?;
		let doc: Document<ResourceObject> = document::decode("record", response)?;
		let mut bean = Bean::from_resource(doc.data);

		for link in links {
			let related = self.relationship_objects(module, id, link, &[]).await?.data;

			if let Some(first) = related.first() {
				let name = first.kind.clone();

				bean.set_relationship(name, related);
			}
		}

		Ok(bean)
	}

	/// Fetches one page of records of `module`.
	pub async fn get_bean_list(&self, module: &str, request: &ListRequest) -> Result<BeanList> {
		let mut url = self.endpoint("/V8/module", &[module])?;
		let mut query = Vec::new();

		if !request.fields.is_empty() {
			query.push(format!("fields[{module}]={}", request.fields.join(",")));
		}
		if let Some(number) = request.page_number {
			query.push(format!("page[number]={number}"));
		}
		if let Some(size) = request.page_size {
			query.push(format!("page[size]={size}"));
		}
		if let Some(sort) = &request.sort {
			query.push(sort.to_query());
		}
		if let Some(legacy) = &request.filter {
			query.push(Filter::from_legacy_query(legacy)?.to_filter_string());
		}

		set_query(&mut url, &query);

		let response = self.read(&url, Value::Null).await?;
		let doc: Document<Vec<ResourceObject>> = document::decode("record list", response)?;
		let entries = doc.data.into_iter().map(Bean::from_resource).collect();

		Ok(BeanList::from_page(entries, request.page_number, request.page_size, &doc.links))
	}

	/// Creates the record, or updates it when it already has an id.
	///
	/// A created record receives the id assigned by the server. Returns the server response.
	pub async fn save_bean(&self, bean: &mut Bean) -> Result<Value> {
		let url = self.endpoint("/V8/module", &[])?;

		match bean.id().map(str::to_owned) {
			Some(id) => {
				let body = json!({
					"data": { "type": bean.module(), "id": id, "attributes": bean.attributes() }
				});

				self.execute(Method::Patch, &url, Some(&body)).await
			},
			None => {
				let body =
					json!({ "data": { "type": bean.module(), "attributes": bean.attributes() } });
				let response = self.execute(Method::Post, &url, Some(&body)).await?;

				if let Some(id) = response.pointer("/data/id").and_then(Value::as_str) {
					bean.set_id(id);
				}

				Ok(response)
			},
		}
	}
}
