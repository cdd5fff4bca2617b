//! Authenticated request pipeline: token lifecycle plus the one-shot retrying executor.

pub mod executor;
pub mod token_manager;

pub use executor::*;
pub use token_manager::*;

// self
use crate::_prelude::*;

/// HTTP methods the resource API is called with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
	/// Read.
	Get,
	/// Create.
	Post,
	/// Partial update.
	Patch,
	/// Removal.
	Delete,
}
impl Method {
	/// Returns the upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}

	pub(crate) fn as_http(self) -> oauth2::http::Method {
		match self {
			Method::Get => oauth2::http::Method::GET,
			Method::Post => oauth2::http::Method::POST,
			Method::Patch => oauth2::http::Method::PATCH,
			Method::Delete => oauth2::http::Method::DELETE,
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
