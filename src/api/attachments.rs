//! Custom endpoints returning binary payloads encoded as JSON.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, api::SuiteCrm, http::CrmHttpClient, oauth::TransportErrorMapper};

impl<C, M> SuiteCrm<C, M>
where
	C: ?Sized + CrmHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Retrieves the attachment of a note.
	pub async fn get_note_attachment(&self, note_id: &str) -> Result<Value> {
		let url = self.endpoint("/V8/custom/getNoteAttach", &[note_id])?;

		self.read(&url, Value::Null).await
	}

	/// Renders the PDF template `template_id` for the record `id` of `module`.
	pub async fn get_pdf_template(&self, template_id: &str, module: &str, id: &str) -> Result<Value> {
		let url = self.endpoint("/V8/custom/getPdfTemplate", &[module, id, template_id])?;

		self.read(&url, Value::Null).await
	}
}
