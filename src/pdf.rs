//! PDF resume loading.
//!
//! Turns an uploaded PDF into page-level [`Document`]s. `pdf-extract`
//! emits form feeds between pages when the document declares them; when
//! it does not, the whole text becomes a single document. Pages with no
//! extractable text are dropped; a PDF yielding nothing at all is
//! rejected so an empty resume never silently enters the index.

use serde_json::json;

use crate::error::{Error, Result};
use crate::models::Document;

/// Extract a PDF into page documents. Each document's metadata carries
/// the 1-based `page` number.
pub fn load_pdf(bytes: &[u8]) -> Result<Vec<Document>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Validation(format!("PDF extraction failed: {}", e)))?;

    let pages: Vec<&str> = if text.contains('\u{c}') {
        text.split('\u{c}').collect()
    } else {
        vec![text.as_str()]
    };

    let documents: Vec<Document> = pages
        .iter()
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| Document::new(page.trim(), json!({ "page": i + 1 })))
        .collect();

    if documents.is_empty() {
        return Err(Error::Validation(
            "PDF contained no extractable text".into(),
        ));
    }

    Ok(documents)
}
