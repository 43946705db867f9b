//! Submission encoding: shape a validated payload into its wire form.
//!
//! Selection is mechanical. Any file attachment means a multipart body;
//! otherwise the payload map goes out verbatim as a single JSON body. No
//! re-validation happens here; the payload validator is the semantic gate
//! and runs strictly before this.

use serde_json::Value;

use crate::{
    errors::Result,
    files::FileSet,
    types::Params,
};

/// One multipart part, either a named text field or a named file field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content: Vec<u8>,
    },
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::Text { name, .. } | Part::File { name, .. } => name,
        }
    }
}

/// The transport-ready representation of a validated payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedRequest {
    /// Single structured JSON body.
    Json { path: String, body: Value },
    /// Multipart form fields plus file attachments.
    Multipart { path: String, parts: Vec<Part> },
}

impl EncodedRequest {
    /// Target path relative to the API base URL.
    pub fn path(&self) -> &str {
        match self {
            EncodedRequest::Json { path, .. } | EncodedRequest::Multipart { path, .. } => path,
        }
    }
}

/// Shape a payload for submission to `/custom/{slug}`.
///
/// With any files present, every payload entry becomes a named text part
/// (mappings and sequences serialized to their JSON text, since a text
/// field cannot carry them natively) and every file becomes a named file
/// part under its caller-supplied field key, with the file's base name and
/// byte content. Without files, the payload map is the JSON body verbatim.
pub fn encode(slug: &str, params: &Params, files: &FileSet) -> Result<EncodedRequest> {
    let path = format!("/custom/{slug}");

    if files.is_empty() {
        return Ok(EncodedRequest::Json {
            path,
            body: Value::Object(params.clone()),
        });
    }

    let mut parts = Vec::with_capacity(params.len() + files.len());
    for (key, value) in params {
        parts.push(Part::Text {
            name: key.clone(),
            value: text_field_value(value)?,
        });
    }
    for file in files.iter() {
        parts.push(Part::File {
            name: file.key().to_string(),
            file_name: file.file_name(),
            content: file.read()?,
        });
    }

    Ok(EncodedRequest::Multipart { path, parts })
}

fn text_field_value(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(value)?,
        other => other.to_string(),
    })
}
