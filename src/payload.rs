//! Request and reply types exchanged with the label backend, plus the body
//! builders for each operation.

use crate::asset::UploadedAsset;
use crate::draft::LabelDraft;
use crate::{Error, ProtocolVersion, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// A file carried in a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// A multipart form: ordered text fields and at most one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.file = Some(part);
        self
    }

    /// First value of a text field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Multipart(FormPayload),
    Json(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request handed to a [`crate::Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

impl OutgoingRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into(), body: RequestBody::Empty }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self { method: Method::Post, url: url.into(), body }
    }

    /// The multipart form, if this request carries one
    pub fn form(&self) -> Option<&FormPayload> {
        match &self.body {
            RequestBody::Multipart(form) => Some(form),
            _ => None,
        }
    }

    /// The JSON document, if this request carries one
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A raw reply from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self { status, content_type: content_type.map(str::to_string), body }
    }

    pub fn from_json(status: u16, value: &Value) -> Self {
        Self::new(status, Some("application/json"), value.to_string().into_bytes())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }

    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::DecodeError(format!("expected JSON from server (status {}): {}", self.status, e))
        })
    }

    /// The `error` text of a JSON error body, if there is one
    pub fn error_message(&self) -> Option<String> {
        self.parse_json::<ErrorReply>().ok().and_then(|r| r.error)
    }
}

/// Reply of the preview endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewReply {
    pub preview_url: Option<String>,
    pub original_file: Option<String>,
    pub error: Option<String>,
}

/// Reply of the save endpoint. Backends answer with `ok` or `success`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveReply {
    pub ok: Option<bool>,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub uuid: Option<String>,
    pub error: Option<String>,
}

impl SaveReply {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.ok.or(self.success).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorReply {
    pub error: Option<String>,
}

fn draft_form(draft: &LabelDraft, protocol: ProtocolVersion) -> FormPayload {
    let mut form = FormPayload::new();
    for (name, value) in draft.form_fields(protocol) {
        form = form.text(name, value);
    }
    form
}

/// Body of a preview round-trip: every form field plus the image
pub fn preview_payload(
    draft: &LabelDraft,
    asset: Option<&UploadedAsset>,
    protocol: ProtocolVersion,
) -> FormPayload {
    let form = draft_form(draft, protocol);
    match asset {
        Some(asset) => form.file(asset.file_part()),
        None => form,
    }
}

/// Body of a PDF export
pub fn pdf_body(
    draft: &LabelDraft,
    asset: Option<&UploadedAsset>,
    filename: Option<&str>,
    protocol: ProtocolVersion,
) -> RequestBody {
    if protocol.uses_json_bodies() {
        return RequestBody::Json(json!({
            "filename": filename,
            "label_data": draft.label_data(protocol),
        }));
    }
    let mut form = preview_payload(draft, asset, protocol);
    if let Some(filename) = filename {
        form = form.text("filename", filename);
    }
    RequestBody::Multipart(form)
}

/// Body of a save request
pub fn save_body(
    draft: &LabelDraft,
    asset: Option<&UploadedAsset>,
    filename: Option<&str>,
    label_uuid: Option<&str>,
    protocol: ProtocolVersion,
) -> RequestBody {
    if protocol.uses_json_bodies() {
        return RequestBody::Json(json!({
            "uuid": label_uuid,
            "label_data": draft.label_data(protocol),
            "filename": filename,
        }));
    }
    let mut form = preview_payload(draft, asset, protocol);
    if let Some(uuid) = label_uuid {
        form = form.text("uuid", uuid);
    }
    if let Some(filename) = filename {
        form = form.text("filename", filename);
    }
    RequestBody::Multipart(form)
}
