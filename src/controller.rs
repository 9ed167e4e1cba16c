//! The preview sync controller.
//!
//! Owns the label draft, the uploaded background and the server-side file
//! name, and turns user edits into preview, save and PDF export requests.
//! Every failure is shown through [`PreviewSurface::alert`] and also returned
//! to the caller. A failed preview leaves the previous preview in place.

use crate::asset::{extension_for_mime, UploadedAsset, BACKGROUND_FIELD};
use crate::bootstrap::PageBootstrap;
use crate::draft::{Field, FieldEvent, LabelDraft, PairSide};
use crate::endpoints::{cache_busted, Endpoints};
use crate::payload::{self, OutgoingRequest, PreviewReply, Reply, RequestBody, SaveReply};
use crate::surface::PreviewSurface;
use crate::transport::Transport;
use crate::{Error, ProtocolVersion, Result, SyncConfig};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const PREVIEW_FAILED: &str = "An error occurred while generating the preview";
const SAVE_SUCCEEDED: &str = "Label saved successfully!";

/// Initial-data keys that may carry the background image
const BACKGROUND_KEYS: [&str; 2] = ["background_url", "background_image"];
/// Initial-data keys that may carry the server-side file name
const FILENAME_KEYS: [&str; 2] = ["original_file", "filename"];

/// Outcome of a successful preview round-trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewUpdate {
    /// Source the preview image now points at
    pub src: String,
    /// Server-side name of the uploaded background, if known
    pub original_file: Option<String>,
}

/// Outcome of a successful PDF export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExport {
    pub file_name: String,
    pub size: usize,
}

/// Outcome of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub message: String,
    pub label_uuid: Option<String>,
}

/// Download name for a label's PDF: every character that is not an ASCII
/// letter or digit becomes `_`, then the name is lower-cased.
pub fn download_file_name(beer_name: &str) -> String {
    let stem: String = beer_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}.pdf", stem)
}

pub struct PreviewSyncController<T, S> {
    transport: T,
    surface: S,
    endpoints: Endpoints,
    protocol: ProtocolVersion,
    max_upload_bytes: usize,
    draft: LabelDraft,
    asset: Option<UploadedAsset>,
    current_file: Option<String>,
    uploaded: bool,
    preview_src: Option<String>,
    previews_issued: u64,
}

impl<T: Transport, S: PreviewSurface> PreviewSyncController<T, S> {
    pub fn new(config: &SyncConfig, transport: T, surface: S) -> Result<Self> {
        let endpoints = Endpoints::new(&config.base_url, config.label_uuid.clone())?;
        Ok(Self {
            transport,
            surface,
            endpoints,
            protocol: config.protocol,
            max_upload_bytes: config.max_upload_bytes,
            draft: LabelDraft::default(),
            asset: None,
            current_file: None,
            uploaded: false,
            preview_src: None,
            previews_issued: 0,
        })
    }

    pub fn draft(&self) -> &LabelDraft {
        &self.draft
    }

    pub fn asset(&self) -> Option<&UploadedAsset> {
        self.asset.as_ref()
    }

    /// Server-side name of the uploaded background
    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    pub fn label_uuid(&self) -> Option<&str> {
        self.endpoints.label_uuid()
    }

    pub fn preview_src(&self) -> Option<&str> {
        self.preview_src.as_deref()
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of preview round-trips issued so far
    pub fn previews_issued(&self) -> u64 {
        self.previews_issued
    }

    /// Field edits re-post the preview only once there is something to render
    pub fn can_preview(&self) -> bool {
        self.asset.is_some() || self.current_file.is_some()
    }

    /// PDF export needs a background the server has accepted
    pub fn can_export(&self) -> bool {
        self.uploaded
    }

    /// Serialize the draft and ask the server for a fresh preview
    pub fn submit_draft(&mut self) -> Result<PreviewUpdate> {
        let url = self.endpoints.preview()?;
        let form = payload::preview_payload(&self.draft, self.asset.as_ref(), self.protocol);
        let request = OutgoingRequest::post(url, RequestBody::Multipart(form));

        self.previews_issued += 1;
        debug!("preview #{} -> {}", self.previews_issued, request.url);

        let reply = match self.transport.send(&request) {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail(PREVIEW_FAILED, e)),
        };
        let parsed: PreviewReply = match reply.parse_json() {
            Ok(parsed) => parsed,
            Err(e) => {
                let err = if reply.is_success() { e } else { Error::HttpStatus(reply.status) };
                return Err(self.fail(PREVIEW_FAILED, err));
            }
        };
        if let Some(message) = parsed.error {
            return Err(self.fail_server(message));
        }
        if !reply.is_success() {
            return Err(self.fail(PREVIEW_FAILED, Error::HttpStatus(reply.status)));
        }
        let Some(preview_url) = parsed.preview_url else {
            let err = Error::DecodeError("preview reply has no preview_url".into());
            return Err(self.fail(PREVIEW_FAILED, err));
        };

        let mut src = match self.endpoints.resolve(&preview_url) {
            Ok(src) => src,
            Err(e) => return Err(self.fail(PREVIEW_FAILED, e)),
        };
        if self.protocol.cache_busts_previews() {
            src = cache_busted(&src, unix_millis());
        }

        self.surface.set_preview_src(&src);
        self.preview_src = Some(src.clone());
        if let Some(original) = parsed.original_file {
            self.current_file = Some(original);
        }
        if self.can_preview() {
            self.uploaded = true;
        }
        info!("preview updated: {}", src);

        Ok(PreviewUpdate {
            src,
            original_file: self.current_file.clone(),
        })
    }

    /// Assign a field without firing any event
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.draft.set(field, value);
        self.refresh_display(field);
    }

    /// React to an `input` or `change` event on a form control.
    ///
    /// Returns `Ok(None)` when the event does not re-post the preview: the
    /// field is not on this protocol's form, its trigger class ignores the
    /// event, or there is no background yet.
    pub fn handle_event(
        &mut self,
        field: Field,
        event: FieldEvent,
        value: impl Into<String>,
    ) -> Result<Option<PreviewUpdate>> {
        if !field.is_available(self.protocol) {
            debug!("ignoring {:?}: not on the {} form", field, self.protocol);
            return Ok(None);
        }
        self.set_field(field, value);

        if !field.trigger(self.protocol).fires_on(event) || !self.can_preview() {
            return Ok(None);
        }
        self.submit_draft().map(Some)
    }

    /// One committed user edit: exactly one preview request once a
    /// background is present
    pub fn edit_field(&mut self, field: Field, value: impl Into<String>) -> Result<Option<PreviewUpdate>> {
        let event = field.trigger(self.protocol).edit_event();
        self.handle_event(field, event, value)
    }

    /// Keep a slider and its number input in step. The side that was not
    /// touched receives the value, then the preview is re-posted if the
    /// field's trigger class fires on `event`.
    pub fn sync_pair(
        &mut self,
        field: Field,
        side: PairSide,
        event: FieldEvent,
        value: impl Into<String>,
    ) -> Result<Option<PreviewUpdate>> {
        if !field.is_numeric() || !field.is_available(self.protocol) {
            return Ok(None);
        }
        let value = value.into();
        let other = match side {
            PairSide::Range => PairSide::Number,
            PairSide::Number => PairSide::Range,
        };
        self.surface
            .set_value(&field.pair_element(other, self.protocol), &value);
        self.set_field(field, value);

        if !field.trigger(self.protocol).fires_on(event) || !self.can_preview() {
            return Ok(None);
        }
        self.submit_draft().map(Some)
    }

    /// Replace the background image and post a preview with it
    pub fn attach_background(&mut self, asset: UploadedAsset) -> Result<PreviewUpdate> {
        if let Err(e) = asset.check_size(self.max_upload_bytes) {
            let message = e.to_string();
            self.surface.alert(&message);
            return Err(e);
        }
        self.surface
            .set_text(&format!("{}_name", BACKGROUND_FIELD), asset.file_name());
        info!("attached background {} ({} bytes)", asset.file_name(), asset.len());
        self.asset = Some(asset);
        self.submit_draft()
    }

    /// Export the label as a PDF and hand it to the surface as a download
    pub fn export_pdf(&mut self) -> Result<PdfExport> {
        if !self.can_export() {
            let err = Error::NotUploaded;
            self.surface.alert(&err.to_string());
            return Err(err);
        }
        if self.draft.beer_name.trim().is_empty() {
            let err = Error::MissingBeerName;
            self.surface.alert(&err.to_string());
            return Err(err);
        }

        let file_name = download_file_name(&self.draft.beer_name);
        match self.request_pdf() {
            Ok(bytes) => {
                if let Err(e) = self.surface.deliver_download(&file_name, &bytes) {
                    self.surface.alert(&format!("Error generating PDF: {}", e));
                    return Err(e);
                }
                info!("exported {} ({} bytes)", file_name, bytes.len());
                Ok(PdfExport { file_name, size: bytes.len() })
            }
            Err(e) => {
                warn!("PDF export failed: {}", e);
                self.surface.alert(&format!("Error generating PDF: {}", e));
                Err(e)
            }
        }
    }

    fn request_pdf(&self) -> Result<Vec<u8>> {
        let body = payload::pdf_body(
            &self.draft,
            self.asset.as_ref(),
            self.current_file.as_deref(),
            self.protocol,
        );
        let request = OutgoingRequest::post(self.endpoints.pdf()?, body);
        debug!("pdf -> {}", request.url);
        let reply = self.transport.send(&request)?;

        if reply.is_json() || !reply.is_success() {
            return Err(match reply.error_message() {
                Some(message) => Error::ServerError(message),
                None if !reply.is_success() => Error::HttpStatus(reply.status),
                None => Error::DecodeError("expected a PDF, got JSON".into()),
            });
        }
        if reply.body.is_empty() {
            return Err(Error::DecodeError("server returned an empty PDF".into()));
        }
        Ok(reply.body)
    }

    /// Persist the label on the server
    pub fn save_label(&mut self) -> Result<SaveOutcome> {
        let body = payload::save_body(
            &self.draft,
            self.asset.as_ref(),
            self.current_file.as_deref(),
            self.endpoints.label_uuid(),
            self.protocol,
        );
        let url = self.endpoints.save()?;
        let request = OutgoingRequest::post(url, body);
        debug!("save -> {}", request.url);

        let result = self
            .transport
            .send(&request)
            .and_then(|reply| interpret_save(&reply));
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("save failed: {}", e);
                self.surface.alert(&format!("Error saving label: {}", e));
                return Err(e);
            }
        };

        if self.endpoints.label_uuid().is_none() {
            if let Some(uuid) = reply.uuid.clone() {
                match self.endpoints.set_label_uuid(Some(uuid)) {
                    Ok(()) => info!("label assigned uuid {}", self.endpoints.label_uuid().unwrap_or_default()),
                    Err(e) => warn!("ignoring label uuid from server: {}", e),
                }
            }
        }

        let message = reply.message.unwrap_or_else(|| SAVE_SUCCEEDED.to_string());
        self.surface.alert(&message);
        Ok(SaveOutcome {
            message,
            label_uuid: self.endpoints.label_uuid().map(str::to_string),
        })
    }

    /// Load server-supplied state: populate the form, restore the background
    /// and refresh every derived display. Issues one preview when a
    /// background was restored.
    ///
    /// A label UUID the endpoints reject is alerted and skipped; the rest of
    /// the page state is still applied.
    pub fn initialize(&mut self, boot: &PageBootstrap) -> Result<()> {
        if let Some(data) = &boot.initial_data {
            for field in self.draft.apply_initial(data, self.protocol) {
                let name = field.name(self.protocol);
                self.surface.set_value(name, self.draft.get(field));
            }

            if let Some(name) = first_string(data, &FILENAME_KEYS) {
                self.current_file = Some(name.to_string());
                self.uploaded = true;
            }

            if let Some(source) = first_string(data, &BACKGROUND_KEYS) {
                match self.fetch_background(source) {
                    Ok(asset) => {
                        self.surface
                            .set_text(&format!("{}_name", BACKGROUND_FIELD), asset.file_name());
                        self.asset = Some(asset);
                        self.uploaded = true;
                    }
                    Err(e) => {
                        warn!("could not restore background from {}: {}", source, e);
                        self.surface
                            .alert(&format!("Could not restore the background image: {}", e));
                    }
                }
            }
        }

        if let Some(uuid) = &boot.label_uuid {
            if let Err(e) = self.endpoints.set_label_uuid(Some(uuid.clone())) {
                warn!("ignoring label uuid from page: {}", e);
                self.surface.alert(&format!("Could not load the label: {}", e));
            }
        }

        self.refresh_displays();

        if self.asset.is_some() {
            self.submit_draft()?;
        }
        Ok(())
    }

    /// Fetch an editor page through the transport and initialize from it
    #[cfg(feature = "http")]
    pub fn bootstrap_from_page(&mut self, page_url: &str) -> Result<PageBootstrap> {
        let boot = match self.fetch_page(page_url) {
            Ok(boot) => boot,
            Err(e) => {
                warn!("could not bootstrap from {}: {}", page_url, e);
                self.surface.alert(&format!("Could not load the label: {}", e));
                return Err(e);
            }
        };
        self.initialize(&boot)?;
        Ok(boot)
    }

    #[cfg(feature = "http")]
    fn fetch_page(&self, page_url: &str) -> Result<PageBootstrap> {
        let url = self.endpoints.resolve(page_url)?;
        let reply = self.transport.send(&OutgoingRequest::get(url))?;
        if !reply.is_success() {
            return Err(Error::HttpStatus(reply.status));
        }
        PageBootstrap::parse_html(&String::from_utf8_lossy(&reply.body))
    }

    /// Push every derived display (percentages, color codes) to the surface
    pub fn refresh_displays(&self) {
        for display in self.draft.displays(self.protocol) {
            self.surface.set_text(&display.element_id, &display.text);
        }
    }

    fn refresh_display(&self, field: Field) {
        if let Some(display) = self.draft.display_for(field, self.protocol) {
            self.surface.set_text(&display.element_id, &display.text);
        }
    }

    fn fetch_background(&self, source: &str) -> Result<UploadedAsset> {
        if source.starts_with("data:") {
            return UploadedAsset::from_data_url(source);
        }
        let url = self.endpoints.resolve(source)?;
        let reply = self.transport.send(&OutgoingRequest::get(url.clone()))?;
        if !reply.is_success() {
            return Err(Error::HttpStatus(reply.status));
        }
        let asset = UploadedAsset::from_bytes(background_file_name(&url, &reply), reply.body)?;
        asset.check_size(self.max_upload_bytes)?;
        Ok(asset)
    }

    fn fail(&self, message: &str, err: Error) -> Error {
        warn!("{}: {}", message, err);
        self.surface.alert(message);
        err
    }

    fn fail_server(&self, message: String) -> Error {
        warn!("server rejected request: {}", message);
        self.surface.alert(&message);
        Error::ServerError(message)
    }
}

fn interpret_save(reply: &Reply) -> Result<SaveReply> {
    let parsed: SaveReply = match reply.parse_json() {
        Ok(parsed) => parsed,
        Err(_) if !reply.is_success() => return Err(Error::HttpStatus(reply.status)),
        Err(e) => return Err(e),
    };
    if let Some(message) = parsed.error.clone() {
        return Err(Error::ServerError(message));
    }
    if !reply.is_success() {
        return Err(Error::HttpStatus(reply.status));
    }
    if !parsed.succeeded() {
        return Err(Error::ServerError("the server did not accept the label".into()));
    }
    Ok(parsed)
}

fn first_string<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| data.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Name a fetched background after the last URL segment, falling back to
/// the reply's content type when the segment has no usable extension
fn background_file_name(url: &str, reply: &Reply) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let has_image_ext = segment
        .rsplit_once('.')
        .map(|(_, ext)| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false);
    if has_image_ext {
        return segment.to_string();
    }
    let ext = reply
        .content_type
        .as_deref()
        .and_then(extension_for_mime)
        .unwrap_or("png");
    format!("{}.{}", BACKGROUND_FIELD, ext)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
