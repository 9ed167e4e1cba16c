//! Labelsync
//!
//! A client for beer-label design backends. It keeps a label draft (the form
//! fields a user edits) in sync with a server-rendered preview, and packages
//! the draft plus the uploaded background image into preview, save and PDF
//! export requests.
//!
//! # Features
//!
//! - **HTTP backend** (default, `http` feature): blocking `reqwest` transport
//!   and editor page bootstrap via `scraper`
//! - **Pluggable surfaces**: the preview image, alerts and downloads go
//!   through the [`surface::PreviewSurface`] trait
//! - **Protocol versions**: both revisions of the label form are spoken,
//!   see [`ProtocolVersion`]
//!
//! # Example
//!
//! ```no_run
//! use labelsync::surface::RecordingSurface;
//! use labelsync::{Field, SyncConfig, UploadedAsset};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig {
//!     base_url: "http://127.0.0.1:5000".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut controller = labelsync::connect(config, RecordingSurface::new())?;
//! controller.attach_background(UploadedAsset::from_path("hops.png")?)?;
//! controller.edit_field(Field::BeerName, "Pale Ale")?;
//! let export = controller.export_pdf()?;
//! println!("Saved {}", export.file_name);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub mod error;
pub use error::{Error, Result};

pub mod asset;
pub mod bootstrap;
pub mod controller;
pub mod draft;
pub mod endpoints;
pub mod payload;
pub mod surface;
pub mod transport;

// Blocking reqwest transport
#[cfg(feature = "http")]
pub mod http;

// Async-friendly session backed by a worker thread
pub mod async_api;

pub use asset::UploadedAsset;
pub use async_api::LiveSession;
pub use bootstrap::PageBootstrap;
pub use controller::{download_file_name, PdfExport, PreviewSyncController, PreviewUpdate, SaveOutcome};
pub use draft::{Field, FieldEvent, FieldTrigger, LabelDraft, PairSide};
pub use endpoints::Endpoints;
pub use transport::{MemoryTransport, Transport};

/// Which revision of the label form and wire format the backend speaks.
///
/// `V1` is the first revision of the editor: the subtitle is sent as
/// `brewer_name`, the image can be rotated, every control re-posts on every
/// keystroke, and PDF/save bodies are JSON. `V2` renames the subtitle, adds a
/// vertical crop, holds crop sliders back until release, cache-busts the
/// preview image and sends multipart bodies everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2,
}

impl ProtocolVersion {
    /// Whether preview URLs get a `t=<millis>` query parameter
    pub fn cache_busts_previews(self) -> bool {
        matches!(self, ProtocolVersion::V2)
    }

    /// Whether PDF and save requests are sent as JSON instead of multipart
    pub fn uses_json_bodies(self) -> bool {
        matches!(self, ProtocolVersion::V1)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => f.write_str("v1"),
            ProtocolVersion::V2 => f.write_str("v2"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ProtocolVersion::V1),
            "v2" | "2" => Ok(ProtocolVersion::V2),
            other => Err(Error::ConfigError(format!("unknown protocol version '{}'", other))),
        }
    }
}

/// Configuration for a preview sync client
///
/// The defaults target a backend running locally on Flask's default port and
/// match the backend's own upload limit.
///
/// # Examples
///
/// ```
/// let cfg = labelsync::SyncConfig::default();
/// assert_eq!(cfg.protocol, labelsync::ProtocolVersion::V2);
/// assert!(cfg.label_uuid.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the label backend
    pub base_url: String,
    /// Label UUID used to scope endpoints, when the server assigned one
    pub label_uuid: Option<String>,
    /// Form revision spoken by the backend
    pub protocol: ProtocolVersion,
    /// Timeout for each request in milliseconds
    pub timeout_ms: u64,
    /// User agent string to send with requests
    pub user_agent: String,
    /// Extra HTTP headers added to every request
    pub headers: HashMap<String, String>,
    /// Largest background image accepted for upload
    pub max_upload_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            label_uuid: None,
            protocol: ProtocolVersion::default(),
            timeout_ms: 30000,
            user_agent: format!("labelsync/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
            max_upload_bytes: asset::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl SyncConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Reject configurations that cannot produce a working client
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be greater than zero".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::ConfigError("max_upload_bytes must be greater than zero".into()));
        }
        Endpoints::new(&self.base_url, self.label_uuid.clone()).map(|_| ())
    }
}

/// Create a controller that talks to the configured backend over HTTP
#[cfg(feature = "http")]
pub fn connect<S: surface::PreviewSurface>(
    config: SyncConfig,
    surface: S,
) -> Result<PreviewSyncController<http::HttpTransport, S>> {
    config.validate()?;
    let transport = http::HttpTransport::new(&config)?;
    PreviewSyncController::new(&config, transport, surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.timeout_ms, 30000);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert!(config.user_agent.starts_with("labelsync/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_json_fills_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"base_url":"http://labels.local","protocol":"v1"}"#).unwrap();
        assert_eq!(config.base_url, "http://labels.local");
        assert_eq!(config.protocol, ProtocolVersion::V1);
        assert_eq!(config.timeout_ms, 30000);
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!("V1".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V1);
        assert_eq!("2".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V2);
        assert!("v3".parse::<ProtocolVersion>().is_err());
        assert_eq!(ProtocolVersion::V1.to_string(), "v1");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = SyncConfig { timeout_ms: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}
