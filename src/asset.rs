//! The uploaded background image

use crate::payload::FilePart;
use crate::{Error, Result};
use base64::Engine as _;
use std::path::Path;

/// Image extensions the backend accepts
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Upload limit enforced by the backend (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Multipart field name carrying the image
pub const BACKGROUND_FIELD: &str = "background";

/// A background image ready to be sent with label requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl UploadedAsset {
    /// Wrap raw image bytes. The file name must carry an allowed extension.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let ext = extension_of(&file_name)
            .ok_or_else(|| Error::InvalidAsset(format!("'{}' has no file extension", file_name)))?;
        let mime = mime_for_extension(&ext).ok_or_else(|| {
            Error::InvalidAsset(format!(
                "'{}' is not an accepted image type (expected {})",
                file_name,
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;
        if bytes.is_empty() {
            return Err(Error::InvalidAsset(format!("'{}' is empty", file_name)));
        }
        Ok(Self { file_name, mime, bytes })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidAsset(format!("{} has no usable file name", path.display())))?
            .to_string();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(file_name, bytes)
    }

    /// Decode a `data:image/...;base64,` URL, naming the file after its type.
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidAsset("not a data URL".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidAsset("data URL has no payload".into()))?;
        let mime = meta
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidAsset("only base64 data URLs are supported".into()))?;
        let ext = extension_for_mime(mime)
            .ok_or_else(|| Error::InvalidAsset(format!("unsupported image type '{}'", mime)))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::InvalidAsset(format!("bad base64 payload: {}", e)))?;
        Self::from_bytes(format!("{}.{}", BACKGROUND_FIELD, ext), bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn check_size(&self, max_bytes: usize) -> Result<()> {
        if self.bytes.len() > max_bytes {
            return Err(Error::InvalidAsset(format!(
                "'{}' is {} bytes, the limit is {} bytes",
                self.file_name,
                self.bytes.len(),
                max_bytes
            )));
        }
        Ok(())
    }

    /// The multipart file part carrying this image
    pub fn file_part(&self) -> FilePart {
        FilePart {
            field: BACKGROUND_FIELD.to_string(),
            file_name: self.file_name.clone(),
            mime: self.mime.to_string(),
            bytes: self.bytes.clone(),
        }
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Extension for an image MIME type (parameters after `;` are ignored)
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        let a = UploadedAsset::from_bytes("Hops.PNG", PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(a.mime(), "image/png");
        let b = UploadedAsset::from_bytes("barley.jpeg", vec![0xff, 0xd8]).unwrap();
        assert_eq!(b.mime(), "image/jpeg");
    }

    #[test]
    fn rejects_other_types_and_empty_files() {
        assert!(matches!(
            UploadedAsset::from_bytes("label.gif", vec![1]),
            Err(Error::InvalidAsset(_))
        ));
        assert!(matches!(
            UploadedAsset::from_bytes("noext", vec![1]),
            Err(Error::InvalidAsset(_))
        ));
        assert!(matches!(
            UploadedAsset::from_bytes("empty.png", Vec::new()),
            Err(Error::InvalidAsset(_))
        ));
    }

    #[test]
    fn size_limit() {
        let a = UploadedAsset::from_bytes("a.png", vec![0; 10]).unwrap();
        assert!(a.check_size(10).is_ok());
        assert!(a.check_size(9).is_err());
    }

    #[test]
    fn decodes_data_urls() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG_MAGIC);
        let a = UploadedAsset::from_data_url(&format!("data:image/png;base64,{}", encoded)).unwrap();
        assert_eq!(a.file_name(), "background.png");
        assert_eq!(a.bytes(), PNG_MAGIC);

        assert!(UploadedAsset::from_data_url("data:image/gif;base64,AAAA").is_err());
        assert!(UploadedAsset::from_data_url("data:image/png,raw").is_err());
        assert!(UploadedAsset::from_data_url("http://example.com/a.png").is_err());
    }

    #[test]
    fn file_part_uses_background_field() {
        let a = UploadedAsset::from_bytes("a.jpg", vec![1, 2, 3]).unwrap();
        let part = a.file_part();
        assert_eq!(part.field, "background");
        assert_eq!(part.mime, "image/jpeg");
        assert_eq!(part.bytes, vec![1, 2, 3]);
    }
}
