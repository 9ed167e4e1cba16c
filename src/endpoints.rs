//! Backend endpoint addressing

use crate::{Error, Result};
use url::Url;

/// Resolves the preview, PDF and save endpoints, scoped by label UUID once
/// the server has assigned one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
    label_uuid: Option<String>,
}

impl Endpoints {
    pub fn new(base_url: &str, label_uuid: Option<String>) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| Error::ConfigError(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::ConfigError(format!("'{}' cannot be used as a base URL", base_url)));
        }
        // Relative joins replace the last path segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut endpoints = Self { base, label_uuid: None };
        endpoints.set_label_uuid(label_uuid)?;
        Ok(endpoints)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn label_uuid(&self) -> Option<&str> {
        self.label_uuid.as_deref()
    }

    pub fn set_label_uuid(&mut self, label_uuid: Option<String>) -> Result<()> {
        let label_uuid = label_uuid.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        if let Some(uuid) = &label_uuid {
            if !uuid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(Error::ConfigError(format!("invalid label UUID '{}'", uuid)));
            }
        }
        self.label_uuid = label_uuid;
        Ok(())
    }

    pub fn preview(&self) -> Result<String> {
        self.scoped("upload")
    }

    pub fn pdf(&self) -> Result<String> {
        self.scoped("generate-pdf")
    }

    pub fn save(&self) -> Result<String> {
        self.scoped("save-label")
    }

    /// Resolve a URL the server handed back (`/static/...`, a relative path,
    /// or an absolute URL) against the base.
    pub fn resolve(&self, reference: &str) -> Result<String> {
        self.base
            .join(reference.trim())
            .map(String::from)
            .map_err(|e| Error::DecodeError(format!("invalid URL '{}': {}", reference, e)))
    }

    fn scoped(&self, name: &str) -> Result<String> {
        let path = match &self.label_uuid {
            Some(uuid) => format!("{}/{}", name, uuid),
            None => name.to_string(),
        };
        self.base
            .join(&path)
            .map(String::from)
            .map_err(|e| Error::ConfigError(format!("cannot build '{}' endpoint: {}", name, e)))
    }
}

/// Append a `t=<stamp>` query parameter so hosts re-fetch a reused preview URL
pub fn cache_busted(url: &str, stamp: u128) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, stamp)
}
