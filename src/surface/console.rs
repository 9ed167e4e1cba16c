//! Terminal surface used by the CLI: alerts go to stderr, downloads are
//! written into an output directory.

use super::PreviewSurface;
use crate::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

pub struct ConsoleSurface {
    download_dir: PathBuf,
}

impl ConsoleSurface {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self { download_dir: download_dir.into() }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

impl PreviewSurface for ConsoleSurface {
    fn set_preview_src(&self, url: &str) {
        info!("preview updated: {}", url);
        println!("preview: {}", url);
    }

    fn alert(&self, message: &str) {
        warn!("alert: {}", message);
        eprintln!("! {}", message);
    }

    fn set_text(&self, element_id: &str, text: &str) {
        debug!("#{} text = {:?}", element_id, text);
    }

    fn set_value(&self, element_id: &str, value: &str) {
        debug!("#{} value = {:?}", element_id, value);
    }

    fn deliver_download(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(file_name);
        std::fs::write(&path, bytes)?;
        info!("wrote {} ({} bytes)", path.display(), bytes.len());
        println!("saved: {}", path.display());
        Ok(())
    }
}
