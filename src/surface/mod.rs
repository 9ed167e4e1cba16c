//! Surfaces: where the controller shows its results.
//!
//! A surface plays the part of the editor page: it displays the preview
//! image, shows blocking alerts, holds the text of labels next to controls,
//! mirrors input values and receives downloaded files.

pub mod console;
pub mod recording;

pub use console::ConsoleSurface;
pub use recording::RecordingSurface;

use crate::Result;
use std::sync::Arc;

pub trait PreviewSurface {
    /// Point the preview image at `url` and make it visible
    fn set_preview_src(&self, url: &str);

    /// Show a blocking, user-facing message
    fn alert(&self, message: &str);

    /// Replace the text content of a display element
    fn set_text(&self, element_id: &str, text: &str);

    /// Replace the value of an input element
    fn set_value(&self, element_id: &str, value: &str);

    /// Hand a downloaded file to the user
    fn deliver_download(&self, file_name: &str, bytes: &[u8]) -> Result<()>;
}

impl<S: PreviewSurface + ?Sized> PreviewSurface for Arc<S> {
    fn set_preview_src(&self, url: &str) {
        (**self).set_preview_src(url)
    }

    fn alert(&self, message: &str) {
        (**self).alert(message)
    }

    fn set_text(&self, element_id: &str, text: &str) {
        (**self).set_text(element_id, text)
    }

    fn set_value(&self, element_id: &str, value: &str) {
        (**self).set_value(element_id, value)
    }

    fn deliver_download(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        (**self).deliver_download(file_name, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_surface_forwards_calls() {
        let surface = Arc::new(RecordingSurface::new());
        let handle: Arc<RecordingSurface> = Arc::clone(&surface);
        handle.alert("hello");
        handle.set_value("beer_name", "Bock");
        assert_eq!(surface.alerts(), vec!["hello".to_string()]);
        assert_eq!(surface.value("beer_name").as_deref(), Some("Bock"));
    }
}
