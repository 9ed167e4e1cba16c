//! In-memory surface that records everything it is asked to show

use super::PreviewSurface;
use crate::Result;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct SurfaceState {
    preview_src: Option<String>,
    preview_history: Vec<String>,
    alerts: Vec<String>,
    texts: HashMap<String, String>,
    values: HashMap<String, String>,
    downloads: Vec<(String, Vec<u8>)>,
}

/// Keeps state in a Mutex so tests can inspect it through a shared handle
#[derive(Debug, Default)]
pub struct RecordingSurface {
    state: Mutex<SurfaceState>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preview_src(&self) -> Option<String> {
        self.state.lock().unwrap().preview_src.clone()
    }

    /// Every preview source set so far, oldest first
    pub fn preview_history(&self) -> Vec<String> {
        self.state.lock().unwrap().preview_history.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state.lock().unwrap().alerts.clone()
    }

    pub fn last_alert(&self) -> Option<String> {
        self.state.lock().unwrap().alerts.last().cloned()
    }

    pub fn text(&self, element_id: &str) -> Option<String> {
        self.state.lock().unwrap().texts.get(element_id).cloned()
    }

    pub fn value(&self, element_id: &str) -> Option<String> {
        self.state.lock().unwrap().values.get(element_id).cloned()
    }

    pub fn downloads(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().downloads.clone()
    }
}

impl PreviewSurface for RecordingSurface {
    fn set_preview_src(&self, url: &str) {
        let mut s = self.state.lock().unwrap();
        s.preview_src = Some(url.to_string());
        s.preview_history.push(url.to_string());
    }

    fn alert(&self, message: &str) {
        self.state.lock().unwrap().alerts.push(message.to_string());
    }

    fn set_text(&self, element_id: &str, text: &str) {
        self.state
            .lock()
            .unwrap()
            .texts
            .insert(element_id.to_string(), text.to_string());
    }

    fn set_value(&self, element_id: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .values
            .insert(element_id.to_string(), value.to_string());
    }

    fn deliver_download(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .downloads
            .push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}
