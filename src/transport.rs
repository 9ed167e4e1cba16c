//! Transports carry requests to the label backend.
//!
//! [`MemoryTransport`] is the in-process stand-in used by tests and by hosts
//! that want to drive the controller without a server. Its default responder
//! answers the three label endpoints the way the backend does.

use crate::payload::{Method, OutgoingRequest, Reply};
use crate::Result;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Core trait for request transports
pub trait Transport {
    /// Send one request and return the raw reply. Non-success statuses are
    /// replies, not errors; only transport failures are `Err`.
    fn send(&self, request: &OutgoingRequest) -> Result<Reply>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &OutgoingRequest) -> Result<Reply> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &OutgoingRequest) -> Result<Reply> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &OutgoingRequest) -> Result<Reply> {
        (**self).send(request)
    }
}

type Responder = Box<dyn Fn(&OutgoingRequest) -> Result<Reply> + Send + Sync>;

/// Records every request and answers through a responder function
pub struct MemoryTransport {
    requests: Mutex<Vec<OutgoingRequest>>,
    responder: Responder,
}

impl MemoryTransport {
    /// A transport answering like a healthy label backend
    pub fn new() -> Self {
        Self::with_responder(default_reply)
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&OutgoingRequest) -> Result<Reply> + Send + Sync + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Every request sent so far, oldest first
    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<OutgoingRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, request: &OutgoingRequest) -> Result<Reply> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// Canned backend behaviour: previews echo the uploaded file name, PDF
/// exports return a minimal document, saves succeed.
pub fn default_reply(request: &OutgoingRequest) -> Result<Reply> {
    if request.method == Method::Get {
        return Ok(Reply::new(404, Some("text/plain"), b"Not Found".to_vec()));
    }
    let path = request
        .url
        .split_once("://")
        .map(|(_, rest)| rest.find('/').map(|i| &rest[i..]).unwrap_or("/"))
        .unwrap_or(&request.url);

    if path.starts_with("/upload") {
        let original = request
            .form()
            .and_then(|f| f.file.as_ref())
            .map(|f| f.file_name.clone())
            .unwrap_or_else(|| "background.png".to_string());
        Ok(Reply::from_json(
            200,
            &json!({
                "preview_url": "/static/uploads/preview.png",
                "original_file": original,
            }),
        ))
    } else if path.starts_with("/generate-pdf") {
        Ok(Reply::new(200, Some("application/pdf"), b"%PDF-1.4\n%%EOF\n".to_vec()))
    } else if path.starts_with("/save-label") {
        Ok(Reply::from_json(200, &json!({"ok": true})))
    } else {
        Ok(Reply::from_json(404, &json!({"error": "Not Found"})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{FormPayload, RequestBody};

    #[test]
    fn records_requests_in_order() {
        let t = MemoryTransport::new();
        t.send(&OutgoingRequest::get("http://h/a")).unwrap();
        t.send(&OutgoingRequest::post("http://h/save-label", RequestBody::Empty)).unwrap();
        assert_eq!(t.request_count(), 2);
        assert_eq!(t.last_request().unwrap().url, "http://h/save-label");
        t.clear();
        assert_eq!(t.request_count(), 0);
    }

    #[test]
    fn default_reply_routes_label_endpoints() {
        let preview = default_reply(&OutgoingRequest::post(
            "http://h/upload/u1",
            RequestBody::Multipart(FormPayload::new()),
        ))
        .unwrap();
        assert!(preview.is_success());
        let body: serde_json::Value = preview.parse_json().unwrap();
        assert_eq!(body["original_file"], "background.png");

        let pdf = default_reply(&OutgoingRequest::post("http://h/generate-pdf", RequestBody::Empty)).unwrap();
        assert!(pdf.body.starts_with(b"%PDF"));

        let missing = default_reply(&OutgoingRequest::get("http://h/static/x.png")).unwrap();
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn custom_responder_and_shared_handles() {
        let t = Arc::new(MemoryTransport::with_responder(|_| Ok(Reply::new(500, None, Vec::new()))));
        let shared = Arc::clone(&t);
        let reply = shared.send(&OutgoingRequest::get("http://h/")).unwrap();
        assert_eq!(reply.status, 500);
        assert_eq!(t.request_count(), 1);
    }
}
