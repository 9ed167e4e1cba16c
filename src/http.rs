//! Blocking HTTP transport built on `reqwest`.

use crate::payload::{Method, OutgoingRequest, Reply, RequestBody};
use crate::transport::Transport;
use crate::{Error, Result, SyncConfig};
use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

/// Sends label requests over HTTP
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::ConfigError(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::ConfigError(format!("invalid value for header '{}': {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &OutgoingRequest) -> Result<Reply> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(payload) => {
                let mut form = Form::new();
                for (name, value) in &payload.fields {
                    form = form.text(name.clone(), value.clone());
                }
                if let Some(file) = &payload.file {
                    let part = Part::bytes(file.bytes.clone())
                        .file_name(file.file_name.clone())
                        .mime_str(&file.mime)
                        .map_err(|e| Error::InvalidAsset(format!("bad MIME type '{}': {}", file.mime, e)))?;
                    form = form.part(file.field.clone(), part);
                }
                builder.multipart(form)
            }
        };

        debug!("{:?} {}", request.method, request.url);
        let res = builder.send()?;
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = res
            .bytes()
            .map_err(|e| Error::NetworkError(format!("Failed to read response body: {}", e)))?
            .to_vec();
        debug!("{} -> {} ({} bytes)", request.url, status, body.len());

        Ok(Reply { status, content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::FormPayload;
    use std::io::Read;

    #[test]
    fn test_http_transport_posts_multipart() {
        // Skip on CI where binding sockets may not be available
        if std::env::var("CI").is_ok() {
            return;
        }

        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();

        let handle = std::thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut body = Vec::new();
            request.as_reader().read_to_end(&mut body).unwrap();
            let url = request.url().to_string();
            let response = tiny_http::Response::from_string(r#"{"preview_url":"/p.png"}"#).with_header(
                "Content-Type: application/json"
                    .parse::<tiny_http::Header>()
                    .unwrap(),
            );
            let _ = request.respond(response);
            (url, String::from_utf8_lossy(&body).to_string())
        });

        let transport = HttpTransport::new(&SyncConfig::default()).expect("Failed to create transport");
        let form = FormPayload::new().text("beer_name", "Kolsch");
        let reply = transport
            .send(&OutgoingRequest::post(
                format!("http://{}/upload", addr),
                RequestBody::Multipart(form),
            ))
            .expect("Failed to send request");

        assert_eq!(reply.status, 200);
        assert!(reply.is_json());
        let (url, body) = handle.join().unwrap();
        assert_eq!(url, "/upload");
        assert!(body.contains("name=\"beer_name\""));
        assert!(body.contains("Kolsch"));
    }

    #[test]
    fn rejects_invalid_header_names() {
        let mut config = SyncConfig::default();
        config.headers.insert("bad header".into(), "x".into());
        assert!(matches!(HttpTransport::new(&config), Err(Error::ConfigError(_))));
    }
}
