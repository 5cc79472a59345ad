use std::fs;
use std::path::Path;

use weblog::{error, info};

pub const SERVER_SOFTWARE: &str = "webserv/1.0";

// Responses carry a pinned Date value.
const FIXED_DATE: &str = "Mon, 27 Jan 2025 12:00:00 GMT";

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_message: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        let mut response = Self {
            status_code,
            status_message: status_phrase(status_code).to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        response.set_header("Server", SERVER_SOFTWARE);
        response.set_header("Date", FIXED_DATE);
        response.set_header("Connection", "close");
        response.set_header("Content-Length", "0");
        response
    }

    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.status_message = status_phrase(code).to_string();
        self
    }

    /// Inserts or updates in place, so serialization keeps first-insertion
    /// order even for headers that get overwritten.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) -> &mut Self {
        self.set_header("Content-Length", &body.len().to_string());
        self.set_header("Content-Type", content_type);
        self.body = body;
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Loads a file as the body, with the Content-Type taken from its
    /// extension. Degrades to a plain 500 when the file cannot be read.
    pub fn body_from_file(&mut self, path: &Path) -> &mut Self {
        match fs::read(path) {
            Ok(content) => {
                info!(
                    "loaded file: {} ({} bytes)",
                    path.display(),
                    content.len()
                );
                let content_type = mime_type(path);
                self.set_body(content, content_type);
            }
            Err(e) => {
                error!("could not open file {}: {}", path.display(), e);
                self.set_status(500);
                self.set_body(b"Internal Server Error".to_vec(), "text/plain");
            }
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status_code, self.status_message
        )
        .into_bytes();
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

pub fn status_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

/// MIME type by lowercased extension after the last dot.
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain; charset=utf-8",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}
