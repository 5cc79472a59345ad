use crate::handlers::{handle_delete, handle_get, handle_head, handle_post};
use crate::prelude::*;

/// Routes parsed requests to handlers. Borrows the configuration for its
/// whole lifetime and owns the per-process upload counter.
#[derive(Debug)]
pub struct Router<'a> {
    config: &'a Config,
    upload_counter: u32,
}

impl<'a> Router<'a> {
    pub fn new(config: &'a Config) -> Self {
        Router {
            config,
            upload_counter: 0,
        }
    }

    pub fn process(&mut self, request: &HttpRequest, port: u16) -> HttpResponse {
        info!(
            "processing {} {} {} on port {}",
            request.method, request.target, request.version, port
        );

        let Some(server) = self.server_for_port(port) else {
            error!("no server configuration found for port {}", port);
            return error_response(HTTP_INTERNAL_SERVER_ERROR, None);
        };

        if !request.is_valid {
            warn!("invalid request received");
            return error_response(HTTP_BAD_REQUEST, Some(server));
        }

        match request.method {
            Method::GET => handle_get(request, server),
            Method::HEAD => handle_head(request, server),
            Method::POST => handle_post(request, server, UPLOAD_ROOT, &mut self.upload_counter),
            Method::DELETE => handle_delete(request, server),
            Method::PUT | Method::OPTIONS => {
                warn!("method not allowed: {}", request.method);
                error_response(HTTP_METHOD_NOT_ALLOWED, Some(server))
            }
        }
    }

    /// First server whose listen set contains the port, in declaration order.
    pub fn server_for_port(&self, port: u16) -> Option<&'a ServerConfig> {
        self.config
            .servers
            .iter()
            .find(|server| server.listens.iter().any(|listen| listen.port == port))
    }
}

pub fn is_path_safe(path: &str) -> bool {
    !path.contains("..") && path.starts_with('/')
}

/// Longest-prefix match; ties keep the first declared location.
pub fn find_location<'s>(server: &'s ServerConfig, path: &str) -> Option<&'s LocationConfig> {
    let mut best: Option<&LocationConfig> = None;
    let mut best_len = 0;
    for location in &server.locations {
        if location.path.is_empty() {
            continue;
        }
        if path.starts_with(&location.path) && location.path.len() > best_len {
            best = Some(location);
            best_len = location.path.len();
        }
    }
    best
}

pub fn is_method_allowed(method: Method, location: &LocationConfig) -> bool {
    location.allow_methods.is_empty()
        || location.allow_methods.iter().any(|m| m == method.as_str())
}

pub fn effective_root<'s>(location: Option<&'s LocationConfig>, server: &'s ServerConfig) -> &'s str {
    if let Some(location) = location {
        if !location.root.is_empty() {
            return &location.root;
        }
    }
    if !server.root.is_empty() {
        return &server.root;
    }
    DEFAULT_ROOT
}

pub fn effective_index<'s>(
    location: Option<&'s LocationConfig>,
    server: &'s ServerConfig,
) -> &'s str {
    if let Some(location) = location {
        if let Some(index) = location.index.first() {
            return index;
        }
    }
    match server.index.first() {
        Some(index) => index,
        None => DEFAULT_INDEX,
    }
}

pub fn strip_query(target: &str) -> &str {
    match target.split_once('?') {
        Some((path, _)) => path,
        None => target,
    }
}

/// Custom error page if one is configured, readable and a regular file;
/// a built-in template otherwise.
pub fn error_response(code: u16, server: Option<&ServerConfig>) -> HttpResponse {
    if let Some(page) = server.and_then(|s| s.error_pages.get(&code)) {
        let path = Path::new(page);
        if path.is_file() {
            if let Ok(content) = fs::read(path) {
                let mut response = HttpResponse::new(code);
                response.set_body(content, mime_type(path));
                return response;
            }
        }
        warn!("custom error page not accessible: {} for status {}", page, code);
    }

    // Only these carry built-in templates; anything else degrades to 500.
    let code = match code {
        HTTP_BAD_REQUEST | HTTP_FORBIDDEN | HTTP_NOT_FOUND | HTTP_METHOD_NOT_ALLOWED
        | HTTP_PAYLOAD_TOO_LARGE | HTTP_INTERNAL_SERVER_ERROR => code,
        _ => HTTP_INTERNAL_SERVER_ERROR,
    };
    let mut response = HttpResponse::new(code);
    response.set_body(builtin_error_body(code), "text/html; charset=utf-8");
    response
}

fn builtin_error_body(code: u16) -> Vec<u8> {
    let phrase = status_phrase(code);
    let detail = match code {
        HTTP_BAD_REQUEST => "The request was malformed.",
        HTTP_FORBIDDEN => "Access to the requested resource is forbidden.",
        HTTP_NOT_FOUND => "The requested resource was not found.",
        HTTP_METHOD_NOT_ALLOWED => "The requested method is not allowed.",
        HTTP_PAYLOAD_TOO_LARGE => "The request payload is too large.",
        _ => "The server encountered an error.",
    };
    format!(
        "<!DOCTYPE html><html><head><title>{code} {phrase}</title></head>\
         <body><h1>{code} {phrase}</h1><p>{detail}</p></body></html>"
    )
    .into_bytes()
}
