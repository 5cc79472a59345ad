use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use weblog::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    DELETE,
    HEAD,
    PUT,
    OPTIONS,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::PUT => "PUT",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "PUT" => Ok(Method::PUT),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::InvalidMethod),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    MissingHeaderTerminator,
    MalformedRequestLine,
    InvalidMethod,
    InvalidTarget,
    InvalidVersion,
    InvalidUtf8,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingHeaderTerminator => write!(f, "missing header terminator"),
            ParseError::MalformedRequestLine => write!(f, "malformed request line"),
            ParseError::InvalidMethod => write!(f, "invalid HTTP method"),
            ParseError::InvalidTarget => write!(f, "invalid request target"),
            ParseError::InvalidVersion => write!(f, "invalid HTTP version"),
            ParseError::InvalidUtf8 => write!(f, "invalid UTF-8 in request head"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub target: String,
    pub version: String,
    /// Keyed by lowercased name; duplicates keep the last value.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Set before `parse` when the body was streamed to disk.
    pub temp_file_path: Option<PathBuf>,
    pub is_complete: bool,
    pub is_valid: bool,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequest {
    pub fn new() -> Self {
        HttpRequest {
            method: Method::GET,
            target: String::new(),
            version: String::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            temp_file_path: None,
            is_complete: false,
            is_valid: false,
        }
    }

    pub fn set_temp_file_path(&mut self, path: PathBuf) {
        self.temp_file_path = Some(path);
    }

    pub fn has_large_upload(&self) -> bool {
        self.temp_file_path.is_some()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Parses a full request out of the accumulated buffer. The buffer
    /// must contain the complete head; the body may be short of the
    /// declared Content-Length, in which case whatever is present is kept
    /// and the request is still accepted.
    pub fn parse(&mut self, raw: &[u8]) -> Result<(), ParseError> {
        self.clear();

        let header_end =
            find_subsequence(raw, b"\r\n\r\n").ok_or(ParseError::MissingHeaderTerminator)?;
        let head = std::str::from_utf8(&raw[..header_end]).map_err(|_| ParseError::InvalidUtf8)?;

        let mut lines = head.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::MalformedRequestLine)?;
        self.parse_request_line(request_line)?;
        for line in lines {
            self.parse_header_line(line);
        }
        self.parse_body(raw, header_end + 4);

        self.is_complete = true;
        self.is_valid = true;
        Ok(())
    }

    /// Resets everything but the temp-file path, which may have been
    /// attached before parsing.
    pub fn clear(&mut self) {
        self.method = Method::GET;
        self.target.clear();
        self.version.clear();
        self.headers.clear();
        self.body.clear();
        self.is_complete = false;
        self.is_valid = false;
    }

    fn parse_request_line(&mut self, line: &str) -> Result<(), ParseError> {
        let mut parts = line.split_whitespace();
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::MalformedRequestLine);
        };

        self.method = method.parse()?;
        if !target.starts_with('/') {
            return Err(ParseError::InvalidTarget);
        }
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidVersion);
        }

        self.target = target.to_string();
        self.version = version.to_string();
        Ok(())
    }

    fn parse_header_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        let Some(colon) = line.find(':') else {
            warn!("invalid header line (no colon): {}", line);
            return;
        };
        let name = line[..colon].trim();
        let value = line[colon + 1..].trim();
        if name.is_empty() {
            warn!("empty header name in line: {}", line);
            return;
        }
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    fn parse_body(&mut self, raw: &[u8], body_start: usize) {
        let declared = self.content_length();
        if declared == 0 {
            return;
        }
        // Streamed bodies live on disk already.
        if self.temp_file_path.is_some() {
            return;
        }
        let available = raw.len().saturating_sub(body_start);
        let take = declared.min(available);
        if take < declared {
            warn!(
                "incomplete body: expected {} bytes, got {} (continuing with partial data)",
                declared, take
            );
        }
        self.body = raw[body_start..body_start + take].to_vec();
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.target, self.version)
    }
}

pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
