use std::path::Path;

use webserv::http::{HttpRequest, HttpResponse, Method, ParseError, mime_type, status_phrase};

#[test]
fn test_simple_get_request() {
    let mut req = HttpRequest::new();
    let raw = b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";

    assert!(req.parse(raw).is_ok());
    assert_eq!(req.method, Method::GET);
    assert_eq!(req.target, "/index.html");
    assert_eq!(req.version, "HTTP/1.1");
    assert!(req.is_complete);
    assert!(req.is_valid);
    assert_eq!(req.header("host"), Some("localhost"));
}

#[test]
fn test_header_names_are_lowercased() {
    let mut req = HttpRequest::new();
    let raw = b"GET / HTTP/1.1\r\nHoSt: x\r\nUSER-AGENT: curl\r\n\r\n";

    req.parse(raw).unwrap();
    assert_eq!(req.headers.get("host").map(String::as_str), Some("x"));
    assert_eq!(req.header("User-Agent"), Some("curl"));
}

#[test]
fn test_duplicate_headers_keep_last_value() {
    let mut req = HttpRequest::new();
    let raw = b"GET / HTTP/1.1\r\nX-Tag: first\r\nX-Tag: second\r\n\r\n";

    req.parse(raw).unwrap();
    assert_eq!(req.header("x-tag"), Some("second"));
}

#[test]
fn test_header_line_without_colon_is_skipped() {
    let mut req = HttpRequest::new();
    let raw = b"GET / HTTP/1.1\r\nthis line has no colon\r\nHost: x\r\n\r\n";

    assert!(req.parse(raw).is_ok());
    assert_eq!(req.header("host"), Some("x"));
    assert_eq!(req.headers.len(), 1);
}

#[test]
fn test_post_request_with_body() {
    let mut req = HttpRequest::new();
    let raw = b"POST /api HTTP/1.1\r\nContent-Length: 13\r\n\r\nHello, World!";

    req.parse(raw).unwrap();
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.body, b"Hello, World!");
}

#[test]
fn test_body_truncated_to_content_length() {
    let mut req = HttpRequest::new();
    let raw = b"POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\nHelloWorld";

    req.parse(raw).unwrap();
    assert_eq!(req.body, b"Hello");
}

#[test]
fn test_partial_body_is_accepted() {
    let mut req = HttpRequest::new();
    let raw = b"POST /upload HTTP/1.1\r\nContent-Length: 100\r\n\r\nonly a little";

    assert!(req.parse(raw).is_ok());
    assert!(req.is_valid);
    assert_eq!(req.body, b"only a little");
}

#[test]
fn test_pre_attached_temp_file_skips_body() {
    let mut req = HttpRequest::new();
    req.set_temp_file_path("/tmp/webserv_upload_test".into());
    let raw = b"POST /upload HTTP/1.1\r\nContent-Length: 1048576\r\n\r\n";

    req.parse(raw).unwrap();
    assert!(req.has_large_upload());
    assert!(req.body.is_empty());
    assert_eq!(req.content_length(), 1_048_576);
}

#[test]
fn test_missing_header_terminator() {
    let mut req = HttpRequest::new();
    assert_eq!(
        req.parse(b"GET / HTTP/1.1\r\nHost: x\r\n"),
        Err(ParseError::MissingHeaderTerminator)
    );
}

#[test]
fn test_invalid_method() {
    let mut req = HttpRequest::new();
    assert_eq!(
        req.parse(b"PATCH /x HTTP/1.1\r\n\r\n"),
        Err(ParseError::InvalidMethod)
    );
}

#[test]
fn test_unroutable_methods_still_parse() {
    for raw in [
        &b"PUT /x HTTP/1.1\r\n\r\n"[..],
        &b"OPTIONS /x HTTP/1.1\r\n\r\n"[..],
    ] {
        let mut req = HttpRequest::new();
        assert!(req.parse(raw).is_ok());
    }
}

#[test]
fn test_invalid_version() {
    let mut req = HttpRequest::new();
    assert_eq!(
        req.parse(b"GET / HTTP/2.0\r\n\r\n"),
        Err(ParseError::InvalidVersion)
    );
}

#[test]
fn test_target_must_start_with_slash() {
    let mut req = HttpRequest::new();
    assert_eq!(
        req.parse(b"GET example.com HTTP/1.1\r\n\r\n"),
        Err(ParseError::InvalidTarget)
    );
}

#[test]
fn test_malformed_request_line() {
    let mut req = HttpRequest::new();
    assert_eq!(
        req.parse(b"GET /\r\n\r\n"),
        Err(ParseError::MalformedRequestLine)
    );
    let mut req = HttpRequest::new();
    assert_eq!(
        req.parse(b"GET / HTTP/1.1 extra\r\n\r\n"),
        Err(ParseError::MalformedRequestLine)
    );
}

#[test]
fn test_query_string_stays_in_target() {
    let mut req = HttpRequest::new();
    req.parse(b"GET /search?q=rust HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(req.target, "/search?q=rust");
}

#[test]
fn test_response_defaults() {
    let res = HttpResponse::new(200);
    assert_eq!(res.status_code, 200);
    assert_eq!(res.status_message, "OK");
    assert_eq!(res.header("Server"), Some("webserv/1.0"));
    assert_eq!(res.header("Connection"), Some("close"));
    assert_eq!(res.header("Content-Length"), Some("0"));
    assert!(res.header("Date").is_some());
}

#[test]
fn test_set_body_updates_content_length() {
    let mut res = HttpResponse::new(200);
    res.set_body(b"Hello Rust".to_vec(), "text/plain");
    assert_eq!(res.header("Content-Length"), Some("10"));
    assert_eq!(res.header("Content-Type"), Some("text/plain"));
}

#[test]
fn test_serialization_shape() {
    let mut res = HttpResponse::new(200);
    res.set_body(b"Hello Rust".to_vec(), "text/plain");
    let bytes = res.to_bytes();
    let s = String::from_utf8_lossy(&bytes);

    assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(s.contains("Content-Type: text/plain\r\n"));
    assert!(s.contains("Content-Length: 10\r\n"));
    assert!(s.ends_with("\r\n\r\nHello Rust"));
    // Exactly one blank line between headers and body.
    assert_eq!(s.matches("\r\n\r\n").count(), 1);
}

#[test]
fn test_serialized_headers_keep_insertion_order() {
    let mut res = HttpResponse::new(200);
    res.set_header("X-First", "1");
    res.set_header("X-Second", "2");
    let s = String::from_utf8(res.to_bytes()).unwrap();

    let server = s.find("Server:").unwrap();
    let first = s.find("X-First:").unwrap();
    let second = s.find("X-Second:").unwrap();
    assert!(server < first && first < second);
}

#[test]
fn test_status_line_round_trip() {
    let mut res = HttpResponse::new(404);
    res.set_header("X-Reason", "missing");
    res.set_body(b"gone".to_vec(), "text/plain");
    let bytes = res.to_bytes();
    let text = String::from_utf8(bytes).unwrap();

    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap();
    assert_eq!(status_line, "HTTP/1.1 404 Not Found");

    let mut headers = std::collections::HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').unwrap();
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    assert_eq!(headers.get("x-reason").map(String::as_str), Some("missing"));
    assert_eq!(headers.get("content-length").map(String::as_str), Some("4"));
}

#[test]
fn test_status_phrases() {
    assert_eq!(status_phrase(200), "OK");
    assert_eq!(status_phrase(201), "Created");
    assert_eq!(status_phrase(204), "No Content");
    assert_eq!(status_phrase(301), "Moved Permanently");
    assert_eq!(status_phrase(302), "Found");
    assert_eq!(status_phrase(400), "Bad Request");
    assert_eq!(status_phrase(401), "Unauthorized");
    assert_eq!(status_phrase(403), "Forbidden");
    assert_eq!(status_phrase(404), "Not Found");
    assert_eq!(status_phrase(405), "Method Not Allowed");
    assert_eq!(status_phrase(413), "Payload Too Large");
    assert_eq!(status_phrase(414), "URI Too Long");
    assert_eq!(status_phrase(500), "Internal Server Error");
    assert_eq!(status_phrase(501), "Not Implemented");
    assert_eq!(status_phrase(505), "HTTP Version Not Supported");
    assert_eq!(status_phrase(418), "Unknown");
}

#[test]
fn test_mime_types() {
    assert_eq!(mime_type(Path::new("a.html")), "text/html; charset=utf-8");
    assert_eq!(mime_type(Path::new("a.HTM")), "text/html; charset=utf-8");
    assert_eq!(mime_type(Path::new("a.css")), "text/css");
    assert_eq!(mime_type(Path::new("a.js")), "application/javascript");
    assert_eq!(mime_type(Path::new("a.json")), "application/json");
    assert_eq!(mime_type(Path::new("a.xml")), "application/xml");
    assert_eq!(mime_type(Path::new("a.txt")), "text/plain; charset=utf-8");
    assert_eq!(mime_type(Path::new("a.jpeg")), "image/jpeg");
    assert_eq!(mime_type(Path::new("a.png")), "image/png");
    assert_eq!(mime_type(Path::new("a.gif")), "image/gif");
    assert_eq!(mime_type(Path::new("a.svg")), "image/svg+xml");
    assert_eq!(mime_type(Path::new("a.ico")), "image/x-icon");
    assert_eq!(mime_type(Path::new("a.pdf")), "application/pdf");
    assert_eq!(mime_type(Path::new("a.zip")), "application/zip");
    assert_eq!(mime_type(Path::new("a.bin")), "application/octet-stream");
    assert_eq!(mime_type(Path::new("noext")), "application/octet-stream");
}
