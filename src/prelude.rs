pub use crate::config::{
    Config, DEFAULT_INDEX, DEFAULT_ROOT, Listen, LocationConfig, ServerConfig,
};
pub use crate::error::Result;
pub use crate::http::{
    HttpRequest, HttpResponse, Method, ParseError, find_subsequence, mime_type, status_phrase,
};
pub use crate::router::Router;
pub use crate::upload::{UploadSink, UploadState};

pub use mio::{
    Events, Interest, Poll, Token,
    net::{TcpListener, TcpStream},
};
pub use weblog::{debug, error, info, warn};

pub use std::collections::HashMap;
pub use std::fs::{self, File, OpenOptions};
pub use std::io::{ErrorKind, Read, Write};
pub use std::path::{Path, PathBuf};

// 2xx
pub const HTTP_OK: u16 = 200;
pub const HTTP_CREATED: u16 = 201;

// 4xx Client Errors
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_FORBIDDEN: u16 = 403;
pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_METHOD_NOT_ALLOWED: u16 = 405;
pub const HTTP_PAYLOAD_TOO_LARGE: u16 = 413;
pub const HTTP_URI_TOO_LONG: u16 = 414;

// 5xx Server Errors
pub const HTTP_INTERNAL_SERVER_ERROR: u16 = 500;

/// Header reads happen in slices of this size.
pub const READ_BUFFER_SIZE: usize = 500;
/// One upload continuation recv, and one CGI stdout drain read.
pub const UPLOAD_CHUNK_SIZE: usize = 8192;
pub const CGI_BUFFER_SIZE: usize = 8192;
/// Declared bodies at or above this stream to a temp file.
pub const LARGE_UPLOAD_THRESHOLD: usize = 1024 * 1024;
pub const MAX_STATIC_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_COMBINED_PATH_LEN: usize = 800;
pub const MAX_FINAL_PATH_LEN: usize = 1000;
pub const MAX_POLL_EVENTS: usize = 10;
/// Consecutive empty reads tolerated before an in-flight transfer is abandoned.
pub const UPLOAD_RETRY_LIMIT: u32 = 100;
pub const READ_RETRY_LIMIT: u32 = 100;
/// Where successful `/upload` POSTs land.
pub const UPLOAD_ROOT: &str = "./html";
