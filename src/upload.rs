use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use weblog::{info, warn};

use crate::prelude::LARGE_UPLOAD_THRESHOLD;

const TEMP_PREFIX: &str = "webserv_upload_";

/// Scoped temp-file writer for request bodies streamed to disk. The temp
/// file is unlinked on drop unless retention was released.
#[derive(Debug)]
pub struct UploadSink {
    temp_path: PathBuf,
    file: Option<File>,
    expected: usize,
    written: usize,
    active: bool,
    complete: bool,
    auto_delete: bool,
}

impl Default for UploadSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSink {
    pub fn new() -> Self {
        UploadSink {
            temp_path: PathBuf::new(),
            file: None,
            expected: 0,
            written: 0,
            active: false,
            complete: false,
            auto_delete: true,
        }
    }

    pub fn is_large(content_length: usize) -> bool {
        content_length >= LARGE_UPLOAD_THRESHOLD
    }

    /// Creates the temp file and arms the sink. Fails if already started.
    pub fn start(&mut self, expected_bytes: usize) -> io::Result<()> {
        if self.active {
            return Err(io::Error::other("upload already in progress"));
        }
        let (path, file) = create_temp_file()?;
        info!(
            "streaming upload of {} bytes to {}",
            expected_bytes,
            path.display()
        );
        self.temp_path = path;
        self.file = Some(file);
        self.expected = expected_bytes;
        self.written = 0;
        self.complete = false;
        self.active = true;
        Ok(())
    }

    pub fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::other("upload not active"));
        };
        if self.written + chunk.len() > self.expected {
            warn!(
                "upload chunk would exceed expected size ({} > {})",
                self.written + chunk.len(),
                self.expected
            );
            return Err(io::Error::other("chunk exceeds declared length"));
        }
        let n = file.write(chunk)?;
        if n != chunk.len() {
            return Err(io::Error::other("partial write to upload temp file"));
        }
        self.written += n;
        Ok(())
    }

    /// Closes the file; the cumulative size must match what was declared.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.active {
            return Err(io::Error::other("upload not active"));
        }
        if self.written != self.expected {
            warn!(
                "upload incomplete ({}/{} bytes)",
                self.written, self.expected
            );
            return Err(io::Error::other("upload incomplete"));
        }
        self.file = None;
        self.active = false;
        self.complete = true;
        info!(
            "upload completed ({} bytes) -> {}",
            self.written,
            self.temp_path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Disables the unlink-on-drop so the caller may move or reuse the file.
    pub fn release_retention(&mut self) {
        self.auto_delete = false;
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        self.file = None;
        if self.auto_delete && !self.temp_path.as_os_str().is_empty() && self.temp_path.exists() {
            if fs::remove_file(&self.temp_path).is_err() {
                warn!("failed to delete temp file {}", self.temp_path.display());
            }
        }
    }
}

/// In-flight transfer bookkeeping for one connection: the sink plus the
/// already-parsed header bytes, kept so the request can be parsed once the
/// body has fully landed on disk.
#[derive(Debug)]
pub struct UploadState {
    pub sink: UploadSink,
    pub expected: usize,
    pub received: usize,
    pub header_bytes: Vec<u8>,
    pub retries: u32,
}

impl UploadState {
    pub fn new(sink: UploadSink, expected: usize, header_bytes: Vec<u8>) -> Self {
        UploadState {
            sink,
            expected,
            received: 0,
            header_bytes,
            retries: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }

    pub fn is_finished(&self) -> bool {
        self.received >= self.expected
    }
}

fn create_temp_file() -> io::Result<(PathBuf, File)> {
    let dir = std::env::temp_dir();
    for attempt in 0..32 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let name = format!("{}{}_{}_{}", TEMP_PREFIX, process::id(), nanos, attempt);
        let path = dir.join(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::other("could not create a unique upload temp file"))
}
