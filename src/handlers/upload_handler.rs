use std::io;

use crate::cgi;
use crate::prelude::*;
use crate::router::{
    effective_root, error_response, find_location, is_method_allowed, is_path_safe, strip_query,
};

pub fn handle_post(
    request: &HttpRequest,
    server: &ServerConfig,
    upload_dir: &str,
    upload_counter: &mut u32,
) -> HttpResponse {
    let target = &request.target;

    info!("POST request to {} (body: {} bytes)", target, request.body.len());

    if !is_path_safe(target) {
        warn!("unsafe path detected in POST: {}", target);
        return error_response(HTTP_FORBIDDEN, Some(server));
    }

    let location = find_location(server, target);
    if let Some(location) = location {
        if !is_method_allowed(Method::POST, location) {
            warn!("POST method not allowed for path: {}", target);
            return error_response(HTTP_METHOD_NOT_ALLOWED, Some(server));
        }
        if location.client_max_body_size > 0 && request.body.len() > location.client_max_body_size
        {
            warn!(
                "request body too large: {} > {}",
                request.body.len(),
                location.client_max_body_size
            );
            return error_response(HTTP_PAYLOAD_TOO_LARGE, Some(server));
        }
    }

    let clean_path = strip_query(target);
    let root = effective_root(location, server);
    let file_path = format!("{}{}", root, clean_path);
    let script = Path::new(&file_path);
    if cgi::is_cgi_file(script) && script.is_file() {
        return cgi::handle_cgi(request, server, script);
    }

    handle_file_upload(request, server, clean_path, upload_dir, upload_counter)
}

fn handle_file_upload(
    request: &HttpRequest,
    server: &ServerConfig,
    request_path: &str,
    upload_dir: &str,
    upload_counter: &mut u32,
) -> HttpResponse {
    if request_path != "/upload" {
        let mut response = HttpResponse::new(HTTP_OK);
        response.set_body(
            b"POST request processed successfully".to_vec(),
            "text/plain",
        );
        return response;
    }

    let is_large = request.has_large_upload();
    if !is_large && request.body.is_empty() {
        warn!("empty upload request body");
        return error_response(HTTP_BAD_REQUEST, Some(server));
    }

    *upload_counter += 1;
    let filename = if is_large {
        format!("{}/uploaded_{}_large.bin", upload_dir, upload_counter)
    } else {
        format!("{}/uploaded_{}.txt", upload_dir, upload_counter)
    };

    let stored = match &request.temp_file_path {
        Some(temp_path) => {
            info!(
                "processing large upload from temp file: {}",
                temp_path.display()
            );
            store_large_upload(temp_path, Path::new(&filename))
        }
        None => store_inline_upload(&request.body, Path::new(&filename)),
    };

    match stored {
        Ok(file_size) => {
            info!("saved upload: {} ({} bytes)", filename, file_size);
            let body = format!(
                "<h1>Upload Successful!</h1><p>File saved as: {}</p><p>Size: {} bytes</p>\
                 <p>Type: {}</p>",
                filename,
                file_size,
                if is_large {
                    "Large file (streamed to disk)"
                } else {
                    "Small file (in memory)"
                }
            );
            let mut response = HttpResponse::new(HTTP_OK);
            response.set_body(body.into_bytes(), "text/html");
            response
        }
        Err(e) => {
            error!("failed to save uploaded file {}: {}", filename, e);
            error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server))
        }
    }
}

/// Rename first; a cross-device rename falls back to copy-then-delete.
fn store_large_upload(temp_path: &Path, destination: &Path) -> io::Result<u64> {
    if fs::rename(temp_path, destination).is_err() {
        fs::copy(temp_path, destination)?;
        fs::remove_file(temp_path)?;
    }
    Ok(fs::metadata(destination)?.len())
}

fn store_inline_upload(body: &[u8], destination: &Path) -> io::Result<u64> {
    fs::write(destination, body)?;
    Ok(body.len() as u64)
}
