use crate::cgi;
use crate::handlers::autoindex_handler::directory_listing;
use crate::prelude::*;
use crate::router::{
    effective_index, effective_root, error_response, find_location, is_method_allowed,
    is_path_safe, strip_query,
};

pub fn handle_get(request: &HttpRequest, server: &ServerConfig) -> HttpResponse {
    let target = &request.target;

    if !is_path_safe(target) {
        warn!("unsafe path detected: {}", target);
        return error_response(HTTP_FORBIDDEN, Some(server));
    }

    let location = find_location(server, target);
    if let Some(location) = location {
        if !is_method_allowed(Method::GET, location) {
            warn!("GET method not allowed for path: {}", target);
            return error_response(HTTP_METHOD_NOT_ALLOWED, Some(server));
        }
    }

    let root = effective_root(location, server);
    let index = effective_index(location, server);
    let clean_path = strip_query(target);

    let file_path = if clean_path == "/" {
        format!("{}/{}", root, index)
    } else {
        format!("{}{}", root, clean_path)
    };
    let path = Path::new(&file_path);

    // lstat so links are seen as links, not their targets
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return error_response(HTTP_NOT_FOUND, Some(server));
    };

    if metadata.file_type().is_symlink() {
        warn!("symbolic link rejected: {}", file_path);
        return error_response(HTTP_FORBIDDEN, Some(server));
    }
    if metadata.is_file() {
        if cgi::is_cgi_file(path) {
            return cgi::handle_cgi(request, server, path);
        }
        return serve_static_file(path, metadata.len(), server);
    }
    if metadata.is_dir() {
        return directory_listing(path, target, server);
    }
    warn!("not a regular file: {}", file_path);
    error_response(HTTP_FORBIDDEN, Some(server))
}

pub fn handle_head(request: &HttpRequest, server: &ServerConfig) -> HttpResponse {
    let target = &request.target;

    if !is_path_safe(target) {
        warn!("unsafe path detected: {}", target);
        return error_response(HTTP_FORBIDDEN, Some(server));
    }

    let location = find_location(server, target);
    if let Some(location) = location {
        if !is_method_allowed(Method::HEAD, location) {
            warn!("HEAD method not allowed for path: {}", target);
            return error_response(HTTP_METHOD_NOT_ALLOWED, Some(server));
        }
    }

    let root = effective_root(location, server);
    let index = effective_index(location, server);
    let clean_path = strip_query(target);

    if root.len() + clean_path.len() > MAX_COMBINED_PATH_LEN {
        error!("HEAD: combined path would be too long");
        return error_response(HTTP_URI_TOO_LONG, Some(server));
    }
    let file_path = if clean_path == "/" {
        format!("{}/{}", root, index)
    } else {
        format!("{}{}", root, clean_path)
    };
    if file_path.len() > MAX_FINAL_PATH_LEN {
        error!("HEAD: final path too long: {}", file_path.len());
        return error_response(HTTP_URI_TOO_LONG, Some(server));
    }
    let path = Path::new(&file_path);

    let Ok(metadata) = fs::metadata(path) else {
        return error_response(HTTP_NOT_FOUND, Some(server));
    };

    if metadata.is_file() {
        let mut response = HttpResponse::new(HTTP_OK);
        response.set_header("Content-Type", mime_type(path));
        response.set_header("Content-Length", &metadata.len().to_string());
        return response;
    }
    if metadata.is_dir() {
        let mut response = HttpResponse::new(HTTP_OK);
        response.set_header("Content-Type", "text/html");
        return response;
    }
    error_response(HTTP_FORBIDDEN, Some(server))
}

fn serve_static_file(path: &Path, file_size: u64, server: &ServerConfig) -> HttpResponse {
    if file_size > MAX_STATIC_FILE_SIZE {
        warn!("file too large: {} ({} bytes)", path.display(), file_size);
        return error_response(HTTP_PAYLOAD_TOO_LARGE, Some(server));
    }

    match fs::read(path) {
        Ok(content) => {
            info!("served file: {} ({} bytes)", path.display(), content.len());
            let mut response = HttpResponse::new(HTTP_OK);
            response.set_body(content, mime_type(path));
            response
        }
        Err(e) => match e.kind() {
            ErrorKind::NotFound => error_response(HTTP_NOT_FOUND, Some(server)),
            ErrorKind::PermissionDenied => {
                warn!("no read permission for file: {}", path.display());
                error_response(HTTP_FORBIDDEN, Some(server))
            }
            _ => {
                error!("failed to load file content: {}", path.display());
                error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server))
            }
        },
    }
}
