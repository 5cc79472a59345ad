use crate::prelude::*;
use crate::router::{
    effective_root, error_response, find_location, is_method_allowed, is_path_safe,
};

pub fn handle_delete(request: &HttpRequest, server: &ServerConfig) -> HttpResponse {
    let target = &request.target;

    info!("DELETE request to {}", target);

    if !is_path_safe(target) {
        warn!("unsafe path detected in DELETE: {}", target);
        return error_response(HTTP_FORBIDDEN, Some(server));
    }

    let location = find_location(server, target);
    if let Some(location) = location {
        if !is_method_allowed(Method::DELETE, location) {
            warn!("DELETE method not allowed for path: {}", target);
            return error_response(HTTP_METHOD_NOT_ALLOWED, Some(server));
        }
    }

    let root = effective_root(location, server);
    let file_path = format!("{}{}", root, target);
    let path = Path::new(&file_path);

    let Ok(metadata) = fs::metadata(path) else {
        return error_response(HTTP_NOT_FOUND, Some(server));
    };
    if !metadata.is_file() {
        warn!("cannot delete non-regular file: {}", file_path);
        return error_response(HTTP_FORBIDDEN, Some(server));
    }

    match fs::remove_file(path) {
        Ok(()) => {
            info!("file deleted successfully: {}", file_path);
            let mut response = HttpResponse::new(HTTP_OK);
            response.set_body(
                format!(
                    "<h1>Delete Successful!</h1><p>File deleted: {}</p>",
                    target
                )
                .into_bytes(),
                "text/html",
            );
            response
        }
        Err(e) => {
            error!("failed to delete file {}: {}", file_path, e);
            error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server))
        }
    }
}
