use crate::prelude::*;
use crate::router::error_response;

const BYTES_PER_KB: u64 = 1024;

/// Full HTML listing of a directory. Produced for every directory target,
/// whether or not the matched location asked for autoindex.
pub fn directory_listing(dir_path: &Path, request_path: &str, server: &ServerConfig) -> HttpResponse {
    let Some((directories, files)) = collect_entries(dir_path) else {
        warn!("cannot open directory: {}", dir_path.display());
        return error_response(HTTP_FORBIDDEN, Some(server));
    };

    let mut html = html_header(request_path);
    html.push_str(&parent_directory_link(request_path));
    html.push_str(&directory_entries(request_path, &directories));
    html.push_str(&file_entries(request_path, dir_path, &files));
    html.push_str("</body></html>");

    info!(
        "generated directory listing for: {} ({} dirs, {} files)",
        request_path,
        directories.len(),
        files.len()
    );

    let mut response = HttpResponse::new(HTTP_OK);
    response.set_body(html.into_bytes(), "text/html; charset=utf-8");
    response
}

/// Entries split into directories and files, both sorted, `.` and `..`
/// skipped. Entries whose metadata cannot be read are dropped.
fn collect_entries(dir_path: &Path) -> Option<(Vec<String>, Vec<String>)> {
    let entries = fs::read_dir(dir_path).ok()?;

    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Ok(metadata) = fs::metadata(entry.path()) else {
            continue;
        };
        if metadata.is_dir() {
            directories.push(name);
        } else {
            files.push(name);
        }
    }
    directories.sort();
    files.sort();
    Some((directories, files))
}

fn format_file_size(file_size: u64) -> String {
    if file_size < BYTES_PER_KB {
        format!("{}B", file_size)
    } else if file_size < BYTES_PER_KB * BYTES_PER_KB {
        format!("{}KB", file_size / BYTES_PER_KB)
    } else {
        format!("{}MB", file_size / (BYTES_PER_KB * BYTES_PER_KB))
    }
}

fn html_header(request_path: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n");
    html.push_str("<html><head>\n");
    html.push_str(&format!(
        "<title>Directory listing for {}</title>\n",
        request_path
    ));
    html.push_str("<style>\n");
    html.push_str("  body { font-family: monospace; margin: 40px; }\n");
    html.push_str("  h1 { color: #333; border-bottom: 1px solid #ccc; padding-bottom: 10px; }\n");
    html.push_str("  .directory { color: #0066cc; font-weight: bold; }\n");
    html.push_str("  .file { color: #000; }\n");
    html.push_str("  a { text-decoration: none; display: block; padding: 2px 0; }\n");
    html.push_str("  a:hover { background-color: #f0f0f0; }\n");
    html.push_str("  .size { color: #666; float: right; }\n");
    html.push_str("</style>\n");
    html.push_str("</head><body>\n");
    html.push_str(&format!(
        "<h1>Directory listing for {}</h1>\n",
        request_path
    ));
    html
}

fn parent_directory_link(request_path: &str) -> String {
    if request_path == "/" {
        return String::new();
    }

    let trimmed = request_path.trim_end_matches('/');
    let parent = match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(last_slash) => &trimmed[..last_slash],
    };
    format!(
        "<a href=\"{}\" class=\"directory\">[Parent Directory]</a>\n",
        parent
    )
}

fn entry_link(request_path: &str, name: &str) -> String {
    let mut link = request_path.to_string();
    if !link.ends_with('/') {
        link.push('/');
    }
    link.push_str(name);
    link
}

fn directory_entries(request_path: &str, directories: &[String]) -> String {
    let mut html = String::new();
    for name in directories {
        html.push_str(&format!(
            "<a href=\"{}/\" class=\"directory\">{}/<span class=\"size\">[DIR]</span></a>\n",
            entry_link(request_path, name),
            name
        ));
    }
    html
}

fn file_entries(request_path: &str, dir_path: &Path, files: &[String]) -> String {
    let mut html = String::new();
    for name in files {
        let size_info = match fs::metadata(dir_path.join(name)) {
            Ok(metadata) => format!(
                "<span class=\"size\">{}</span>",
                format_file_size(metadata.len())
            ),
            Err(_) => String::new(),
        };
        html.push_str(&format!(
            "<a href=\"{}\" class=\"file\">{}{}</a>\n",
            entry_link(request_path, name),
            name,
            size_info
        ));
    }
    html
}
