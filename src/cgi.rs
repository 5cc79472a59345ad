use std::io;
use std::process::{Command, Stdio};

use crate::prelude::*;
use crate::router::error_response;

pub fn is_cgi_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("php") | Some("py") | Some("cgi") | Some("pl")
    )
}

/// `.cgi` scripts run directly, everything else through its interpreter.
fn interpreter_for(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("php") => Some("php-cgi"),
        Some("py") => Some("python3"),
        Some("pl") => Some("perl"),
        _ => None,
    }
}

/// Runs the script as a child process, feeding the request body to its
/// stdin and draining its output. This is the one place the event loop
/// blocks: output is collected and the child reaped before returning.
pub fn handle_cgi(request: &HttpRequest, server: &ServerConfig, script_path: &Path) -> HttpResponse {
    info!("CGI request to {}", script_path.display());

    // One outbound pipe; its write end is handed to the child as both
    // stdout and stderr, so diagnostics land in the captured body too.
    let (mut output, stdout_tx) = match io::pipe() {
        Ok(pair) => pair,
        Err(e) => {
            error!("failed to create pipes for CGI: {}", e);
            return error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server));
        }
    };
    let stderr_tx = match stdout_tx.try_clone() {
        Ok(tx) => tx,
        Err(e) => {
            error!("failed to duplicate CGI output pipe: {}", e);
            return error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server));
        }
    };

    let mut command = match interpreter_for(script_path) {
        Some(interpreter) => {
            let mut command = Command::new(interpreter);
            command.arg(script_path);
            command
        }
        None => Command::new(script_path),
    };
    command
        .envs(build_cgi_env(request))
        .stdin(Stdio::piped())
        .stdout(stdout_tx)
        .stderr(stderr_tx);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!("failed to spawn CGI process: {}", e);
            return error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server));
        }
    };
    // The command still holds the parent's copies of the write ends;
    // they must go away for the drain below to see EOF.
    drop(command);

    if request.method == Method::POST && !request.body.is_empty() {
        if let Some(stdin) = child.stdin.as_mut() {
            if let Err(e) = stdin.write_all(&request.body) {
                warn!("failed to write request body to CGI stdin: {}", e);
            }
        }
    }
    // Close stdin so the child sees EOF.
    drop(child.stdin.take());

    let mut captured = Vec::new();
    let mut chunk = [0u8; CGI_BUFFER_SIZE];
    loop {
        match output.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => captured.extend_from_slice(&chunk[..n]),
            Err(e) => {
                error!("failed to read CGI output: {}", e);
                break;
            }
        }
    }

    match child.wait() {
        Ok(status) if status.success() => {
            info!("CGI executed successfully, output size: {}", captured.len());
            let mut response = HttpResponse::new(HTTP_OK);
            response.set_body(captured, "text/html");
            response
        }
        Ok(status) => {
            error!("CGI execution failed with status: {}", status);
            error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server))
        }
        Err(e) => {
            error!("failed to reap CGI process: {}", e);
            error_response(HTTP_INTERNAL_SERVER_ERROR, Some(server))
        }
    }
}

fn build_cgi_env(request: &HttpRequest) -> HashMap<String, String> {
    let (path, query) = match request.target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (request.target.as_str(), ""),
    };

    let mut env = HashMap::new();
    env.insert("REQUEST_METHOD".to_string(), request.method.to_string());
    env.insert("QUERY_STRING".to_string(), query.to_string());
    env.insert("PATH_INFO".to_string(), path.to_string());
    env.insert(
        "CONTENT_LENGTH".to_string(),
        request.body.len().to_string(),
    );
    env.insert(
        "CONTENT_TYPE".to_string(),
        request.header("content-type").unwrap_or("").to_string(),
    );
    env.insert("SCRIPT_NAME".to_string(), path.to_string());
    env.insert("SERVER_SOFTWARE".to_string(), "webserv/1.0".to_string());
    env.insert("SERVER_NAME".to_string(), "localhost".to_string());
    env.insert("SERVER_PORT".to_string(), "8080".to_string());
    env.insert(
        "HTTP_HOST".to_string(),
        request.header("host").unwrap_or("").to_string(),
    );
    env.insert(
        "HTTP_USER_AGENT".to_string(),
        request.header("user-agent").unwrap_or("").to_string(),
    );
    env
}
