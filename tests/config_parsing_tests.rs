use webserv::config::{Config, ConfigError};

#[test]
fn test_single_server() {
    let source = "
        server {
            listen 8080;
            root ./html;
            index index.html;
            location / {
                allow_methods GET;
            }
        }
    ";
    let config = Config::from_str(source).unwrap();

    assert_eq!(config.servers.len(), 1);
    let server = &config.servers[0];
    assert_eq!(server.root, "./html");
    assert_eq!(server.index, vec!["index.html"]);
    assert_eq!(server.listens.len(), 1);
    assert_eq!(server.listens[0].addr, 0);
    assert_eq!(server.listens[0].port, 8080);
    assert_eq!(server.locations.len(), 1);
    assert_eq!(server.locations[0].path, "/");
    assert_eq!(server.locations[0].allow_methods, vec!["GET"]);
}

#[test]
fn test_listen_with_address() {
    let config = Config::from_str("server { listen 127.0.0.1:9000; }").unwrap();
    let listen = config.servers[0].listens[0];
    assert_eq!(listen.addr, (127 << 24) | 1);
    assert_eq!(listen.port, 9000);
}

#[test]
fn test_multiple_servers_and_listens() {
    let source = "
        server { listen 8080; listen 8081; }
        server { listen 192.168.0.1:9090; }
    ";
    let config = Config::from_str(source).unwrap();
    assert_eq!(config.servers.len(), 2);
    assert_eq!(config.servers[0].listens.len(), 2);
    assert_eq!(config.servers[1].listens[0].port, 9090);
}

#[test]
fn test_comments_are_ignored() {
    let source = "
        # leading comment
        server {
            listen 8080; # trailing comment
            # root ./ignored;
        }
    ";
    let config = Config::from_str(source).unwrap();
    assert!(config.servers[0].root.is_empty());
}

#[test]
fn test_error_pages() {
    let source = "
        server {
            listen 8080;
            error_page 404 ./html/404.html;
            error_page 500 ./html/500.html;
        }
    ";
    let config = Config::from_str(source).unwrap();
    let pages = &config.servers[0].error_pages;
    assert_eq!(pages.get(&404).map(String::as_str), Some("./html/404.html"));
    assert_eq!(pages.get(&500).map(String::as_str), Some("./html/500.html"));
}

#[test]
fn test_body_size_requires_unit() {
    let config = Config::from_str(
        "server { listen 1; location / { client_max_body_size 10m; } }",
    )
    .unwrap();
    assert_eq!(
        config.servers[0].locations[0].client_max_body_size,
        10 * 1024 * 1024
    );

    let err = Config::from_str(
        "server { listen 1; location / { client_max_body_size 10; } }",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDirective { .. }));
}

#[test]
fn test_autoindex_values() {
    let config = Config::from_str(
        "server { listen 1; location / { autoindex on; } location /b { autoindex off; } }",
    )
    .unwrap();
    assert!(config.servers[0].locations[0].autoindex);
    assert!(!config.servers[0].locations[1].autoindex);

    let err = Config::from_str("server { listen 1; location / { autoindex maybe; } }")
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDirective { .. }));
}

#[test]
fn test_invalid_listen_values() {
    for source in [
        "server { listen 8000-9000; }",
        "server { listen 300.0.0.1:80; }",
        "server { listen 1.2.3:80; }",
        "server { listen notaport; }",
    ] {
        let err = Config::from_str(source).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidDirective { .. }),
            "expected invalid directive for {source}"
        );
    }
}

#[test]
fn test_server_without_listen_is_rejected() {
    let err = Config::from_str("server { root ./html; }").unwrap_err();
    assert_eq!(err, ConfigError::MissingListen);
}

#[test]
fn test_location_path_must_start_with_slash() {
    let err = Config::from_str("server { listen 1; location api { } }").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDirective { .. }));
}

#[test]
fn test_unknown_directives_are_skipped() {
    let config = Config::from_str("server { listen 8080; worker_processes 4; }").unwrap();
    assert_eq!(config.servers[0].listens[0].port, 8080);
}

#[test]
fn test_bad_index_names_fall_back_to_default() {
    let long_name = "x".repeat(101);
    let source = format!(
        "server {{ listen 1; index ../evil.html {long_name} good.html; }}"
    );
    let config = Config::from_str(&source).unwrap();
    assert_eq!(
        config.servers[0].index,
        vec!["index.html", "index.html", "good.html"]
    );
}

#[test]
fn test_syntax_error_surfaces() {
    let err = Config::from_str("server { listen 8080 }").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax(_)));
}
