use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use conf::{ConfError, Item};
use weblog::warn;

pub const DEFAULT_CONFIG_FILENAME: &str = "default.conf";
pub const DEFAULT_ROOT: &str = "./html";
pub const DEFAULT_INDEX: &str = "index.html";

const MEGABYTE: usize = 1024 * 1024;
const MAX_INDEX_NAME_LEN: usize = 100;

/// An IPv4 address in host order plus a TCP port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listen {
    pub addr: u32,
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct LocationConfig {
    pub path: String,
    pub root: String,
    pub index: Vec<String>,
    pub autoindex: bool,
    /// Empty list = all methods allowed.
    pub allow_methods: Vec<String>,
    /// In bytes; 0 = unbounded.
    pub client_max_body_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub root: String,
    pub index: Vec<String>,
    pub listens: Vec<Listen>,
    pub locations: Vec<LocationConfig>,
    pub error_pages: HashMap<u16, String>,
}

/// The immutable in-memory configuration. Built once at startup; the
/// router and the multiplexer only ever borrow it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Syntax(ConfError),
    InvalidDirective { directive: String, token: String },
    MissingListen,
    Unreadable { path: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Syntax(e) => write!(f, "config syntax error: {}", e),
            ConfigError::InvalidDirective { directive, token } => {
                write!(f, "invalid '{}' directive: '{}'", directive, token)
            }
            ConfigError::MissingListen => {
                write!(f, "every server block needs at least one listen directive")
            }
            ConfigError::Unreadable { path, reason } => {
                write!(f, "couldn't read '{}': {}", path, reason)
            }
        }
    }
}

impl Error for ConfigError {}

impl From<ConfError> for ConfigError {
    fn from(e: ConfError) -> Self {
        ConfigError::Syntax(e)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if path.is_dir() {
            return Err(ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: "is a directory".to_string(),
            });
        }
        let source = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Config, ConfigError> {
        let items = conf::parse(source)?;
        let mut servers = Vec::new();
        for item in items {
            match item {
                Item::Block { name, children, .. } if name == "server" || name.is_empty() => {
                    servers.push(build_server(children)?);
                }
                other => warn!("unknown context/directive: {}", other.name()),
            }
        }
        for server in &servers {
            if server.listens.is_empty() {
                return Err(ConfigError::MissingListen);
            }
        }
        Ok(Config { servers })
    }

    /// Default-config lookup for an argument-less start: `config/` then
    /// `config/valid/`, both relative to the executable's directory.
    pub fn search_default(program: &Path) -> Option<PathBuf> {
        let base = program.parent().unwrap_or(Path::new("."));
        for subdir in ["config", "config/valid"] {
            let candidate = base.join(subdir).join(DEFAULT_CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

fn build_server(items: Vec<Item>) -> Result<ServerConfig, ConfigError> {
    let mut server = ServerConfig::default();
    for item in items {
        match item {
            Item::Directive { name, args } => match name.as_str() {
                "listen" => server.listens.push(parse_listen(first_arg(&name, &args)?)?),
                "root" => server.root = first_arg(&name, &args)?.to_string(),
                "index" => server.index = sanitize_index(args),
                "error_page" => {
                    let (code, page) = parse_error_page(&args)?;
                    server.error_pages.insert(code, page);
                }
                _ => warn!("unknown context/directive: {}", name),
            },
            Item::Block {
                name,
                args,
                children,
            } if name == "location" => {
                server.locations.push(build_location(args, children)?);
            }
            other => warn!("unknown context/directive: {}", other.name()),
        }
    }
    Ok(server)
}

fn build_location(args: Vec<String>, items: Vec<Item>) -> Result<LocationConfig, ConfigError> {
    let mut location = LocationConfig::default();
    match args.first() {
        Some(path) if path.starts_with('/') => location.path = path.clone(),
        other => {
            return Err(ConfigError::InvalidDirective {
                directive: "location".to_string(),
                token: other.cloned().unwrap_or_default(),
            });
        }
    }
    for item in items {
        match item {
            Item::Directive { name, args } => match name.as_str() {
                "root" => location.root = first_arg(&name, &args)?.to_string(),
                "index" => location.index = sanitize_index(args),
                "autoindex" => location.autoindex = parse_autoindex(first_arg(&name, &args)?)?,
                "allow_methods" => location.allow_methods = args,
                "client_max_body_size" => {
                    location.client_max_body_size = parse_body_size(first_arg(&name, &args)?)?;
                }
                _ => warn!("unknown context/directive: {}", name),
            },
            other => warn!("unknown context/directive: {}", other.name()),
        }
    }
    Ok(location)
}

fn first_arg<'a>(directive: &str, args: &'a [String]) -> Result<&'a str, ConfigError> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| ConfigError::InvalidDirective {
            directive: directive.to_string(),
            token: String::new(),
        })
}

/// `A.B.C.D:PORT`, or a bare `PORT` which implies 0.0.0.0.
fn parse_listen(value: &str) -> Result<Listen, ConfigError> {
    let invalid = || ConfigError::InvalidDirective {
        directive: "listen".to_string(),
        token: value.to_string(),
    };

    if value.contains('-') {
        return Err(invalid());
    }

    let Some((ip, port)) = value.split_once(':') else {
        let port = value.parse::<u16>().map_err(|_| invalid())?;
        return Ok(Listen { addr: 0, port });
    };

    let mut addr: u32 = 0;
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(invalid());
    }
    for octet in octets {
        let octet = octet.parse::<u32>().map_err(|_| invalid())?;
        if octet > 255 {
            return Err(invalid());
        }
        addr = (addr << 8) | octet;
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok(Listen { addr, port })
}

fn parse_error_page(args: &[String]) -> Result<(u16, String), ConfigError> {
    let invalid = |token: &str| ConfigError::InvalidDirective {
        directive: "error_page".to_string(),
        token: token.to_string(),
    };
    let [code, page] = args else {
        return Err(invalid(&args.join(" ")));
    };
    let code = code.parse::<u16>().map_err(|_| invalid(code))?;
    Ok((code, page.clone()))
}

/// Megabytes with a mandatory `m`/`M` suffix; anything else is an error.
fn parse_body_size(value: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidDirective {
        directive: "client_max_body_size".to_string(),
        token: value.to_string(),
    };
    let digits = value
        .strip_suffix(['m', 'M'])
        .ok_or_else(invalid)?;
    let size = digits.parse::<usize>().map_err(|_| invalid())?;
    Ok(size * MEGABYTE)
}

fn parse_autoindex(value: &str) -> Result<bool, ConfigError> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ConfigError::InvalidDirective {
            directive: "autoindex".to_string(),
            token: value.to_string(),
        }),
    }
}

/// Index names carrying `..` or longer than 100 characters are replaced
/// by the hard-coded default.
fn sanitize_index(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| {
            if name.contains("..") || name.len() > MAX_INDEX_NAME_LEN {
                warn!("invalid index file name '{}', using {}", name, DEFAULT_INDEX);
                DEFAULT_INDEX.to_string()
            } else {
                name
            }
        })
        .collect()
}
