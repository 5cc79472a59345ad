use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use webserv::config::{Config, DEFAULT_CONFIG_FILENAME};
use webserv::error::Result;
use webserv::server::Server;
use weblog::{error, info};

const LOG_FILE: &str = "webserv.log";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!(
            "\x1b[31m[ERROR]\x1b[0m Usage: {} [CONFIG_FILE]",
            args.first().map(String::as_str).unwrap_or("webserv")
        );
        return ExitCode::FAILURE;
    }

    if weblog::init(LOG_FILE).is_err() {
        eprintln!("\x1b[31m[ERROR]\x1b[0m could not open {} for appending", LOG_FILE);
        return ExitCode::FAILURE;
    }

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => match Config::search_default(Path::new(&args[0])) {
            Some(path) => path,
            None => {
                error!(
                    "no {} found under config/ or config/valid/",
                    DEFAULT_CONFIG_FILENAME
                );
                return ExitCode::FAILURE;
            }
        },
    };

    info!("parsing '{}'", config_path.display());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(config: &Config) -> Result<()> {
    let mut server = Server::new(config)?;
    server.run()
}
