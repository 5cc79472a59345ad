use core::fmt;
use std::{
    error::Error,
    fmt::{Debug, Display, Formatter},
};

use crate::config::ConfigError;
use conf::ConfError;

/// Errors that unwind past the event loop: init failures, poll failures,
/// broken configuration. Per-request problems never become one of these,
/// they turn into HTTP responses instead.
pub struct FatalError(pub Box<dyn Error>);

impl Debug for FatalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\r\x1b[K{}", self)
    }
}

impl Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x1b[31mERROR\x1b[0m: {}", self.0)
    }
}

impl Error for FatalError {}

impl From<std::io::Error> for FatalError {
    fn from(e: std::io::Error) -> Self {
        FatalError(Box::new(e))
    }
}

impl From<ConfError> for FatalError {
    fn from(e: ConfError) -> Self {
        FatalError(Box::new(e))
    }
}

impl From<ConfigError> for FatalError {
    fn from(e: ConfigError) -> Self {
        FatalError(Box::new(e))
    }
}

impl From<String> for FatalError {
    fn from(s: String) -> Self {
        FatalError(Box::new(Message(s)))
    }
}

impl From<&str> for FatalError {
    fn from(s: &str) -> Self {
        FatalError(Box::new(Message(s.to_string())))
    }
}

#[derive(Debug)]
struct Message(String);

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for Message {}

pub type Result<T> = std::result::Result<T, FatalError>;
