use crate::http::response::reason_phrase;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ServerError {
    /// No controller matched any prefix of the routed path.
    NotFound,
    /// A controller matched, but none of its actions did.
    RouteNotFound(String),
    /// An explicit HTTP status signalled by an action.
    Status(u16, String),
    /// The selected encoder could not represent the response body.
    FormatError(String),
    ParseError(String),
    IoError(io::Error),
    InternalError(String),
    PanicError(String),
}

impl ServerError {
    /// Build a status error. Codes outside the known HTTP table are coerced
    /// to 500 rather than rejected; an empty reason falls back to the
    /// standard reason phrase.
    pub fn status<S: Into<String>>(code: u16, reason: S) -> ServerError {
        let code = if reason_phrase(code).is_some() { code } else { 500 };
        let mut message = reason.into();
        if message.is_empty() {
            message = reason_phrase(code).unwrap_or("Internal Server Error").to_string();
        }
        ServerError::Status(code, message)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::NotFound | ServerError::RouteNotFound(_) => 404,
            ServerError::Status(code, _) => *code,
            ServerError::ParseError(_) => 400,
            ServerError::FormatError(_)
            | ServerError::IoError(_)
            | ServerError::InternalError(_)
            | ServerError::PanicError(_) => 500,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::NotFound => write!(f, "Not found"),
            ServerError::RouteNotFound(action) => write!(f, "No route for action `{}`", action),
            ServerError::Status(code, message) => write!(f, "HTTP {}: {}", code, message),
            ServerError::FormatError(msg) => write!(f, "Format error: {}", msg),
            ServerError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ServerError::IoError(err) => write!(f, "IO error: {}", err),
            ServerError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ServerError::PanicError(msg) => write!(f, "Panic: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::IoError(err)
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::FormatError(err.to_string())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
