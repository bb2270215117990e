use std::convert::From;
use std::error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

#[derive(Debug)]
pub enum ErrorKind {
    UnknownSection,
    InvalidDirection,
    InvalidDate,
    InvalidAvatar,
    HttpStatus(u16),
    Network,
    Decode,
    ConfigParse,
    CommandParse,
    IOError(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, msg: &str) -> Self {
        Error {
            kind,
            message: Some(msg.to_owned()),
        }
    }

    pub fn with_msg(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }

    pub fn unknown_section(name: &str) -> Self {
        Error::new(
            ErrorKind::UnknownSection,
            &format!("no section named '{}'", name),
        )
    }

    pub fn is_unknown_section(&self) -> bool {
        matches!(self.kind, ErrorKind::UnknownSection)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind,
            message: None,
        }
    }
}

impl From<io::ErrorKind> for Error {
    fn from(kind: io::ErrorKind) -> Error {
        Error::from(io::Error::from(kind))
    }
}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Error {
        Error::from(ErrorKind::IOError(io_error))
    }
}

impl From<chrono::ParseError> for Error {
    fn from(parse_error: chrono::ParseError) -> Error {
        Error::new(
            ErrorKind::InvalidDate,
            &format!("Could not parse date: {}", parse_error),
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::new(ErrorKind::Decode, &error.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Error {
        Error::new(ErrorKind::ConfigParse, &error.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Error {
        if let Some(status) = error.status() {
            Error::new(ErrorKind::HttpStatus(status.as_u16()), &error.to_string())
        } else if error.is_decode() {
            Error::new(ErrorKind::Decode, &error.to_string())
        } else {
            Error::new(ErrorKind::Network, &error.to_string())
        }
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for Error {
    fn from(error: nom::Err<E>) -> Self {
        Error::new(
            ErrorKind::CommandParse,
            &format!("Error while parsing: {}", error),
        )
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        if let ErrorKind::IOError(err) = err.kind {
            err
        } else {
            let kind = err.kind;
            io::Error::new(
                io::ErrorKind::InvalidInput,
                err.message.unwrap_or_else(|| kind.as_str()),
            )
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.kind.as_str(), msg),
            None => write!(f, "{}", self.kind.as_str()),
        }
    }
}

impl error::Error for Error {}

impl ErrorKind {
    pub fn as_str(&self) -> String {
        match self {
            ErrorKind::UnknownSection => "unknown section".to_owned(),
            ErrorKind::InvalidDirection => "invalid month direction".to_owned(),
            ErrorKind::InvalidDate => "invalid date".to_owned(),
            ErrorKind::InvalidAvatar => "invalid avatar".to_owned(),
            ErrorKind::HttpStatus(code) => format!("request failed with status {}", code),
            ErrorKind::Network => "network error".to_owned(),
            ErrorKind::Decode => "invalid response format".to_owned(),
            ErrorKind::ConfigParse => "invalid configuration".to_owned(),
            ErrorKind::CommandParse => "invalid command".to_owned(),
            ErrorKind::IOError(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::unknown_section("billing");
        assert_eq!(
            err.to_string(),
            "unknown section: no section named 'billing'"
        );
        assert!(err.is_unknown_section());
    }

    #[test]
    fn io_error_roundtrips_through_kind() {
        let err = Error::from(io::ErrorKind::NotFound);
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn into_io_error_keeps_message_or_kind() {
        let io_err: io::Error = Error::new(ErrorKind::Decode, "bad payload").into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(io_err.to_string(), "bad payload");

        let io_err: io::Error = Error::from(ErrorKind::HttpStatus(404)).into();
        assert_eq!(io_err.to_string(), "request failed with status 404");
    }

    #[test]
    fn status_kind_is_rendered() {
        let err = Error::from(ErrorKind::HttpStatus(503));
        assert_eq!(err.to_string(), "request failed with status 503");
    }
}
