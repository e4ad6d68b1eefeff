//! Error types for the NoWDB bindings.
//!
//! Client-side failures carry the return code of the native call and the
//! text the library's `explain` function gives for it. Server-side failures
//! carry the error code and details string of a result.

use thiserror::Error;

use crate::codes;

#[derive(Error, Debug)]
pub enum NowdbError {
    #[error("Library error: {0}")]
    Library(String),

    #[error("Client error {code}: {message}")]
    Client { code: i32, message: String },

    #[error("{code}: {details}")]
    Server { code: i32, details: String },

    #[error("Wrong result type: {0}")]
    WrongType(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Row is full: {0}")]
    RowFull(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NowdbError {
    /// Server or client error code, if this error carries one.
    pub fn code(&self) -> Option<i32> {
        match self {
            NowdbError::Client { code, .. } | NowdbError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for a server error carrying the end-of-data code.
    pub fn is_eof(&self) -> bool {
        matches!(self, NowdbError::Server { code, .. } if *code == codes::EOF)
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, NowdbError::Server { code, .. } if *code == codes::DUP_KEY)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NowdbError::Server { code, .. } if *code == codes::TIMEOUT)
    }
}

impl From<std::ffi::NulError> for NowdbError {
    fn from(err: std::ffi::NulError) -> Self {
        NowdbError::InvalidArgument(format!(
            "string contains a NUL byte at position {}",
            err.nul_position()
        ))
    }
}

impl From<libloading::Error> for NowdbError {
    fn from(err: libloading::Error) -> Self {
        NowdbError::Library(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NowdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_predicates() {
        let eof = NowdbError::Server {
            code: codes::EOF,
            details: "end of file".to_string(),
        };
        assert!(eof.is_eof());
        assert!(!eof.is_duplicate_key());
        assert_eq!(eof.code(), Some(codes::EOF));

        let dup = NowdbError::Server {
            code: codes::DUP_KEY,
            details: "duplicated key".to_string(),
        };
        assert!(dup.is_duplicate_key());
        assert_eq!(dup.to_string(), "27: duplicated key");
    }

    #[test]
    fn test_client_error_is_not_eof() {
        // the client library has its own EOF code, it is not the server one
        let err = NowdbError::Client {
            code: codes::client::EOF,
            message: "end of file".to_string(),
        };
        assert!(!err.is_eof());
        assert_eq!(err.code(), Some(4));
    }

    #[test]
    fn test_nul_error_conversion() {
        let err: NowdbError = std::ffi::CString::new("use\0db").unwrap_err().into();
        assert!(matches!(err, NowdbError::InvalidArgument(_)));
        assert!(err.to_string().contains("position 3"));
    }
}
