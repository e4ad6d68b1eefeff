//! DB-API exception taxonomy.

use std::fmt;

use crate::codes;
use crate::error::NowdbError;

pub type DbResult<T> = Result<T, DbApiError>;

/// Errors raised through the DB-API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbApiError {
    /// Important warnings.
    Warning(String),

    /// Problems of the binding itself rather than of the database.
    Interface(String),

    /// Any other error reported by the database.
    Database(String),

    /// Problems with the processed data (invalid values, out of range).
    Data(String),

    /// Errors of the database's operation, not under the caller's control.
    Operational(String),

    /// Relational integrity violated, e.g. a duplicate key.
    Integrity(String),

    /// The database hit an internal error.
    Internal(String),

    /// Wrong statement or wrong use of the API.
    Programming(String),

    /// The operation is not supported by the database.
    NotSupported(String),
}

impl DbApiError {
    /// Name of the exception class.
    pub fn kind(&self) -> &'static str {
        match self {
            DbApiError::Warning(_) => "Warning",
            DbApiError::Interface(_) => "InterfaceError",
            DbApiError::Database(_) => "DatabaseError",
            DbApiError::Data(_) => "DataError",
            DbApiError::Operational(_) => "OperationalError",
            DbApiError::Integrity(_) => "IntegrityError",
            DbApiError::Internal(_) => "InternalError",
            DbApiError::Programming(_) => "ProgrammingError",
            DbApiError::NotSupported(_) => "NotSupportedError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DbApiError::Warning(m)
            | DbApiError::Interface(m)
            | DbApiError::Database(m)
            | DbApiError::Data(m)
            | DbApiError::Operational(m)
            | DbApiError::Integrity(m)
            | DbApiError::Internal(m)
            | DbApiError::Programming(m)
            | DbApiError::NotSupported(m) => m,
        }
    }

    /// True for every class except `Warning`.
    pub fn is_error(&self) -> bool {
        !matches!(self, DbApiError::Warning(_))
    }

    /// Classify a server error code.
    pub fn from_server(code: i32, message: String) -> Self {
        match code {
            codes::DUP_KEY | codes::KEY_NOT_FOUND | codes::COLLISION | codes::DUP_NAME => {
                DbApiError::Integrity(message)
            }
            codes::TIMEOUT
            | codes::BUSY
            | codes::LOCK
            | codes::ULOCK
            | codes::SOCKET
            | codes::PROTOCOL
            | codes::SERVER
            | codes::READ
            | codes::WRITE
            | codes::OPEN
            | codes::CLOSE => DbApiError::Operational(message),
            codes::PARSER | codes::UNK_SYMBOL | codes::BAD_NAME | codes::NOT_FOUND => {
                DbApiError::Programming(message)
            }
            codes::NOT_SUPP => DbApiError::NotSupported(message),
            codes::INVALID | codes::TOO_BIG | codes::TIME => DbApiError::Data(message),
            codes::PANIC | codes::NO_MEM | codes::CATALOG => DbApiError::Internal(message),
            _ => DbApiError::Database(message),
        }
    }
}

impl fmt::Display for DbApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for DbApiError {}

impl From<NowdbError> for DbApiError {
    fn from(err: NowdbError) -> Self {
        let message = err.to_string();
        match err {
            NowdbError::Server { code, .. } => DbApiError::from_server(code, message),
            NowdbError::Client { .. } | NowdbError::Library(_) | NowdbError::ConnectionClosed => {
                DbApiError::Interface(message)
            }
            NowdbError::Io(_) => DbApiError::Operational(message),
            NowdbError::WrongType(_) => DbApiError::Programming(message),
            NowdbError::InvalidArgument(_) | NowdbError::RowFull(_) => DbApiError::Data(message),
            NowdbError::Config(_) => DbApiError::Interface(message),
        }
    }
}
