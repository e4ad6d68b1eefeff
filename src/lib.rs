//! NoWDB client bindings.
//!
//! Safe wrappers around the NoWDB native libraries: `libnowdbclient.so` for
//! applications talking to a server, `libnowdb.so` for stored procedures
//! running inside it. Results are read with a two-level protocol (cursor
//! batches, rows within a batch) exposed as a plain [`Iterator`] of [`Row`]s.
//!
//! ```no_run
//! use nowdb::{ClientConfig, Connection};
//!
//! let config = ClientConfig::new("127.0.0.1", 55505).database("retail");
//! let con = Connection::connect(&config)?;
//! for row in con.execute("select prod_key, prod_desc from product")? {
//!     println!("{}", row?);
//! }
//! con.close()?;
//! # Ok::<(), nowdb::NowdbError>(())
//! ```

pub mod codes;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod dbapi;
pub mod error;
pub mod native;
pub mod procedure;
pub mod result;
pub mod script;
pub mod types;

#[cfg(test)]
mod mock;

#[cfg(feature = "python")]
mod python;

pub use config::{ClientConfig, Encoding};
pub use connection::Connection;
pub use cursor::Cursor;
pub use error::{NowdbError, Result};
pub use native::{ClientApi, HostApi, NativeClient, NativeHost, RawHandle, ResultApi};
pub use procedure::{Procedure, RowBuilder};
pub use result::{Fetched, QueryResult, Row, RowBatch};
pub use script::split_statements;
pub use types::{Report, ResultKind, Value, ValueType};
