//! Native binding layer.
//!
//! The NoWDB engine and wire protocol live in two external shared
//! libraries: `libnowdbclient.so` for client programs and `libnowdb.so`
//! inside the server, for stored procedures. This module declares their C
//! ABI and wraps it behind three traits:
//!
//! - [`ResultApi`]: result, row and cursor accessors shared by both libraries
//! - [`ClientApi`]: connecting and executing statements as a client
//! - [`HostApi`]: executing statements and building results inside a procedure
//!
//! Everything above this module talks to the traits only, never to raw
//! pointers. Raw return codes are passed through unchanged; translating them
//! into errors is the job of the safe layer.

pub mod client;
pub mod ffi;
pub mod host;

use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

use crate::types::{Report, ResultKind, Value};

pub use client::NativeClient;
pub use host::NativeHost;

/// An opaque, non-null handle owned by a native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

// Handles are plain addresses. Calls through a connection's handles are
// serialized by the connection lock.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    /// Wrap a pointer returned by the native library. Null gives `None`.
    #[inline]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawHandle)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Build a handle from a plain token. Used by library implementations
    /// that are not backed by real memory.
    pub fn from_token(token: usize) -> Option<Self> {
        Self::from_ptr(token as *mut c_void)
    }

    pub fn token(self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// Result, row and cursor accessors common to the client and host libraries.
///
/// Methods taking a handle may only be called with a handle that has not
/// been released. The safe wrappers guarantee that by construction.
pub trait ResultApi: Send + Sync {
    /// Raw result kind tag.
    fn result_kind(&self, res: RawHandle) -> i32;

    /// True if the result carries no error. Each library reports this with
    /// its own convention; implementations normalize it.
    fn result_ok(&self, res: RawHandle) -> bool;

    /// Server error code of the result.
    fn result_errcode(&self, res: RawHandle) -> i32;

    /// Error details, if the library has any.
    fn result_details(&self, res: RawHandle) -> Option<String>;

    fn result_report(&self, res: RawHandle) -> Report;

    /// True if a cursor has reached the end of data.
    fn result_eof(&self, res: RawHandle) -> bool;

    /// Release a result, row or cursor handle. Called exactly once per handle.
    fn release(&self, res: RawHandle, kind: ResultKind);

    /// Materialize the first batch of a cursor. Returns the library's code.
    fn cursor_open(&self, cur: RawHandle) -> i32;

    /// Request the next batch from the server. Returns the library's code.
    fn cursor_fetch(&self, cur: RawHandle) -> i32;

    /// Owned copy of the cursor's current batch.
    fn cursor_row(&self, cur: RawHandle) -> Option<RawHandle>;

    /// Owned copy of a row result.
    fn row_copy(&self, row: RawHandle) -> Option<RawHandle>;

    /// Advance inside the batch. False at the end of the batch.
    fn row_next(&self, row: RawHandle) -> bool;

    /// Number of fields of the current row.
    fn row_count(&self, row: RawHandle) -> usize;

    /// Decode field `idx` of the current row.
    fn row_field(&self, row: RawHandle, idx: usize) -> Value;
}

/// Client side of the library (`libnowdbclient.so`).
pub trait ClientApi: ResultApi {
    /// Human readable text for a client return code.
    fn explain(&self, code: i32) -> String;

    fn connect(
        &self,
        host: &CStr,
        port: u16,
        user: Option<&CStr>,
        password: Option<&CStr>,
        flags: i32,
    ) -> std::result::Result<RawHandle, i32>;

    /// Close and free a connection. Returns the library's code.
    fn close(&self, con: RawHandle) -> i32;

    /// Free a connection without the closing handshake.
    fn destroy(&self, con: RawHandle);

    fn execute(&self, con: RawHandle, statement: &CStr) -> std::result::Result<RawHandle, i32>;
}

/// Stored procedure side of the library (`libnowdb.so`).
pub trait HostApi: ResultApi {
    fn execute(&self, db: RawHandle, statement: &CStr) -> std::result::Result<RawHandle, i32>;

    /// Wrap a raw engine result into a procedure result.
    fn wrap(&self, raw: RawHandle) -> Option<RawHandle>;

    fn make_success(&self) -> Option<RawHandle>;

    fn make_error(&self, code: i32, message: &CStr) -> Option<RawHandle>;

    fn make_report(&self, report: Report) -> Option<RawHandle>;

    fn make_row(&self) -> Option<RawHandle>;

    /// Bytes left in the row buffer.
    fn row_capacity(&self, row: RawHandle) -> i32;

    /// Append one value. Returns the library's code.
    fn add_to_row(&self, row: RawHandle, value: &Value) -> i32;

    /// Append the end-of-row marker. Returns the library's code.
    fn close_row(&self, row: RawHandle) -> i32;
}
