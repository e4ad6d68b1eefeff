//! `libnowdb.so`, the library stored procedures run against.

use std::ffi::{c_char, c_long, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;

use super::client::{decode_field, optional_symbol, probe_field_count, symbol};
use super::ffi::{self, symbols, Handle};
use super::{HostApi, RawHandle, ResultApi};
use crate::codes;
use crate::error::{NowdbError, Result};
use crate::types::{Report, ResultKind, Value};

/// Default file name of the host library.
pub const DEFAULT_HOST_LIBRARY: &str = "libnowdb.so";

/// The procedure library with all of its functions resolved.
pub struct NativeHost {
    path: PathBuf,
    exec: ffi::DbExecFn,
    wrap: ffi::DbWrapFn,
    success: ffi::DbSuccessFn,
    make_error: ffi::DbMakeErrorFn,
    make_report: Option<ffi::DbMakeReportFn>,
    make_row: ffi::DbMakeRowFn,
    result_destroy: ffi::DbResultDestroyFn,
    result_type: ffi::ResultTypeFn,
    result_status: ffi::ResultStatusFn,
    result_errcode: ffi::DbResultErrcodeFn,
    result_details: ffi::DbResultDetailsFn,
    result_report: Option<ffi::ResultReportFn>,
    result_eof: ffi::CursorEofFn,
    add_to_row: ffi::DbAddToRowFn,
    row_capacity: ffi::DbRowCapacityFn,
    close_row: ffi::DbCloseRowFn,
    cursor_open: ffi::DbCursorOpenFn,
    cursor_close: ffi::DbCursorCloseFn,
    cursor_fetch: ffi::CursorFetchFn,
    cursor_row: ffi::CursorRowFn,
    row_next: ffi::RowNextFn,
    row_copy: ffi::RowCopyFn,
    row_count: Option<ffi::RowCountFn>,
    row_field: ffi::RowFieldFn,
    // `None` for function tables that are not backed by a loaded library.
    _lib: Option<Library>,
}

impl NativeHost {
    /// Load the host library. Inside the server this resolves to the
    /// already loaded engine.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lib = unsafe { Library::new(&path) }.map_err(|e| {
            NowdbError::Library(format!("failed to load '{}': {e}", path.display()))
        })?;

        // SAFETY: the types are the declarations of nowproc.h.
        let host = unsafe {
            NativeHost {
                exec: symbol(&lib, &path, symbols::DB_EXEC_STATEMENT)?,
                wrap: symbol(&lib, &path, symbols::DB_RESULT_WRAP)?,
                success: symbol(&lib, &path, symbols::DB_RESULT_SUCCESS)?,
                make_error: symbol(&lib, &path, symbols::DB_RESULT_MAKE_ERROR)?,
                make_report: optional_symbol(&lib, symbols::DB_RESULT_MAKE_REPORT),
                make_row: symbol(&lib, &path, symbols::DB_RESULT_MAKE_ROW)?,
                result_destroy: symbol(&lib, &path, symbols::DB_RESULT_DESTROY)?,
                result_type: symbol(&lib, &path, symbols::DB_RESULT_TYPE)?,
                result_status: symbol(&lib, &path, symbols::DB_RESULT_STATUS)?,
                result_errcode: symbol(&lib, &path, symbols::DB_RESULT_ERRCODE)?,
                result_details: symbol(&lib, &path, symbols::DB_RESULT_DETAILS)?,
                result_report: optional_symbol(&lib, symbols::DB_RESULT_REPORT),
                result_eof: symbol(&lib, &path, symbols::DB_RESULT_EOF)?,
                add_to_row: symbol(&lib, &path, symbols::DB_RESULT_ADD_TO_ROW)?,
                row_capacity: symbol(&lib, &path, symbols::DB_RESULT_ROW_CAPACITY)?,
                close_row: symbol(&lib, &path, symbols::DB_RESULT_CLOSE_ROW)?,
                cursor_open: symbol(&lib, &path, symbols::DB_CURSOR_OPEN)?,
                cursor_close: symbol(&lib, &path, symbols::DB_CURSOR_CLOSE)?,
                cursor_fetch: symbol(&lib, &path, symbols::DB_CURSOR_FETCH)?,
                cursor_row: symbol(&lib, &path, symbols::DB_CURSOR_ROW)?,
                row_next: symbol(&lib, &path, symbols::DB_ROW_NEXT)?,
                row_copy: symbol(&lib, &path, symbols::DB_ROW_COPY)?,
                row_count: optional_symbol(&lib, symbols::DB_ROW_COUNT),
                row_field: symbol(&lib, &path, symbols::DB_ROW_FIELD)?,
                path: path.clone(),
                _lib: Some(lib),
            }
        };

        tracing::debug!(path = %path.display(), "loaded procedure library");
        Ok(host)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultApi for NativeHost {
    fn result_kind(&self, res: RawHandle) -> i32 {
        unsafe { (self.result_type)(res.as_ptr()) as i32 }
    }

    fn result_ok(&self, res: RawHandle) -> bool {
        // host convention: the status is a truth value
        unsafe { (self.result_status)(res.as_ptr()) != 0 }
    }

    fn result_errcode(&self, res: RawHandle) -> i32 {
        unsafe { (self.result_errcode)(res.as_ptr()) }
    }

    fn result_details(&self, res: RawHandle) -> Option<String> {
        let p = unsafe { (self.result_details)(res.as_ptr()) };
        if p.is_null() {
            return None;
        }
        let details = unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned();
        // allocated by the library for the caller
        unsafe { libc::free(p.cast::<c_void>()) };
        Some(details)
    }

    fn result_report(&self, res: RawHandle) -> Report {
        let Some(report) = self.result_report else {
            return Report::default();
        };
        let mut r = Report::default();
        unsafe { report(res.as_ptr(), &mut r.affected, &mut r.errors, &mut r.runtime) };
        r
    }

    fn result_eof(&self, res: RawHandle) -> bool {
        unsafe { (self.result_eof)(res.as_ptr()) != 0 }
    }

    fn release(&self, res: RawHandle, kind: ResultKind) {
        match kind {
            ResultKind::Cursor => unsafe { (self.cursor_close)(res.as_ptr()) },
            _ => unsafe { (self.result_destroy)(res.as_ptr(), 1) },
        }
    }

    fn cursor_open(&self, cur: RawHandle) -> i32 {
        // a procedure cursor is opened first and then needs its first fetch;
        // a failed open is reported without fetching
        let rc = unsafe { (self.cursor_open)(cur.as_ptr()) as i32 };
        if rc != codes::OK {
            return rc;
        }
        self.cursor_fetch(cur)
    }

    fn cursor_fetch(&self, cur: RawHandle) -> i32 {
        unsafe { (self.cursor_fetch)(cur.as_ptr()) as i32 }
    }

    fn cursor_row(&self, cur: RawHandle) -> Option<RawHandle> {
        // the host hands out a fresh row object on every call
        RawHandle::from_ptr(unsafe { (self.cursor_row)(cur.as_ptr()) })
    }

    fn row_copy(&self, row: RawHandle) -> Option<RawHandle> {
        RawHandle::from_ptr(unsafe { (self.row_copy)(row.as_ptr()) })
    }

    fn row_next(&self, row: RawHandle) -> bool {
        unsafe { (self.row_next)(row.as_ptr()) == 0 }
    }

    fn row_count(&self, row: RawHandle) -> usize {
        match self.row_count {
            Some(count) => usize::try_from(unsafe { count(row.as_ptr()) }).unwrap_or(0),
            None => unsafe { probe_field_count(self.row_field, row.as_ptr()) },
        }
    }

    fn row_field(&self, row: RawHandle, idx: usize) -> Value {
        let mut typ: c_long = 0;
        let ptr = unsafe { (self.row_field)(row.as_ptr(), idx as c_long, &mut typ) };
        unsafe { decode_field(ptr, typ) }
    }
}

impl HostApi for NativeHost {
    fn execute(&self, db: RawHandle, statement: &CStr) -> std::result::Result<RawHandle, i32> {
        let mut res: Handle = ptr::null_mut();
        let rc = unsafe { (self.exec)(db.as_ptr(), statement.as_ptr(), &mut res) };
        if rc != 0 {
            return Err(rc as i32);
        }
        RawHandle::from_ptr(res).ok_or(codes::NO_RSC)
    }

    fn wrap(&self, raw: RawHandle) -> Option<RawHandle> {
        RawHandle::from_ptr(unsafe { (self.wrap)(raw.as_ptr()) })
    }

    fn make_success(&self) -> Option<RawHandle> {
        RawHandle::from_ptr(unsafe { (self.success)() })
    }

    fn make_error(&self, code: i32, message: &CStr) -> Option<RawHandle> {
        RawHandle::from_ptr(unsafe { (self.make_error)(code as c_long, message.as_ptr()) })
    }

    fn make_report(&self, report: Report) -> Option<RawHandle> {
        let make = self.make_report?;
        RawHandle::from_ptr(unsafe { make(report.affected, report.errors, report.runtime) })
    }

    fn make_row(&self) -> Option<RawHandle> {
        RawHandle::from_ptr(unsafe { (self.make_row)() })
    }

    fn row_capacity(&self, row: RawHandle) -> i32 {
        unsafe { (self.row_capacity)(row.as_ptr()) }
    }

    fn add_to_row(&self, row: RawHandle, value: &Value) -> i32 {
        let tag = value.value_type().tag() as c_char;
        let add = self.add_to_row;
        // the library reads the value through a pointer to its storage
        let rc = match value {
            Value::Null => unsafe { add(row.as_ptr(), tag, ptr::null()) },
            Value::Text(s) => {
                let Ok(text) = CString::new(s.as_str()) else {
                    return codes::INVALID;
                };
                let p: *const c_char = text.as_ptr();
                unsafe { add(row.as_ptr(), tag, (&p as *const *const c_char).cast()) }
            }
            Value::Date(v) | Value::Time(v) | Value::Int(v) => unsafe {
                add(row.as_ptr(), tag, (v as *const i64).cast())
            },
            Value::Bool(b) => {
                let v = i64::from(*b);
                unsafe { add(row.as_ptr(), tag, (&v as *const i64).cast()) }
            }
            Value::UInt(v) => unsafe { add(row.as_ptr(), tag, (v as *const u64).cast()) },
            Value::Float(v) => unsafe { add(row.as_ptr(), tag, (v as *const f64).cast()) },
        };
        rc as i32
    }

    fn close_row(&self, row: RawHandle) -> i32 {
        unsafe { (self.close_row)(row.as_ptr()) as i32 }
    }
}
