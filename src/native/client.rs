//! `libnowdbclient.so`, loaded at runtime.

use std::collections::HashMap;
use std::ffi::{c_char, c_long, c_short, c_void, CStr};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::ffi::{self, symbols, Handle};
use super::{ClientApi, RawHandle, ResultApi};
use crate::codes;
use crate::error::{NowdbError, Result};
use crate::types::{Report, ResultKind, Value, ValueType};

/// Default file name of the client library.
pub const DEFAULT_CLIENT_LIBRARY: &str = "libnowdbclient.so";

/// Upper bound when counting fields by probing.
const MAX_PROBED_FIELDS: usize = 4096;

/// Libraries loaded so far, one per path.
static LOADED: Lazy<Mutex<HashMap<PathBuf, Arc<NativeClient>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Resolve a mandatory symbol and copy the function pointer out.
///
/// # Safety
/// `T` must be the function pointer type the library exports under `name`.
pub(crate) unsafe fn symbol<T: Copy>(lib: &Library, path: &Path, name: &[u8]) -> Result<T> {
    lib.get::<T>(name).map(|s| *s).map_err(|e| {
        NowdbError::Library(format!(
            "symbol '{}' not found in '{}': {e}",
            String::from_utf8_lossy(name),
            path.display()
        ))
    })
}

/// Resolve a symbol that older library builds do not export.
///
/// # Safety
/// Same as [`symbol`].
pub(crate) unsafe fn optional_symbol<T: Copy>(lib: &Library, name: &[u8]) -> Option<T> {
    lib.get::<T>(name).ok().map(|s| *s)
}

/// Copy a field out of native memory according to its type tag.
///
/// # Safety
/// `ptr` must be null or point to a value of the type named by `tag`, as
/// returned by a row field accessor for a row that is still alive.
pub(crate) unsafe fn decode_field(ptr: *const c_void, tag: c_long) -> Value {
    if ptr.is_null() {
        return Value::Null;
    }
    match ValueType::from_tag(tag as i32) {
        Some(ValueType::Nothing) => Value::Null,
        Some(ValueType::Text) => Value::Text(
            CStr::from_ptr(ptr.cast::<c_char>())
                .to_string_lossy()
                .into_owned(),
        ),
        Some(ValueType::Date) => Value::Date(ptr.cast::<i64>().read_unaligned()),
        Some(ValueType::Time) => Value::Time(ptr.cast::<i64>().read_unaligned()),
        Some(ValueType::Int) => Value::Int(ptr.cast::<i64>().read_unaligned()),
        Some(ValueType::UInt) => Value::UInt(ptr.cast::<u64>().read_unaligned()),
        Some(ValueType::Float) => Value::Float(ptr.cast::<f64>().read_unaligned()),
        Some(ValueType::Bool) => Value::Bool(ptr.cast::<u8>().read() != 0),
        None => {
            tracing::warn!(tag, "unknown field type, decoding as NULL");
            Value::Null
        }
    }
}

/// Count the fields of a row by asking for fields until the library returns
/// no pointer.
///
/// # Safety
/// `row` must be a live row handle and `field` its field accessor.
pub(crate) unsafe fn probe_field_count(field: ffi::RowFieldFn, row: Handle) -> usize {
    let mut typ: c_long = 0;
    for i in 0..MAX_PROBED_FIELDS {
        if field(row, i as c_long, &mut typ).is_null() {
            return i;
        }
    }
    MAX_PROBED_FIELDS
}

/// The client library with all of its functions resolved.
pub struct NativeClient {
    path: PathBuf,
    explain: Option<ffi::ExplainFn>,
    connect: ffi::ConnectFn,
    connection_close: ffi::ConnectionCloseFn,
    connection_destroy: ffi::ConnectionDestroyFn,
    exec: ffi::ExecFn,
    result_destroy: ffi::ResultDestroyFn,
    result_type: ffi::ResultTypeFn,
    result_status: ffi::ResultStatusFn,
    result_errcode: ffi::ResultErrcodeFn,
    result_details: ffi::ResultDetailsFn,
    result_report: Option<ffi::ResultReportFn>,
    cursor_fetch: ffi::CursorFetchFn,
    cursor_eof: ffi::CursorEofFn,
    cursor_row: ffi::CursorRowFn,
    row_copy: ffi::RowCopyFn,
    row_next: ffi::RowNextFn,
    row_count: Option<ffi::RowCountFn>,
    row_field: ffi::RowFieldFn,
    // Declared last: the function pointers above must not outlive it.
    // `None` for function tables that are not backed by a loaded library.
    _lib: Option<Library>,
}

impl NativeClient {
    /// Load the client library from `path` and resolve its symbols.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lib = unsafe { Library::new(&path) }.map_err(|e| {
            NowdbError::Library(format!("failed to load '{}': {e}", path.display()))
        })?;

        // SAFETY: the types are the declarations of nowclient.h.
        let client = unsafe {
            NativeClient {
                explain: optional_symbol::<ffi::ExplainFn>(&lib, symbols::ERR_EXPLAIN)
                    .or_else(|| optional_symbol(&lib, symbols::ERR_DESCRIBE)),
                connect: symbol(&lib, &path, symbols::CONNECT)?,
                connection_close: symbol(&lib, &path, symbols::CONNECTION_CLOSE)?,
                connection_destroy: symbol(&lib, &path, symbols::CONNECTION_DESTROY)?,
                exec: symbol(&lib, &path, symbols::EXEC_STATEMENT)?,
                result_destroy: symbol(&lib, &path, symbols::RESULT_DESTROY)?,
                result_type: symbol(&lib, &path, symbols::RESULT_TYPE)?,
                result_status: symbol(&lib, &path, symbols::RESULT_STATUS)?,
                result_errcode: symbol(&lib, &path, symbols::RESULT_ERRCODE)?,
                result_details: symbol(&lib, &path, symbols::RESULT_DETAILS)?,
                result_report: optional_symbol(&lib, symbols::RESULT_REPORT),
                cursor_fetch: symbol(&lib, &path, symbols::CURSOR_FETCH)?,
                cursor_eof: symbol(&lib, &path, symbols::CURSOR_EOF)?,
                cursor_row: symbol(&lib, &path, symbols::CURSOR_ROW)?,
                row_copy: symbol(&lib, &path, symbols::ROW_COPY)?,
                row_next: symbol(&lib, &path, symbols::ROW_NEXT)?,
                row_count: optional_symbol(&lib, symbols::ROW_COUNT),
                row_field: symbol(&lib, &path, symbols::ROW_FIELD)?,
                path: path.clone(),
                _lib: Some(lib),
            }
        };

        tracing::debug!(path = %path.display(), "loaded client library");
        Ok(client)
    }

    /// Load the library at `path` once per process and share it.
    pub fn shared(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let mut loaded = LOADED.lock();
        if let Some(client) = loaded.get(path) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(Self::load(path)?);
        loaded.insert(path.to_path_buf(), Arc::clone(&client));
        Ok(client)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultApi for NativeClient {
    fn result_kind(&self, res: RawHandle) -> i32 {
        unsafe { (self.result_type)(res.as_ptr()) as i32 }
    }

    fn result_ok(&self, res: RawHandle) -> bool {
        // client convention: status zero means success
        unsafe { (self.result_status)(res.as_ptr()) == 0 }
    }

    fn result_errcode(&self, res: RawHandle) -> i32 {
        i32::from(unsafe { (self.result_errcode)(res.as_ptr()) })
    }

    fn result_details(&self, res: RawHandle) -> Option<String> {
        let p = unsafe { (self.result_details)(res.as_ptr()) };
        if p.is_null() {
            return None;
        }
        // the string belongs to the result
        Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
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
        unsafe { (self.cursor_eof)(res.as_ptr()) != 0 }
    }

    fn release(&self, res: RawHandle, _kind: ResultKind) {
        unsafe { (self.result_destroy)(res.as_ptr()) }
    }

    fn cursor_open(&self, _cur: RawHandle) -> i32 {
        // results of exec_statement already carry their first batch;
        // nowdb_cursor_open of this library creates a separate cursor handle
        codes::OK
    }

    fn cursor_fetch(&self, cur: RawHandle) -> i32 {
        unsafe { (self.cursor_fetch)(cur.as_ptr()) as i32 }
    }

    fn cursor_row(&self, cur: RawHandle) -> Option<RawHandle> {
        let row = unsafe { (self.cursor_row)(cur.as_ptr()) };
        if row.is_null() {
            return None;
        }
        RawHandle::from_ptr(unsafe { (self.row_copy)(row) })
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

impl ClientApi for NativeClient {
    fn explain(&self, code: i32) -> String {
        let text = self
            .explain
            .map(|explain| unsafe { explain(code as c_long) })
            .filter(|p| !p.is_null())
            .map(|p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned());
        text.unwrap_or_else(|| format!("client error {code}"))
    }

    fn connect(
        &self,
        host: &CStr,
        port: u16,
        user: Option<&CStr>,
        password: Option<&CStr>,
        flags: i32,
    ) -> std::result::Result<RawHandle, i32> {
        let mut con: Handle = ptr::null_mut();
        let rc = unsafe {
            (self.connect)(
                &mut con,
                host.as_ptr(),
                // the library takes a C short; keep the bit pattern
                port as c_short,
                user.map_or(ptr::null(), CStr::as_ptr),
                password.map_or(ptr::null(), CStr::as_ptr),
                flags as c_long,
            )
        };
        if rc != 0 {
            return Err(rc as i32);
        }
        RawHandle::from_ptr(con).ok_or(codes::client::NOCON)
    }

    fn close(&self, con: RawHandle) -> i32 {
        unsafe { (self.connection_close)(con.as_ptr()) as i32 }
    }

    fn destroy(&self, con: RawHandle) {
        unsafe { (self.connection_destroy)(con.as_ptr()) }
    }

    fn execute(&self, con: RawHandle, statement: &CStr) -> std::result::Result<RawHandle, i32> {
        let mut res: Handle = ptr::null_mut();
        let rc = unsafe { (self.exec)(con.as_ptr(), statement.as_ptr(), &mut res) };
        if rc != 0 {
            return Err(rc as i32);
        }
        RawHandle::from_ptr(res).ok_or(codes::client::NORES)
    }
}
