//! Raw C signatures of the NoWDB libraries.
//!
//! `long` parameters are declared as `c_long` the way the libraries are
//! called from other bindings; handles are `*mut c_void`.

use std::ffi::{c_char, c_int, c_long, c_short, c_void};

pub type Handle = *mut c_void;

// ----------------------------------------------------------------------------
// libnowdbclient.so
// ----------------------------------------------------------------------------

pub type ExplainFn = unsafe extern "C" fn(err: c_long) -> *const c_char;
pub type ConnectFn = unsafe extern "C" fn(
    con: *mut Handle,
    host: *const c_char,
    port: c_short,
    user: *const c_char,
    pw: *const c_char,
    flags: c_long,
) -> c_long;
pub type ConnectionCloseFn = unsafe extern "C" fn(con: Handle) -> c_long;
pub type ConnectionDestroyFn = unsafe extern "C" fn(con: Handle);
pub type ExecFn =
    unsafe extern "C" fn(con: Handle, stmt: *const c_char, res: *mut Handle) -> c_long;

pub type ResultDestroyFn = unsafe extern "C" fn(res: Handle);
pub type ResultTypeFn = unsafe extern "C" fn(res: Handle) -> c_long;
pub type ResultStatusFn = unsafe extern "C" fn(res: Handle) -> c_long;
/// Declared `short` by the client header.
pub type ResultErrcodeFn = unsafe extern "C" fn(res: Handle) -> c_short;
pub type ResultDetailsFn = unsafe extern "C" fn(res: Handle) -> *const c_char;
pub type ResultReportFn =
    unsafe extern "C" fn(res: Handle, affected: *mut u64, errors: *mut u64, runtime: *mut u64);

pub type CursorFetchFn = unsafe extern "C" fn(cur: Handle) -> c_long;
pub type CursorEofFn = unsafe extern "C" fn(cur: Handle) -> c_long;
pub type CursorRowFn = unsafe extern "C" fn(cur: Handle) -> Handle;

pub type RowCopyFn = unsafe extern "C" fn(row: Handle) -> Handle;
pub type RowNextFn = unsafe extern "C" fn(row: Handle) -> c_long;
pub type RowCountFn = unsafe extern "C" fn(row: Handle) -> c_long;
pub type RowFieldFn =
    unsafe extern "C" fn(row: Handle, field: c_long, typ: *mut c_long) -> *mut c_void;

// ----------------------------------------------------------------------------
// libnowdb.so (stored procedures)
// ----------------------------------------------------------------------------

pub type DbExecFn =
    unsafe extern "C" fn(db: Handle, stmt: *const c_char, res: *mut Handle) -> c_long;
pub type DbWrapFn = unsafe extern "C" fn(raw: Handle) -> Handle;
pub type DbSuccessFn = unsafe extern "C" fn() -> Handle;
pub type DbMakeErrorFn = unsafe extern "C" fn(code: c_long, msg: *const c_char) -> Handle;
pub type DbMakeReportFn = unsafe extern "C" fn(affected: u64, errors: u64, runtime: u64) -> Handle;
pub type DbMakeRowFn = unsafe extern "C" fn() -> Handle;
pub type DbResultErrcodeFn = unsafe extern "C" fn(res: Handle) -> c_int;
pub type DbCursorOpenFn = unsafe extern "C" fn(cur: Handle) -> c_long;
pub type DbResultDestroyFn = unsafe extern "C" fn(res: Handle, all: c_long);
/// Returns a heap string the caller must free.
pub type DbResultDetailsFn = unsafe extern "C" fn(res: Handle) -> *mut c_char;
pub type DbCursorCloseFn = unsafe extern "C" fn(cur: Handle);
pub type DbAddToRowFn = unsafe extern "C" fn(row: Handle, t: c_char, value: *const c_void) -> c_long;
pub type DbRowCapacityFn = unsafe extern "C" fn(row: Handle) -> c_int;
pub type DbCloseRowFn = unsafe extern "C" fn(row: Handle) -> c_long;

// ----------------------------------------------------------------------------
// Symbol names
// ----------------------------------------------------------------------------

pub mod symbols {
    pub const ERR_EXPLAIN: &[u8] = b"nowdb_err_explain";
    pub const ERR_DESCRIBE: &[u8] = b"nowdb_err_describe";
    pub const CONNECT: &[u8] = b"nowdb_connect";
    pub const CONNECTION_CLOSE: &[u8] = b"nowdb_connection_close";
    pub const CONNECTION_DESTROY: &[u8] = b"nowdb_connection_destroy";
    pub const EXEC_STATEMENT: &[u8] = b"nowdb_exec_statement";
    pub const RESULT_DESTROY: &[u8] = b"nowdb_result_destroy";
    pub const RESULT_TYPE: &[u8] = b"nowdb_result_type";
    pub const RESULT_STATUS: &[u8] = b"nowdb_result_status";
    pub const RESULT_ERRCODE: &[u8] = b"nowdb_result_errcode";
    pub const RESULT_DETAILS: &[u8] = b"nowdb_result_details";
    pub const RESULT_REPORT: &[u8] = b"nowdb_result_report";
    pub const CURSOR_FETCH: &[u8] = b"nowdb_cursor_fetch";
    pub const CURSOR_EOF: &[u8] = b"nowdb_cursor_eof";
    pub const CURSOR_ROW: &[u8] = b"nowdb_cursor_row";
    pub const ROW_COPY: &[u8] = b"nowdb_row_copy";
    pub const ROW_NEXT: &[u8] = b"nowdb_row_next";
    pub const ROW_COUNT: &[u8] = b"nowdb_row_count";
    pub const ROW_FIELD: &[u8] = b"nowdb_row_field";

    pub const DB_EXEC_STATEMENT: &[u8] = b"nowdb_dbexec_statement";
    pub const DB_RESULT_WRAP: &[u8] = b"nowdb_dbresult_wrap";
    pub const DB_RESULT_SUCCESS: &[u8] = b"nowdb_dbresult_success";
    pub const DB_RESULT_MAKE_ERROR: &[u8] = b"nowdb_dbresult_makeError";
    pub const DB_RESULT_MAKE_REPORT: &[u8] = b"nowdb_dbresult_makeReport";
    pub const DB_RESULT_MAKE_ROW: &[u8] = b"nowdb_dbresult_makeRow";
    pub const DB_RESULT_DESTROY: &[u8] = b"nowdb_dbresult_destroy";
    pub const DB_RESULT_TYPE: &[u8] = b"nowdb_dbresult_type";
    pub const DB_RESULT_STATUS: &[u8] = b"nowdb_dbresult_status";
    pub const DB_RESULT_ERRCODE: &[u8] = b"nowdb_dbresult_errcode";
    pub const DB_RESULT_DETAILS: &[u8] = b"nowdb_dbresult_details";
    pub const DB_RESULT_REPORT: &[u8] = b"nowdb_dbresult_report";
    pub const DB_RESULT_EOF: &[u8] = b"nowdb_dbresult_eof";
    pub const DB_RESULT_ADD_TO_ROW: &[u8] = b"nowdb_dbresult_add2Row";
    pub const DB_RESULT_ROW_CAPACITY: &[u8] = b"nowdb_dbresult_rowCapacity";
    pub const DB_RESULT_CLOSE_ROW: &[u8] = b"nowdb_dbresult_closeRow";
    pub const DB_CURSOR_OPEN: &[u8] = b"nowdb_dbcur_open";
    pub const DB_CURSOR_CLOSE: &[u8] = b"nowdb_dbcur_close";
    pub const DB_CURSOR_FETCH: &[u8] = b"nowdb_dbcur_fetch";
    pub const DB_CURSOR_ROW: &[u8] = b"nowdb_dbcur_row";
    pub const DB_ROW_NEXT: &[u8] = b"nowdb_dbrow_next";
    pub const DB_ROW_COPY: &[u8] = b"nowdb_dbrow_copy";
    pub const DB_ROW_COUNT: &[u8] = b"nowdb_dbrow_count";
    pub const DB_ROW_FIELD: &[u8] = b"nowdb_dbrow_field";
}
