//! Stored procedure support.
//!
//! A procedure runs inside the server. It receives the database it runs
//! against as an opaque pointer, executes statements through `libnowdb.so`
//! and hands back a result it built: success, error, report or rows.

mod row_builder;


use std::ffi::{c_void, CString};
use std::path::Path;
use std::sync::Arc;

use crate::codes;
use crate::error::{NowdbError, Result};
use crate::native::{HostApi, NativeHost, RawHandle, ResultApi};
use crate::result::QueryResult;
use crate::types::Report;

pub use row_builder::{required_capacity, RowBuilder};

/// The context a stored procedure runs in.
pub struct Procedure {
    host: Arc<dyn HostApi>,
    results: Arc<dyn ResultApi>,
    db: RawHandle,
}

impl Procedure {
    /// Wrap the database handle the server passed to the procedure.
    pub fn new<A: HostApi + 'static>(host: Arc<A>, db: RawHandle) -> Self {
        let results: Arc<dyn ResultApi> = host.clone();
        Self { host, results, db }
    }

    /// Load the host library from `path` and wrap the raw database pointer.
    pub fn load(path: impl AsRef<Path>, db: *mut c_void) -> Result<Self> {
        let db = RawHandle::from_ptr(db)
            .ok_or_else(|| NowdbError::InvalidArgument("database handle is null".to_string()))?;
        let host = Arc::new(NativeHost::load(path)?);
        Ok(Self::new(host, db))
    }

    pub fn db(&self) -> RawHandle {
        self.db
    }

    /// Run a statement against the procedure's database.
    pub fn execute(&self, statement: &str) -> Result<QueryResult> {
        let stmt = CString::new(statement)?;
        tracing::debug!(statement, "procedure execute");
        let res = self
            .host
            .execute(self.db, &stmt)
            .map_err(|code| NowdbError::Server {
                code,
                details: codes::name(code).to_string(),
            })?;
        Ok(self.result(res))
    }

    /// Take over a raw engine result.
    pub fn wrap(&self, raw: RawHandle) -> Result<QueryResult> {
        let res = self.host.wrap(raw).ok_or_else(|| no_result("wrap"))?;
        Ok(self.result(res))
    }

    pub fn success(&self) -> Result<QueryResult> {
        let res = self.host.make_success().ok_or_else(|| no_result("success"))?;
        Ok(self.result(res))
    }

    pub fn error(&self, code: i32, message: &str) -> Result<QueryResult> {
        let message = CString::new(message)?;
        let res = self
            .host
            .make_error(code, &message)
            .ok_or_else(|| no_result("error"))?;
        Ok(self.result(res))
    }

    pub fn report(&self, affected: u64, errors: u64, runtime: u64) -> Result<QueryResult> {
        let report = Report {
            affected,
            errors,
            runtime,
        };
        let res = self
            .host
            .make_report(report)
            .ok_or_else(|| no_result("report"))?;
        Ok(self.result(res))
    }

    /// Start building a row result.
    pub fn row(&self) -> Result<RowBuilder> {
        let res = self.host.make_row().ok_or_else(|| no_result("row"))?;
        Ok(RowBuilder::new(Arc::clone(&self.host), self.result(res)))
    }

    fn result(&self, handle: RawHandle) -> QueryResult {
        QueryResult::new(Arc::clone(&self.results), handle, None)
    }
}

fn no_result(what: &str) -> NowdbError {
    NowdbError::Server {
        code: codes::NO_MEM,
        details: format!("cannot create {what} result"),
    }
}
