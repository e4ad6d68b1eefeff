//! Results, row batches and rows.
//!
//! A [`QueryResult`] owns one native result handle and releases it when
//! dropped. Rows are read through [`RowBatch`], an owned copy of the batch a
//! cursor currently holds; a batch is released on its own, independently of
//! the result it was copied from.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;

use crate::codes;
use crate::connection::Session;
use crate::cursor::Cursor;
use crate::error::{NowdbError, Result};
use crate::native::{RawHandle, ResultApi};
use crate::types::{Report, ResultKind, Value};

/// Text used when a failed result carries no details.
const NO_DETAILS: &str = "cannot obtain error message";

// ============================================================================
// QueryResult
// ============================================================================

/// Outcome of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// A new batch is available.
    Batch,
    /// The server has no more data.
    Eof,
}

/// A result returned by the server.
pub struct QueryResult {
    api: Arc<dyn ResultApi>,
    handle: RawHandle,
    kind: OnceCell<ResultKind>,
    /// Connection the result talks to when fetching; `None` inside a
    /// stored procedure.
    session: Option<Arc<Session>>,
    owned: bool,
}

impl QueryResult {
    pub(crate) fn new(
        api: Arc<dyn ResultApi>,
        handle: RawHandle,
        session: Option<Arc<Session>>,
    ) -> Self {
        Self {
            api,
            handle,
            kind: OnceCell::new(),
            session,
            owned: true,
        }
    }

    /// Result kind. Read from the library on first use.
    pub fn kind(&self) -> ResultKind {
        *self
            .kind
            .get_or_init(|| ResultKind::from_tag(self.api.result_kind(self.handle)))
    }

    /// True if the result carries no error.
    pub fn is_ok(&self) -> bool {
        self.api.result_ok(self.handle)
    }

    /// Server error code, `codes::OK` for successful results.
    pub fn code(&self) -> i32 {
        self.api.result_errcode(self.handle)
    }

    pub fn details(&self) -> String {
        self.api
            .result_details(self.handle)
            .unwrap_or_else(|| NO_DETAILS.to_string())
    }

    /// True if a cursor has delivered all of its data.
    pub fn eof(&self) -> bool {
        self.api.result_eof(self.handle)
    }

    /// The server error this result carries.
    pub fn error(&self) -> NowdbError {
        NowdbError::Server {
            code: self.code(),
            details: self.details(),
        }
    }

    /// Fail if the result carries an error. End of data is not an error.
    pub fn check(&self) -> Result<()> {
        if self.is_ok() {
            return Ok(());
        }
        let code = self.code();
        if code == codes::EOF {
            return Ok(());
        }
        Err(NowdbError::Server {
            code,
            details: self.details(),
        })
    }

    /// Counters of a REPORT result.
    pub fn report(&self) -> Result<Report> {
        match self.kind() {
            ResultKind::Report => Ok(self.api.result_report(self.handle)),
            other => Err(NowdbError::WrongType(format!(
                "result is {other}, not a report"
            ))),
        }
    }

    /// Copy the current row batch.
    pub fn row(&self) -> Result<RowBatch> {
        let batch = match self.kind() {
            ResultKind::Cursor => self.api.cursor_row(self.handle),
            ResultKind::Row => self.api.row_copy(self.handle),
            other => {
                return Err(NowdbError::WrongType(format!(
                    "result is {other}, not a cursor nor a row"
                )))
            }
        };
        match batch {
            Some(handle) => Ok(RowBatch::new(Arc::clone(&self.api), handle)),
            None => Err(self.error()),
        }
    }

    /// Materialize the first batch of a cursor. A row result is always
    /// ready.
    pub fn open(&self) -> Result<Fetched> {
        match self.kind() {
            ResultKind::Cursor => {
                let rc = self.on_connection(|api, h| api.cursor_open(h))?;
                self.classify(rc, "open")
            }
            ResultKind::Row => Ok(Fetched::Batch),
            other => Err(NowdbError::WrongType(format!(
                "result is {other}, not a cursor"
            ))),
        }
    }

    /// Ask the server for the next batch of a cursor.
    pub fn fetch(&self) -> Result<Fetched> {
        match self.kind() {
            ResultKind::Cursor => {
                let rc = self.on_connection(|api, h| api.cursor_fetch(h))?;
                self.classify(rc, "fetch")
            }
            other => Err(NowdbError::WrongType(format!(
                "result is {other}, not a cursor"
            ))),
        }
    }

    /// Iterate over all rows, fetching batches as needed.
    pub fn into_cursor(self) -> Cursor {
        Cursor::new(self)
    }

    /// Give up ownership of the native handle. The caller must release it.
    pub fn into_raw(mut self) -> RawHandle {
        self.owned = false;
        self.handle
    }

    pub fn as_raw(&self) -> RawHandle {
        self.handle
    }

    /// Run a call that talks to the server, after checking the connection
    /// is still open. Calls on one connection are serialized.
    fn on_connection<T>(&self, f: impl FnOnce(&dyn ResultApi, RawHandle) -> T) -> Result<T> {
        match &self.session {
            Some(session) => {
                let con = session.lock();
                if con.is_none() {
                    return Err(NowdbError::ConnectionClosed);
                }
                Ok(f(self.api.as_ref(), self.handle))
            }
            None => Ok(f(self.api.as_ref(), self.handle)),
        }
    }

    fn classify(&self, rc: i32, op: &str) -> Result<Fetched> {
        let ok = self.is_ok();
        if rc == codes::OK && ok {
            tracing::debug!(op, "new batch");
            return Ok(Fetched::Batch);
        }
        if !ok {
            let code = self.code();
            if code == codes::EOF {
                tracing::debug!(op, "end of data");
                return Ok(Fetched::Eof);
            }
            return Err(NowdbError::Server {
                code,
                details: self.details(),
            });
        }
        if self.eof() {
            return Ok(Fetched::Eof);
        }
        let message = format!("cursor {op} failed");
        match self.session {
            Some(_) => Err(NowdbError::Client { code: rc, message }),
            // inside a procedure the code comes from the engine
            None => Err(NowdbError::Server {
                code: rc,
                details: message,
            }),
        }
    }
}

impl IntoIterator for QueryResult {
    type Item = Result<Row>;
    type IntoIter = Cursor;

    fn into_iter(self) -> Cursor {
        self.into_cursor()
    }
}

impl Drop for QueryResult {
    fn drop(&mut self) {
        if self.owned {
            let kind = self.kind();
            self.api.release(self.handle, kind);
        }
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("handle", &self.handle)
            .field("kind", &self.kind.get())
            .finish()
    }
}

// ============================================================================
// RowBatch
// ============================================================================

/// An owned copy of a batch of rows, positioned on one row.
pub struct RowBatch {
    api: Arc<dyn ResultApi>,
    handle: RawHandle,
}

impl RowBatch {
    fn new(api: Arc<dyn ResultApi>, handle: RawHandle) -> Self {
        Self { api, handle }
    }

    /// Move to the next row of the batch. False at the end of the batch,
    /// which is not necessarily the end of data.
    pub fn next_row(&mut self) -> bool {
        let more = self.api.row_next(self.handle);
        tracing::trace!(more, "next row");
        more
    }

    /// Number of fields of the current row.
    pub fn count(&self) -> usize {
        self.api.row_count(self.handle)
    }

    pub fn field(&self, idx: usize) -> Value {
        self.api.row_field(self.handle, idx)
    }

    /// Copy the current row out of the batch.
    pub fn to_row(&self) -> Row {
        let n = self.count();
        (0..n).map(|i| self.field(i)).collect()
    }
}

impl Drop for RowBatch {
    fn drop(&mut self) {
        self.api.release(self.handle, ResultKind::Row);
    }
}

impl fmt::Debug for RowBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowBatch").field("handle", &self.handle).finish()
    }
}

// ============================================================================
// Row
// ============================================================================

/// One row of decoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: SmallVec<[Value; 16]>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: SmallVec::from_vec(values),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values.into_vec()
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        &self.values[idx]
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = smallvec::IntoIter<[Value; 16]>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Fields separated by `;`.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_display() {
        let row = Row::new(vec![
            Value::Int(1),
            Value::Text("x".to_string()),
            Value::Null,
        ]);
        assert_eq!(row.to_string(), "1;x;NULL");
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], Value::Text("x".to_string()));
        assert_eq!(row.get(3), None);
    }

    #[test]
    fn test_row_serialize() {
        let row: Row = vec![Value::UInt(7), Value::Bool(false)].into_iter().collect();
        assert_eq!(serde_json::to_string(&row).unwrap(), "[7,false]");
    }

    #[test]
    fn test_empty_row() {
        let row = Row::default();
        assert!(row.is_empty());
        assert_eq!(row.to_string(), "");
    }
}
