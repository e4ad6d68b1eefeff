//! Scripted in-memory server used by the tests.
//!
//! `MockServer` implements both library traits. Statements are answered from
//! a script; every handle it hands out is tracked so tests can check that
//! each one is released exactly once and never used afterwards.

use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;

use parking_lot::Mutex;

use crate::codes;
use crate::native::{ClientApi, HostApi, RawHandle, ResultApi};
use crate::types::{Report, ResultKind, Value};

pub type Batch = Vec<Vec<Value>>;

/// Scripted reply to a statement.
#[derive(Debug, Clone)]
pub enum Reply {
    Status,
    Error { code: i32, details: String },
    Report(Report),
    /// A single row result.
    Row(Vec<Value>),
    /// A cursor delivering these batches.
    Cursor(Vec<Batch>),
    /// A cursor whose fetch number `at` (counting from 0) fails.
    FailingCursor {
        batches: Vec<Batch>,
        at: usize,
        code: i32,
    },
    /// The native execute call itself fails with this client code.
    SendFailure(i32),
}

#[derive(Debug)]
enum Object {
    Connection,
    Result {
        kind: ResultKind,
        ok: bool,
        code: i32,
        details: Option<String>,
        report: Report,
    },
    Cursor {
        current: Option<Batch>,
        pending: VecDeque<Batch>,
        fail_at: Option<(usize, i32)>,
        fetches: usize,
        ok: bool,
        code: i32,
        eof: bool,
    },
    Batch {
        rows: Batch,
        pos: usize,
    },
    Built {
        capacity: i32,
        rows: Batch,
        current: Vec<Value>,
    },
}

#[derive(Debug, Default)]
struct State {
    next_token: usize,
    objects: HashMap<usize, Object>,
    released: Vec<usize>,
    misuse: Vec<String>,
    executed: Vec<String>,
    script: HashMap<String, Reply>,
    connect_failure: Option<i32>,
    row_capacity: i32,
    fetches: usize,
    closes: usize,
}

impl State {
    fn alloc(&mut self, object: Object) -> RawHandle {
        self.next_token += 1;
        let token = self.next_token;
        self.objects.insert(token, object);
        // tokens start above zero
        RawHandle::from_token(token).expect("tokens are non-zero")
    }

    fn get(&mut self, h: RawHandle, op: &str) -> Option<&mut Object> {
        let token = h.token();
        if !self.objects.contains_key(&token) {
            let what = if self.released.contains(&token) {
                "released"
            } else {
                "unknown"
            };
            self.misuse.push(format!("{op} on {what} handle {token}"));
            return None;
        }
        self.objects.get_mut(&token)
    }

    fn reply(&mut self, statement: &str) -> std::result::Result<RawHandle, i32> {
        self.executed.push(statement.to_string());
        let reply = self.script.get(statement).cloned().unwrap_or(Reply::Error {
            code: codes::PARSER,
            details: format!("cannot parse '{statement}'"),
        });
        Ok(match reply {
            Reply::SendFailure(code) => return Err(code),
            Reply::Status => self.alloc(Object::Result {
                kind: ResultKind::Status,
                ok: true,
                code: codes::OK,
                details: None,
                report: Report::default(),
            }),
            Reply::Error { code, details } => self.alloc(Object::Result {
                kind: ResultKind::Status,
                ok: false,
                code,
                details: Some(details),
                report: Report::default(),
            }),
            Reply::Report(report) => self.alloc(Object::Result {
                kind: ResultKind::Report,
                ok: true,
                code: codes::OK,
                details: None,
                report,
            }),
            Reply::Row(values) => self.alloc(Object::Built {
                capacity: 0,
                rows: vec![values],
                current: Vec::new(),
            }),
            Reply::Cursor(batches) => self.cursor(batches, None),
            Reply::FailingCursor { batches, at, code } => self.cursor(batches, Some((at, code))),
        })
    }

    fn cursor(&mut self, batches: Vec<Batch>, fail_at: Option<(usize, i32)>) -> RawHandle {
        let mut pending: VecDeque<Batch> = batches.into();
        // the first batch arrives with the reply
        let current = pending.pop_front();
        let empty = current.is_none();
        self.alloc(Object::Cursor {
            current,
            pending,
            fail_at,
            fetches: 0,
            ok: !empty,
            code: if empty { codes::EOF } else { codes::OK },
            eof: empty,
        })
    }
}

/// The scripted server.
#[derive(Debug)]
pub struct MockServer {
    state: Mutex<State>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                row_capacity: 8192,
                ..State::default()
            }),
        }
    }

    /// Answer `statement` with `reply`.
    pub fn on(&self, statement: &str, reply: Reply) -> &Self {
        self.state.lock().script.insert(statement.to_string(), reply);
        self
    }

    pub fn fail_connect(&self, code: i32) {
        self.state.lock().connect_failure = Some(code);
    }

    /// Capacity of rows built with `make_row`.
    pub fn set_row_capacity(&self, capacity: i32) {
        self.state.lock().row_capacity = capacity;
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    /// Handles still alive, connections excluded.
    pub fn live(&self) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|o| !matches!(o, Object::Connection))
            .count()
    }

    pub fn open_connections(&self) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|o| matches!(o, Object::Connection))
            .count()
    }

    /// Calls on released or unknown handles, and double releases.
    pub fn misuse(&self) -> Vec<String> {
        self.state.lock().misuse.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().fetches
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Rows appended to a row result built by a procedure.
    pub fn built_rows(&self, h: RawHandle) -> Vec<Vec<Value>> {
        match self.state.lock().objects.get(&h.token()) {
            Some(Object::Built { rows, .. }) => rows.clone(),
            _ => Vec::new(),
        }
    }

    fn execute_statement(&self, statement: &CStr) -> std::result::Result<RawHandle, i32> {
        let statement = statement.to_string_lossy();
        self.state.lock().reply(&statement)
    }
}

/// Bytes a value takes in a built row: type byte plus payload.
fn encoded_size(value: &Value) -> i32 {
    match value {
        Value::Null => 1,
        Value::Bool(_) => 2,
        Value::Text(s) => s.len() as i32 + 2,
        _ => 9,
    }
}

impl ResultApi for MockServer {
    fn result_kind(&self, res: RawHandle) -> i32 {
        let mut state = self.state.lock();
        match state.get(res, "result_kind") {
            Some(Object::Result { kind, .. }) => kind.tag(),
            Some(Object::Cursor { .. }) => ResultKind::CURSOR_TAG,
            Some(Object::Batch { .. } | Object::Built { .. }) => ResultKind::ROW_TAG,
            _ => 0,
        }
    }

    fn result_ok(&self, res: RawHandle) -> bool {
        let mut state = self.state.lock();
        match state.get(res, "result_ok") {
            Some(Object::Result { ok, .. } | Object::Cursor { ok, .. }) => *ok,
            Some(_) => true,
            None => false,
        }
    }

    fn result_errcode(&self, res: RawHandle) -> i32 {
        let mut state = self.state.lock();
        match state.get(res, "result_errcode") {
            Some(Object::Result { code, .. } | Object::Cursor { code, .. }) => *code,
            _ => codes::OK,
        }
    }

    fn result_details(&self, res: RawHandle) -> Option<String> {
        let mut state = self.state.lock();
        match state.get(res, "result_details") {
            Some(Object::Result { details, .. }) => details.clone(),
            Some(Object::Cursor { ok: false, code, .. }) => Some(codes::name(*code).to_string()),
            _ => None,
        }
    }

    fn result_report(&self, res: RawHandle) -> Report {
        let mut state = self.state.lock();
        match state.get(res, "result_report") {
            Some(Object::Result { report, .. }) => *report,
            _ => Report::default(),
        }
    }

    fn result_eof(&self, res: RawHandle) -> bool {
        let mut state = self.state.lock();
        matches!(state.get(res, "result_eof"), Some(Object::Cursor { eof: true, .. }))
    }

    fn release(&self, res: RawHandle, _kind: ResultKind) {
        let mut state = self.state.lock();
        let token = res.token();
        if state.objects.remove(&token).is_some() {
            state.released.push(token);
        } else if state.released.contains(&token) {
            state.misuse.push(format!("double release of handle {token}"));
        } else {
            state.misuse.push(format!("release of unknown handle {token}"));
        }
    }

    fn cursor_open(&self, cur: RawHandle) -> i32 {
        let mut state = self.state.lock();
        match state.get(cur, "cursor_open") {
            Some(Object::Cursor { ok: false, code, .. }) => *code,
            Some(Object::Cursor { .. }) => codes::OK,
            _ => codes::INVALID,
        }
    }

    fn cursor_fetch(&self, cur: RawHandle) -> i32 {
        let mut state = self.state.lock();
        state.fetches += 1;
        let Some(Object::Cursor {
            current,
            pending,
            fail_at,
            fetches,
            ok,
            code,
            eof,
        }) = state.get(cur, "cursor_fetch")
        else {
            return codes::INVALID;
        };
        let n = *fetches;
        *fetches += 1;
        if let Some((at, fail)) = *fail_at {
            if n == at {
                *current = None;
                *ok = false;
                *code = fail;
                return fail;
            }
        }
        match pending.pop_front() {
            Some(batch) => {
                *current = Some(batch);
                codes::OK
            }
            None => {
                *current = None;
                *ok = false;
                *code = codes::EOF;
                *eof = true;
                codes::EOF
            }
        }
    }

    fn cursor_row(&self, cur: RawHandle) -> Option<RawHandle> {
        let mut state = self.state.lock();
        let rows = match state.get(cur, "cursor_row") {
            Some(Object::Cursor {
                current: Some(batch),
                ..
            }) => batch.clone(),
            _ => return None,
        };
        Some(state.alloc(Object::Batch { rows, pos: 0 }))
    }

    fn row_copy(&self, row: RawHandle) -> Option<RawHandle> {
        let mut state = self.state.lock();
        let rows = match state.get(row, "row_copy") {
            Some(Object::Batch { rows, .. } | Object::Built { rows, .. }) => rows.clone(),
            _ => return None,
        };
        Some(state.alloc(Object::Batch { rows, pos: 0 }))
    }

    fn row_next(&self, row: RawHandle) -> bool {
        let mut state = self.state.lock();
        match state.get(row, "row_next") {
            Some(Object::Batch { rows, pos }) => {
                *pos += 1;
                *pos < rows.len()
            }
            _ => false,
        }
    }

    fn row_count(&self, row: RawHandle) -> usize {
        let mut state = self.state.lock();
        match state.get(row, "row_count") {
            Some(Object::Batch { rows, pos }) => rows.get(*pos).map_or(0, Vec::len),
            _ => 0,
        }
    }

    fn row_field(&self, row: RawHandle, idx: usize) -> Value {
        let mut state = self.state.lock();
        match state.get(row, "row_field") {
            Some(Object::Batch { rows, pos }) => rows
                .get(*pos)
                .and_then(|r| r.get(idx))
                .cloned()
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

impl ClientApi for MockServer {
    fn explain(&self, code: i32) -> String {
        match code {
            codes::client::NOCON => "no connection".to_string(),
            codes::client::NOREAD => "cannot read from socket".to_string(),
            codes::client::NOWRITE => "cannot write to socket".to_string(),
            _ => format!("client error {code}"),
        }
    }

    fn connect(
        &self,
        _host: &CStr,
        _port: u16,
        _user: Option<&CStr>,
        _password: Option<&CStr>,
        _flags: i32,
    ) -> std::result::Result<RawHandle, i32> {
        let mut state = self.state.lock();
        if let Some(code) = state.connect_failure {
            return Err(code);
        }
        Ok(state.alloc(Object::Connection))
    }

    fn close(&self, con: RawHandle) -> i32 {
        let mut state = self.state.lock();
        state.closes += 1;
        let token = con.token();
        match state.objects.remove(&token) {
            Some(Object::Connection) => {
                state.released.push(token);
                codes::client::OK
            }
            _ => {
                state.misuse.push(format!("close of invalid connection {token}"));
                codes::client::NOCON
            }
        }
    }

    fn destroy(&self, con: RawHandle) {
        let mut state = self.state.lock();
        let token = con.token();
        if state.objects.remove(&token).is_some() {
            state.released.push(token);
        }
    }

    fn execute(&self, con: RawHandle, statement: &CStr) -> std::result::Result<RawHandle, i32> {
        {
            let mut state = self.state.lock();
            if !matches!(state.get(con, "execute"), Some(Object::Connection)) {
                return Err(codes::client::NOCON);
            }
        }
        self.execute_statement(statement)
    }
}

impl HostApi for MockServer {
    fn execute(&self, _db: RawHandle, statement: &CStr) -> std::result::Result<RawHandle, i32> {
        self.execute_statement(statement)
    }

    fn wrap(&self, raw: RawHandle) -> Option<RawHandle> {
        // the wrapped result takes the raw one over
        let mut state = self.state.lock();
        let object = state.objects.remove(&raw.token())?;
        state.released.push(raw.token());
        Some(state.alloc(object))
    }

    fn make_success(&self) -> Option<RawHandle> {
        Some(self.state.lock().alloc(Object::Result {
            kind: ResultKind::Status,
            ok: true,
            code: codes::OK,
            details: None,
            report: Report::default(),
        }))
    }

    fn make_error(&self, code: i32, message: &CStr) -> Option<RawHandle> {
        Some(self.state.lock().alloc(Object::Result {
            kind: ResultKind::Status,
            ok: false,
            code,
            details: Some(message.to_string_lossy().into_owned()),
            report: Report::default(),
        }))
    }

    fn make_report(&self, report: Report) -> Option<RawHandle> {
        Some(self.state.lock().alloc(Object::Result {
            kind: ResultKind::Report,
            ok: true,
            code: codes::OK,
            details: None,
            report,
        }))
    }

    fn make_row(&self) -> Option<RawHandle> {
        let mut state = self.state.lock();
        let capacity = state.row_capacity;
        Some(state.alloc(Object::Built {
            capacity,
            rows: Vec::new(),
            current: Vec::new(),
        }))
    }

    fn row_capacity(&self, row: RawHandle) -> i32 {
        let mut state = self.state.lock();
        match state.get(row, "row_capacity") {
            Some(Object::Built { capacity, .. }) => *capacity,
            _ => 0,
        }
    }

    fn add_to_row(&self, row: RawHandle, value: &Value) -> i32 {
        let mut state = self.state.lock();
        match state.get(row, "add_to_row") {
            Some(Object::Built {
                capacity, current, ..
            }) => {
                let size = encoded_size(value);
                if size >= *capacity {
                    return codes::TOO_BIG;
                }
                *capacity -= size;
                current.push(value.clone());
                codes::OK
            }
            _ => codes::INVALID,
        }
    }

    fn close_row(&self, row: RawHandle) -> i32 {
        let mut state = self.state.lock();
        match state.get(row, "close_row") {
            Some(Object::Built {
                capacity,
                rows,
                current,
            }) => {
                if *capacity < 1 {
                    return codes::TOO_BIG;
                }
                *capacity -= 1;
                rows.push(std::mem::take(current));
                codes::OK
            }
            _ => codes::INVALID,
        }
    }
}
