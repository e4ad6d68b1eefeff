//! DB-API cursors.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::codes;
use crate::connection::Connection;
use crate::cursor::Cursor;
use crate::result::{QueryResult, Row};
use crate::types::{ResultKind, Value};

use super::error::{DbApiError, DbResult};
use super::parse::{self, Columns};
use super::TYPE_CODE_UNKNOWN;

/// How fetched rows are shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowFormat {
    /// Column name to value.
    #[default]
    Dict,
    Tuple,
    List,
}

/// One entry of a cursor description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub type_code: i32,
}

impl Column {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: TYPE_CODE_UNKNOWN,
        }
    }
}

/// A fetched row in the cursor's row format.
#[derive(Debug, Clone, PartialEq)]
pub enum DbRow {
    Dict(Vec<(String, Value)>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
}

impl DbRow {
    /// Value of the column `name`. Only dictionaries have names.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            DbRow::Dict(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn at(&self, idx: usize) -> Option<&Value> {
        match self {
            DbRow::Dict(fields) => fields.get(idx).map(|(_, v)| v),
            DbRow::Tuple(values) | DbRow::List(values) => values.get(idx),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DbRow::Dict(fields) => fields.len(),
            DbRow::Tuple(values) | DbRow::List(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            DbRow::Dict(fields) => fields.into_iter().map(|(_, v)| v).collect(),
            DbRow::Tuple(values) | DbRow::List(values) => values,
        }
    }
}

impl Serialize for DbRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DbRow::Dict(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            DbRow::Tuple(values) | DbRow::List(values) => serializer.collect_seq(values),
        }
    }
}

/// A DB-API cursor.
pub struct DbCursor {
    con: Connection,
    rows: Option<Cursor>,
    executed: bool,
    description: Option<Vec<Column>>,
    rowcount: i64,
    /// Default number of rows for [`DbCursor::fetchmany`].
    pub arraysize: usize,
    format: RowFormat,
}

impl DbCursor {
    pub(crate) fn new(con: Connection) -> Self {
        Self {
            con,
            rows: None,
            executed: false,
            description: None,
            rowcount: -1,
            arraysize: 1,
            format: RowFormat::Dict,
        }
    }

    /// Columns of the last select, `None` if the statement returns no rows.
    pub fn description(&self) -> Option<&[Column]> {
        self.description.as_deref()
    }

    /// Rows fetched so far or rows affected by the last statement; `-1`
    /// if unknown.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    pub fn row_format(&self) -> RowFormat {
        self.format
    }

    pub fn set_row_format(&mut self, format: RowFormat) {
        self.format = format;
    }

    /// Stored procedures are called with `exec`.
    pub fn callproc(&mut self, _name: &str, _params: &[Value]) -> DbResult<()> {
        Err(DbApiError::NotSupported(
            "callproc is not supported, use execute".to_string(),
        ))
    }

    /// Release the current result. The cursor can execute again.
    pub fn close(&mut self) {
        self.rows = None;
        self.executed = false;
        self.description = None;
        self.rowcount = -1;
    }

    /// Execute `op` with `params` substituted for its placeholders.
    pub fn execute(&mut self, op: &str, params: &[Value]) -> DbResult<()> {
        self.close();
        let sql = if params.is_empty() {
            op.to_string()
        } else {
            parse::substitute(op, params)?
        };

        let columns = self.describe(&sql)?;
        let res = self.con.execute(&sql).map_err(DbApiError::from)?;
        self.executed = true;

        if !res.is_ok() {
            if res.code() == codes::EOF {
                self.description = Some(columns);
                self.rowcount = 0;
                return Ok(());
            }
            return Err(DbApiError::from_server(res.code(), res.details()));
        }

        match res.kind() {
            ResultKind::Cursor | ResultKind::Row => {
                self.description = Some(columns);
                self.rows = Some(res.into_cursor());
            }
            ResultKind::Report => {
                let report = res.report()?;
                self.rowcount = i64::try_from(report.affected).unwrap_or(i64::MAX);
            }
            _ => {}
        }
        Ok(())
    }

    /// Execute `op` once per parameter set. Reports add up in `rowcount`;
    /// rows of the last statement can be fetched.
    pub fn executemany(&mut self, op: &str, seq: &[Vec<Value>]) -> DbResult<()> {
        let mut affected: Option<i64> = None;
        for params in seq {
            self.execute(op, params)?;
            if self.rows.is_none() && self.rowcount >= 0 {
                *affected.get_or_insert(0) += self.rowcount;
            }
        }
        if let Some(n) = affected {
            self.rowcount = n;
        }
        Ok(())
    }

    /// Next row, `None` when all rows have been fetched.
    pub fn fetchone(&mut self) -> DbResult<Option<DbRow>> {
        if !self.executed {
            return Err(DbApiError::Interface("not executed".to_string()));
        }
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        if self.rowcount < 0 {
            self.rowcount = 0;
        }
        match rows.next() {
            None => Ok(None),
            Some(Err(e)) => Err(DbApiError::from(e)),
            Some(Ok(row)) => {
                self.rowcount += 1;
                Ok(Some(self.shape(row)))
            }
        }
    }

    /// Up to `size` rows, `arraysize` by default.
    pub fn fetchmany(&mut self, size: Option<usize>) -> DbResult<Vec<DbRow>> {
        let size = size.unwrap_or(self.arraysize);
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            match self.fetchone()? {
                Some(row) => out.push(row),
                None => break,
            }
        }
        Ok(out)
    }

    pub fn fetchall(&mut self) -> DbResult<Vec<DbRow>> {
        let mut out = Vec::new();
        while let Some(row) = self.fetchone()? {
            out.push(row);
        }
        Ok(out)
    }

    /// Column names of a select, asking the server for `SELECT *`.
    fn describe(&self, sql: &str) -> DbResult<Vec<Column>> {
        match parse::select_columns(sql) {
            Columns::Named(names) => Ok(names.into_iter().map(Column::named).collect()),
            Columns::Star { table } => {
                let res = self
                    .con
                    .execute(&format!("describe {table}"))
                    .map_err(|e| DbApiError::Database(e.to_string()))?;
                describe_fields(res)
            }
            Columns::Unknown => Ok(Vec::new()),
        }
    }

    fn shape(&self, row: Row) -> DbRow {
        match self.format {
            RowFormat::Tuple => DbRow::Tuple(row.into_vec()),
            RowFormat::List => DbRow::List(row.into_vec()),
            RowFormat::Dict => {
                let columns = self.description.as_deref().unwrap_or(&[]);
                DbRow::Dict(
                    row.into_iter()
                        .enumerate()
                        .map(|(i, v)| {
                            let name = columns
                                .get(i)
                                .map_or_else(|| format!("col{i}"), |c| c.name.clone());
                            (name, v)
                        })
                        .collect(),
                )
            }
        }
    }
}

/// The first field of every row of a `describe` result names a column.
fn describe_fields(res: QueryResult) -> DbResult<Vec<Column>> {
    if !res.is_ok() {
        return Err(DbApiError::Database(res.details()));
    }
    let mut columns = Vec::new();
    for row in res {
        let row = row.map_err(|e| DbApiError::Database(e.to_string()))?;
        let name = match row.get(0) {
            Some(Value::Text(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => continue,
        };
        columns.push(Column::named(name));
    }
    Ok(columns)
}

impl Iterator for DbCursor {
    type Item = DbResult<DbRow>;

    fn next(&mut self) -> Option<DbResult<DbRow>> {
        self.fetchone().transpose()
    }
}
