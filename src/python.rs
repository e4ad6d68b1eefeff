//! Python DB-API module `nowdb`.

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use pyo3::IntoPyObjectExt;

use crate::dbapi::{self, DbApiError, DbConnection, DbCursor, DbRow, RowFormat};
use crate::types::Value;

create_exception!(nowdb, Warning, PyException);
create_exception!(nowdb, Error, PyException);
create_exception!(nowdb, InterfaceError, Error);
create_exception!(nowdb, DatabaseError, Error);
create_exception!(nowdb, DataError, DatabaseError);
create_exception!(nowdb, OperationalError, DatabaseError);
create_exception!(nowdb, IntegrityError, DatabaseError);
create_exception!(nowdb, InternalError, DatabaseError);
create_exception!(nowdb, ProgrammingError, DatabaseError);
create_exception!(nowdb, NotSupportedError, DatabaseError);

const DICTROW: u8 = 1;
const TUPLEROW: u8 = 2;
const LISTROW: u8 = 3;

fn to_py_err(err: DbApiError) -> PyErr {
    let message = err.message().to_string();
    match err {
        DbApiError::Warning(_) => Warning::new_err(message),
        DbApiError::Interface(_) => InterfaceError::new_err(message),
        DbApiError::Database(_) => DatabaseError::new_err(message),
        DbApiError::Data(_) => DataError::new_err(message),
        DbApiError::Operational(_) => OperationalError::new_err(message),
        DbApiError::Integrity(_) => IntegrityError::new_err(message),
        DbApiError::Internal(_) => InternalError::new_err(message),
        DbApiError::Programming(_) => ProgrammingError::new_err(message),
        DbApiError::NotSupported(_) => NotSupportedError::new_err(message),
    }
}

fn row_format(code: u8) -> PyResult<RowFormat> {
    match code {
        DICTROW => Ok(RowFormat::Dict),
        TUPLEROW => Ok(RowFormat::Tuple),
        LISTROW => Ok(RowFormat::List),
        other => Err(ProgrammingError::new_err(format!("unknown row format {other}"))),
    }
}

/// DATE and TIME travel as their canonical strings.
fn value_to_py(py: Python<'_>, val: Value) -> PyResult<PyObject> {
    match val {
        Value::Null => Ok(py.None()),
        Value::Bool(b) => b.into_py_any(py),
        Value::Int(i) => i.into_py_any(py),
        Value::UInt(u) => u.into_py_any(py),
        Value::Float(f) => f.into_py_any(py),
        Value::Text(s) => s.into_py_any(py),
        other @ (Value::Date(_) | Value::Time(_)) => other.to_string().into_py_any(py),
    }
}

fn row_to_py(py: Python<'_>, row: DbRow) -> PyResult<PyObject> {
    match row {
        DbRow::Dict(fields) => {
            let dict = PyDict::new(py);
            for (name, value) in fields {
                dict.set_item(name, value_to_py(py, value)?)?;
            }
            dict.into_py_any(py)
        }
        DbRow::Tuple(values) => {
            let items = values
                .into_iter()
                .map(|v| value_to_py(py, v))
                .collect::<PyResult<Vec<_>>>()?;
            PyTuple::new(py, items)?.into_py_any(py)
        }
        DbRow::List(values) => {
            let items = values
                .into_iter()
                .map(|v| value_to_py(py, v))
                .collect::<PyResult<Vec<_>>>()?;
            PyList::new(py, items)?.into_py_any(py)
        }
    }
}

fn rows_to_py(py: Python<'_>, rows: Vec<DbRow>) -> PyResult<PyObject> {
    let items = rows
        .into_iter()
        .map(|r| row_to_py(py, r))
        .collect::<PyResult<Vec<_>>>()?;
    PyList::new(py, items)?.into_py_any(py)
}

/// Convert query parameters with type dispatch. `bool` is checked before
/// `int` since it is a subclass.
fn py_to_value(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    if obj.is_none() {
        Ok(Value::Null)
    } else if obj.is_instance_of::<PyBool>() {
        Ok(Value::Bool(obj.extract()?))
    } else if obj.is_instance_of::<PyInt>() {
        match obj.extract::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => Ok(Value::UInt(obj.extract()?)),
        }
    } else if obj.is_instance_of::<PyFloat>() {
        Ok(Value::Float(obj.extract()?))
    } else if obj.is_instance_of::<PyString>() {
        Ok(Value::Text(obj.extract()?))
    } else {
        Ok(Value::Text(obj.str()?.to_string()))
    }
}

fn py_params(params: Option<&Bound<'_, PyAny>>) -> PyResult<Vec<Value>> {
    match params {
        None => Ok(Vec::new()),
        Some(p) if p.is_none() => Ok(Vec::new()),
        Some(p) => p.try_iter()?.map(|item| py_to_value(&item?)).collect(),
    }
}

/// Connect to `host:port` and use `db`.
#[pyfunction]
#[pyo3(signature = (host, port, db, user=None, password=None))]
fn connect(
    host: &str,
    port: u16,
    db: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> PyResult<Connection> {
    let con = dbapi::connect(host, port, db, user, password).map_err(to_py_err)?;
    Ok(Connection { con })
}

#[pyclass(unsendable)]
pub struct Connection {
    con: DbConnection,
}

#[pymethods]
impl Connection {
    fn close(&self) -> PyResult<()> {
        self.con.close().map_err(to_py_err)
    }

    fn commit(&self) -> PyResult<()> {
        self.con.commit().map_err(to_py_err)
    }

    fn rollback(&self) -> PyResult<()> {
        self.con.rollback().map_err(to_py_err)
    }

    fn cursor(&self) -> PyResult<Cursor> {
        let cur = self.con.cursor().map_err(to_py_err)?;
        Ok(Cursor { cur })
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc=None, _tb=None))]
    fn __exit__(
        &self,
        _exc_type: Option<&Bound<'_, PyAny>>,
        _exc: Option<&Bound<'_, PyAny>>,
        _tb: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<bool> {
        self.close()?;
        Ok(false)
    }
}

#[pyclass(unsendable)]
pub struct Cursor {
    cur: DbCursor,
}

#[pymethods]
impl Cursor {
    /// `(name, type_code)` pairs of the last select.
    #[getter]
    fn description<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyList>>> {
        let Some(columns) = self.cur.description() else {
            return Ok(None);
        };
        let items = columns
            .iter()
            .map(|c| PyTuple::new(py, [c.name.as_str().into_py_any(py)?, c.type_code.into_py_any(py)?]))
            .collect::<PyResult<Vec<_>>>()?;
        Ok(Some(PyList::new(py, items)?))
    }

    #[getter]
    fn rowcount(&self) -> i64 {
        self.cur.rowcount()
    }

    #[getter]
    fn arraysize(&self) -> usize {
        self.cur.arraysize
    }

    #[setter]
    fn set_arraysize(&mut self, size: usize) {
        self.cur.arraysize = size;
    }

    #[pyo3(name = "setRowFormat")]
    fn set_row_format(&mut self, format: u8) -> PyResult<()> {
        self.cur.set_row_format(row_format(format)?);
        Ok(())
    }

    fn callproc(&mut self, name: &str) -> PyResult<()> {
        self.cur.callproc(name, &[]).map_err(to_py_err)
    }

    fn close(&mut self) {
        self.cur.close();
    }

    /// Execute `operation`; returns the cursor so rows can be iterated
    /// directly.
    #[pyo3(signature = (operation, parameters=None, rowformat=None))]
    fn execute<'py>(
        mut slf: PyRefMut<'py, Self>,
        operation: &str,
        parameters: Option<&Bound<'py, PyAny>>,
        rowformat: Option<u8>,
    ) -> PyResult<PyRefMut<'py, Self>> {
        if let Some(format) = rowformat {
            slf.cur.set_row_format(row_format(format)?);
        }
        let params = py_params(parameters)?;
        slf.cur.execute(operation, &params).map_err(to_py_err)?;
        Ok(slf)
    }

    fn executemany(&mut self, operation: &str, seq_of_parameters: &Bound<'_, PyAny>) -> PyResult<()> {
        let seq = seq_of_parameters
            .try_iter()?
            .map(|params| py_params(Some(&params?)))
            .collect::<PyResult<Vec<_>>>()?;
        self.cur.executemany(operation, &seq).map_err(to_py_err)
    }

    fn fetchone(&mut self, py: Python<'_>) -> PyResult<Option<PyObject>> {
        self.cur
            .fetchone()
            .map_err(to_py_err)?
            .map(|row| row_to_py(py, row))
            .transpose()
    }

    #[pyo3(signature = (size=None))]
    fn fetchmany(&mut self, py: Python<'_>, size: Option<usize>) -> PyResult<PyObject> {
        let rows = self.cur.fetchmany(size).map_err(to_py_err)?;
        rows_to_py(py, rows)
    }

    fn fetchall(&mut self, py: Python<'_>) -> PyResult<PyObject> {
        let rows = self.cur.fetchall().map_err(to_py_err)?;
        rows_to_py(py, rows)
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self, py: Python<'_>) -> PyResult<Option<PyObject>> {
        self.fetchone(py)
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc=None, _tb=None))]
    fn __exit__(
        &mut self,
        _exc_type: Option<&Bound<'_, PyAny>>,
        _exc: Option<&Bound<'_, PyAny>>,
        _tb: Option<&Bound<'_, PyAny>>,
    ) -> bool {
        self.cur.close();
        false
    }
}

/// NoWDB client, Python DB API 2.0
#[pymodule]
fn nowdb(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add("apilevel", dbapi::APILEVEL)?;
    m.add("threadsafety", dbapi::THREADSAFETY)?;
    m.add("paramstyle", dbapi::PARAMSTYLE)?;
    m.add("dictrow", DICTROW)?;
    m.add("tuplerow", TUPLEROW)?;
    m.add("listrow", LISTROW)?;

    m.add("Warning", py.get_type::<Warning>())?;
    m.add("Error", py.get_type::<Error>())?;
    m.add("InterfaceError", py.get_type::<InterfaceError>())?;
    m.add("DatabaseError", py.get_type::<DatabaseError>())?;
    m.add("DataError", py.get_type::<DataError>())?;
    m.add("OperationalError", py.get_type::<OperationalError>())?;
    m.add("IntegrityError", py.get_type::<IntegrityError>())?;
    m.add("InternalError", py.get_type::<InternalError>())?;
    m.add("ProgrammingError", py.get_type::<ProgrammingError>())?;
    m.add("NotSupportedError", py.get_type::<NotSupportedError>())?;

    m.add_function(wrap_pyfunction!(connect, m)?)?;
    m.add_class::<Connection>()?;
    m.add_class::<Cursor>()?;
    Ok(())
}
