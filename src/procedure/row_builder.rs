//! Row results built inside a procedure.

use std::sync::Arc;

use crate::error::{NowdbError, Result};
use crate::native::HostApi;
use crate::result::QueryResult;
use crate::types::Value;

/// Bytes a value needs in a row buffer, counting its type byte and the
/// end-of-row marker that must still fit after it.
pub fn required_capacity(value: &Value) -> i32 {
    match value {
        Value::Null | Value::Bool(_) => 3,
        Value::Text(s) => i32::try_from(s.len()).map_or(i32::MAX, |n| n.saturating_add(4)),
        _ => 10,
    }
}

/// Appends values to a row result.
pub struct RowBuilder {
    host: Arc<dyn HostApi>,
    result: QueryResult,
}

impl RowBuilder {
    pub(crate) fn new(host: Arc<dyn HostApi>, result: QueryResult) -> Self {
        Self { host, result }
    }

    /// Bytes left in the row buffer.
    pub fn capacity(&self) -> i32 {
        self.host.row_capacity(self.result.as_raw())
    }

    /// True if `value` can still be added.
    pub fn fits(&self, value: &Value) -> bool {
        let capacity = self.capacity();
        capacity > 0 && capacity >= required_capacity(value)
    }

    /// Add one value to the current row.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.fits(&value) {
            return Err(NowdbError::RowFull(format!(
                "no room for a {} value ({} bytes left)",
                value.value_type().name(),
                self.capacity()
            )));
        }
        let rc = self.host.add_to_row(self.result.as_raw(), &value);
        if rc != 0 {
            return Err(NowdbError::Server {
                code: rc,
                details: format!("cannot add {} value to row", value.value_type().name()),
            });
        }
        Ok(())
    }

    /// Terminate the current row.
    pub fn close_row(&mut self) -> Result<()> {
        let rc = self.host.close_row(self.result.as_raw());
        if rc != 0 {
            return Err(NowdbError::RowFull(format!("cannot close row (code {rc})")));
        }
        Ok(())
    }

    /// The row result, ready to be handed back to the server.
    pub fn finish(self) -> QueryResult {
        self.result
    }
}
