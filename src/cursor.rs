//! Row iteration over cursor results.
//!
//! Rows come in batches. The cursor walks the current batch row by row and
//! asks the server for the next batch when the current one is exhausted,
//! until the server reports end of data.

use crate::codes;
use crate::error::{NowdbError, Result};
use crate::result::{Fetched, QueryResult, Row, RowBatch};
use crate::types::ResultKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Not opened yet.
    Pending,
    /// Positioned on a batch. `needs_next` is set once the current row has
    /// been handed out.
    Ready { needs_next: bool },
    Done,
}

/// Iterator over the rows of a cursor or row result.
///
/// Yields `Err` at most once; the iteration ends after an error.
pub struct Cursor {
    // Dropped before `result`: a batch never outlives its cursor.
    batch: Option<RowBatch>,
    result: QueryResult,
    state: State,
    rows: u64,
}

impl Cursor {
    pub(crate) fn new(result: QueryResult) -> Self {
        Self {
            batch: None,
            result,
            state: State::Pending,
            rows: 0,
        }
    }

    /// The result being iterated.
    pub fn result(&self) -> &QueryResult {
        &self.result
    }

    /// Rows handed out so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Open the result and position on its first batch. `Ok(false)` if
    /// there is no data at all.
    fn start(&mut self) -> Result<bool> {
        if !self.result.is_ok() {
            if self.result.code() == codes::EOF {
                return Ok(false);
            }
            return Err(self.result.error());
        }
        let kind = self.result.kind();
        if !kind.has_rows() {
            return Err(NowdbError::WrongType(format!(
                "result is {kind}, not a cursor nor a row"
            )));
        }
        if self.result.open()? == Fetched::Eof {
            return Ok(false);
        }
        self.batch = Some(self.result.row()?);
        Ok(true)
    }

    /// Move to the next row, fetching a new batch if needed. `Ok(false)` at
    /// end of data.
    fn advance(&mut self) -> Result<bool> {
        if let Some(batch) = self.batch.as_mut() {
            if batch.next_row() {
                return Ok(true);
            }
        }
        // the exhausted batch goes before the cursor moves on
        self.batch = None;
        if self.result.kind() == ResultKind::Row {
            return Ok(false);
        }
        match self.result.fetch()? {
            Fetched::Eof => Ok(false),
            Fetched::Batch => {
                self.batch = Some(self.result.row()?);
                Ok(true)
            }
        }
    }

    fn finish(&mut self) {
        self.batch = None;
        self.state = State::Done;
    }
}

impl Iterator for Cursor {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        let needs_next = match self.state {
            State::Done => return None,
            State::Pending => match self.start() {
                Ok(true) => false,
                Ok(false) => {
                    self.finish();
                    return None;
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            },
            State::Ready { needs_next } => needs_next,
        };

        if needs_next {
            match self.advance() {
                Ok(true) => {}
                Ok(false) => {
                    self.finish();
                    return None;
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            }
        }

        let Some(row) = self.batch.as_ref().map(RowBatch::to_row) else {
            self.finish();
            return None;
        };
        self.state = State::Ready { needs_next: true };
        self.rows += 1;
        Some(Ok(row))
    }
}

impl std::iter::FusedIterator for Cursor {}
