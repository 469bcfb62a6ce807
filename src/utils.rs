/// Utility helpers for result-stream handling.
use crate::client::{BackendError, ResultMetadata, RowStream};
use crate::error::{Error, Result};
use crate::value::Row;

/// Pull iterator over a result stream with one row of lookahead.
///
/// The first row is pulled at construction time, immediately after execute.
/// The backend only populates stream metadata with the first result chunk,
/// so peeking up front makes `Cursor::description` available even if the
/// caller never fetches a row.
pub struct PeekIterator {
    stream: Box<dyn RowStream>,
    peeked: Option<Row>,
    done: bool,
}

impl PeekIterator {
    /// Wrap a stream, eagerly pulling the first row.
    pub(crate) fn new(mut stream: Box<dyn RowStream>) -> Result<Self> {
        let peeked = match stream.next_row() {
            Some(Ok(row)) => Some(row),
            Some(Err(e)) => return Err(Error::from_backend(e)),
            None => None,
        };
        let done = peeked.is_none();
        Ok(PeekIterator {
            stream,
            peeked,
            done,
        })
    }

    /// Schema of the underlying stream. Populated, because the stream has
    /// been pulled at least once.
    pub fn metadata(&self) -> Option<&ResultMetadata> {
        self.stream.metadata()
    }

    /// Next row, or `None` at exhaustion.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if let Some(row) = self.peeked.take() {
            return Ok(Some(row));
        }
        if self.done {
            return Ok(None);
        }
        match self.stream.next_row() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(Error::from_backend(e)),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }
}

/// Drain a result stream to completion, discarding rows.
///
/// The wrapped client defers a mutation until its result stream is consumed;
/// a statement executed inside a transaction attempt whose stream is dropped
/// unread is silently lost. Every mutating `execute_sql` call must therefore
/// run through this before the attempt completes.
pub(crate) fn drain(stream: &mut dyn RowStream) -> std::result::Result<(), BackendError> {
    while let Some(row) = stream.next_row() {
        row?;
    }
    Ok(())
}
