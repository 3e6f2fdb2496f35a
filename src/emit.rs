//! JSON Lines output: one compact JSON object per decoded record.

use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};

pub struct JsonLines<W> {
    writer: W,
}

impl<W> JsonLines<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write `record` followed by a newline.
    pub fn emit<T>(&mut self, record: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_writer(&mut self.writer, record).map_err(Error::Encode)?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| Error::Encode(serde_json::Error::io(e)))
    }

    /// Emit every record in order, returning how many were written.
    pub fn emit_all<'r, T, I>(&mut self, records: I) -> Result<usize>
    where
        T: Serialize + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let mut count = 0;
        for record in records {
            self.emit(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|e| Error::Encode(serde_json::Error::io(e)))?;
        Ok(self.writer)
    }
}
