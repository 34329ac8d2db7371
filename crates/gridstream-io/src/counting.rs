//! Byte-counting writer.

use std::io::{self, Seek, SeekFrom, Write};

/// Wraps a writer and reports how far output has reached.
///
/// For seekable outputs the count is the high-water position, i.e. the
/// resulting length when writing to a fresh file.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    position: u64,
    high_water: u64,
}

impl<W> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            high_water: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.high_water
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        self.high_water = self.high_water.max(self.position);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Seek> Seek for CountingWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}
