use std::io::{self, Write};

/// Remembers whether anything went through it.
pub struct TrackingWriter<W> {
    inner: W,
    written: usize,
}

impl<W: Write> TrackingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl<W: Write> Write for TrackingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Puts a blank line between two blocks of output.
pub struct SeparatorWriter<W> {
    inner: W,
    ready: bool,
}

impl<W: Write> SeparatorWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, ready: false }
    }

    /// The next non-empty write starts with a blank line.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for SeparatorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.ready {
            self.inner.write_all(b"\n")?;
            self.ready = false;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
