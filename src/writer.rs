//! An output sink which redraws its previous frame in place.

use std::io::{self, Write};
use terminal_size::{terminal_size, Width};

/// Assumed width when we aren't running in a terminal.
const FALLBACK_WIDTH: usize = 100;

/// Buffers a whole frame of bar lines, and on flush rewinds the cursor over
/// the last frame before writing the new one.
pub(crate) struct Output {
    out: Box<dyn Write + Send>,
    buf: Vec<u8>,
    /// Number of lines written by the previous flush.
    lines: usize,
}

impl Output {
    pub(crate) fn new(out: Box<dyn Write + Send>) -> Output {
        Output {
            out,
            buf: Vec::new(),
            lines: 0,
        }
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Commit the buffered frame to the underlying writer.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return self.out.flush();
        }

        if self.lines > 0 {
            // Up to the start of the previous frame, then erase everything below.
            write!(self.out, "\x1B[{}A\r\x1B[J", self.lines)?;
        }

        self.lines = self.buf.iter().filter(|b| **b == b'\n').count();
        let res = self.out.write_all(&self.buf);
        self.buf.clear();
        res?;

        self.out.flush()
    }

    /// Swap in a new underlying writer, flushing anything pending into the old
    /// one first.
    pub(crate) fn replace(&mut self, out: Box<dyn Write + Send>) -> io::Result<()> {
        let res = self.flush();
        self.out = out;
        self.lines = 0;
        res
    }

    /// The current width of the terminal attached to stdout.
    pub(crate) fn term_width() -> usize {
        terminal_size()
            .map(|(Width(w), _)| w as usize)
            .unwrap_or(FALLBACK_WIDTH)
    }
}

/// A cloneable in-memory writer for inspecting output in tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Capture(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

#[cfg(test)]
impl Capture {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// The lines of the most recently drawn frame.
    pub(crate) fn last_frame(&self) -> Vec<String> {
        let all = self.contents();
        let frame = all.rsplit("\x1B[J").next().unwrap_or_default();
        frame.lines().map(String::from).collect()
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
