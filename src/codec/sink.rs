//! Output destinations for the transcoder
//!
//! A sink is borrowed for the transcoder's lifetime; the caller opens and
//! closes the underlying destination.

use std::fs::File;
use std::io::{self, Write};

/// Where transcoded bytes go
pub enum Sink<'s> {
    /// An already-open file
    File(&'s mut File),
    /// An in-memory buffer
    Buffer(&'s mut Vec<u8>),
    /// Any other output stream
    Stream(&'s mut dyn Write),
}

impl<'s> Sink<'s> {
    /// Write all of `bytes` to the destination
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        match self {
            Sink::File(file) => file.write_all(bytes),
            Sink::Buffer(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            Sink::Stream(stream) => stream.write_all(bytes),
        }
    }

    /// Flush the destination (no-op for buffers)
    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::File(file) => file.flush(),
            Sink::Buffer(_) => Ok(()),
            Sink::Stream(stream) => stream.flush(),
        }
    }

    /// Short label for log events
    pub fn kind(&self) -> &'static str {
        match self {
            Sink::File(_) => "file",
            Sink::Buffer(_) => "buffer",
            Sink::Stream(_) => "stream",
        }
    }
}

impl<'s> From<&'s mut File> for Sink<'s> {
    fn from(file: &'s mut File) -> Self {
        Sink::File(file)
    }
}

impl<'s> From<&'s mut Vec<u8>> for Sink<'s> {
    fn from(buf: &'s mut Vec<u8>) -> Self {
        Sink::Buffer(buf)
    }
}

impl std::fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sink").field(&self.kind()).finish()
    }
}
