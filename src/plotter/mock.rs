// In-memory serial port for tests
//
// Serves scripted input and records every byte written. An empty input
// queue behaves like a serial read timeout.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

#[derive(Debug, Default)]
pub struct MockPort {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    fail_writes: bool,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port that already has `text` waiting to be read
    pub fn with_input(text: &str) -> Self {
        Self {
            incoming: text.bytes().collect(),
            ..Self::default()
        }
    }

    /// Port whose writes all fail as if the cable was pulled
    pub fn disconnected() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn unread(&self) -> usize {
        self.incoming.len()
    }

    pub fn written(&self) -> &str {
        std::str::from_utf8(&self.written).expect("transport writes utf-8")
    }

    /// Written bytes split into lines, terminators stripped
    pub fn lines(&self) -> Vec<&str> {
        self.written().lines().collect()
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.incoming.pop_front() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "Operation timed out")),
        }
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
