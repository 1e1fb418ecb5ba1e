// Line-oriented serial transport for G-code firmware
//
// Frames each command as one newline-terminated line. Knows nothing about
// motion; the controller decides what is safe to send.

use serialport::{self, SerialPort};
use std::io::{self, Read, Write};
use std::thread;
use tracing::{debug, info, trace, warn};

use super::gcode::Command;
use crate::config::{MAX_DRAIN_LINES, READ_TIMEOUT, SETTLE_DELAY};

/// Error types for the serial link
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to open serial port {port}: {source}")]
    ConnectionFailed {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Serial write failed: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Serial link to the plotter firmware
pub struct Transport<P = Box<dyn SerialPort>> {
    port: P,
    verbose: bool,
}

impl Transport {
    /// Open the serial port, let the link settle, and discard the boot banner
    pub fn open(port_name: &str, baud_rate: u32, verbose: bool) -> Result<Self> {
        info!("Opening serial port {} at {} baud", port_name, baud_rate);
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| TransportError::ConnectionFailed {
                port: port_name.to_string(),
                source,
            })?;

        // Firmware resets on open and ignores input until it has booted
        thread::sleep(SETTLE_DELAY);

        let mut transport = Self::new(port, verbose);
        transport.drain_startup_noise();
        Ok(transport)
    }
}

impl<P: Read + Write> Transport<P> {
    /// Wrap an already-open port. No settle delay, no drain.
    pub fn new(port: P, verbose: bool) -> Self {
        Self { port, verbose }
    }

    /// The underlying port
    pub fn get_ref(&self) -> &P {
        &self.port
    }

    /// Read one line, stopping at `\n`, a read timeout, or EOF.
    ///
    /// Returns `None` only when nothing at all arrived before the timeout.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if is_timeout(&e) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if line.is_empty() {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&line);
        Ok(Some(text.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Discard whatever the firmware printed before we started talking.
    ///
    /// Stops at the first read that times out with no data. Each read is
    /// bounded by the port timeout and the number of lines by `MAX_DRAIN_LINES`.
    pub fn drain_startup_noise(&mut self) {
        for discarded in 0..MAX_DRAIN_LINES {
            match self.read_line() {
                Ok(Some(line)) => debug!("Discarding startup line: {:?}", line),
                Ok(None) => {
                    debug!("Serial link quiet after {} lines", discarded);
                    return;
                }
                Err(e) => {
                    warn!("Read error while draining serial link: {}", e);
                    return;
                }
            }
        }
        warn!(
            "Serial link still chattering after {} lines, continuing anyway",
            MAX_DRAIN_LINES
        );
    }

    /// Write one command followed by a newline
    pub fn send_line(&mut self, command: &str) -> Result<()> {
        if self.verbose {
            info!("Serial sending: {}", command);
        } else {
            trace!("Serial sending: {}", command);
        }

        let mut framed = String::with_capacity(command.len() + 1);
        framed.push_str(command);
        framed.push('\n');

        self.port.write_all(framed.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    /// Send a multi-line block one line at a time, in order.
    ///
    /// Splits on `\n` exactly, so a trailing newline produces a final empty line.
    pub fn send_lines(&mut self, block: &str) -> Result<()> {
        for line in block.split('\n') {
            self.send_line(line)?;
        }
        Ok(())
    }

    pub fn send(&mut self, command: Command) -> Result<()> {
        self.send_line(&command.to_string())
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
