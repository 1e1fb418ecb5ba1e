// G-code vocabulary understood by the plotter firmware
//
// Only this fixed set is ever emitted. One command per line, newline-terminated
// by the transport.

use std::fmt;

/// A single line of G-code sent to the firmware
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `G21`: millimeter units
    Millimeters,
    /// `G90`: absolute coordinates
    AbsoluteMode,
    /// `G91`: relative coordinates
    RelativeMode,
    /// `$H`: run the homing cycle
    Home,
    /// `$X`: clear the alarm lock without homing
    KillAlarmLock,
    /// `G0`: rapid move at the firmware's max rate
    Rapid { x: f64, y: f64 },
    /// `G01`: coordinated move at feed rate `speed` (mm/min)
    Feed { speed: f64, x: f64, y: f64 },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Millimeters => f.write_str("G21"),
            Command::AbsoluteMode => f.write_str("G90"),
            Command::RelativeMode => f.write_str("G91"),
            Command::Home => f.write_str("$H"),
            Command::KillAlarmLock => f.write_str("$X"),
            // Coordinates carry 6 decimals, the feed rate 5
            Command::Rapid { x, y } => write!(f, "G0 X{:.6} Y{:.6}", x, y),
            Command::Feed { speed, x, y } => write!(f, "G01 F{:.5} X{:.6} Y{:.6}", speed, x, y),
        }
    }
}
