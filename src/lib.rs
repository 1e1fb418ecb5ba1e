//! Safety-gated motion control for a two-axis G-code plotter.
//!
//! [`plotter::MotionController`] refuses every move until the machine has
//! been homed, keeps targets inside the workspace, and caps the feed rate.
//! [`plotter::Transport`] frames the resulting commands onto the serial line.

pub mod config;
pub mod messages;
pub mod plotter;
pub mod runtime;
