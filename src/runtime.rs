// Command-line driver: bring the plotter up, home it, and run one action
//
// All safety decisions live in MotionController; this only sequences calls.

use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::{info, warn};

use crate::config::PlotterConfig;
use crate::plotter::{MotionController, MotionError, Position};

const JOG_STEPS: [f64; 3] = [1.0, 5.0, 20.0]; // mm
const JOG_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(name = "ouija", about = "Safety-gated controller for a G-code pen plotter")]
pub struct Cli {
    /// Serial port of the plotter (overrides the config file)
    #[arg(long)]
    pub port: Option<String>,

    /// Log every G-code line sent to the plotter
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON config file with port and workspace limits
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Home the plotter and park at the origin
    Home,
    /// Home, then move to X Y (mm)
    Goto {
        x: f64,
        y: f64,
        /// Feed rate in mm/min; rapid move when omitted
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Home, then visit each point in order
    Trace {
        /// Point as X,Y in mm (repeatable)
        #[arg(long = "point", value_parser = parse_point, required = true)]
        points: Vec<Position>,
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Home, wait for the carriage, then draw a slow line up the Y axis
    Demo {
        /// Seconds to wait for homing to finish
        #[arg(long, default_value_t = 10)]
        settle_secs: u64,
    },
    /// Home, then step the pen with the keyboard (WASD move, R/F step size, Q quit)
    Jog {
        /// Initial step size in mm: 1, 5 or 20
        #[arg(long = "step", value_name = "MM", value_parser = parse_jog_step, default_value = "1")]
        step_idx: usize,
    },
    /// Print the effective configuration and exit without opening the port
    ShowConfig,
}

/// Map a step size in mm to its slot in `JOG_STEPS`; any other size is refused
fn parse_jog_step(s: &str) -> Result<usize, String> {
    let mm = s.trim().parse::<f64>().map_err(|e| format!("bad step '{}': {}", s, e))?;
    JOG_STEPS
        .iter()
        .position(|&step| step == mm)
        .ok_or_else(|| format!("step must be one of {:?} mm, got {}", JOG_STEPS, mm))
}

fn parse_point(s: &str) -> Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad X '{}': {}", x, e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad Y '{}': {}", y, e))?;
    Ok(Position::new(x, y))
}

/// Merge the config file (if any) with command-line overrides
pub fn resolve_config(cli: &Cli) -> Result<PlotterConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            PlotterConfig::from_json_file(path)?
        }
        None => PlotterConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    config.verbose |= cli.verbose;
    config.validate()?;
    Ok(config)
}

pub fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&cli)?;

    if let Action::ShowConfig = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut plotter = MotionController::connect(&config)?;
    info!(
        "Plotter ready on {} ({} x {} mm, max {} mm/min)",
        config.port, config.workspace.width, config.workspace.height, config.workspace.max_speed
    );

    plotter.calibrate_and_unlock()?;

    match cli.command {
        Action::Home => {}
        Action::Goto { x, y, speed } => plotter.move_to(x, y, speed)?,
        Action::Trace { points, speed } => {
            info!("Tracing {} points", points.len());
            for point in points {
                plotter.move_to(point.x, point.y, speed)?;
            }
        }
        Action::Demo { settle_secs } => {
            info!("Waiting {}s for homing to finish", settle_secs);
            sleep(Duration::from_secs(settle_secs));
            plotter.move_to(0.0, 100.0, Some(100.0))?;
        }
        Action::Jog { step_idx } => {
            enable_raw_mode()?;
            let jogged = jog(&mut plotter, step_idx);
            first_error(jogged, disable_raw_mode())?;
        }
        Action::ShowConfig => unreachable!("handled before connecting"),
    }

    println!("{}", serde_json::to_string(&plotter.status())?);
    Ok(())
}

/// Report a jog failure ahead of a failure to restore the terminal
fn first_error(
    jogged: Result<(), Box<dyn std::error::Error>>,
    restored: std::io::Result<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    jogged?;
    restored?;
    Ok(())
}

fn jog(
    plotter: &mut MotionController,
    mut step_idx: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Controls: WASD=move, R/F=step size, Q=quit");
    info!("Step: {} mm", JOG_STEPS[step_idx]);

    loop {
        if !event::poll(JOG_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let step = JOG_STEPS[step_idx];
        let (dx, dy) = match key.code {
            KeyCode::Char('w') => (0.0, -step),
            KeyCode::Char('s') => (0.0, step),
            KeyCode::Char('a') => (-step, 0.0),
            KeyCode::Char('d') => (step, 0.0),
            KeyCode::Char('r') => {
                step_idx = (step_idx + 1).min(JOG_STEPS.len() - 1);
                info!("Step: {} mm", JOG_STEPS[step_idx]);
                continue;
            }
            KeyCode::Char('f') => {
                step_idx = step_idx.saturating_sub(1);
                info!("Step: {} mm", JOG_STEPS[step_idx]);
                continue;
            }
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            _ => continue,
        };

        let from = plotter.last_commanded_position();
        match plotter.move_to(from.x + dx, from.y + dy, None) {
            Ok(()) => {}
            // Link failures end the session; refused moves just get skipped
            Err(MotionError::Transport(e)) => return Err(e.into()),
            Err(e) => warn!("Jog ignored: {}", e),
        }
    }
}
