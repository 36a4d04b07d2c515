mod args;
mod geometry;
mod process;
mod x11;

use std::env;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use eyre::{Result, bail};

use args::Args;
use geometry::Geometry;
use process::{ChildCommand, Supervisor};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}: {error:#}", program_name());
            ExitCode::from(1)
        }
    }
}

/// Resolve the target window, hand its handle to the child, and stay
/// around until the child is gone. The supervisor's own exit status
/// reflects only its own failures, never the child's exit code.
fn run(args: Args) -> Result<()> {
    if args.command.is_empty() {
        bail!("could not create command line");
    }

    let display = x11::Display::open()?;
    let geometry = match args.geometry.as_deref() {
        Some(input) => Geometry::parse(input)?,
        None => Geometry::default(),
    };
    let rect = geometry.resolve(display.screen_rect());

    let window = display.place_window(rect)?;
    let command = ChildCommand::build(&args.command, &window.handle_token())?;

    let supervisor = Supervisor::launch(&command)?;
    supervisor.forward_signals()?;
    supervisor.wait()?;

    // window and display drop here, destroying the window and closing the
    // connection only after the child has been reaped.
    Ok(())
}

fn program_name() -> String {
    env::args()
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
