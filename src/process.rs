use std::ffi::{CString, c_int};
use std::sync::atomic::{AtomicI32, Ordering};

use eyre::{Result, WrapErr, bail};
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp, fork};

/// Placeholder token replaced with the window handle.
pub const WINDOW_TOKEN: &str = "WID";

/// Child pid the signal handler forwards to. Written once at launch.
static FORWARD_PID: AtomicI32 = AtomicI32::new(0);

extern "C" fn forward_signal(signum: c_int) {
    let pid = FORWARD_PID.load(Ordering::Relaxed);
    if pid > 0 {
        if let Ok(signal) = Signal::try_from(signum) {
            let _ = signal::kill(Pid::from_raw(pid), signal);
        }
    }
}

/// The child's argument vector, ready for exec.
pub struct ChildCommand {
    argv: Vec<CString>,
    program: String,
}

impl ChildCommand {
    /// Copy `template` into an exec argument vector, substituting every
    /// `WID` token with `handle`. Fails on an empty template.
    pub fn build(template: &[String], handle: &str) -> Result<Self> {
        if template.is_empty() {
            bail!("could not create command line");
        }
        let mut argv = Vec::with_capacity(template.len());
        for argument in template {
            let argument = if argument == WINDOW_TOKEN {
                handle
            } else {
                argument
            };
            argv.push(CString::new(argument).wrap_err("could not create command line")?);
        }
        let program = argv[0].to_string_lossy().into_owned();
        Ok(Self { argv, program })
    }

    /// The resolved executable name, after substitution.
    pub fn program(&self) -> &str {
        &self.program
    }
}

/// A launched child and the state needed to supervise it.
pub struct Supervisor {
    child: Pid,
    program: String,
}

impl Supervisor {
    /// Fork and exec the child command. The child branch never returns: it
    /// either becomes the target program or exits with status 2 so an exec
    /// failure stays distinguishable from the program's own exit codes.
    pub fn launch(command: &ChildCommand) -> Result<Self> {
        match unsafe { fork() }.wrap_err("fork")? {
            ForkResult::Child => {
                let error = execvp(&command.argv[0], &command.argv).unwrap_err();
                eprintln!("{}: {}", command.program(), error.desc());
                std::process::exit(2)
            }
            ForkResult::Parent { child } => {
                FORWARD_PID.store(child.as_raw(), Ordering::Relaxed);
                Ok(Self {
                    child,
                    program: command.program().to_owned(),
                })
            }
        }
    }

    /// Relay interrupt and terminate requests to the child. The handler
    /// only forwards the signal number; all teardown stays on the normal
    /// post-wait path.
    pub fn forward_signals(&self) -> Result<()> {
        // No SA_RESTART: the blocking wait is interrupted and retried.
        let action = SigAction::new(
            SigHandler::Handler(forward_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe {
            signal::sigaction(Signal::SIGINT, &action).wrap_err("sigaction SIGINT")?;
            signal::sigaction(Signal::SIGTERM, &action).wrap_err("sigaction SIGTERM")?;
        }
        Ok(())
    }

    /// Block until the child changes state, retrying when the wait is
    /// interrupted by signal delivery. Reports a normal exit to stderr.
    pub fn wait(&self) -> Result<WaitStatus> {
        let status = loop {
            match waitpid(self.child, None) {
                Ok(status) => break status,
                Err(Errno::EINTR) => continue,
                Err(error) => return Err(error).wrap_err("waitpid"),
            }
        };
        if let WaitStatus::Exited(_, code) = status {
            eprintln!("{} died, exit status {}", self.program, code);
        }
        Ok(status)
    }
}
