use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use parking_lot::Mutex;

use crate::{
    client::{self, Pid},
    report,
};

/// Shared between the signal handler thread and whoever runs a child process.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    child: Arc<Mutex<Option<Pid>>>,
    triggered: Arc<AtomicBool>,
    cooperative: Arc<AtomicBool>,
}

/// What the handler does with a received signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Stop the tracked child, its owner reports the interrupt.
    Terminate(Pid),
    /// A polling stage notices the flag and unwinds, running destructors.
    Unwind,
    Exit,
}

/// Keeps a child registered with the handler until dropped.
pub struct Tracked<'a> {
    interrupt: &'a Interrupt,
}

/// Marks a stage that checks [`Interrupt::triggered`] and unwinds by itself.
pub struct Cooperating<'a> {
    interrupt: &'a Interrupt,
}

impl Interrupt {
    /// Installs the SIGINT/SIGTERM handler. With a child running the signal
    /// terminates it and lets the caller unwind. Inside a cooperating stage
    /// only the flag is set. Otherwise the process exits with status 2 right
    /// away.
    pub fn install() -> Result<Self> {
        let interrupt = Self::default();
        interrupt.spawn_signal_handler()?;
        Ok(interrupt)
    }

    #[cfg(unix)]
    fn spawn_signal_handler(&self) -> Result<()> {
        use signal_hook::{
            consts::{SIGINT, SIGTERM},
            iterator::Signals,
        };

        log::debug!("Spawning exit signal handler");
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let state = self.clone();

        std::thread::spawn(move || {
            for sig in signals.forever() {
                log::debug!("Received signal {sig}");

                match state.respond() {
                    Response::Terminate(pid) => {
                        report::warn(format!("Termination requested, stopping child process {pid}"));
                        if let Err(err) = client::terminate(&pid) {
                            log::error!("Unable to stop child process: {err}");
                        }
                    }
                    Response::Unwind => log::debug!("Interrupt flagged, waiting for the current stage to unwind"),
                    Response::Exit => {
                        report::aborted();
                        std::process::exit(2);
                    }
                }
            }
        });

        Ok(())
    }

    // Without POSIX signals Ctrl+C keeps its default behaviour.
    #[cfg(not(unix))]
    fn spawn_signal_handler(&self) -> Result<()> {
        Ok(())
    }

    /// Flags the interrupt and decides how the handler reacts to it.
    pub fn respond(&self) -> Response {
        self.trigger();

        if let Some(pid) = self.tracked_pid() {
            return Response::Terminate(pid);
        }

        match self.cooperative.load(Ordering::SeqCst) {
            true => Response::Unwind,
            false => Response::Exit,
        }
    }

    pub fn cooperate(&self) -> Cooperating<'_> {
        self.cooperative.store(true, Ordering::SeqCst);
        Cooperating { interrupt: self }
    }

    pub fn track(&self, pid: Pid) -> Tracked<'_> {
        *self.child.lock() = Some(pid);
        Tracked { interrupt: self }
    }

    pub fn triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn tracked_pid(&self) -> Option<Pid> {
        self.child.lock().clone()
    }
}

impl Tracked<'_> {
    pub fn interrupt(&self) -> &Interrupt {
        self.interrupt
    }
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        *self.interrupt.child.lock() = None;
    }
}

impl Drop for Cooperating<'_> {
    fn drop(&mut self) {
        self.interrupt.cooperative.store(false, Ordering::SeqCst);
    }
}
