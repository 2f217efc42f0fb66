pub mod openvpn;
pub mod wireguard;

use std::{
    ffi::{OsStr, OsString},
    io::{BufRead, BufReader},
    process::{Child, Command, ExitStatus, Stdio},
    time::Duration,
};

use sysinfo::{Process, ProcessStatus, Signal, System};

use crate::{
    error::{Error, Result},
    interrupt::{Interrupt, Tracked},
    locate::Locator,
    poll::Poller,
    report,
};

const ELEVATE: &str = "sudo";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pid(u32);

impl Pid {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Pid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn is_privileged() -> bool {
    #[cfg(unix)]
    return users::get_effective_uid() == 0;

    #[cfg(not(unix))]
    return false;
}

/// Prefixes `sudo` on POSIX hosts when the current user isn't root. Creating
/// tunnel devices and installing packages need it.
pub fn elevate(argv: Vec<OsString>, privileged: bool) -> Vec<OsString> {
    if !cfg!(unix) || privileged {
        return argv;
    }

    let mut elevated = Vec::with_capacity(argv.len() + 1);
    elevated.push(OsString::from(ELEVATE));
    elevated.extend(argv);
    elevated
}

pub fn get_process<'a>(pid: &Pid, sys: &'a mut System) -> Option<&'a Process> {
    let pid = sysinfo::Pid::from_u32(pid.as_u32());
    sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]));
    sys.process(pid)
}

pub fn is_running(pid: &Pid) -> bool {
    let mut sys = System::new();
    get_process(pid, &mut sys).is_some_and(|process| process.status() != ProcessStatus::Zombie)
}

/// Sends SIGTERM without waiting, the owner of the child reaps it.
pub fn terminate(pid: &Pid) -> std::io::Result<()> {
    let mut sys = System::new();
    let Some(process) = get_process(pid, &mut sys) else {
        return Ok(());
    };

    match process.kill_with(Signal::Term) {
        Some(true) => Ok(()),
        Some(false) => Err(std::io::Error::other(format!(
            "Failed to send SIGTERM to pid {pid}"
        ))),
        None => match process.kill() {
            true => Ok(()),
            false => Err(std::io::Error::other(format!("Failed to kill pid {pid}"))),
        },
    }
}

/// Subprocess invocation, optionally elevated.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    elevated: bool,
    privileged: Option<bool>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Cmd {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            elevated: false,
            privileged: None,
        }
    }

    /// Replaces a bare program name with the path `locator` resolves it to.
    pub fn resolve(mut self, locator: &Locator) -> Self {
        if let Some(path) = self.program.to_str().and_then(|name| locator.find(name)) {
            self.program = path.into_os_string();
        }
        self
    }

    /// Overrides the effective uid check when deciding on `sudo`.
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = Some(privileged);
        self
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn program_name(&self) -> String {
        std::path::Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Full argument vector as it would run for a user with `privileged` rights.
    pub fn argv_for(&self, privileged: bool) -> Vec<OsString> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.args.iter().cloned());

        match self.elevated {
            true => elevate(argv, privileged),
            false => argv,
        }
    }

    pub fn argv(&self) -> Vec<OsString> {
        self.argv_for(self.privileged.unwrap_or_else(is_privileged))
    }

    pub fn display(&self) -> String {
        self.argv()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let argv = self.argv();
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        command
    }

    fn spawn(&self, mut command: Command) -> Result<Child> {
        command.spawn().map_err(|source| Error::ProcessLaunch {
            program: self.program_name(),
            source,
        })
    }

    /// Runs to completion with the terminal attached, non-zero exit is an error.
    pub fn run(&self, interrupt: &Interrupt) -> Result<()> {
        let mut child = self.spawn(self.command())?;
        let tracked = interrupt.track(Pid::from(child.id()));
        let status = child.wait()?;
        drop(tracked);

        if interrupt.triggered() {
            return Err(Error::Interrupted);
        }

        match status.success() {
            true => Ok(()),
            false => Err(Error::ProcessFailed {
                program: self.program_name(),
                status,
            }),
        }
    }

    /// Spawns with stdout piped so it can be forwarded line by line.
    pub fn spawn_streaming<'a>(&self, interrupt: &'a Interrupt) -> Result<Streaming<'a>> {
        let mut command = self.command();
        command.stdout(Stdio::piped());

        let child = self.spawn(command)?;
        let pid = Pid::from(child.id());
        log::debug!("Spawned {} with pid {pid}", self.program_name());

        Ok(Streaming {
            tracked: interrupt.track(pid.clone()),
            child,
            pid,
            program: self.program_name(),
        })
    }
}

pub struct Streaming<'a> {
    child: Child,
    pid: Pid,
    program: String,
    tracked: Tracked<'a>,
}

impl Streaming<'_> {
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Hands every stdout line to `sink` until the child closes it. After an
    /// interrupt the child gets `grace` to exit before it is killed.
    pub fn forward<F>(mut self, grace: Duration, mut sink: F) -> Result<ExitStatus>
    where
        F: FnMut(&str),
    {
        if let Some(stdout) = self.child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => sink(&line),
                    Err(err) => {
                        report::warn(format!("Error while reading {} output: {err}", self.program));
                        break;
                    }
                }
            }
        }

        if !self.tracked.interrupt().triggered() {
            return Ok(self.child.wait()?);
        }

        let exited = Poller::new(Duration::from_millis(100), grace).until(|| self.child.try_wait())?;
        if exited.is_none() {
            log::debug!("{} did not exit within {:?}, killing it", self.program, grace);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }

        Err(Error::Interrupted)
    }
}
