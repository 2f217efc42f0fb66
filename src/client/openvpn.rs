use super::*;
use crate::config::{OpenVpnConfig, Settings};
use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

const AUTH_FILENAME: &str = "openvpn_auth.txt";

/// Two line username/password file for `--auth-user-pass`. Lives in its own
/// private temp directory which is removed on drop.
#[derive(Debug)]
pub struct AuthFile {
    dir: TempDir,
    path: PathBuf,
}

impl AuthFile {
    pub fn create(username: &str, password: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("vpn_auth_").tempdir()?;
        let path = dir.path().join(AUTH_FILENAME);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path)?;
        write!(file, "{username}\n{password}\n")?;
        file.flush()?;

        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

pub fn command(binary: &Path, config_file: &Path, auth_file: &Path) -> Cmd {
    Cmd::new(binary)
        .arg("--config")
        .arg(config_file)
        .arg("--auth-user-pass")
        .arg(auth_file)
        .elevated(true)
}

/// Runs OpenVPN in the foreground, streaming its output, until it exits or
/// the operator interrupts. The auth file is gone by the time this returns.
pub fn connect(
    binary: &Path,
    config: &OpenVpnConfig,
    settings: &Settings,
    privileged: bool,
    interrupt: &Interrupt,
) -> Result<()> {
    if !config.config_file.exists() {
        return Err(Error::ConfigFileNotFound(config.config_file.clone()));
    }

    let auth = AuthFile::create(&config.username, &config.password)?;
    let cmd = command(binary, &config.config_file, auth.path()).privileged(privileged);

    report::info("Launching OpenVPN process. You will likely be asked for your sudo password (on Linux) or admin rights (on Windows).");
    report::info(format!("Command: {}", cmd.display()));

    let running = cmd.spawn_streaming(interrupt)?;
    if let Some(url) = &config.startup_url {
        open_when_running(running.pid().clone(), url.clone(), settings.startup_url_delay);
    }

    let status = running.forward(settings.terminate_grace, |line| println!("{line}"));
    drop(auth);
    report::info("OpenVPN process ended.");

    let status = status?;
    if !status.success() {
        report::warn(format!("OpenVPN exited with {status}"));
    }

    Ok(())
}

/// Opens `url` in the default browser once the client survived `delay`.
fn open_when_running(pid: Pid, url: String, delay: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(delay);

        if !is_running(&pid) {
            report::warn("VPN connection failed. Please check your configuration and credentials.");
            return;
        }

        report::info("VPN connection initiated successfully.");
        report::info(format!("Opening browser and navigating to {url}..."));
        if let Err(err) = opener::open_browser(&url) {
            report::warn(format!("Error opening browser: {err}"));
        }
    });
}
