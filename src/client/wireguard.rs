use super::*;
use crate::{config::WireGuardConfig, handoff, locate::Locator, platform::Platform};
use std::{io, path::Path};

/// Package manager invocations that install WireGuard on this host. macOS gets
/// an empty plan, installing there is left to Homebrew and the operator.
pub fn install_plan(platform: &Platform, locator: &Locator) -> Result<Vec<Cmd>> {
    match platform {
        Platform::Linux => {
            if locator.has("apt-get") {
                Ok(vec![
                    Cmd::new("apt-get").arg("update").elevated(true),
                    Cmd::new("apt-get")
                        .args(["install", "-y", "wireguard", "wireguard-tools"])
                        .elevated(true),
                ])
            } else if locator.has("dnf") {
                Ok(vec![Cmd::new("dnf")
                    .args(["install", "-y", "wireguard-tools"])
                    .elevated(true)])
            } else {
                Err(Error::dependency(
                    "apt-get or dnf",
                    "Unsupported Linux distro, install wireguard-tools manually.",
                ))
            }
        }
        Platform::Windows => {
            if locator.has("winget") {
                Ok(vec![Cmd::new("winget").args([
                    "install",
                    "--id",
                    "WireGuard.WireGuard",
                    "-e",
                    "--silent",
                ])])
            } else if locator.has("choco") {
                Ok(vec![Cmd::new("choco").args(["install", "wireguard", "-y"])])
            } else {
                Err(Error::dependency(
                    "winget or choco",
                    "Install WireGuard manually from https://www.wireguard.com/install/",
                ))
            }
        }
        Platform::MacOs => Ok(Vec::new()),
        Platform::Other(os) => Err(Error::dependency(
            "package manager",
            format!("Automatic installation is not supported on {os}."),
        )),
    }
}

pub fn install(
    platform: &Platform,
    locator: &Locator,
    privileged: bool,
    interrupt: &Interrupt,
) -> Result<()> {
    if *platform == Platform::MacOs {
        report::warn("On macOS, please install via Homebrew: brew install wireguard-tools");
    }

    for cmd in install_plan(platform, locator)? {
        let cmd = cmd.resolve(locator).privileged(privileged);
        report::info(format!("Running: {}", cmd.display()));
        cmd.run(interrupt)?;
    }

    Ok(())
}

pub fn up_command(config_file: &Path) -> Cmd {
    Cmd::new("wg-quick").arg("up").arg(config_file).elevated(true)
}

pub fn connect(
    config: &WireGuardConfig,
    platform: &Platform,
    locator: &Locator,
    privileged: bool,
    interrupt: &Interrupt,
) -> Result<()> {
    if !config.config_file.exists() {
        return Err(Error::ConfigFileNotFound(config.config_file.clone()));
    }

    match platform {
        Platform::Linux | Platform::MacOs => {
            let cmd = up_command(&config.config_file)
                .resolve(locator)
                .privileged(privileged);
            report::info(format!("Running: {}", cmd.display()));
            cmd.run(interrupt)?;

            report::info(format!(
                "Tunnel is now active. To disconnect: sudo wg-quick down {}",
                config.config_file.display()
            ));
            report_interface(&config.interface_name);
            Ok(())
        }
        Platform::Windows => {
            report::info("On Windows, the WireGuard app manages tunnels.");
            report::info("Please import your .conf file into the WireGuard app and activate it manually.");
            handoff::wait_for_enter(
                "Press Enter once the tunnel is active to continue...",
                &mut io::stdin().lock(),
                &mut io::stdout(),
            )
        }
        Platform::Other(os) => Err(Error::dependency(
            "wg-quick",
            format!("WireGuard connections are not supported on {os}."),
        )),
    }
}

#[cfg(unix)]
pub fn find_nic(interface_name: &str) -> Option<pnet::datalink::NetworkInterface> {
    pnet::datalink::interfaces()
        .into_iter()
        .find(|e| e.is_up() && !e.is_loopback() && e.name == interface_name)
}

#[cfg(unix)]
fn report_interface(interface_name: &str) {
    match find_nic(interface_name) {
        Some(nic) => {
            let ips = nic
                .ips
                .iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            report::info(format!("Interface {interface_name} is up ({ips})"));
        }
        None => report::warn(format!(
            "Interface {interface_name} not found, wg-quick names it after the config file."
        )),
    }
}

#[cfg(not(unix))]
fn report_interface(_interface_name: &str) {}
