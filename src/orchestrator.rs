//! Stage sequencing. Every stage is a hard gate for the next one, the first
//! error ends the run.

use std::{io, path::Path, time::Duration};

use crate::{
    browser::{webdriver::WebDriver, Driver},
    client::{self, openvpn, wireguard},
    config::{OpenVpnConfig, Settings, WireGuardConfig},
    discover::{self, LinkDiscoverer},
    download::{DownloadWatcher, DownloadedArtifact, WatchOptions},
    error::{Error, Result},
    handoff,
    interrupt::Interrupt,
    locate::{self, Locator},
    platform::{Platform, TargetPlatform},
    report,
};

/// Everything a run needs besides its VPN configuration.
pub struct Context {
    pub platform: Platform,
    pub locator: Locator,
    pub settings: Settings,
    pub interrupt: Interrupt,
    /// Running as root, elevated commands skip `sudo`.
    pub privileged: bool,
}

impl Context {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            platform: Platform::current(),
            locator: Locator::new(),
            settings: Settings::default(),
            interrupt,
            privileged: client::is_privileged(),
        }
    }
}

pub fn run_openvpn(config: &OpenVpnConfig, ctx: &Context) -> Result<()> {
    let candidates = locate::openvpn_candidates(&ctx.platform);

    match ctx.locator.first_of(candidates) {
        Some(path) => report::info(format!(
            "openvpn found at {}. Skipping download/installer step.",
            path.display()
        )),
        None => {
            let artifact = download_installer(config, ctx)?;
            report::info(format!("Downloaded file located at: {}", artifact.path.display()));

            handoff::run(&ctx.platform, &artifact)?;

            if ctx.locator.first_of(candidates).is_none() {
                report::warn("openvpn still not found in PATH after you confirmed installation.");
                report::warn("If the installer did not add OpenVPN to PATH, locate the openvpn binary and add it to PATH or rerun.");

                let proceed = handoff::ask_yes_no(
                    "Do you want to attempt to continue anyway?",
                    &mut io::stdin().lock(),
                    &mut io::stdout(),
                )?;
                if !proceed {
                    return Err(Error::OperatorAbort(
                        "Aborting as openvpn is not available.".into(),
                    ));
                }
            }
            report::info("Proceeding to connection step.");
        }
    }

    let binary = ctx.locator.first_of(candidates).ok_or_else(|| {
        Error::dependency(
            "openvpn",
            "Ensure the installer added openvpn to PATH or run it manually.",
        )
    })?;

    openvpn::connect(&binary, config, &ctx.settings, ctx.privileged, &ctx.interrupt)
}

pub fn run_wireguard(config: &WireGuardConfig, ctx: &Context) -> Result<()> {
    let candidates = locate::wireguard_candidates(&ctx.platform);

    match ctx.locator.first_of(candidates) {
        Some(path) => report::info(format!(
            "{} found, skipping installation.",
            locate::display_name(&path)
        )),
        None => {
            report::info("WireGuard not found, installing...");
            wireguard::install(&ctx.platform, &ctx.locator, ctx.privileged, &ctx.interrupt)?;

            if ctx.locator.first_of(candidates).is_none() {
                return Err(Error::dependency(
                    "WireGuard",
                    "Installation failed or the binary is not in PATH.",
                ));
            }
        }
    }

    wireguard::connect(
        config,
        &ctx.platform,
        &ctx.locator,
        ctx.privileged,
        &ctx.interrupt,
    )
}

/// Drives a real browser to fetch the installer into a fresh temp directory.
/// The directory is kept, the installer belongs to the operator afterwards.
pub fn download_installer(config: &OpenVpnConfig, ctx: &Context) -> Result<DownloadedArtifact> {
    let target = ctx.platform.target();
    report::info(format!("Detected OS: {} -> target platform {target}", ctx.platform));

    let dir = tempfile::Builder::new()
        .prefix("vpn_download_")
        .tempdir()?
        .keep();
    report::info(format!("Using temporary download dir: {}", dir.display()));

    // Declared before the driver so the driver is dropped first on unwind.
    let _stage = ctx.interrupt.cooperate();
    let mut driver = WebDriver::launch(
        config.browser,
        &dir,
        ctx.settings.driver_start_timeout,
    )?;

    let watch = WatchOptions::from_settings(&ctx.settings, config.download_timeout);
    fetch_installer(
        &mut driver,
        &config.download_page_url,
        &dir,
        target,
        ctx.settings.anchor_wait_timeout,
        watch,
        &ctx.interrupt,
    )
}

fn check(interrupt: &Interrupt) -> Result<()> {
    match interrupt.triggered() {
        true => Err(Error::Interrupted),
        false => Ok(()),
    }
}

/// Navigates, picks the installer link, triggers it and waits for the file.
/// Returns [`Error::Interrupted`] between steps once `interrupt` fired.
pub fn fetch_installer<D: Driver>(
    driver: &mut D,
    page_url: &str,
    download_dir: &Path,
    target: TargetPlatform,
    anchor_timeout: Duration,
    watch: WatchOptions,
    interrupt: &Interrupt,
) -> Result<DownloadedArtifact> {
    check(interrupt)?;
    let watcher = DownloadWatcher::new(download_dir, watch)?.with_interrupt(interrupt.clone());

    report::info(format!("Navigating to download page: {page_url}"));
    driver.navigate(page_url)?;

    let anchors = discover::wait_for_anchors(driver, anchor_timeout)?;
    check(interrupt)?;
    let selection = match LinkDiscoverer::new(target).discover(&anchors) {
        Some(selection) => selection,
        None => {
            report::warn("No obvious installer link found automatically. The website may require manual download or the heuristics need updating.");
            return Err(Error::NoInstallerLink(page_url.to_string()));
        }
    };

    let activation = discover::activate(driver, &anchors, &selection)?;
    log::debug!("Activated {} via {:?}", selection.href, activation);

    report::info("Download initiated, waiting for the file to appear in download folder...");
    watcher.wait()
}
