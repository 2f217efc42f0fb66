use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::{
    config::{self, OpenVpnConfig, WireGuardConfig},
    error::Error,
    interrupt::Interrupt,
    orchestrator::{self, Context},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Openvpn,
    Wireguard,
}

impl Mode {
    /// WireGuard only when its config is set and OpenVPN's is not.
    pub fn infer<F>(source: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| source(key).is_some_and(|v| !v.trim().is_empty());

        match set("WG_CONFIG_FILE") && !set("VPN_CONFIG_FILE") {
            true => Self::Wireguard,
            false => Self::Openvpn,
        }
    }
}

pub fn init() -> Command {
    command!("vpn-automator")
        .about("Connect to an OpenVPN or WireGuard VPN, installing the client first when it is missing")
        .arg(
            Arg::new("env-file")
                .short('e')
                .long("env-file")
                .global(true)
                .help("Load variables from this file instead of ./.env")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Set RUST_LOG to debug")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("openvpn")
                .visible_alias("ovpn")
                .about("Download OpenVPN if needed and connect with VPN_CONFIG_FILE"),
        )
        .subcommand(
            Command::new("wireguard")
                .visible_alias("wg")
                .about("Install WireGuard if needed and bring up WG_CONFIG_FILE"),
        )
}

pub fn mode(matches: &ArgMatches) -> Mode {
    match matches.subcommand_name() {
        Some("openvpn") => Mode::Openvpn,
        Some("wireguard") => Mode::Wireguard,
        _ => Mode::infer(&config::env_source),
    }
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let env_file = matches.get_one::<PathBuf>("env-file");
    config::load_env_file(env_file.map(PathBuf::as_path))
        .with_context(|| format!("Unable to load environment file {:?}", env_file))?;

    let mode = mode(matches);
    log::debug!("Running in {:?} mode", mode);

    match mode {
        Mode::Openvpn => handle_openvpn(),
        Mode::Wireguard => handle_wireguard(),
    }
}

/// Process status for a failed run: 2 after an operator interrupt, 1 for
/// everything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<Error>().map_or(1, Error::exit_code)
}

fn handle_openvpn() -> Result<()> {
    let config = OpenVpnConfig::from_source(&config::env_source)?;
    let ctx = Context::new(Interrupt::install()?);

    orchestrator::run_openvpn(&config, &ctx)?;
    Ok(())
}

fn handle_wireguard() -> Result<()> {
    let config = WireGuardConfig::from_source(&config::env_source)?;
    let ctx = Context::new(Interrupt::install()?);

    orchestrator::run_wireguard(&config, &ctx)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn infers_wireguard_only_without_openvpn_config() {
        assert_eq!(Mode::infer(&source(&[("WG_CONFIG_FILE", "wg0.conf")])), Mode::Wireguard);
        assert_eq!(
            Mode::infer(&source(&[("WG_CONFIG_FILE", "wg0.conf"), ("VPN_CONFIG_FILE", "a.ovpn")])),
            Mode::Openvpn
        );
        assert_eq!(Mode::infer(&source(&[])), Mode::Openvpn);
    }

    #[test]
    fn runs_without_any_flag() {
        let matches = init().try_get_matches_from(["vpn-automator"]).unwrap();
        assert!(!matches.get_flag("verbose"));
        assert!(matches.subcommand_name().is_none());
    }

    #[test]
    fn subcommand_selects_mode() {
        let matches = init()
            .try_get_matches_from(["vpn-automator", "wg", "-v"])
            .unwrap();
        assert_eq!(mode(&matches), Mode::Wireguard);
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(exit_code(&anyhow::Error::new(Error::Interrupted)), 2);
        assert_eq!(
            exit_code(&anyhow::Error::new(Error::NoInstallerLink("http://x".into()))),
            1
        );
        assert_eq!(exit_code(&anyhow::anyhow!("opaque")), 1);
    }

    #[test]
    fn cli_is_well_formed() {
        init().debug_assert();
    }
}
