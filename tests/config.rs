use std::{collections::HashMap, io::Write, time::Duration};

use anyhow::Result;
use vpn_automator::{
    config::{self, Browser, OpenVpnConfig, WireGuardConfig, DEFAULT_DOWNLOAD_TIMEOUT},
    error::Error,
    poll::Poller,
};

fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

const COMPLETE: [(&str, &str); 4] = [
    ("DOWNLOAD_PAGE_URL", "https://vpn.example/download"),
    ("VPN_CONFIG_FILE", "/etc/vpn/client.ovpn"),
    ("VPN_USERNAME", "alice"),
    ("VPN_PASSWORD", "hunter2"),
];

#[test]
fn openvpn_defaults() -> Result<()> {
    let config = OpenVpnConfig::from_source(&source(&COMPLETE))?;

    assert_eq!(config.username, "alice");
    assert_eq!(config.browser, Browser::Chrome);
    assert_eq!(config.download_timeout, Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT));
    assert_eq!(config.startup_url, None);
    Ok(())
}

#[test]
fn missing_username_is_named() {
    let pairs: Vec<_> = COMPLETE
        .iter()
        .copied()
        .filter(|(k, _)| *k != "VPN_USERNAME")
        .collect();

    let err = OpenVpnConfig::from_source(&source(&pairs)).unwrap_err();
    assert!(matches!(&err, Error::MissingVariables(names) if names == &vec!["VPN_USERNAME"]));
    assert!(err.to_string().contains("VPN_USERNAME"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn every_missing_variable_is_reported_at_once() {
    let err = OpenVpnConfig::from_source(&source(&[("VPN_PASSWORD", "   ")])).unwrap_err();

    match err {
        Error::MissingVariables(names) => assert_eq!(
            names,
            vec!["DOWNLOAD_PAGE_URL", "VPN_CONFIG_FILE", "VPN_USERNAME", "VPN_PASSWORD"]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn browser_and_timeout_overrides() -> Result<()> {
    let mut pairs = COMPLETE.to_vec();
    pairs.extend([
        ("BROWSER", "Firefox"),
        ("DOWNLOAD_TIMEOUT", "30"),
        ("STARTUP_URL", "https://intranet.example"),
    ]);

    let config = OpenVpnConfig::from_source(&source(&pairs))?;
    assert_eq!(config.browser, Browser::Firefox);
    assert_eq!(config.download_timeout, Duration::from_secs(30));
    assert_eq!(config.startup_url.as_deref(), Some("https://intranet.example"));
    Ok(())
}

#[test]
fn unknown_browser_falls_back_to_chrome() -> Result<()> {
    let mut pairs = COMPLETE.to_vec();
    pairs.push(("BROWSER", "netscape"));

    let config = OpenVpnConfig::from_source(&source(&pairs))?;
    assert_eq!(config.browser, Browser::Chrome);
    Ok(())
}

#[test]
fn non_numeric_timeout_is_rejected() {
    let mut pairs = COMPLETE.to_vec();
    pairs.push(("DOWNLOAD_TIMEOUT", "two minutes"));

    let err = OpenVpnConfig::from_source(&source(&pairs)).unwrap_err();
    assert!(matches!(err, Error::InvalidVariable { name: "DOWNLOAD_TIMEOUT", .. }));
}

#[test]
fn wireguard_interface_defaults_to_wg0() -> Result<()> {
    let config = WireGuardConfig::from_source(&source(&[("WG_CONFIG_FILE", "/etc/wireguard/wg0.conf")]))?;
    assert_eq!(config.interface_name, "wg0");

    let err = WireGuardConfig::from_source(&source(&[])).unwrap_err();
    assert!(matches!(err, Error::MissingVariables(names) if names == vec!["WG_CONFIG_FILE"]));
    Ok(())
}

#[test]
fn explicit_env_file_must_exist() {
    let result = config::load_env_file(Some(std::path::Path::new("/nonexistent/vpn.env")));
    assert!(result.is_err());
}

#[test]
fn env_file_seeds_the_environment() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "VPN_AUTOMATOR_TEST_ONLY=from-file")?;

    let loaded = config::load_env_file(Some(file.path()))?;
    assert_eq!(loaded.as_deref(), Some(file.path()));
    assert_eq!(
        config::env_source("VPN_AUTOMATOR_TEST_ONLY").as_deref(),
        Some("from-file")
    );
    Ok(())
}

#[test]
fn largest_timeout_is_accepted_without_overflow() -> Result<()> {
    let mut pairs = COMPLETE.to_vec();
    pairs.push(("DOWNLOAD_TIMEOUT", "18446744073709551615"));

    let config = OpenVpnConfig::from_source(&source(&pairs))?;
    assert_eq!(config.download_timeout, Duration::from_secs(u64::MAX));

    let poller = Poller::new(Duration::from_millis(10), config.download_timeout);
    assert!(!poller.expired());
    Ok(())
}
