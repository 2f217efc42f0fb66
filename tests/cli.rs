use std::{ffi::OsStr, io::Write};

use anyhow::Result;
use vpn_automator::{cli, error::Error};

// Mutates the process environment, so it stays the only test in this binary.
#[test]
fn missing_username_fails_before_anything_runs() -> Result<()> {
    let workdir = tempfile::tempdir()?;
    let bin = tempfile::tempdir()?;
    let ovpn = workdir.path().join("client.ovpn");
    std::fs::write(&ovpn, "client\n")?;

    let mut env_file = tempfile::NamedTempFile::new_in(workdir.path())?;
    writeln!(env_file, "DOWNLOAD_PAGE_URL=https://vpn.example/download")?;
    writeln!(env_file, "VPN_CONFIG_FILE={}", ovpn.display())?;
    writeln!(env_file, "VPN_PASSWORD=hunter2")?;

    std::env::remove_var("VPN_USERNAME");
    // With nothing on PATH any later stage would fail with a dependency error.
    std::env::set_var("PATH", bin.path());

    let args: [&OsStr; 4] = [
        OsStr::new("vpn-automator"),
        OsStr::new("--env-file"),
        env_file.path().as_os_str(),
        OsStr::new("openvpn"),
    ];
    let matches = cli::init().try_get_matches_from(args)?;

    let err = cli::run(&matches).unwrap_err();

    match err.downcast_ref::<Error>() {
        Some(Error::MissingVariables(names)) => assert_eq!(names, &vec!["VPN_USERNAME"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(cli::exit_code(&err), 1);
    assert!(err.to_string().contains("VPN_USERNAME"));
    Ok(())
}
