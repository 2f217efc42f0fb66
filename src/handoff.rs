//! Manual installation handoff.
//!
//! GUI installers are never driven automatically. The operator gets the steps
//! for their platform and confirms once done.

use std::io::{self, BufRead, Write};

use crate::{
    download::{ArtifactKind, DownloadedArtifact},
    error::{Error, Result},
    platform::Platform,
    report,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Yes,
    No,
    Abort,
    Other,
}

fn parse_reply(line: &str) -> Reply {
    match line.trim().to_lowercase().as_str() {
        "yes" | "y" => Reply::Yes,
        "no" | "n" => Reply::No,
        "abort" | "quit" | "q" => Reply::Abort,
        _ => Reply::Other,
    }
}

pub fn instructions(platform: &Platform, artifact: &DownloadedArtifact) -> Vec<String> {
    let path = artifact.path.display();
    let name = artifact
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut steps = vec![format!("1) Installer file: {path}")];

    if platform.is_windows() {
        steps.push("2) Right click -> Run as administrator".into());
        steps.push("3) During installation: check 'Add to PATH' or similar if offered (recommended)".into());
        return steps;
    }

    let step = if name.ends_with(".deb") {
        format!("2) Run: sudo dpkg -i \"{path}\" && sudo apt-get -f install -y")
    } else if name.ends_with(".rpm") {
        format!("2) Run: sudo rpm -ivh \"{path}\"")
    } else if artifact.kind == ArtifactKind::Archive {
        "2) Extract and follow included README / install instructions".into()
    } else {
        "2) Run installer according to your distro's guidelines with root privileges".into()
    };
    steps.push(step);

    steps
}

/// Reads replies until the operator confirms. `no` only reminds them to
/// finish, an explicit abort or end of input gives up.
pub fn await_confirmation<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<()> {
    loop {
        write!(output, "Have you completed installation? (yes/no): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(Error::OperatorAbort("Installation was not confirmed.".into()));
        }

        match parse_reply(&line) {
            Reply::Yes => return Ok(()),
            Reply::No => writeln!(output, "Please complete installation and return here when finished.")?,
            Reply::Abort => {
                return Err(Error::OperatorAbort("Installation was not confirmed.".into()))
            }
            Reply::Other => writeln!(output, "Please type 'yes' when installation is complete, or 'abort' to stop.")?,
        }
    }
}

/// Single yes/no question, anything but yes counts as no.
pub fn ask_yes_no<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{question} (yes/no): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_reply(&line) == Reply::Yes)
}

pub fn wait_for_enter<R: BufRead, W: Write>(message: &str, input: &mut R, output: &mut W) -> Result<()> {
    write!(output, "{message}")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Prints the steps and blocks on the terminal until the operator confirms.
pub fn run(platform: &Platform, artifact: &DownloadedArtifact) -> Result<()> {
    report::info("ATTENTION: Automated installation of GUI installers is intentionally NOT attempted.");
    report::info("Please run the downloaded installer manually with administrative privileges.");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out)?;
    for step in instructions(platform, artifact) {
        writeln!(out, "  {step}")?;
    }
    writeln!(out)?;
    writeln!(out, "After you have completed installation, please confirm (type 'yes') so the connection step can continue.")?;

    await_confirmation(&mut io::stdin().lock(), &mut out)
}
