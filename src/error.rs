use std::{path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

use crate::browser::BrowserError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidVariable { name: &'static str, value: String },
    #[error("Config file not found: {0:?}")]
    ConfigFileNotFound(PathBuf),
    #[error("{name} not found. {guidance}")]
    DependencyMissing { name: String, guidance: String },
    #[error("Could not find a suitable installer link on {0}. Download the installer manually or update the page heuristics.")]
    NoInstallerLink(String),
    #[error("Download did not complete within {}s. Check the network, browser prompts or the download page.", .0.as_secs())]
    DownloadTimeout(Duration),
    #[error("Failed to start `{program}`: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` failed with {status}")]
    ProcessFailed { program: String, status: ExitStatus },
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("{0}")]
    OperatorAbort(String),
    #[error("User interrupted.")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn dependency(name: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self::DependencyMissing {
            name: name.into(),
            guidance: guidance.into(),
        }
    }

    /// Label printed in front of the fatal line.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingVariables(_) | Self::InvalidVariable { .. } | Self::ConfigFileNotFound(_) => {
                "ConfigurationError"
            }
            Self::DependencyMissing { .. } => "DependencyMissingError",
            Self::Browser(
                BrowserError::DriverNotFound { .. }
                | BrowserError::Launch { .. }
                | BrowserError::NoBrowser,
            ) => "DependencyMissingError",
            Self::Browser(_) => "BrowserError",
            Self::NoInstallerLink(_) => "DiscoveryFailure",
            Self::DownloadTimeout(_) => "DownloadTimeoutError",
            Self::ProcessLaunch { .. } | Self::ProcessFailed { .. } => "ProcessLaunchError",
            Self::OperatorAbort(_) => "OperatorAbort",
            Self::Interrupted => "Interrupted",
            Self::Io(_) => "IoError",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => 2,
            _ => 1,
        }
    }
}
