use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::{Error, Result},
    report,
};

pub const DEFAULT_DOWNLOAD_TIMEOUT: u64 = 120;
pub const DEFAULT_WG_INTERFACE: &str = "wg0";

static PARTIAL_SUFFIXES: [&str; 4] = [".crdownload", ".part", ".partial", ".download"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl Browser {
    pub fn other(&self) -> Self {
        match self {
            Self::Chrome => Self::Firefox,
            Self::Firefox => Self::Chrome,
        }
    }
}

impl Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct OpenVpnConfig {
    pub config_file: PathBuf,
    pub username: String,
    pub password: String,
    pub startup_url: Option<String>,
    pub download_page_url: String,
    pub browser: Browser,
    pub download_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WireGuardConfig {
    pub config_file: PathBuf,
    pub interface_name: String,
}

/// Tunables that used to be scattered constants. Built once and handed to
/// every stage that waits on something.
#[derive(Debug, Clone)]
pub struct Settings {
    pub partial_suffixes: Vec<String>,
    pub download_poll_interval: Duration,
    pub stability_interval: Duration,
    pub anchor_wait_timeout: Duration,
    pub driver_start_timeout: Duration,
    pub startup_url_delay: Duration,
    pub terminate_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            partial_suffixes: PARTIAL_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            download_poll_interval: Duration::from_secs(1),
            stability_interval: Duration::from_millis(500),
            anchor_wait_timeout: Duration::from_secs(30),
            driver_start_timeout: Duration::from_secs(10),
            startup_url_delay: Duration::from_secs(10),
            terminate_grace: Duration::from_secs(5),
        }
    }
}

/// Reads the process environment.
pub fn env_source(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Seeds the environment from a `.env` file. Variables that are already set
/// take precedence over the file.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| Some(path.to_path_buf())),
        None => dotenvy::dotenv().map(Some),
    };

    match loaded {
        Ok(path) => {
            log::debug!("Loaded environment file {:?}", path);
            Ok(path)
        }
        Err(err) if err.not_found() && path.is_none() => Ok(None),
        Err(dotenvy::Error::Io(err)) => Err(err.into()),
        Err(err) => Err(Error::InvalidVariable {
            name: "env file",
            value: err.to_string(),
        }),
    }
}

struct Reader<'a, F> {
    source: &'a F,
    missing: Vec<&'static str>,
}

impl<'a, F> Reader<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(source: &'a F) -> Self {
        Self {
            source,
            missing: Vec::new(),
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.source)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key);
                String::new()
            }
        }
    }

    fn finish(self) -> Result<()> {
        match self.missing.is_empty() {
            true => Ok(()),
            false => Err(Error::MissingVariables(self.missing)),
        }
    }
}

fn parse_browser(value: Option<String>) -> Browser {
    match value.map(|v| v.to_lowercase()).as_deref() {
        None => Browser::default(),
        Some("chrome") => Browser::Chrome,
        Some("firefox") => Browser::Firefox,
        Some(other) => {
            report::warn(format!("Unknown BROWSER='{other}', defaulting to chrome"));
            Browser::default()
        }
    }
}

impl OpenVpnConfig {
    pub fn from_source<F>(source: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader::new(source);

        let download_page_url = reader.required("DOWNLOAD_PAGE_URL");
        let config_file = reader.required("VPN_CONFIG_FILE");
        let username = reader.required("VPN_USERNAME");
        let password = reader.required("VPN_PASSWORD");
        let startup_url = reader.optional("STARTUP_URL");
        let browser = parse_browser(reader.optional("BROWSER"));
        let download_timeout = reader.optional("DOWNLOAD_TIMEOUT");

        reader.finish()?;

        let download_timeout = match download_timeout {
            Some(value) => value.parse::<u64>().map_err(|_| Error::InvalidVariable {
                name: "DOWNLOAD_TIMEOUT",
                value,
            })?,
            None => DEFAULT_DOWNLOAD_TIMEOUT,
        };

        Ok(Self {
            config_file: PathBuf::from(config_file),
            username,
            password,
            startup_url,
            download_page_url,
            browser,
            download_timeout: Duration::from_secs(download_timeout),
        })
    }
}

impl WireGuardConfig {
    pub fn from_source<F>(source: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader::new(source);

        let config_file = reader.required("WG_CONFIG_FILE");
        let interface_name = reader
            .optional("WG_INTERFACE_NAME")
            .unwrap_or_else(|| DEFAULT_WG_INTERFACE.to_string());

        reader.finish()?;

        Ok(Self {
            config_file: PathBuf::from(config_file),
            interface_name,
        })
    }
}
