use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Other(String),
}

/// Operating system family an installer link is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPlatform {
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }

    // Anything that isn't Windows gets Linux packages offered.
    pub fn target(&self) -> TargetPlatform {
        match self {
            Self::Windows => TargetPlatform::Windows,
            _ => TargetPlatform::Linux,
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Other(name) => name.as_str(),
        };
        write!(f, "{name}")
    }
}

impl Display for TargetPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
        };
        write!(f, "{name}")
    }
}
