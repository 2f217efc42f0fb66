use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::platform::Platform;

/// Searches the process search path, or an explicit one, for executables.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    search_path: Option<OsString>,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_path(paths: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(paths.into()),
        }
    }

    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(name, Some(paths), cwd)
            }
            None => which::which(name),
        };

        match found {
            Ok(path) => {
                log::trace!("Resolved `{name}` to {:?}", path);
                Some(path)
            }
            Err(_) => None,
        }
    }

    /// First candidate found, in the given order.
    pub fn first_of(&self, candidates: &[&str]) -> Option<PathBuf> {
        candidates.iter().find_map(|name| self.find(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

pub fn openvpn_candidates(platform: &Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows => &["openvpn.exe", "openvpn"],
        _ => &["openvpn"],
    }
}

pub fn wireguard_candidates(platform: &Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows => &["wireguard.exe", "wg.exe", "wg-quick.exe"],
        _ => &["wg-quick", "wg"],
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
