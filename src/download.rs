//! Watches the browser's download directory for a finished installer.
//!
//! Browsers write under a temporary suffix and rename on completion, so a file
//! only counts once it has no partial suffix, is non-empty and kept the same
//! size across the stability interval. When several qualify the largest one
//! wins, small companions such as cache files lose to the installer itself.

use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    config::Settings,
    error::{Error, Result},
    interrupt::Interrupt,
    poll::Poller,
    report,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Installer,
    Archive,
    Other,
}

impl ArtifactKind {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        const INSTALLERS: [&str; 6] = [".exe", ".msi", ".deb", ".rpm", ".pkg", ".dmg"];
        const ARCHIVES: [&str; 4] = [".tar.gz", ".tar.xz", ".tgz", ".zip"];

        if INSTALLERS.iter().any(|ext| name.ends_with(ext)) {
            Self::Installer
        } else if ARCHIVES.iter().any(|ext| name.ends_with(ext)) {
            Self::Archive
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub kind: ArtifactKind,
}

impl DownloadedArtifact {
    fn new(path: PathBuf, size: u64) -> Self {
        let kind = ArtifactKind::from_path(&path);
        Self { path, size, kind }
    }
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub partial_suffixes: Vec<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub stability_interval: Duration,
}

impl WatchOptions {
    pub fn from_settings(settings: &Settings, timeout: Duration) -> Self {
        Self {
            partial_suffixes: settings.partial_suffixes.clone(),
            timeout,
            poll_interval: settings.download_poll_interval,
            stability_interval: settings.stability_interval,
        }
    }
}

/// Directory entries (name -> size) before the download was triggered.
#[derive(Debug, Clone, Default)]
pub struct DirSnapshot {
    entries: HashMap<String, u64>,
}

impl DirSnapshot {
    pub fn take(dir: &Path) -> io::Result<Self> {
        let entries = list_files(dir)?
            .into_iter()
            .map(|(name, path)| {
                let size = file_size(&path).unwrap_or(0);
                (name, size)
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

pub struct DownloadWatcher {
    dir: PathBuf,
    options: WatchOptions,
    snapshot: DirSnapshot,
    seen_partials: HashSet<String>,
    interrupt: Option<Interrupt>,
}

impl DownloadWatcher {
    /// Snapshots `dir`; call before the download is triggered.
    pub fn new(dir: &Path, options: WatchOptions) -> io::Result<Self> {
        let snapshot = DirSnapshot::take(dir)?;
        let mut watcher = Self {
            dir: dir.to_path_buf(),
            options,
            snapshot,
            seen_partials: HashSet::new(),
            interrupt: None,
        };

        let partials = watcher
            .snapshot
            .names()
            .filter(|name| watcher.is_partial(name))
            .map(str::to_string)
            .collect();
        watcher.seen_partials = partials;

        log::debug!(
            "Existing files before download: {:?}",
            watcher.snapshot.names().collect::<Vec<_>>()
        );

        Ok(watcher)
    }

    /// Stops waiting with [`Error::Interrupted`] once `interrupt` fires.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn is_partial(&self, name: &str) -> bool {
        self.options
            .partial_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Blocks until a completed download shows up or the timeout elapses.
    pub fn wait(mut self) -> Result<DownloadedArtifact> {
        let timeout = self.options.timeout;
        let poller = Poller::new(self.options.poll_interval, timeout);

        let found = poller.until(|| {
            if self.interrupt.as_ref().is_some_and(Interrupt::triggered) {
                return Err(Error::Interrupted);
            }
            Ok(self.scan()?)
        })?;

        match found {
            Some(artifact) => Ok(artifact),
            None => {
                report::warn("Timeout waiting for download completion.");
                Err(Error::DownloadTimeout(timeout))
            }
        }
    }

    fn scan(&mut self) -> io::Result<Option<DownloadedArtifact>> {
        let current = list_files(&self.dir)?;
        let current_names: HashSet<&str> = current.iter().map(|(name, _)| name.as_str()).collect();

        for (name, _) in &current {
            if self.is_partial(name) {
                self.seen_partials.insert(name.clone());
            }
        }

        let fresh: Vec<&PathBuf> = current
            .iter()
            .filter(|(name, _)| !self.snapshot.contains(name) && !self.is_partial(name))
            .map(|(_, path)| path)
            .collect();

        let mut completed = self.stable_files(&fresh);

        // Browsers that download in place keep the final name and drop the
        // partial companion once done.
        for (name, path) in &current {
            if !self.snapshot.contains(name) || self.is_partial(name) {
                continue;
            }

            let renamed = self.seen_partials.iter().any(|partial| {
                !current_names.contains(partial.as_str())
                    && partial
                        .strip_prefix(name.as_str())
                        .is_some_and(|suffix| self.options.partial_suffixes.iter().any(|s| s == suffix))
            });

            if renamed {
                if let Some(size) = file_size(path).filter(|size| *size > 0) {
                    completed.push(DownloadedArtifact::new(path.clone(), size));
                }
            }
        }

        if completed.is_empty() {
            return Ok(None);
        }

        report::info(format!(
            "Detected completed download: {:?}",
            completed.iter().map(|a| &a.path).collect::<Vec<_>>()
        ));

        Ok(completed.into_iter().max_by_key(|artifact| artifact.size))
    }

    /// Files whose size is non-zero and unchanged across the stability interval.
    fn stable_files(&self, paths: &[&PathBuf]) -> Vec<DownloadedArtifact> {
        if paths.is_empty() {
            return Vec::new();
        }

        let before: Vec<Option<u64>> = paths.iter().map(|path| file_size(path)).collect();
        std::thread::sleep(self.options.stability_interval);

        paths
            .iter()
            .zip(before)
            .filter_map(|(path, before)| {
                let before = before?;
                let after = file_size(path)?;
                (before == after && after > 0).then(|| DownloadedArtifact::new((*path).clone(), after))
            })
            .collect()
    }
}

fn list_files(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        files.push((entry.file_name().to_string_lossy().into_owned(), path));
    }

    Ok(files)
}

fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|meta| meta.len())
}
