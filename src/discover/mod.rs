//! Installer link discovery on a rendered download page.
//!
//! Every anchor is run through an ordered list of [`Matcher`]s. Anchors without
//! an `href` get one last chance through the absolute URL embedded in their
//! `onclick` handler. Candidates are deduplicated on the href without its
//! fragment, and an exact suffix match always wins over a keyword-only one.
//!
//! Relative hrefs are kept as written, they are not resolved against the page.

pub mod matcher;

use std::{collections::HashSet, sync::OnceLock, time::Duration};

use regex::Regex;

pub use self::matcher::{Match, MatchKind, Matcher};
use crate::{
    browser::{Anchor, BrowserError, Driver},
    platform::TargetPlatform,
    poll::Poller,
    report,
};

const CLICK_SCRIPT: &str = "arguments[0].click();";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub href: String,
    pub text: String,
    pub kind: MatchKind,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub href: String,
    pub file_name: Option<String>,
    pub kind: MatchKind,
}

/// How the chosen link was finally triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Script click on the anchor with exactly the chosen href.
    ScriptClick,
    /// Click on an anchor whose href contains the chosen one.
    Click,
    Navigate,
}

pub struct LinkDiscoverer {
    platform: TargetPlatform,
    matchers: Vec<Box<dyn Matcher>>,
}

fn onclick_url() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"https?://[^'"\s]+"#).expect("valid onclick pattern"))
}

pub fn strip_fragment(href: &str) -> &str {
    match href.split_once('#') {
        Some((head, _)) => head,
        None => href,
    }
}

/// Last path segment of the URL, `None` when the path ends in `/`.
pub fn file_name_from_url(href: &str) -> Option<String> {
    let name = match url::Url::parse(href) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => {
            let path = href.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().map(str::to_string)
        }
    };

    name.filter(|name| !name.is_empty())
}

impl LinkDiscoverer {
    pub fn new(platform: TargetPlatform) -> Self {
        Self::with_matchers(platform, matcher::default_matchers())
    }

    pub fn with_matchers(platform: TargetPlatform, matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { platform, matchers }
    }

    pub fn platform(&self) -> TargetPlatform {
        self.platform
    }

    pub fn resolve_href<E>(&self, anchor: &Anchor<E>) -> Option<String> {
        if let Some(href) = anchor.href.as_deref().filter(|h| !h.is_empty()) {
            return Some(href.to_string());
        }

        let onclick = anchor.onclick.as_deref()?;
        onclick_url().find(onclick).map(|m| m.as_str().to_string())
    }

    /// Matching anchors in page order, one per fragment-less href.
    pub fn candidates<E>(&self, anchors: &[Anchor<E>]) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for anchor in anchors {
            let Some(href) = self.resolve_href(anchor) else {
                continue;
            };
            let key = strip_fragment(&href).to_string();
            let lower = key.to_lowercase();

            let Some(found) = matcher::best_match(&self.matchers, &lower, &anchor.text, self.platform)
            else {
                continue;
            };

            if !seen.insert(key.clone()) {
                log::trace!("Duplicate candidate {key}");
                continue;
            }

            candidates.push(Candidate {
                href: key,
                text: anchor.text.clone(),
                kind: found.kind,
                confidence: found.confidence,
            });
        }

        candidates
    }

    pub fn select(candidates: &[Candidate]) -> Option<&Candidate> {
        candidates
            .iter()
            .find(|c| c.kind == MatchKind::Suffix)
            .or_else(|| candidates.first())
    }

    /// Picks the installer link, `None` when nothing on the page qualifies.
    pub fn discover<E>(&self, anchors: &[Anchor<E>]) -> Option<Selection> {
        let candidates = self.candidates(anchors);
        log::debug!("{} installer candidates for {}", candidates.len(), self.platform);

        let chosen = Self::select(&candidates)?;
        let how = match chosen.kind {
            MatchKind::Suffix => "by suffix",
            MatchKind::Keyword => "fallback",
        };
        report::info(format!("Selected download link ({how}): {}", chosen.href));

        Some(Selection {
            href: chosen.href.clone(),
            file_name: file_name_from_url(&chosen.href),
            kind: chosen.kind,
        })
    }
}

/// Waits for the page to render anchors. An empty list after the timeout is
/// only a warning, discovery then runs on nothing.
pub fn wait_for_anchors<D: Driver>(
    driver: &mut D,
    timeout: Duration,
) -> Result<Vec<Anchor<D::Element>>, BrowserError> {
    let anchors = Poller::new(Duration::from_millis(500), timeout).until(|| {
        let anchors = driver.anchors()?;
        Ok::<_, BrowserError>((!anchors.is_empty()).then_some(anchors))
    })?;

    match anchors {
        Some(anchors) => Ok(anchors),
        None => {
            report::warn("No anchor tags found on page, it may be javascript heavy or blocked. Continuing with best-effort parsing.");
            Ok(Vec::new())
        }
    }
}

/// Triggers the download: script click on the exact anchor, then a click on
/// any anchor containing the href (scripted first, native second), then
/// direct navigation.
pub fn activate<D: Driver>(
    driver: &mut D,
    anchors: &[Anchor<D::Element>],
    selection: &Selection,
) -> Result<Activation, BrowserError> {
    let chosen = selection.href.as_str();

    if let Some(anchor) = anchors.iter().find(|a| a.href.as_deref() == Some(chosen)) {
        match driver.execute(CLICK_SCRIPT, &anchor.element) {
            Ok(_) => return Ok(Activation::ScriptClick),
            Err(err) => log::debug!("Script click failed: {err}"),
        }
    }

    let containing = anchors
        .iter()
        .find(|a| a.href.as_deref().is_some_and(|h| h.contains(chosen)));
    if let Some(anchor) = containing {
        match driver.execute(CLICK_SCRIPT, &anchor.element) {
            Ok(_) => return Ok(Activation::Click),
            Err(err) => log::debug!("Script click on containing anchor failed: {err}"),
        }
        match driver.click(&anchor.element) {
            Ok(()) => return Ok(Activation::Click),
            Err(err) => log::debug!("Click failed: {err}"),
        }
    }

    report::warn("Could not click the download anchor, navigating directly to its href.");
    driver.navigate(chosen)?;
    Ok(Activation::Navigate)
}
