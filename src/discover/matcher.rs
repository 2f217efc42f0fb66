//! Heuristics deciding whether a link looks like an installer download.

use crate::platform::TargetPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Keyword,
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub kind: MatchKind,
    pub confidence: u8,
}

pub trait Matcher {
    /// `href` is already lower-cased and stripped of its fragment.
    fn evaluate(&self, href: &str, text: &str, platform: TargetPlatform) -> Option<Match>;
}

pub fn suffixes(platform: TargetPlatform) -> &'static [&'static str] {
    match platform {
        TargetPlatform::Windows => &[".exe", ".msi"],
        TargetPlatform::Linux => &[".deb", ".rpm", ".tar.gz", ".tar.xz"],
    }
}

pub fn keywords(platform: TargetPlatform) -> &'static [&'static str] {
    match platform {
        TargetPlatform::Windows => &["windows", "msi", "exe"],
        TargetPlatform::Linux => &["linux", ".deb", ".rpm"],
    }
}

/// Href ends with a package extension for the platform.
pub struct SuffixMatcher;

impl Matcher for SuffixMatcher {
    fn evaluate(&self, href: &str, _text: &str, platform: TargetPlatform) -> Option<Match> {
        suffixes(platform)
            .iter()
            .any(|suffix| href.ends_with(suffix))
            .then_some(Match {
                kind: MatchKind::Suffix,
                confidence: 100,
            })
    }
}

/// A platform keyword shows up in the href or the link text.
pub struct KeywordMatcher;

impl Matcher for KeywordMatcher {
    fn evaluate(&self, href: &str, text: &str, platform: TargetPlatform) -> Option<Match> {
        let text = text.to_lowercase();
        keywords(platform)
            .iter()
            .any(|kw| href.contains(kw) || text.contains(kw))
            .then_some(Match {
                kind: MatchKind::Keyword,
                confidence: 50,
            })
    }
}

pub fn default_matchers() -> Vec<Box<dyn Matcher>> {
    vec![Box::new(SuffixMatcher), Box::new(KeywordMatcher)]
}

/// Best match across all matchers, suffix beating keyword.
pub fn best_match(
    matchers: &[Box<dyn Matcher>],
    href: &str,
    text: &str,
    platform: TargetPlatform,
) -> Option<Match> {
    matchers
        .iter()
        .filter_map(|m| m.evaluate(href, text, platform))
        .max_by_key(|m| (m.kind, m.confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_match_is_platform_specific() {
        let win = SuffixMatcher.evaluate("http://x/setup.msi", "", TargetPlatform::Windows);
        assert_eq!(win.map(|m| m.kind), Some(MatchKind::Suffix));

        let none = SuffixMatcher.evaluate("http://x/setup.msi", "", TargetPlatform::Linux);
        assert_eq!(none, None);

        let tarball =
            SuffixMatcher.evaluate("http://x/openvpn-2.6.tar.xz", "", TargetPlatform::Linux);
        assert!(tarball.is_some());
    }

    #[test]
    fn keywords_match_text_case_insensitively() {
        let found = KeywordMatcher.evaluate("http://x/dl?id=3", "Download for LINUX", TargetPlatform::Linux);
        assert_eq!(found.map(|m| m.kind), Some(MatchKind::Keyword));

        let missing = KeywordMatcher.evaluate("http://x/dl?id=3", "Download", TargetPlatform::Linux);
        assert_eq!(missing, None);
    }

    #[test]
    fn suffix_outranks_keyword() {
        let matchers = default_matchers();
        let best = best_match(&matchers, "http://x/windows/setup.exe", "", TargetPlatform::Windows);
        assert_eq!(best.map(|m| m.kind), Some(MatchKind::Suffix));
    }
}
