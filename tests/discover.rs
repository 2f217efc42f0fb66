use anyhow::Result;
use vpn_automator::{
    browser::{Anchor, BrowserError, Driver},
    discover::{self, file_name_from_url, Activation, LinkDiscoverer, MatchKind},
    platform::TargetPlatform,
};

#[derive(Default)]
struct FakeDriver {
    fail_script: bool,
    fail_click: bool,
    visited: Vec<String>,
    scripted: Vec<usize>,
    clicked: Vec<usize>,
}

impl Driver for FakeDriver {
    type Element = usize;

    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.visited.push(url.to_string());
        Ok(())
    }

    fn anchors(&mut self) -> Result<Vec<Anchor<usize>>, BrowserError> {
        Ok(Vec::new())
    }

    fn click(&mut self, element: &usize) -> Result<(), BrowserError> {
        if self.fail_click {
            return Err(BrowserError::Response("not interactable".into()));
        }
        self.clicked.push(*element);
        Ok(())
    }

    fn execute(&mut self, _script: &str, element: &usize) -> Result<serde_json::Value, BrowserError> {
        if self.fail_script {
            return Err(BrowserError::Command {
                error: "javascript error".into(),
                message: "blocked".into(),
            });
        }
        self.scripted.push(*element);
        Ok(serde_json::Value::Null)
    }
}

fn page(links: &[(Option<&str>, &str)]) -> Vec<Anchor<usize>> {
    links
        .iter()
        .enumerate()
        .map(|(i, (href, text))| Anchor::new(i, *href, text))
        .collect()
}

#[test]
fn suffix_match_beats_earlier_keyword_match() -> Result<()> {
    let anchors = page(&[
        (Some("https://vpn.example/windows"), "Windows client"),
        (Some("https://vpn.example/files/openvpn-install.msi"), "Download"),
    ]);

    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");

    assert_eq!(selection.href, "https://vpn.example/files/openvpn-install.msi");
    assert_eq!(selection.kind, MatchKind::Suffix);
    assert_eq!(selection.file_name.as_deref(), Some("openvpn-install.msi"));
    Ok(())
}

#[test]
fn windows_host_picks_exe_over_deb() {
    let anchors = page(&[(Some("http://x/a.exe"), ""), (Some("http://x/b.deb"), "")]);

    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");
    assert_eq!(selection.href, "http://x/a.exe");
    assert_eq!(selection.file_name.as_deref(), Some("a.exe"));
}

#[test]
fn first_suffix_match_in_page_order_wins() {
    let anchors = page(&[
        (Some("https://vpn.example/linux"), "Linux"),
        (Some("https://vpn.example/openvpn-2.6.rpm"), "Fedora"),
        (Some("https://vpn.example/openvpn_2.6_amd64.deb"), "Debian"),
    ]);

    let discoverer = LinkDiscoverer::new(TargetPlatform::Linux);
    let candidates = discoverer.candidates(&anchors);
    assert_eq!(candidates.len(), 3);

    let selection = discoverer.discover(&anchors).expect("a selection");
    assert_eq!(selection.href, "https://vpn.example/openvpn-2.6.rpm");
    assert_eq!(selection.kind, MatchKind::Suffix);
}

#[test]
fn falls_back_to_first_keyword_match() -> Result<()> {
    let anchors = page(&[
        (Some("https://vpn.example/about"), "About"),
        (Some("https://vpn.example/dl?os=linux"), "Get it"),
        (Some("https://vpn.example/dl?id=9"), "Linux build"),
    ]);

    let selection = LinkDiscoverer::new(TargetPlatform::Linux)
        .discover(&anchors)
        .expect("a selection");

    assert_eq!(selection.href, "https://vpn.example/dl?os=linux");
    assert_eq!(selection.kind, MatchKind::Keyword);
    Ok(())
}

#[test]
fn page_without_installer_links_yields_nothing() {
    let anchors = page(&[
        (Some("https://vpn.example/"), "Home"),
        (Some("https://vpn.example/pricing"), "Pricing"),
        (None, "Menu"),
    ]);

    assert!(LinkDiscoverer::new(TargetPlatform::Linux).discover(&anchors).is_none());
}

#[test]
fn windows_page_offering_only_linux_packages() {
    let anchors = page(&[
        (Some("https://vpn.example/openvpn_2.6_amd64.deb"), "Ubuntu package"),
        (Some("https://vpn.example/openvpn-2.6.rpm"), "Fedora package"),
    ]);

    assert!(LinkDiscoverer::new(TargetPlatform::Windows).discover(&anchors).is_none());
}

#[test]
fn fragments_do_not_create_duplicate_candidates() {
    let anchors = page(&[
        (Some("https://vpn.example/setup.exe#top"), "Download"),
        (Some("https://vpn.example/setup.exe#mirror"), "Mirror"),
        (Some("https://vpn.example/setup.exe"), "Again"),
    ]);

    let candidates = LinkDiscoverer::new(TargetPlatform::Windows).candidates(&anchors);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].href, "https://vpn.example/setup.exe");
}

#[test]
fn url_embedded_in_onclick_is_considered() {
    let anchors = vec![
        Anchor::new(0, None, "Download")
            .with_onclick("window.location='https://cdn.example/openvpn-2.6.msi'; return false;"),
    ];

    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");
    assert_eq!(selection.href, "https://cdn.example/openvpn-2.6.msi");
}

#[test]
fn relative_hrefs_are_kept_as_written() {
    let anchors = page(&[(Some("/downloads/openvpn.deb"), "Debian")]);

    let selection = LinkDiscoverer::new(TargetPlatform::Linux)
        .discover(&anchors)
        .expect("a selection");
    assert_eq!(selection.href, "/downloads/openvpn.deb");
    assert_eq!(selection.file_name.as_deref(), Some("openvpn.deb"));
}

#[test]
fn file_name_is_last_path_segment() {
    assert_eq!(
        file_name_from_url("https://x.example/a/b/client.msi?sig=1").as_deref(),
        Some("client.msi")
    );
    assert_eq!(file_name_from_url("https://x.example/downloads/"), None);
}

#[test]
fn activation_prefers_script_click_on_exact_anchor() -> Result<()> {
    let anchors = page(&[
        (Some("https://vpn.example/"), "Home"),
        (Some("https://vpn.example/setup.exe"), "Download"),
    ]);
    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");

    let mut driver = FakeDriver::default();
    let how = discover::activate(&mut driver, &anchors, &selection)?;

    assert_eq!(how, Activation::ScriptClick);
    assert_eq!(driver.scripted, vec![1]);
    assert!(driver.visited.is_empty());
    Ok(())
}

#[test]
fn activation_clicks_when_script_fails() -> Result<()> {
    let anchors = page(&[(Some("https://vpn.example/setup.exe#dl"), "Download")]);
    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");

    let mut driver = FakeDriver {
        fail_script: true,
        ..Default::default()
    };
    let how = discover::activate(&mut driver, &anchors, &selection)?;

    assert_eq!(how, Activation::Click);
    assert_eq!(driver.clicked, vec![0]);
    Ok(())
}

#[test]
fn containing_anchor_is_script_clicked_first() -> Result<()> {
    let anchors = page(&[
        (Some("https://vpn.example/"), "Home"),
        (Some("https://vpn.example/setup.exe#dl"), "Download"),
    ]);
    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");

    let mut driver = FakeDriver::default();
    let how = discover::activate(&mut driver, &anchors, &selection)?;

    assert_eq!(how, Activation::Click);
    assert_eq!(driver.scripted, vec![1]);
    assert!(driver.clicked.is_empty());
    Ok(())
}

#[test]
fn activation_navigates_when_nothing_is_clickable() -> Result<()> {
    let anchors = page(&[(Some("https://vpn.example/setup.exe"), "Download")]);
    let selection = LinkDiscoverer::new(TargetPlatform::Windows)
        .discover(&anchors)
        .expect("a selection");

    let mut driver = FakeDriver {
        fail_script: true,
        fail_click: true,
        ..Default::default()
    };
    let how = discover::activate(&mut driver, &anchors, &selection)?;

    assert_eq!(how, Activation::Navigate);
    assert_eq!(driver.visited, vec!["https://vpn.example/setup.exe"]);
    Ok(())
}
