use std::{
    net::TcpListener,
    path::Path,
    process::{Child, Command, Stdio},
    time::Duration,
};

use reqwest::{blocking::Client, Method};
use serde_json::{json, Value};

use super::{Anchor, BrowserError, Driver};
use crate::{config::Browser, poll::Poller, report};

const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4ef0cb7b6c5a";
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);
const SAVE_TO_DISK_TYPES: &str = "application/octet-stream,application/x-debian-package,application/x-rpm,application/x-msdos-program,application/x-msdownload";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(String);

impl ElementId {
    fn as_arg(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// W3C WebDriver session backed by a locally spawned driver server.
pub struct WebDriver {
    client: Client,
    base: String,
    session: Option<String>,
    server: Child,
    browser: Browser,
}

impl WebDriver {
    /// Starts the preferred browser, falling back to the other one.
    pub fn launch(
        preferred: Browser,
        download_dir: &Path,
        start_timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let mut missing = Vec::new();

        for browser in [preferred, preferred.other()] {
            match Self::start(browser, download_dir, start_timeout) {
                Ok(driver) => {
                    report::info(format!("Using {browser} WebDriver"));
                    return Ok(driver);
                }
                Err(BrowserError::DriverNotFound { driver }) => {
                    log::debug!("{driver} not on PATH, skipping {browser}");
                    missing.push(driver);
                }
                Err(err) => report::warn(format!("{browser} driver init failed: {err}")),
            }
        }

        match missing.len() {
            2 => Err(BrowserError::DriverNotFound {
                driver: missing.join(" or "),
            }),
            _ => Err(BrowserError::NoBrowser),
        }
    }

    fn start(
        browser: Browser,
        download_dir: &Path,
        start_timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let program = driver_program(browser);
        let binary = which::which(program).map_err(|_| BrowserError::DriverNotFound {
            driver: program.to_string(),
        })?;

        let launch_error = |source| BrowserError::Launch {
            driver: program.to_string(),
            source,
        };
        let port = free_port().map_err(launch_error)?;

        log::debug!("Starting {:?} on port {port}", binary);
        let server = Command::new(&binary)
            .args(driver_args(browser, port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(launch_error)?;

        let mut driver = Self {
            client: Client::builder().timeout(CLIENT_TIMEOUT).build()?,
            base: format!("http://127.0.0.1:{port}"),
            session: None,
            server,
            browser,
        };

        driver.wait_ready(start_timeout)?;
        driver.session = Some(driver.new_session(download_dir)?);

        Ok(driver)
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    fn wait_ready(&self, timeout: Duration) -> Result<(), BrowserError> {
        let url = format!("{}/status", self.base);
        let ready = Poller::new(Duration::from_millis(250), timeout).until(
            || -> Result<Option<()>, BrowserError> {
                let Ok(res) = self.client.get(&url).send() else {
                    return Ok(None);
                };
                let body: Value = res.json().unwrap_or(Value::Null);
                let ready = body["value"]["ready"].as_bool().unwrap_or(false);
                Ok(ready.then_some(()))
            },
        )?;

        ready.ok_or_else(|| BrowserError::NotReady(driver_program(self.browser).to_string()))
    }

    fn new_session(&self, download_dir: &Path) -> Result<String, BrowserError> {
        let body = json!({
            "capabilities": { "alwaysMatch": capabilities(self.browser, download_dir) }
        });
        let value = self.call(Method::POST, "/session", Some(body))?;

        match value["sessionId"].as_str() {
            Some(id) => Ok(id.to_string()),
            None => Err(BrowserError::Response(format!("no sessionId in {value}"))),
        }
    }

    fn session_path(&self, path: &str) -> Result<String, BrowserError> {
        match &self.session {
            Some(id) => Ok(format!("/session/{id}{path}")),
            None => Err(BrowserError::Response("no active session".into())),
        }
    }

    fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BrowserError> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send()?;
        let status = res.status();
        let mut payload: Value = res.json()?;
        let value = payload
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null);

        match status.is_success() {
            true => Ok(value),
            false => Err(command_error(&value)),
        }
    }

    fn attribute(&self, element: &ElementId, name: &str) -> Result<Option<String>, BrowserError> {
        let path = self.session_path(&format!("/element/{}/attribute/{name}", element.0))?;
        let value = self.call(Method::GET, &path, None)?;
        Ok(value.as_str().map(str::to_string))
    }

    fn text(&self, element: &ElementId) -> Result<String, BrowserError> {
        let path = self.session_path(&format!("/element/{}/text", element.0))?;
        let value = self.call(Method::GET, &path, None)?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    fn describe(&self, element: ElementId) -> Result<Anchor<ElementId>, BrowserError> {
        let href = self.attribute(&element, "href")?.filter(|h| !h.is_empty());
        let onclick = self.attribute(&element, "onclick")?.filter(|o| !o.is_empty());
        let text = self.text(&element)?;

        Ok(Anchor {
            element,
            href,
            text,
            onclick,
        })
    }
}

impl Driver for WebDriver {
    type Element = ElementId;

    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let path = self.session_path("/url")?;
        self.call(Method::POST, &path, Some(json!({ "url": url })))?;
        Ok(())
    }

    fn anchors(&mut self) -> Result<Vec<Anchor<ElementId>>, BrowserError> {
        let path = self.session_path("/elements")?;
        let body = json!({ "using": "css selector", "value": "a" });
        let value = self.call(Method::POST, &path, Some(body))?;

        let mut anchors = Vec::new();
        for element in element_ids(&value) {
            // Elements can go stale between listing and inspection.
            match self.describe(element) {
                Ok(anchor) => anchors.push(anchor),
                Err(err) => log::debug!("Skipping anchor: {err}"),
            }
        }

        Ok(anchors)
    }

    fn click(&mut self, element: &ElementId) -> Result<(), BrowserError> {
        let path = self.session_path(&format!("/element/{}/click", element.0))?;
        self.call(Method::POST, &path, Some(json!({})))?;
        Ok(())
    }

    fn execute(&mut self, script: &str, element: &ElementId) -> Result<Value, BrowserError> {
        let path = self.session_path("/execute/sync")?;
        let body = json!({ "script": script, "args": [element.as_arg()] });
        self.call(Method::POST, &path, Some(body))
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        if let Ok(path) = self.session_path("") {
            if let Err(err) = self.call(Method::DELETE, &path, None) {
                log::debug!("Failed to close browser session: {err}");
            }
        }

        let _ = self.server.kill();
        let _ = self.server.wait();
    }
}

fn driver_program(browser: Browser) -> &'static str {
    match browser {
        Browser::Chrome => "chromedriver",
        Browser::Firefox => "geckodriver",
    }
}

fn driver_args(browser: Browser, port: u16) -> Vec<String> {
    match browser {
        Browser::Chrome => vec![format!("--port={port}")],
        Browser::Firefox => vec!["--port".into(), port.to_string()],
    }
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Session capabilities that send downloads to `download_dir` without a prompt.
pub fn capabilities(browser: Browser, download_dir: &Path) -> Value {
    let dir = download_dir.to_string_lossy();
    match browser {
        Browser::Chrome => json!({
            "browserName": "chrome",
            "goog:chromeOptions": {
                "prefs": {
                    "download.default_directory": dir,
                    "download.prompt_for_download": false,
                    "profile.default_content_settings.popups": 0
                },
                "excludeSwitches": ["enable-automation"]
            }
        }),
        Browser::Firefox => json!({
            "browserName": "firefox",
            "moz:firefoxOptions": {
                "prefs": {
                    "browser.download.folderList": 2,
                    "browser.download.dir": dir,
                    "browser.helperApps.neverAsk.saveToDisk": SAVE_TO_DISK_TYPES
                }
            }
        }),
    }
}

fn element_ids(value: &Value) -> Vec<ElementId> {
    value
        .as_array()
        .map(|elements| {
            elements
                .iter()
                .filter_map(|e| e[ELEMENT_KEY].as_str())
                .map(|id| ElementId(id.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn command_error(value: &Value) -> BrowserError {
    BrowserError::Command {
        error: value["error"].as_str().unwrap_or("unknown error").to_string(),
        message: value["message"].as_str().unwrap_or_default().to_string(),
    }
}
