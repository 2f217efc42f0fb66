//! Browser automation capability consumed by link discovery.
//!
//! The discovery code only talks to [`Driver`]; [`webdriver::WebDriver`] is the
//! implementation used at runtime, tests substitute their own.

pub mod webdriver;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("`{driver}` was not found, install it and make sure it is on your PATH")]
    DriverNotFound { driver: String },
    #[error("Failed to start `{driver}`: {source}")]
    Launch {
        driver: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{0}` did not become ready in time")]
    NotReady(String),
    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebDriver error `{error}`: {message}")]
    Command { error: String, message: String },
    #[error("Unexpected WebDriver response: {0}")]
    Response(String),
    #[error("Could not start a Chrome or Firefox session. Install a browser together with chromedriver or geckodriver and make sure both are on your PATH")]
    NoBrowser,
}

/// An `<a>` element as seen on the rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor<E> {
    pub element: E,
    pub href: Option<String>,
    pub text: String,
    pub onclick: Option<String>,
}

impl<E> Anchor<E> {
    pub fn new(element: E, href: Option<&str>, text: &str) -> Self {
        Self {
            element,
            href: href.map(str::to_string),
            text: text.to_string(),
            onclick: None,
        }
    }

    pub fn with_onclick(mut self, onclick: &str) -> Self {
        self.onclick = Some(onclick.to_string());
        self
    }
}

pub trait Driver {
    type Element;

    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;
    fn anchors(&mut self) -> Result<Vec<Anchor<Self::Element>>, BrowserError>;
    fn click(&mut self, element: &Self::Element) -> Result<(), BrowserError>;
    fn execute(
        &mut self,
        script: &str,
        element: &Self::Element,
    ) -> Result<serde_json::Value, BrowserError>;
}
