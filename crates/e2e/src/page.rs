//! Browser seam: locators, the `Page`/`Browser` traits and assertion helpers
//!
//! Everything above this module talks to the browser only through these
//! traits. The Playwright bridge implements them for real runs; unit tests use
//! a scripted in-memory page.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Interval between polls in the assertion helpers
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Text matcher for accessible names and visible text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextMatch {
    /// Plain string (Playwright substring semantics unless the locator is exact)
    String { value: String },
    /// JavaScript regex source plus flags
    Regex { source: String, flags: String },
}

impl TextMatch {
    pub fn regex(source: impl Into<String>) -> Self {
        TextMatch::Regex {
            source: source.into(),
            flags: String::new(),
        }
    }

    /// Case-insensitive regex
    pub fn regex_i(source: impl Into<String>) -> Self {
        TextMatch::Regex {
            source: source.into(),
            flags: "i".to_string(),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(value: &str) -> Self {
        TextMatch::String {
            value: value.to_string(),
        }
    }
}

impl From<String> for TextMatch {
    fn from(value: String) -> Self {
        TextMatch::String { value }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::String { value } => write!(f, "\"{}\"", value),
            TextMatch::Regex { source, flags } => write!(f, "/{}/{}", source, flags),
        }
    }
}

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    TestId {
        id: String,
    },
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
        #[serde(default)]
        exact: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
    },
    Label {
        text: String,
    },
    Placeholder {
        text: String,
    },
    Text {
        text: TextMatch,
        #[serde(default)]
        exact: bool,
    },
    /// CSS or `xpath=` selector
    Css {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        has_text: Option<TextMatch>,
    },
    /// Index into the matches of `inner`; negative means last
    Nth {
        inner: Box<Locator>,
        index: i64,
    },
    Within {
        parent: Box<Locator>,
        child: Box<Locator>,
    },
    Filter {
        inner: Box<Locator>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        has_text: Option<TextMatch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        has_not: Option<Box<Locator>>,
    },
}

impl Locator {
    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId { id: id.into() }
    }

    /// Element with an ARIA role and accessible name
    pub fn role(role: &str, name: impl Into<TextMatch>) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: Some(name.into()),
            exact: false,
            level: None,
        }
    }

    /// Any element with the role, regardless of name
    pub fn role_any(role: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: None,
            exact: false,
            level: None,
        }
    }

    pub fn button(name: impl Into<TextMatch>) -> Self {
        Self::role("button", name)
    }

    pub fn textbox(name: impl Into<TextMatch>) -> Self {
        Self::role("textbox", name)
    }

    pub fn heading(name: impl Into<TextMatch>) -> Self {
        Self::role("heading", name)
    }

    pub fn option(name: impl Into<TextMatch>) -> Self {
        Self::role("option", name)
    }

    pub fn combobox(name: impl Into<TextMatch>) -> Self {
        Self::role("combobox", name)
    }

    pub fn label(text: impl Into<String>) -> Self {
        Locator::Label { text: text.into() }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Locator::Placeholder { text: text.into() }
    }

    pub fn text(text: impl Into<TextMatch>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
            has_text: None,
        }
    }

    /// CSS selector restricted to elements containing the text
    pub fn css_with_text(selector: impl Into<String>, text: impl Into<TextMatch>) -> Self {
        Locator::Css {
            selector: selector.into(),
            has_text: Some(text.into()),
        }
    }

    /// Require an exact name/text match
    pub fn exact(mut self) -> Self {
        match &mut self {
            Locator::Role { exact, .. } | Locator::Text { exact, .. } => *exact = true,
            _ => {}
        }
        self
    }

    /// Restrict a heading to a level (`h1`..`h6`)
    pub fn level(mut self, value: u8) -> Self {
        if let Locator::Role { level, .. } = &mut self {
            *level = Some(value);
        }
        self
    }

    pub fn nth(self, index: usize) -> Self {
        Locator::Nth {
            inner: Box::new(self),
            index: index as i64,
        }
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    pub fn last(self) -> Self {
        Locator::Nth {
            inner: Box::new(self),
            index: -1,
        }
    }

    /// Search for `child` inside the elements matched by `self`
    pub fn locate(self, child: Locator) -> Self {
        Locator::Within {
            parent: Box::new(self),
            child: Box::new(child),
        }
    }

    pub fn filter_text(self, text: impl Into<TextMatch>) -> Self {
        Locator::Filter {
            inner: Box::new(self),
            has_text: Some(text.into()),
            has_not: None,
        }
    }

    /// Drop matches that contain an element matching `other`
    pub fn without(self, other: Locator) -> Self {
        Locator::Filter {
            inner: Box::new(self),
            has_text: None,
            has_not: Some(Box::new(other)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::TestId { id } => write!(f, "testid={}", id),
            Locator::Role {
                role,
                name,
                exact,
                level,
            } => {
                write!(f, "role={}", role)?;
                if let Some(level) = level {
                    write!(f, "[level={}]", level)?;
                }
                if let Some(name) = name {
                    write!(f, "[name={}]", name)?;
                }
                if *exact {
                    write!(f, "[exact]")?;
                }
                Ok(())
            }
            Locator::Label { text } => write!(f, "label=\"{}\"", text),
            Locator::Placeholder { text } => write!(f, "placeholder=\"{}\"", text),
            Locator::Text { text, exact } => {
                write!(f, "text={}", text)?;
                if *exact {
                    write!(f, "[exact]")?;
                }
                Ok(())
            }
            Locator::Css { selector, has_text } => {
                write!(f, "css={}", selector)?;
                if let Some(text) = has_text {
                    write!(f, "[has-text={}]", text)?;
                }
                Ok(())
            }
            Locator::Nth { inner, index } => write!(f, "{} >> nth={}", inner, index),
            Locator::Within { parent, child } => write!(f, "{} >> {}", parent, child),
            Locator::Filter {
                inner,
                has_text,
                has_not,
            } => {
                write!(f, "{} >> filter", inner)?;
                if let Some(text) = has_text {
                    write!(f, "[has-text={}]", text)?;
                }
                if let Some(not) = has_not {
                    write!(f, "[has-not={}]", not)?;
                }
                Ok(())
            }
        }
    }
}

/// URL matcher used by `wait_for_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UrlPattern {
    Contains(String),
    /// `*` matches within a path segment, `**` across segments
    Glob(String),
    Regex(String),
}

impl UrlPattern {
    pub fn contains(value: impl Into<String>) -> Self {
        UrlPattern::Contains(value.into())
    }

    pub fn glob(value: impl Into<String>) -> Self {
        UrlPattern::Glob(value.into())
    }

    pub fn regex(value: impl Into<String>) -> Self {
        UrlPattern::Regex(value.into())
    }

    /// Compile the pattern to an anchored (glob) or unanchored (regex) regex
    pub fn to_regex(&self) -> E2eResult<Regex> {
        let source = match self {
            UrlPattern::Contains(value) => regex::escape(value),
            UrlPattern::Glob(glob) => {
                let mut out = String::from("^");
                let mut chars = glob.chars().peekable();
                while let Some(c) = chars.next() {
                    if c == '*' {
                        if chars.peek() == Some(&'*') {
                            chars.next();
                            out.push_str(".*");
                        } else {
                            out.push_str("[^/]*");
                        }
                    } else {
                        out.push_str(&regex::escape(&c.to_string()));
                    }
                }
                out.push('$');
                out
            }
            UrlPattern::Regex(source) => source.clone(),
        };
        Ok(Regex::new(&source)?)
    }

    pub fn matches(&self, url: &str) -> E2eResult<bool> {
        match self {
            UrlPattern::Contains(value) => Ok(url.contains(value.as_str())),
            _ => Ok(self.to_regex()?.is_match(url)),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Contains(value) => write!(f, "*{}*", value),
            UrlPattern::Glob(glob) => write!(f, "{}", glob),
            UrlPattern::Regex(source) => write!(f, "/{}/", source),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Skip actionability checks (overlays intercepting the click)
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// Options for a fresh browser context
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Storage-state file to restore cookies and local storage from
    pub storage_state: Option<PathBuf>,
    pub geolocation: Option<Geolocation>,
    pub permissions: Vec<String>,
    /// Scripts evaluated before any page script on every navigation
    pub init_scripts: Vec<String>,
}

/// One browser tab inside its own context
#[async_trait]
pub trait Page: Send {
    async fn url(&mut self) -> E2eResult<String>;

    async fn goto(&mut self, url: &str, timeout: Duration) -> E2eResult<()>;

    async fn wait_for_load_state(&mut self, state: LoadState) -> E2eResult<()>;

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool>;

    async fn is_enabled(&mut self, locator: &Locator) -> E2eResult<bool>;

    async fn is_disabled(&mut self, locator: &Locator) -> E2eResult<bool>;

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize>;

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn click_with(&mut self, locator: &Locator, options: ClickOptions) -> E2eResult<()>;

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        self.click_with(locator, ClickOptions::default()).await
    }

    async fn check(&mut self, locator: &Locator) -> E2eResult<()>;

    async fn press(&mut self, locator: &Locator, key: &str) -> E2eResult<()>;

    async fn set_input_files(&mut self, locator: &Locator, files: &[PathBuf]) -> E2eResult<()>;

    async fn text_content(&mut self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn inner_text(&mut self, locator: &Locator) -> E2eResult<String>;

    async fn input_value(&mut self, locator: &Locator) -> E2eResult<String>;

    /// Wait for the locator to reach `state`; `Timeout` when it does not
    async fn wait_for(
        &mut self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()>;

    async fn wait_for_url(&mut self, pattern: &UrlPattern, timeout: Duration) -> E2eResult<()>;

    /// Wait for a response whose URL starts with `url` and whose status is
    /// `status`. Responses the page received before the call also count.
    async fn wait_for_response(&mut self, url: &str, status: u16, timeout: Duration)
        -> E2eResult<()>;

    async fn sleep(&mut self, duration: Duration) -> E2eResult<()>;

    /// Snapshot cookies and local storage to `path`
    async fn save_storage_state(&mut self, path: &Path) -> E2eResult<()>;

    /// Close the page together with its context
    async fn close(&mut self) -> E2eResult<()>;
}

/// Factory for isolated browser contexts
#[async_trait]
pub trait Browser: Send {
    type Page: Page + 'static;

    async fn new_page(&mut self, options: ContextOptions) -> E2eResult<Self::Page>;
}

/// Best-effort visibility check for branching; errors count as not visible
pub async fn probe_visible(page: &mut dyn Page, locator: &Locator) -> bool {
    match page.is_visible(locator).await {
        Ok(visible) => visible,
        Err(e) => {
            debug!("Visibility probe for {} failed: {}", locator, e);
            false
        }
    }
}

pub async fn expect_visible(
    page: &mut dyn Page,
    locator: &Locator,
    timeout: Duration,
) -> E2eResult<()> {
    page.wait_for(locator, WaitState::Visible, timeout)
        .await
        .map_err(|e| match e {
            E2eError::Timeout(_) => {
                E2eError::Timeout(format!("{} to be visible ({:?})", locator, timeout))
            }
            other => other,
        })
}

/// Number of polls that fit into `timeout`
fn poll_budget(timeout: Duration, interval: Duration) -> u128 {
    (timeout.as_millis() / interval.as_millis().max(1)).max(1)
}

pub async fn expect_enabled(
    page: &mut dyn Page,
    locator: &Locator,
    timeout: Duration,
) -> E2eResult<()> {
    for _ in 0..poll_budget(timeout, POLL_INTERVAL) {
        if page.is_enabled(locator).await.unwrap_or(false) {
            return Ok(());
        }
        page.sleep(POLL_INTERVAL).await?;
    }
    Err(E2eError::Timeout(format!(
        "{} to be enabled ({:?})",
        locator, timeout
    )))
}

/// Poll until the element's text contains `expected`
pub async fn expect_text(
    page: &mut dyn Page,
    locator: &Locator,
    expected: &str,
    timeout: Duration,
) -> E2eResult<()> {
    let mut last = None;
    for _ in 0..poll_budget(timeout, POLL_INTERVAL) {
        if let Ok(text) = page.text_content(locator).await {
            if text.as_deref().is_some_and(|t| t.contains(expected)) {
                return Ok(());
            }
            last = text;
        }
        page.sleep(POLL_INTERVAL).await?;
    }
    Err(E2eError::AssertionFailed(format!(
        "expected {} to contain '{}', got {:?}",
        locator, expected, last
    )))
}

pub async fn expect_count(
    page: &mut dyn Page,
    locator: &Locator,
    expected: usize,
    timeout: Duration,
) -> E2eResult<()> {
    let mut last = 0;
    for _ in 0..poll_budget(timeout, POLL_INTERVAL) {
        last = page.count(locator).await?;
        if last == expected {
            return Ok(());
        }
        page.sleep(POLL_INTERVAL).await?;
    }
    Err(E2eError::AssertionFailed(format!(
        "expected {} element(s) for {}, found {}",
        expected, locator, last
    )))
}

/// Click `target` until `appears` is visible, at most `attempts` times
///
/// Covers controls whose first click is swallowed while the page hydrates.
pub async fn click_until_visible(
    page: &mut dyn Page,
    target: &Locator,
    appears: &Locator,
    attempts: usize,
    wait: Duration,
) -> E2eResult<()> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        page.click(target).await?;
        if page.wait_for(appears, WaitState::Visible, wait).await.is_ok() {
            return Ok(());
        }
        warn!("Attempt {} to click {} failed, retrying...", attempt, target);
    }
    Err(E2eError::StepFailed {
        step: target.to_string(),
        reason: format!("{} did not appear after {} attempts", appears, attempts),
    })
}

pub async fn expect_url(
    page: &mut dyn Page,
    pattern: &UrlPattern,
    timeout: Duration,
) -> E2eResult<()> {
    match page.wait_for_url(pattern, timeout).await {
        Ok(()) => Ok(()),
        Err(E2eError::Timeout(_)) => {
            let actual = page.url().await.unwrap_or_default();
            Err(E2eError::AssertionFailed(format!(
                "expected URL matching {}, got {}",
                pattern, actual
            )))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_locator_display() {
        let save = Locator::button("Save and Next");
        assert_eq!(save.to_string(), "role=button[name=\"Save and Next\"]");

        let heading = Locator::heading(TextMatch::regex_i("Identity Verification")).level(6);
        assert_eq!(
            heading.to_string(),
            "role=heading[level=6][name=/Identity Verification/i]"
        );

        let cell = Locator::role("gridcell", "7").exact().first();
        assert_eq!(cell.to_string(), "role=gridcell[name=\"7\"][exact] >> nth=0");
    }

    #[test]
    fn test_locator_serializes_for_bridge() {
        let locator = Locator::test_id("emailOrPhone").last();
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(json["kind"], "nth");
        assert_eq!(json["index"], -1);
        assert_eq!(json["inner"]["kind"], "test_id");
        assert_eq!(json["inner"]["id"], "emailOrPhone");
    }

    #[test]
    fn test_exact_ignored_for_css() {
        let locator = Locator::css("input[type=\"file\"]").exact();
        assert_eq!(locator, Locator::css("input[type=\"file\"]"));
    }

    #[test_case(UrlPattern::glob("**/dashboard"), "https://qav2.cybermart.com/dashboard", true)]
    #[test_case(UrlPattern::glob("**/dashboard"), "https://qav2.cybermart.com/dashboard/x", false)]
    #[test_case(UrlPattern::glob("**/account-management/account-type**"), "https://qav2.cybermart.com/account-management/account-type?x=1", true)]
    #[test_case(UrlPattern::regex(r"step=\d"), "https://qav2.cybermart.com/a?step=3", true)]
    #[test_case(UrlPattern::contains("/sign-in"), "https://qav2.cybermart.com/sign-in", true)]
    #[test_case(UrlPattern::contains("/sign-in"), "https://qav2.cybermart.com/sign-up", false)]
    fn test_url_pattern_matches(pattern: UrlPattern, url: &str, expected: bool) {
        assert_eq!(pattern.matches(url).unwrap(), expected);
    }
}
