//! Scripted in-memory page for unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{E2eError, E2eResult};
use crate::page::{
    Browser, ClickOptions, ContextOptions, LoadState, Locator, Page, UrlPattern, WaitState,
};

/// State change applied when a scripted element is clicked or filled
#[derive(Debug, Clone)]
pub enum Effect {
    Navigate(String),
    Show(Locator),
    Hide(Locator),
    Enable(Locator),
    SetText(Locator, String),
}

/// Everything the code under test did to the page
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Goto(String),
    Fill(String, String),
    Click(String),
    Check(String),
    Press(String, String),
    Upload(String, Vec<PathBuf>),
    SaveState(PathBuf),
    Close,
}

#[derive(Debug, Default)]
pub struct FakePage {
    pub url: String,
    visible: HashSet<String>,
    disabled: HashSet<String>,
    counts: HashMap<String, usize>,
    texts: HashMap<String, String>,
    values: HashMap<String, String>,
    responses: Vec<(String, u16)>,
    url_error: Option<String>,
    redirects: HashMap<String, String>,
    on_click: HashMap<String, VecDeque<Vec<Effect>>>,
    on_fill: HashMap<String, Vec<Effect>>,
    pub actions: Vec<Action>,
}

impl FakePage {
    pub fn at(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn show(mut self, locator: &Locator) -> Self {
        self.visible.insert(locator.to_string());
        self
    }

    pub fn disable(mut self, locator: &Locator) -> Self {
        self.disabled.insert(locator.to_string());
        self
    }

    pub fn with_count(mut self, locator: &Locator, count: usize) -> Self {
        self.counts.insert(locator.to_string(), count);
        self
    }

    pub fn with_text(mut self, locator: &Locator, text: &str) -> Self {
        self.texts.insert(locator.to_string(), text.to_string());
        self
    }

    pub fn with_value(mut self, locator: &Locator, value: &str) -> Self {
        self.values.insert(locator.to_string(), value.to_string());
        self
    }

    /// Record a 200 response for `url` as already received
    pub fn with_response(self, url: &str) -> Self {
        self.with_status_response(url, 200)
    }

    pub fn with_status_response(mut self, url: &str, status: u16) -> Self {
        self.responses.push((url.to_string(), status));
        self
    }

    /// `url()` fails as if the bridge lost the page
    pub fn failing_url(mut self, message: &str) -> Self {
        self.url_error = Some(message.to_string());
        self
    }

    /// `goto(from)` lands on `to`
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Each click of `locator` consumes the next batch of effects
    pub fn on_click(mut self, locator: &Locator, effects: Vec<Effect>) -> Self {
        self.on_click
            .entry(locator.to_string())
            .or_default()
            .push_back(effects);
        self
    }

    pub fn on_fill(mut self, locator: &Locator, effects: Vec<Effect>) -> Self {
        self.on_fill.insert(locator.to_string(), effects);
        self
    }

    pub fn clicks(&self, locator: &Locator) -> usize {
        let key = locator.to_string();
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Click(k) if *k == key))
            .count()
    }

    pub fn filled(&self, locator: &Locator) -> Option<&str> {
        let key = locator.to_string();
        self.actions.iter().rev().find_map(|a| match a {
            Action::Fill(k, v) if *k == key => Some(v.as_str()),
            _ => None,
        })
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Navigate(url) => self.url = url,
                Effect::Show(l) => {
                    self.visible.insert(l.to_string());
                }
                Effect::Hide(l) => {
                    self.visible.remove(&l.to_string());
                }
                Effect::Enable(l) => {
                    self.disabled.remove(&l.to_string());
                }
                Effect::SetText(l, text) => {
                    self.texts.insert(l.to_string(), text);
                }
            }
        }
    }

    fn require_visible(&self, locator: &Locator) -> E2eResult<String> {
        let key = locator.to_string();
        if self.visible.contains(&key) {
            Ok(key)
        } else {
            Err(E2eError::Timeout(key))
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn url(&mut self) -> E2eResult<String> {
        match &self.url_error {
            Some(message) => Err(E2eError::Bridge(message.clone())),
            None => Ok(self.url.clone()),
        }
    }

    async fn goto(&mut self, url: &str, _timeout: Duration) -> E2eResult<()> {
        self.actions.push(Action::Goto(url.to_string()));
        self.url = self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn wait_for_load_state(&mut self, _state: LoadState) -> E2eResult<()> {
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        Ok(self.visible.contains(&locator.to_string()))
    }

    async fn is_enabled(&mut self, locator: &Locator) -> E2eResult<bool> {
        let key = self.require_visible(locator)?;
        Ok(!self.disabled.contains(&key))
    }

    async fn is_disabled(&mut self, locator: &Locator) -> E2eResult<bool> {
        let key = self.require_visible(locator)?;
        Ok(self.disabled.contains(&key))
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        let key = locator.to_string();
        Ok(self
            .counts
            .get(&key)
            .copied()
            .unwrap_or(usize::from(self.visible.contains(&key))))
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()> {
        let key = locator.to_string();
        self.actions.push(Action::Fill(key.clone(), value.to_string()));
        self.values.insert(key.clone(), value.to_string());
        if let Some(effects) = self.on_fill.get(&key).cloned() {
            self.apply(effects);
        }
        Ok(())
    }

    async fn click_with(&mut self, locator: &Locator, _options: ClickOptions) -> E2eResult<()> {
        let key = locator.to_string();
        self.actions.push(Action::Click(key.clone()));
        let effects = self.on_click.get_mut(&key).and_then(VecDeque::pop_front);
        if let Some(effects) = effects {
            self.apply(effects);
        }
        Ok(())
    }

    async fn check(&mut self, locator: &Locator) -> E2eResult<()> {
        self.actions.push(Action::Check(locator.to_string()));
        Ok(())
    }

    async fn press(&mut self, locator: &Locator, key: &str) -> E2eResult<()> {
        self.actions
            .push(Action::Press(locator.to_string(), key.to_string()));
        Ok(())
    }

    async fn set_input_files(&mut self, locator: &Locator, files: &[PathBuf]) -> E2eResult<()> {
        self.actions
            .push(Action::Upload(locator.to_string(), files.to_vec()));
        Ok(())
    }

    async fn text_content(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        Ok(self.texts.get(&locator.to_string()).cloned())
    }

    async fn inner_text(&mut self, locator: &Locator) -> E2eResult<String> {
        let key = locator.to_string();
        self.texts
            .get(&key)
            .cloned()
            .ok_or(E2eError::Timeout(key))
    }

    async fn input_value(&mut self, locator: &Locator) -> E2eResult<String> {
        Ok(self
            .values
            .get(&locator.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn wait_for(
        &mut self,
        locator: &Locator,
        state: WaitState,
        _timeout: Duration,
    ) -> E2eResult<()> {
        let key = locator.to_string();
        let shown = self.visible.contains(&key);
        let reached = match state {
            WaitState::Visible | WaitState::Attached => shown,
            WaitState::Hidden | WaitState::Detached => !shown,
        };
        if reached {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("{} to be {}", key, state.as_str())))
        }
    }

    async fn wait_for_url(&mut self, pattern: &UrlPattern, _timeout: Duration) -> E2eResult<()> {
        if pattern.matches(&self.url)? {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("URL {}", pattern)))
        }
    }

    async fn wait_for_response(
        &mut self,
        url: &str,
        status: u16,
        _timeout: Duration,
    ) -> E2eResult<()> {
        if self
            .responses
            .iter()
            .any(|(seen, code)| seen.starts_with(url) && *code == status)
        {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("response {}", url)))
        }
    }

    async fn sleep(&mut self, _duration: Duration) -> E2eResult<()> {
        Ok(())
    }

    async fn save_storage_state(&mut self, path: &Path) -> E2eResult<()> {
        self.actions.push(Action::SaveState(path.to_path_buf()));
        std::fs::write(path, r#"{"cookies":[],"origins":[]}"#)?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.actions.push(Action::Close);
        Ok(())
    }
}

/// Hands out pre-scripted pages in order and records context options
#[derive(Debug, Default)]
pub struct FakeBrowser {
    pages: VecDeque<FakePage>,
    pub opened: Vec<ContextOptions>,
}

impl FakeBrowser {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages: pages.into(),
            opened: Vec::new(),
        }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Page = FakePage;

    async fn new_page(&mut self, options: ContextOptions) -> E2eResult<FakePage> {
        self.opened.push(options);
        Ok(self
            .pages
            .pop_front()
            .unwrap_or_else(|| FakePage::at("about:blank")))
    }
}
