//! Session bootstrap: restore a persisted storage state or log in interactively
//!
//! A session file is trusted until navigating to a protected page lands on a
//! sign-in URL. Expired files are deleted before logging in again, and every
//! successful interactive login rewrites the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::page::{expect_enabled, Browser, ContextOptions, LoadState, Locator, Page, WaitState};

/// Poll interval for the manual CAPTCHA gate
const CAPTCHA_POLL: Duration = Duration::from_secs(1);

/// One storage-state file on disk
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `auth-<label>.json` for a seller registry label
    pub fn seller(config: &E2eConfig, label: &str) -> Self {
        Self::new(config.state_dir.join(format!("auth-{}.json", label)))
    }

    pub fn admin(config: &E2eConfig) -> Self {
        Self::new(config.state_dir.join("admin-auth.json"))
    }

    pub fn buyer(config: &E2eConfig) -> Self {
        Self::new(config.state_dir.join("buyer-session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Delete the file; returns whether there was one
    pub fn remove(&self) -> E2eResult<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn ensure_parent(&self) -> E2eResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Role-specific interactive login
#[async_trait]
pub trait LoginFlow: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Page whose content only an authenticated user can see
    fn protected_url(&self) -> String;

    /// Options for every context this flow opens
    fn context_options(&self) -> ContextOptions {
        ContextOptions::default()
    }

    /// Drive the login UI on a fresh, unauthenticated page
    async fn login(&self, page: &mut dyn Page) -> E2eResult<()>;

    /// Assert protected content is visible
    async fn confirm(&self, page: &mut dyn Page) -> E2eResult<()>;

    /// Apps that do not redirect anonymous users can report a signed-out page here
    async fn is_signed_out(&self, _page: &mut dyn Page) -> bool {
        false
    }
}

/// How the page returned by [`bootstrap`] was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session file; logged in interactively
    Fresh,
    /// Session file restored and still valid
    Restored,
    /// Session file was stale, deleted, and replaced by a new login
    Renewed,
}

#[derive(Debug)]
pub struct Session<P> {
    pub page: P,
    pub status: SessionStatus,
}

/// Sign-in redirects used by all three apps
pub fn is_sign_in_url(url: &str) -> bool {
    url.contains("sign-in") || url.contains("login")
}

/// Produce an authenticated page for `flow`, reusing `store` when it is valid
pub async fn bootstrap<B: Browser>(
    browser: &mut B,
    store: &SessionStore,
    flow: &dyn LoginFlow,
    config: &E2eConfig,
) -> E2eResult<Session<B::Page>> {
    if !store.exists() {
        info!("No saved {} session at {}", flow.name(), store.path().display());
        let page = fresh_login(browser, store, flow).await?;
        return Ok(Session {
            page,
            status: SessionStatus::Fresh,
        });
    }

    let options = ContextOptions {
        storage_state: Some(store.path().to_path_buf()),
        ..flow.context_options()
    };
    let mut page = browser.new_page(options).await?;
    page.goto(&flow.protected_url(), config.timeouts.navigation())
        .await?;
    page.wait_for_load_state(LoadState::NetworkIdle).await?;

    let url = page.url().await?;
    if is_sign_in_url(&url) || flow.is_signed_out(&mut page).await {
        warn!(
            "{} session expired ({}), deleting {}",
            flow.name(),
            url,
            store.path().display()
        );
        store.remove()?;
        page.close().await?;
        let page = fresh_login(browser, store, flow).await?;
        return Ok(Session {
            page,
            status: SessionStatus::Renewed,
        });
    }

    flow.confirm(&mut page).await?;
    info!("{} logged in with saved session", flow.name());
    Ok(Session {
        page,
        status: SessionStatus::Restored,
    })
}

/// Re-authenticate when the app bounced the page to sign-in mid-flow
pub async fn ensure_valid_session<B: Browser>(
    browser: &mut B,
    store: &SessionStore,
    flow: &dyn LoginFlow,
    mut page: B::Page,
) -> E2eResult<B::Page> {
    match page.url().await {
        Ok(url) if !is_sign_in_url(&url) => return Ok(page),
        Ok(url) => {
            warn!("Session expired at {}, doing fresh login", url);
            store.remove()?;
        }
        // The page is unusable but the saved session may still be good
        Err(e) => warn!("Failed session check ({}), doing fresh login", e),
    }

    if let Err(e) = page.close().await {
        debug!("Closing stale page failed: {}", e);
    }
    fresh_login(browser, store, flow).await
}

async fn fresh_login<B: Browser>(
    browser: &mut B,
    store: &SessionStore,
    flow: &dyn LoginFlow,
) -> E2eResult<B::Page> {
    let mut page = browser.new_page(flow.context_options()).await?;
    flow.login(&mut page).await?;
    flow.confirm(&mut page).await?;

    store.ensure_parent()?;
    page.save_storage_state(store.path()).await?;
    info!("{} auth saved to {}", flow.name(), store.path().display());
    Ok(page)
}

/// Block until a human solves the reCAPTCHA widget
pub async fn wait_for_captcha(page: &mut dyn Page, timeout: Duration) -> E2eResult<()> {
    let response = Locator::css("textarea[name=\"g-recaptcha-response\"]");
    warn!("Solve reCAPTCHA manually...");

    let polls = (timeout.as_millis() / CAPTCHA_POLL.as_millis()).max(1);
    for _ in 0..polls {
        let value = page.input_value(&response).await.unwrap_or_default();
        if !value.is_empty() {
            info!("reCAPTCHA solved");
            return Ok(());
        }
        page.sleep(CAPTCHA_POLL).await?;
    }

    Err(E2eError::Timeout(format!(
        "reCAPTCHA to be solved ({:?})",
        timeout
    )))
}

/// Answer a one-time-code challenge if `field` shows up within `appear_within`
///
/// Returns whether a challenge was answered. A modal that stays open after
/// verifying is logged, not raised; the caller's next state check decides.
pub async fn answer_otp(
    page: &mut dyn Page,
    field: &Locator,
    code: &str,
    appear_within: Duration,
    close_within: Duration,
) -> E2eResult<bool> {
    if page
        .wait_for(field, WaitState::Visible, appear_within)
        .await
        .is_err()
    {
        return Ok(false);
    }

    info!("OTP required, entering code...");
    page.fill(field, code).await?;

    let verify = Locator::button(crate::page::TextMatch::regex_i("Verify"));
    expect_enabled(page, &verify, appear_within).await?;
    page.click(&verify).await?;

    match page.wait_for(field, WaitState::Detached, close_within).await {
        Ok(()) => info!("OTP verified"),
        Err(e) => warn!("OTP modal still open after verify: {}", e),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Action, FakeBrowser, FakePage};

    const PROTECTED: &str = "https://qav2.cybermart.com/dashboard";
    const SIGN_IN: &str = "https://qav2.cybermart.com/sign-in";

    struct ScriptedLogin;

    #[async_trait]
    impl LoginFlow for ScriptedLogin {
        fn name(&self) -> &str {
            "seller"
        }

        fn protected_url(&self) -> String {
            PROTECTED.to_string()
        }

        async fn login(&self, page: &mut dyn Page) -> E2eResult<()> {
            page.goto(SIGN_IN, Duration::from_secs(1)).await?;
            page.fill(&Locator::test_id("emailOrPhone"), "a@b.com").await?;
            page.click(&Locator::button("Continue")).await
        }

        async fn confirm(&self, page: &mut dyn Page) -> E2eResult<()> {
            crate::page::expect_visible(page, &Locator::text("Inventory Management"), Duration::from_secs(1)).await
        }
    }

    fn login_page() -> FakePage {
        FakePage::at("about:blank")
            .on_click(
                &Locator::button("Continue"),
                vec![
                    crate::testing::Effect::Navigate(PROTECTED.to_string()),
                    crate::testing::Effect::Show(Locator::text("Inventory Management")),
                ],
            )
    }

    #[tokio::test]
    async fn test_fresh_login_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("auth-lastSignup.json"));
        let mut browser = FakeBrowser::new(vec![login_page()]);

        let session = bootstrap(&mut browser, &store, &ScriptedLogin, &E2eConfig::default())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Fresh);
        assert!(store.exists());
        assert!(session
            .page
            .actions
            .contains(&Action::SaveState(store.path().to_path_buf())));
        assert_eq!(browser.opened[0].storage_state, None);
    }

    #[tokio::test]
    async fn test_valid_session_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("auth.json"));
        std::fs::write(store.path(), "{}").unwrap();

        let restored = FakePage::at("about:blank").show(&Locator::text("Inventory Management"));
        let mut browser = FakeBrowser::new(vec![restored]);

        let session = bootstrap(&mut browser, &store, &ScriptedLogin, &E2eConfig::default())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Restored);
        assert_eq!(browser.opened.len(), 1);
        assert_eq!(
            browser.opened[0].storage_state.as_deref(),
            Some(store.path())
        );
        assert!(!session
            .page
            .actions
            .iter()
            .any(|a| matches!(a, Action::SaveState(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_deleted_and_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("auth.json"));
        std::fs::write(store.path(), "stale").unwrap();

        let stale = FakePage::at("about:blank").redirect(PROTECTED, SIGN_IN);
        let mut browser = FakeBrowser::new(vec![stale, login_page()]);

        let session = bootstrap(&mut browser, &store, &ScriptedLogin, &E2eConfig::default())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Renewed);
        assert_eq!(browser.opened.len(), 2);
        assert_eq!(browser.opened[1].storage_state, None);
        // Rewritten by the fresh login, not the stale content
        assert_ne!(std::fs::read_to_string(store.path()).unwrap(), "stale");
    }

    #[tokio::test]
    async fn test_ensure_valid_session_relogs_on_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("auth.json"));
        std::fs::write(store.path(), "old").unwrap();
        let mut browser = FakeBrowser::new(vec![login_page()]);

        let kept = ensure_valid_session(&mut browser, &store, &ScriptedLogin, FakePage::at(PROTECTED))
            .await
            .unwrap();
        assert_eq!(kept.url, PROTECTED);
        assert!(browser.opened.is_empty());

        let renewed = ensure_valid_session(&mut browser, &store, &ScriptedLogin, FakePage::at(SIGN_IN))
            .await
            .unwrap();
        assert_eq!(renewed.url, PROTECTED);
        assert_eq!(browser.opened.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_valid_session_keeps_store_when_page_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("auth.json"));
        std::fs::write(store.path(), "saved").unwrap();

        // Fresh login never reaches the dashboard
        let mut browser = FakeBrowser::new(vec![FakePage::at("about:blank")]);
        let broken = FakePage::at(PROTECTED).failing_url("bridge closed");

        let err = ensure_valid_session(&mut browser, &store, &ScriptedLogin, broken)
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::Timeout(_)));
        assert_eq!(browser.opened.len(), 1);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "saved");
    }

    #[tokio::test]
    async fn test_ensure_valid_session_relogs_after_broken_page() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("auth.json"));
        std::fs::write(store.path(), "saved").unwrap();
        let mut browser = FakeBrowser::new(vec![login_page()]);
        let broken = FakePage::at(PROTECTED).failing_url("bridge closed");

        let renewed = ensure_valid_session(&mut browser, &store, &ScriptedLogin, broken)
            .await
            .unwrap();

        assert_eq!(renewed.url, PROTECTED);
        assert_eq!(browser.opened.len(), 1);
        assert!(renewed
            .actions
            .contains(&Action::SaveState(store.path().to_path_buf())));
    }

    #[tokio::test]
    async fn test_captcha_gate_times_out() {
        let mut page = FakePage::at(SIGN_IN);
        let err = wait_for_captcha(&mut page, Duration::from_secs(3)).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout(_)));

        let solved = Locator::css("textarea[name=\"g-recaptcha-response\"]");
        let mut page = FakePage::at(SIGN_IN).with_value(&solved, "token");
        wait_for_captcha(&mut page, Duration::from_secs(3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_otp_absent_is_not_an_error() {
        let field = Locator::placeholder("Enter OTP *");
        let mut page = FakePage::at(PROTECTED);
        let answered = answer_otp(&mut page, &field, "123456", Duration::from_secs(1), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!answered);
        assert!(page.actions.is_empty());
    }
}
