//! Seller login check

use tracing::info;

use crate::config::E2eConfig;
use crate::error::E2eResult;
use crate::login::{expect_seller_dashboard, SellerLogin};
use crate::page::Browser;
use crate::sellers::{Credentials, SellerRegistry};
use crate::session::{bootstrap, Session, SessionStore};

/// Credentials stored under `label` in the configured registry
pub fn seller_credentials(config: &E2eConfig, label: &str) -> E2eResult<Credentials> {
    let registry = SellerRegistry::load(&config.sellers_file)?;
    let credentials = registry.get(label)?.clone();
    info!("Using seller type: {}", label);
    info!("Email: {}", credentials.email);
    Ok(credentials)
}

/// Restore or create the selected seller's session and land on the dashboard
pub async fn seller_login<B: Browser>(
    browser: &mut B,
    config: &E2eConfig,
) -> E2eResult<Session<B::Page>> {
    let label = config.seller_label();
    let credentials = seller_credentials(config, &label)?;
    let store = SessionStore::seller(config, &label);
    let flow = SellerLogin::dashboard(config, credentials);

    let mut session = bootstrap(browser, &store, &flow, config).await?;
    expect_seller_dashboard(&mut session.page, config).await?;
    info!("Seller {} is on the dashboard ({:?})", label, session.status);
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::page::Locator;
    use crate::session::SessionStatus;
    use crate::testing::{FakeBrowser, FakePage};

    fn config_in(dir: &std::path::Path) -> E2eConfig {
        E2eConfig {
            state_dir: dir.to_path_buf(),
            sellers_file: dir.join("sellers.json"),
            seller: Some("lastSignup".to_string()),
            ..E2eConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_label_fails_before_browser_opens() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.seller = Some("seller3".to_string());
        std::fs::write(
            &config.sellers_file,
            r#"{"lastSignup":{"email":"a@cybermart.com","password":"x"}}"#,
        )
        .unwrap();
        let mut browser = FakeBrowser::new(vec![]);

        let err = seller_login(&mut browser, &config).await.unwrap_err();

        assert!(matches!(err, E2eError::SellerNotFound { ref label, .. } if label == "seller3"));
        assert!(browser.opened.is_empty());
    }

    #[tokio::test]
    async fn test_saved_session_lands_on_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(
            &config.sellers_file,
            r#"{"lastSignup":{"email":"a@cybermart.com","password":"x"}}"#,
        )
        .unwrap();
        let store = SessionStore::seller(&config, "lastSignup");
        std::fs::write(store.path(), "{}").unwrap();

        let page = FakePage::at("about:blank").show(&Locator::text("Inventory Management"));
        let mut browser = FakeBrowser::new(vec![page]);

        let session = seller_login(&mut browser, &config).await.unwrap();

        assert_eq!(session.status, SessionStatus::Restored);
        assert_eq!(session.page.url, config.seller_page("dashboard"));
        assert_eq!(
            browser.opened[0].storage_state.as_deref(),
            Some(store.path())
        );
    }
}
