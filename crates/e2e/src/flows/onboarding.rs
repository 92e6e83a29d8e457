//! Resume onboarding for an existing registry seller

use tracing::info;

use super::seller_login::seller_credentials;
use crate::error::E2eResult;
use crate::login::SellerLogin;
use crate::page::Browser;
use crate::session::{bootstrap, SessionStore};
use crate::stepper::{run_stepper, StepContext};

/// Log in as the selected seller and finish the wizard from wherever it is
pub async fn continue_onboarding<B: Browser>(
    browser: &mut B,
    ctx: &mut StepContext<'_>,
) -> E2eResult<B::Page> {
    let config = ctx.config;
    let label = config.seller_label();
    let credentials = seller_credentials(config, &label)?;
    let store = SessionStore::seller(config, &label);
    let flow = SellerLogin::onboarding(config, credentials);

    let session = bootstrap(browser, &store, &flow, config).await?;
    info!("Seller {} session {:?}, resuming stepper", label, session.status);
    run_stepper(browser, &store, &flow, session.page, ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::E2eConfig;
    use crate::page::Locator;
    use crate::testing::{Effect, FakeBrowser, FakePage};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_expired_session_relogs_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let config = E2eConfig {
            state_dir: dir.path().to_path_buf(),
            sellers_file: dir.path().join("sellers.json"),
            seller: Some("seller2".to_string()),
            ..E2eConfig::default()
        };
        std::fs::write(
            &config.sellers_file,
            r#"{"seller2":{"email":"b@cybermart.com","password":"pw"}}"#,
        )
        .unwrap();
        let store = SessionStore::seller(&config, "seller2");
        std::fs::write(store.path(), "{}").unwrap();

        let landing = config.seller_page("account-management/account-type");
        let stale = FakePage::at("about:blank").redirect(&landing, &config.seller_page("sign-in"));
        let fresh = FakePage::at("about:blank")
            .show(&Locator::heading("Sign in"))
            .with_value(
                &Locator::css("textarea[name=\"g-recaptcha-response\"]"),
                "token",
            )
            .on_click(
                &Locator::button("Continue"),
                vec![Effect::Navigate(config.seller_page("dashboard"))],
            );
        let mut browser = FakeBrowser::new(vec![stale, fresh]);
        let mut ctx =
            StepContext::seeded(&config, 9, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());

        let page = continue_onboarding(&mut browser, &mut ctx).await.unwrap();

        assert_eq!(page.url, config.seller_page("dashboard"));
        assert_eq!(browser.opened.len(), 2);
        assert!(browser.opened[1].storage_state.is_none());
        assert!(store.exists());
    }
}
