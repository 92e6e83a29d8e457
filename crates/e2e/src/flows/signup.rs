//! Seller sign-up, optionally continuing straight into onboarding

use rand::Rng;
use tracing::info;

use crate::config::{E2eConfig, DEFAULT_SELLER_LABEL};
use crate::datagen;
use crate::error::E2eResult;
use crate::login::SellerLogin;
use crate::page::{expect_visible, Browser, ContextOptions, LoadState, Locator, Page, UrlPattern};
use crate::sellers::{Credentials, SellerRegistry};
use crate::session::{answer_otp, wait_for_captcha, SessionStore};
use crate::stepper::{run_stepper, StepContext};

/// Register a new business seller and record it as `lastSignup`
pub async fn signup<B: Browser, R: Rng + ?Sized>(
    browser: &mut B,
    config: &E2eConfig,
    rng: &mut R,
) -> E2eResult<(B::Page, Credentials)> {
    let timeouts = &config.timeouts;
    let mut page = browser.new_page(ContextOptions::default()).await?;
    page.goto(&config.seller_page("sign-up"), timeouts.navigation())
        .await?;
    page.wait_for_load_state(LoadState::DomContentLoaded).await?;
    expect_visible(&mut page, &Locator::heading("Sign up"), timeouts.element()).await?;

    let credentials = Credentials::new(
        datagen::email(rng, &config.signup.email_local, &config.signup.email_domain),
        config.signup.password.clone(),
    );
    info!("New signup email: {}", credentials.email);

    page.fill(&Locator::test_id("emailOrPhone"), &credentials.email)
        .await?;
    page.fill(&Locator::test_id("password"), &credentials.password)
        .await?;
    page.fill(&Locator::test_id("confirmPassword"), &credentials.password)
        .await?;

    wait_for_captcha(&mut page, timeouts.captcha()).await?;
    page.click(&Locator::test_id("signup-submit")).await?;

    answer_otp(
        &mut page,
        &Locator::textbox("Enter OTP *"),
        &config.otp_code,
        timeouts.element(),
        timeouts.element(),
    )
    .await?;

    let mut registry = SellerRegistry::load(&config.sellers_file)?;
    registry.record(DEFAULT_SELLER_LABEL, credentials.clone())?;
    info!("Updated {} with {}", registry.path().display(), DEFAULT_SELLER_LABEL);

    Ok((page, credentials))
}

/// Sign up, persist the new session, then complete the onboarding wizard
pub async fn signup_and_onboard<B: Browser>(
    browser: &mut B,
    ctx: &mut StepContext<'_>,
) -> E2eResult<B::Page> {
    let config = ctx.config;
    let (mut page, credentials) = signup(browser, config, &mut ctx.rng).await?;
    page.wait_for_url(
        &UrlPattern::regex("(welcome|account-management|dashboard)"),
        config.timeouts.step(),
    )
    .await?;

    let store = SessionStore::seller(config, DEFAULT_SELLER_LABEL);
    store.ensure_parent()?;
    page.save_storage_state(store.path()).await?;
    info!("Signup session saved to {}", store.path().display());

    let flow = SellerLogin::onboarding(config, credentials);
    run_stepper(browser, &store, &flow, page, ctx).await
}
