//! Interactive login flows for the seller, admin and buyer apps

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::E2eConfig;
use crate::error::E2eResult;
use crate::page::{
    click_until_visible, expect_url, expect_visible, probe_visible, ContextOptions, Locator,
    LoadState, Page, UrlPattern, WaitState,
};
use crate::session::{answer_otp, wait_for_captcha, LoginFlow};
use crate::sellers::Credentials;

/// Wait for a single buyer login control to react
const BUYER_CLICK_WAIT: Duration = Duration::from_secs(5);
const BUYER_CLICK_ATTEMPTS: usize = 4;

/// Seller app login with CAPTCHA gate and optional OTP
#[derive(Debug, Clone)]
pub struct SellerLogin {
    config: E2eConfig,
    credentials: Credentials,
    landing: &'static str,
    marker: Option<Locator>,
}

impl SellerLogin {
    /// Seller who is expected to have finished onboarding
    pub fn dashboard(config: &E2eConfig, credentials: Credentials) -> Self {
        Self {
            config: config.clone(),
            credentials,
            landing: "dashboard",
            marker: Some(Locator::text("Inventory Management")),
        }
    }

    /// Seller who may be anywhere inside the onboarding wizard
    pub fn onboarding(config: &E2eConfig, credentials: Credentials) -> Self {
        Self {
            config: config.clone(),
            credentials,
            landing: "account-management/account-type",
            marker: None,
        }
    }
}

#[async_trait]
impl LoginFlow for SellerLogin {
    fn name(&self) -> &str {
        "Seller"
    }

    fn protected_url(&self) -> String {
        self.config.seller_page(self.landing)
    }

    async fn login(&self, page: &mut dyn Page) -> E2eResult<()> {
        let timeouts = &self.config.timeouts;
        info!("Logging in seller {}", self.credentials.email);
        page.goto(&self.config.seller_page("sign-in"), timeouts.navigation())
            .await?;
        expect_visible(page, &Locator::heading("Sign in"), timeouts.element()).await?;

        wait_for_captcha(page, timeouts.captcha()).await?;

        page.fill(&Locator::test_id("emailOrPhone"), &self.credentials.email)
            .await?;
        page.fill(&Locator::test_id("password"), &self.credentials.password)
            .await?;
        page.click(&Locator::button("Continue")).await?;

        answer_otp(
            page,
            &Locator::textbox("Enter OTP *"),
            &self.config.otp_code,
            timeouts.short(),
            timeouts.element(),
        )
        .await?;

        page.wait_for_url(
            &UrlPattern::regex("(welcome|account-management|dashboard|stepper)"),
            timeouts.step(),
        )
        .await
    }

    async fn confirm(&self, page: &mut dyn Page) -> E2eResult<()> {
        match &self.marker {
            Some(marker) => expect_visible(page, marker, self.config.timeouts.step()).await,
            None => Ok(()),
        }
    }
}

/// Admin app login; the CAPTCHA is solved by a human before submit lands
#[derive(Debug, Clone)]
pub struct AdminLogin {
    config: E2eConfig,
}

impl AdminLogin {
    pub fn new(config: &E2eConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl LoginFlow for AdminLogin {
    fn name(&self) -> &str {
        "Admin"
    }

    fn protected_url(&self) -> String {
        self.config.admin_page("dashboard")
    }

    async fn login(&self, page: &mut dyn Page) -> E2eResult<()> {
        let config = &self.config;
        config.require_credentials("admin", &config.admin)?;

        page.goto(&config.admin_page("sign-in"), config.timeouts.navigation())
            .await?;
        page.fill(&Locator::test_id("emailOrPhone"), &config.admin.email)
            .await?;
        page.fill(&Locator::test_id("password"), &config.admin.password)
            .await?;
        warn!("Solve Admin CAPTCHA manually...");
        page.click(&Locator::test_id("login-submit")).await
    }

    async fn confirm(&self, page: &mut dyn Page) -> E2eResult<()> {
        expect_visible(
            page,
            &Locator::text("Inventory Management"),
            self.config.timeouts.captcha(),
        )
        .await
    }
}

/// Buyer storefront login through the header modal
///
/// The storefront never redirects anonymous visitors, so a restored session
/// is judged by whether the "Login / Register" entry is still rendered.
#[derive(Debug, Clone)]
pub struct BuyerLogin {
    config: E2eConfig,
}

impl BuyerLogin {
    pub fn new(config: &E2eConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn login_entry() -> Locator {
        Locator::role_any("paragraph").filter_text("Login / Register")
    }
}

#[async_trait]
impl LoginFlow for BuyerLogin {
    fn name(&self) -> &str {
        "Buyer"
    }

    fn protected_url(&self) -> String {
        self.config.buyer_page("/")
    }

    fn context_options(&self) -> ContextOptions {
        let location = &self.config.buyer_location;
        ContextOptions {
            geolocation: Some(location.geolocation()),
            permissions: vec!["geolocation".to_string()],
            init_scripts: vec![location.init_script()],
            ..ContextOptions::default()
        }
    }

    async fn login(&self, page: &mut dyn Page) -> E2eResult<()> {
        let config = &self.config;
        config.require_credentials("buyer", &config.buyer)?;

        page.goto(&config.buyer_page("/"), config.timeouts.navigation())
            .await?;
        page.wait_for_load_state(LoadState::DomContentLoaded).await?;

        let email = Locator::textbox("Phone/Email *");
        click_until_visible(
            page,
            &Self::login_entry(),
            &email,
            BUYER_CLICK_ATTEMPTS,
            BUYER_CLICK_WAIT,
        )
        .await?;
        page.fill(&email, &config.buyer.email).await?;

        let password = Locator::test_id("password");
        click_until_visible(
            page,
            &Locator::button("Continue"),
            &password,
            BUYER_CLICK_ATTEMPTS,
            BUYER_CLICK_WAIT,
        )
        .await?;
        page.fill(&password, &config.buyer.password).await?;
        page.click(&Locator::button("Sign In")).await?;

        page.wait_for_response(&config.profile_api(), 200, config.timeouts.step())
            .await?;
        info!("Buyer profile loaded");
        Ok(())
    }

    async fn confirm(&self, page: &mut dyn Page) -> E2eResult<()> {
        page.wait_for(
            &Self::login_entry(),
            WaitState::Hidden,
            self.config.timeouts.element(),
        )
        .await
    }

    async fn is_signed_out(&self, page: &mut dyn Page) -> bool {
        probe_visible(page, &Self::login_entry()).await
    }
}

/// Assert the seller landed on the dashboard
pub async fn expect_seller_dashboard(page: &mut dyn Page, config: &E2eConfig) -> E2eResult<()> {
    expect_url(page, &UrlPattern::regex("dashboard"), config.timeouts.step()).await
}
