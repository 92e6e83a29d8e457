//! Seller onboarding wizard: step detection, resumption and the advance driver
//!
//! The current step is never stored. It is recomputed from the URL, and for
//! the ambiguous pages from visible headings, every time the driver needs it,
//! so an interrupted run resumes wherever the app says the seller is.

pub mod datepicker;
mod handlers;

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::page::{
    expect_enabled, expect_url, probe_visible, Browser, ClickOptions, LoadState, Locator, Page,
    TextMatch, UrlPattern,
};
use crate::session::{answer_otp, ensure_valid_session, is_sign_in_url, LoginFlow, SessionStore};

pub use handlers::handle_step;

/// Wizard pages in the order the app presents them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Welcome,
    AccountType,
    BusinessInformation,
    PrimaryContactInformation,
    PaymentInformation,
    StoreAndProductInformation,
    IdentityAndAddressVerification,
    IdentityVerification,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::Welcome,
        Step::AccountType,
        Step::BusinessInformation,
        Step::PrimaryContactInformation,
        Step::PaymentInformation,
        Step::StoreAndProductInformation,
        Step::IdentityAndAddressVerification,
        Step::IdentityVerification,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            Step::Welcome => "Welcome",
            Step::AccountType => "Account Type",
            Step::BusinessInformation => "Business Information",
            Step::PrimaryContactInformation => "Primary Contact Information",
            Step::PaymentInformation => "Payment Information",
            Step::StoreAndProductInformation => "Store and Product Information",
            Step::IdentityAndAddressVerification => "Identity and Address Verification",
            Step::IdentityVerification => "Identity Verification",
        }
    }

    /// Steps addressed unambiguously by `?step=N`
    pub fn from_query_index(index: u32) -> Option<Step> {
        match index {
            0 => Some(Step::BusinessInformation),
            1 => Some(Step::PrimaryContactInformation),
            2 => Some(Step::PaymentInformation),
            3 => Some(Step::StoreAndProductInformation),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

/// What the URL alone says about the wizard position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlClass {
    SignIn,
    Fixed(Step),
    /// `step=4`: one of the two verification pages, decided by heading
    VerificationVariant,
    Welcome,
    /// Account type page without a `step` query; only valid with its heading
    AccountTypeCandidate,
    Dashboard,
    Unknown,
}

fn step_query() -> &'static Regex {
    static STEP_QUERY: OnceLock<Regex> = OnceLock::new();
    STEP_QUERY.get_or_init(|| Regex::new(r"[?&]step=(\d+)").expect("static regex"))
}

/// Classify a wizard URL; checks run in priority order
pub fn classify_url(url: &str) -> UrlClass {
    if is_sign_in_url(url) {
        return UrlClass::SignIn;
    }

    if let Some(caps) = step_query().captures(url) {
        return match caps[1].parse::<u32>() {
            Ok(4) => UrlClass::VerificationVariant,
            Ok(index) => Step::from_query_index(index)
                .map(UrlClass::Fixed)
                .unwrap_or(UrlClass::Unknown),
            Err(_) => UrlClass::Unknown,
        };
    }

    if url.contains("/welcome") {
        UrlClass::Welcome
    } else if url.contains("/account-management/account-type") {
        UrlClass::AccountTypeCandidate
    } else if url.contains("/dashboard") {
        UrlClass::Dashboard
    } else {
        UrlClass::Unknown
    }
}

fn verification_heading(name: &str) -> Locator {
    Locator::heading(TextMatch::regex_i(name)).level(6)
}

/// Current wizard step; `None` once the seller has reached the dashboard
pub async fn detect_step(page: &mut dyn Page) -> E2eResult<Option<Step>> {
    page.wait_for_load_state(LoadState::NetworkIdle).await?;
    let url = page.url().await?;

    match classify_url(&url) {
        UrlClass::SignIn => {
            warn!("Session expired, redirected to {}", url);
            Err(E2eError::SessionExpired { url })
        }
        UrlClass::Fixed(step) => Ok(Some(step)),
        UrlClass::VerificationVariant => {
            if probe_visible(page, &verification_heading("Identity and Address Verification")).await
            {
                Ok(Some(Step::IdentityAndAddressVerification))
            } else if probe_visible(page, &verification_heading("Identity Verification")).await {
                Ok(Some(Step::IdentityVerification))
            } else {
                Err(E2eError::UnknownStep { url })
            }
        }
        UrlClass::Welcome => Ok(Some(Step::Welcome)),
        UrlClass::AccountTypeCandidate => {
            if probe_visible(page, &Locator::heading("Account Type")).await {
                Ok(Some(Step::AccountType))
            } else {
                Err(E2eError::UnknownStep { url })
            }
        }
        UrlClass::Dashboard => {
            info!("Seller already completed stepper, now on dashboard");
            Ok(None)
        }
        UrlClass::Unknown => Err(E2eError::UnknownStep { url }),
    }
}

/// The wizard's generic advance control
pub fn save_and_next() -> Locator {
    Locator::button(TextMatch::regex_i("Continue|Save|Save and Next|Save & Next")).first()
}

fn describe(step: Option<Step>) -> String {
    step.map(|s| s.heading().to_string())
        .unwrap_or_else(|| "Dashboard".to_string())
}

/// Click `control` until the wizard reports one of `expected`
///
/// Each attempt force-clicks, answers an OTP interstitial if one shows up,
/// and re-detects the step. At most `stepper.max_attempts` clicks are made.
pub async fn advance_and_confirm(
    page: &mut dyn Page,
    control: &Locator,
    expected: &[Option<Step>],
    config: &E2eConfig,
) -> E2eResult<Option<Step>> {
    let policy = &config.stepper;
    let attempts = policy.max_attempts.max(1);
    let otp_field = Locator::placeholder("Enter OTP *");

    expect_enabled(page, control, config.timeouts.element()).await?;

    let mut observed = String::from("nothing");
    for attempt in 1..=attempts {
        info!("Clicking {} (attempt {})", control, attempt);
        page.click_with(control, ClickOptions { force: true }).await?;

        if let Err(e) = answer_otp(
            page,
            &otp_field,
            &config.otp_code,
            Duration::from_millis(policy.otp_wait_ms),
            Duration::from_millis(policy.otp_close_ms),
        )
        .await
        {
            warn!("OTP handling failed: {}", e);
        }

        match detect_step(page).await {
            Ok(detected) => {
                debug!(
                    "After click: expected one of {:?}, detected {}",
                    expected,
                    describe(detected)
                );
                if expected.contains(&detected) {
                    return Ok(detected);
                }
                observed = describe(detected);
            }
            Err(E2eError::UnknownStep { url }) => observed = format!("unknown page {}", url),
            Err(e) => return Err(e),
        }

        if attempt < attempts {
            page.sleep(Duration::from_millis(policy.retry_pause_ms)).await?;
        }
    }

    Err(E2eError::AdvanceFailed {
        expected: expected
            .iter()
            .map(|s| describe(*s))
            .collect::<Vec<_>>()
            .join(" or "),
        observed,
        attempts,
    })
}

/// Per-run inputs shared by the step handlers
pub struct StepContext<'a> {
    pub config: &'a E2eConfig,
    pub rng: StdRng,
    pub today: NaiveDate,
}

impl<'a> StepContext<'a> {
    pub fn new(config: &'a E2eConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Reproducible data for a given seed and date
    pub fn seeded(config: &'a E2eConfig, seed: u64, today: NaiveDate) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            today,
        }
    }
}

/// Drive the wizard from wherever it currently is to the dashboard
///
/// Before each transition the session is re-validated; an expiry detected
/// mid-step triggers a fresh login and the loop resumes from the detected
/// step. `stepper.max_transitions` bounds the number of handled steps.
pub async fn run_stepper<B: Browser>(
    browser: &mut B,
    store: &SessionStore,
    flow: &dyn LoginFlow,
    page: B::Page,
    ctx: &mut StepContext<'_>,
) -> E2eResult<B::Page> {
    let max_transitions = ctx.config.stepper.max_transitions;
    let mut page = page;

    for _ in 0..max_transitions {
        page = ensure_valid_session(browser, store, flow, page).await?;

        let step = match detect_step(&mut page).await {
            Ok(Some(step)) => step,
            Ok(None) => {
                info!("Stepper flow completed, now on dashboard");
                expect_url(
                    &mut page,
                    &UrlPattern::regex("dashboard"),
                    ctx.config.timeouts.step(),
                )
                .await?;
                return Ok(page);
            }
            Err(e) if e.is_session_expired() => continue,
            Err(e) => return Err(e),
        };

        info!("Current step: {}", step);
        match handle_step(&mut page, step, ctx).await {
            Ok(()) => {}
            Err(e) if e.is_session_expired() => {
                warn!("Session expired during {}, resuming after login", step);
            }
            Err(e) => return Err(e),
        }
    }

    let url = page.url().await.unwrap_or_default();
    Err(E2eError::StepFailed {
        step: "onboarding".to_string(),
        reason: format!(
            "dashboard not reached after {} transitions (stuck at {})",
            max_transitions, url
        ),
    })
}
