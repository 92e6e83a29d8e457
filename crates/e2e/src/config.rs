//! Harness configuration: target URLs, file locations, credentials and timeouts

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::page::Geolocation;
use crate::sellers::Credentials;

/// Registry label used when neither the config nor `SELLER` names one
pub const DEFAULT_SELLER_LABEL: &str = "lastSignup";

/// Environment variable selecting the seller registry entry
pub const SELLER_ENV: &str = "SELLER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// Seller app base URL
    pub seller_url: String,

    /// Admin app base URL
    pub admin_url: String,

    /// Buyer storefront base URL
    pub buyer_url: String,

    /// Backend API base URL (only observed through the browser)
    pub api_url: String,

    /// Directory holding session storage-state files
    pub state_dir: PathBuf,

    /// Seller registry file
    pub sellers_file: PathBuf,

    /// Directory of image fixtures used by upload steps
    pub fixtures_dir: PathBuf,

    /// Registry label override; falls back to `SELLER`, then `lastSignup`
    pub seller: Option<String>,

    /// Fixed one-time code accepted by staging
    pub otp_code: String,

    pub admin: Credentials,

    pub buyer: Credentials,

    pub signup: SignupConfig,

    pub timeouts: Timeouts,

    pub stepper: StepperPolicy,

    /// Location injected into the buyer app's local storage
    pub buyer_location: BuyerLocation,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            seller_url: "https://qav2.cybermart.com".to_string(),
            admin_url: "https://qaadminv2.cybermart.com".to_string(),
            buyer_url: "https://qabuyer.cybermart.com".to_string(),
            api_url: "https://qaapi.cybermart.com".to_string(),
            state_dir: PathBuf::from("."),
            sellers_file: PathBuf::from("sellers.json"),
            fixtures_dir: PathBuf::from("test-data/Images"),
            seller: None,
            otp_code: "123456".to_string(),
            admin: Credentials::default(),
            buyer: Credentials::default(),
            signup: SignupConfig::default(),
            timeouts: Timeouts::default(),
            stepper: StepperPolicy::default(),
            buyer_location: BuyerLocation::default(),
        }
    }
}

impl E2eConfig {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Seller registry label for this run
    pub fn seller_label(&self) -> String {
        self.seller
            .clone()
            .or_else(|| std::env::var(SELLER_ENV).ok())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_SELLER_LABEL.to_string())
    }

    pub fn seller_page(&self, path: &str) -> String {
        join_url(&self.seller_url, path)
    }

    pub fn admin_page(&self, path: &str) -> String {
        join_url(&self.admin_url, path)
    }

    pub fn buyer_page(&self, path: &str) -> String {
        join_url(&self.buyer_url, path)
    }

    /// Profile endpoint the buyer app calls once a user is signed in
    pub fn profile_api(&self) -> String {
        join_url(&self.api_url, "/api/v1/user/profile/get-profile")
    }

    pub fn fixture(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join(name)
    }

    /// Reject configurations a flow cannot run with
    pub fn require_credentials(&self, who: &str, creds: &Credentials) -> E2eResult<()> {
        if creds.email.is_empty() || creds.password.is_empty() {
            return Err(E2eError::Config(format!(
                "{} credentials are not configured",
                who
            )));
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupConfig {
    /// Local part prefix; six random letters are appended
    pub email_local: String,
    pub email_domain: String,
    pub password: String,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            email_local: "qa+seller".to_string(),
            email_domain: "cybermart.com".to_string(),
            password: "Cybermart@123".to_string(),
        }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Page navigation on slow staging
    pub navigation_ms: u64,
    /// Manual CAPTCHA solving
    pub captcha_ms: u64,
    /// Arrival of the next wizard step or post-login page
    pub step_ms: u64,
    /// Individual elements becoming visible/enabled
    pub element_ms: u64,
    /// Optional interstitials such as the OTP modal
    pub short_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 180_000,
            captcha_ms: 180_000,
            step_ms: 60_000,
            element_ms: 30_000,
            short_ms: 5_000,
        }
    }
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn captcha(&self) -> Duration {
        Duration::from_millis(self.captcha_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn short(&self) -> Duration {
        Duration::from_millis(self.short_ms)
    }
}

/// Bounds for the onboarding wizard driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperPolicy {
    /// Clicks of the advance control before giving up
    pub max_attempts: usize,
    /// Pause between advance attempts
    pub retry_pause_ms: u64,
    /// How long to look for the OTP modal after each click
    pub otp_wait_ms: u64,
    /// How long to wait for the OTP modal to close after verifying
    pub otp_close_ms: u64,
    /// Step handlers run before the wizard is considered stuck
    pub max_transitions: usize,
}

impl Default for StepperPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_pause_ms: 1_000,
            otp_wait_ms: 5_000,
            otp_close_ms: 15_000,
            max_transitions: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuyerLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub state_name: String,
    pub country_name: String,
}

impl Default for BuyerLocation {
    fn default() -> Self {
        Self {
            latitude: 24.8607,
            longitude: 67.0011,
            accuracy: 100.0,
            state_name: "Sindh".to_string(),
            country_name: "Pakistan".to_string(),
        }
    }
}

impl BuyerLocation {
    pub fn geolocation(&self) -> Geolocation {
        Geolocation {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
        }
    }

    /// Init script seeding the storefront's persisted location store
    pub fn init_script(&self) -> String {
        let store = serde_json::json!({
            "state": {
                "coords": { "lat": self.latitude, "lng": self.longitude },
                "locationStateName": self.state_name,
                "locationCountryName": self.country_name,
            }
        });
        format!(
            "localStorage.setItem('user-location-storage', {});",
            serde_json::Value::String(store.to_string())
        )
    }
}
