//! Scenario runner: executes workflows in order and records their outcome

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::flows::{
    admin_session, approve_product, continue_onboarding, create_product, place_order,
    search_product, seller_login, signup, signup_and_onboard, ProductOptions,
};
use crate::page::{Browser, Page};
use crate::playwright::PlaywrightConfig;
use crate::stepper::StepContext;

/// Workflows the harness can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    SellerLogin,
    Signup,
    SignupAndOnboard,
    Onboarding,
    CreateProduct,
    CreateCustomizableProduct,
    ApproveProduct,
    SearchProduct,
    PlaceOrder,
}

impl Scenario {
    pub const ALL: [Scenario; 9] = [
        Scenario::SellerLogin,
        Scenario::Signup,
        Scenario::SignupAndOnboard,
        Scenario::Onboarding,
        Scenario::CreateProduct,
        Scenario::CreateCustomizableProduct,
        Scenario::ApproveProduct,
        Scenario::SearchProduct,
        Scenario::PlaceOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::SellerLogin => "seller-login",
            Scenario::Signup => "signup",
            Scenario::SignupAndOnboard => "signup-onboard",
            Scenario::Onboarding => "onboarding",
            Scenario::CreateProduct => "create-product",
            Scenario::CreateCustomizableProduct => "create-customizable-product",
            Scenario::ApproveProduct => "approve-product",
            Scenario::SearchProduct => "search-product",
            Scenario::PlaceOrder => "place-order",
        }
    }

    /// Whether the scenario operates on an existing product
    pub fn needs_product(&self) -> bool {
        matches!(
            self,
            Scenario::ApproveProduct | Scenario::SearchProduct | Scenario::PlaceOrder
        )
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
                E2eError::Config(format!(
                    "unknown scenario '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub e2e: E2eConfig,
    pub playwright: PlaywrightConfig,
    /// Product used by approve/search/checkout when no earlier scenario created one
    pub product: Option<String>,
    /// Seed for reproducible generated data; entropy when unset
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            e2e: E2eConfig::default(),
            playwright: PlaywrightConfig::default(),
            product: None,
            seed: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
    /// Product name carried from a create scenario to the ones after it
    product: Option<String>,
}

impl TestRunner {
    pub fn with_config(config: RunnerConfig) -> Self {
        let product = config.product.clone();
        Self { config, product }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Product the next product-bound scenario will use
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    fn step_context(&self) -> StepContext<'_> {
        match self.config.seed {
            Some(seed) => StepContext::seeded(
                &self.config.e2e,
                seed,
                chrono::Local::now().date_naive(),
            ),
            None => StepContext::new(&self.config.e2e),
        }
    }

    /// Run scenarios in order; a failure is recorded and the next one still runs
    pub async fn run_scenarios<B: Browser>(
        &mut self,
        browser: &mut B,
        scenarios: &[Scenario],
    ) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for &scenario in scenarios {
            if scenario.needs_product() && self.product.is_none() {
                skipped += 1;
                warn!("- {} skipped: no product name available", scenario);
                results.push(TestResult {
                    name: scenario.to_string(),
                    success: false,
                    duration_ms: 0,
                    error: Some(
                        "skipped: no product name (pass --product or create one first)"
                            .to_string(),
                    ),
                });
                continue;
            }

            let result = self.run_scenario(browser, scenario).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(TestSuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    /// Run one scenario, timing it and capturing its error
    pub async fn run_scenario<B: Browser>(
        &mut self,
        browser: &mut B,
        scenario: Scenario,
    ) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario);

        let outcome = self.execute(browser, scenario).await;

        TestResult {
            name: scenario.to_string(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    async fn execute<B: Browser>(&mut self, browser: &mut B, scenario: Scenario) -> E2eResult<()> {
        let config = &self.config.e2e;
        let mut page = match scenario {
            Scenario::SellerLogin => seller_login(browser, config).await?.page,
            Scenario::Signup => {
                let mut ctx = self.step_context();
                let (page, credentials) = signup(browser, config, &mut ctx.rng).await?;
                info!("Signed up {}", credentials.email);
                page
            }
            Scenario::SignupAndOnboard => {
                let mut ctx = self.step_context();
                signup_and_onboard(browser, &mut ctx).await?
            }
            Scenario::Onboarding => {
                let mut ctx = self.step_context();
                continue_onboarding(browser, &mut ctx).await?
            }
            Scenario::CreateProduct | Scenario::CreateCustomizableProduct => {
                let options = ProductOptions {
                    customizable: scenario == Scenario::CreateCustomizableProduct,
                };
                let mut ctx = self.step_context();
                let (page, name) =
                    create_product(browser, config, options, &mut ctx.rng, ctx.today).await?;
                self.product = Some(name);
                page
            }
            Scenario::ApproveProduct => {
                let name = self.require_product()?;
                let mut page = admin_session(browser, config).await?.page;
                approve_product(&mut page, &name).await?;
                page
            }
            Scenario::SearchProduct => {
                let name = self.require_product()?;
                let mut page = admin_session(browser, config).await?.page;
                search_product(&mut page, &name).await?;
                page
            }
            Scenario::PlaceOrder => {
                let name = self.require_product()?;
                let mut rng = match self.config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                let order = place_order(browser, config, &name, &mut rng).await?;
                info!("Order {} placed for {}", order.order_no, name);
                return Ok(());
            }
        };

        if let Err(e) = page.close().await {
            debug!("Closing page after {} failed: {}", scenario, e);
        }
        Ok(())
    }

    fn require_product(&self) -> E2eResult<String> {
        self.product
            .clone()
            .ok_or_else(|| E2eError::Config("no product name available".to_string()))
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
