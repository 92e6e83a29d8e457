//! CyberMart E2E Test Framework
//!
//! Browser-driven checks for the CyberMart seller, admin and buyer apps:
//! - Restores saved sessions and logs in again when they expired
//! - Detects the current seller onboarding step and drives the wizard to the
//!   dashboard from wherever it stands
//! - Creates, approves, searches and buys products with randomized data
//! - Controls Playwright through a Node bridge speaking line-delimited JSON
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── Preflight::check_apps()                              │
//! │    ├── PlaywrightBridge::launch() -> impl Browser           │
//! │    └── run_scenarios([Scenario]) -> TestSuiteResult         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  flows                                                      │
//! │    ├── session::bootstrap (restore | expire + re-login)     │
//! │    ├── stepper::run_stepper (detect -> handle -> confirm)   │
//! │    └── product / admin / buyer workflows                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  page::{Page, Browser, Locator}  <- Playwright bridge       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod datagen;
pub mod error;
pub mod flows;
pub mod login;
pub mod page;
pub mod playwright;
pub mod preflight;
pub mod runner;
pub mod sellers;
pub mod session;
pub mod stepper;

#[cfg(test)]
mod testing;

pub use config::E2eConfig;
pub use error::{E2eError, E2eResult};
pub use page::{Browser, Locator, Page};
pub use playwright::{PlaywrightBridge, PlaywrightConfig};
pub use runner::{Scenario, TestRunner};
pub use stepper::{Step, StepContext};
