//! Admin review of seller products

use std::time::Duration;

use tracing::info;

use crate::config::E2eConfig;
use crate::error::E2eResult;
use crate::login::AdminLogin;
use crate::page::{expect_visible, Browser, Locator, Page, TextMatch};
use crate::session::{bootstrap, Session, SessionStore};

const ROW_TIMEOUT: Duration = Duration::from_secs(30);
const RESULTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Restore or create the admin session
pub async fn admin_session<B: Browser>(
    browser: &mut B,
    config: &E2eConfig,
) -> E2eResult<Session<B::Page>> {
    let store = SessionStore::admin(config);
    bootstrap(browser, &store, &AdminLogin::new(config), config).await
}

/// Approve the pending product whose row mentions `product_name`
pub async fn approve_product(page: &mut dyn Page, product_name: &str) -> E2eResult<()> {
    page.click(&Locator::button("Inventory Management")).await?;

    let row = Locator::role(
        "row",
        TextMatch::regex_i(regex::escape(product_name)),
    );
    expect_visible(page, &row, ROW_TIMEOUT).await?;
    page.click(&row.locate(Locator::label("icon-button"))).await?;

    page.click(&Locator::role("menuitem", "Review")).await?;
    // Approve, then confirm in the dialog
    let approve = Locator::button("Approve");
    page.click(&approve).await?;
    page.click(&approve).await?;

    info!("Product [{}] approved successfully by Admin", product_name);
    Ok(())
}

/// Search the inventory and assert an active variation of `product_name`
pub async fn search_product(page: &mut dyn Page, product_name: &str) -> E2eResult<()> {
    page.click(&Locator::role("link", "Inventory Management"))
        .await?;

    let search = Locator::textbox("Search by product name, UPC, CSIN");
    page.click(&search).await?;
    page.fill(&search, product_name).await?;
    page.click(&Locator::button("Search")).await?;

    let results = Locator::css_with_text("table", "Product Name");
    expect_visible(page, &results, RESULTS_TIMEOUT).await?;
    expect_visible(
        page,
        &results.locate(Locator::css("tr")).nth(1),
        RESULTS_TIMEOUT,
    )
    .await?;

    let variations = Locator::text("View all variations").first();
    expect_visible(page, &variations, RESULTS_TIMEOUT).await?;
    page.click(&variations).await?;

    let active = Locator::css("tr")
        .filter_text(product_name)
        .filter_text("Active");
    expect_visible(page, &active, ROW_TIMEOUT).await?;

    info!("Product [{}] status is Active", product_name);
    Ok(())
}
