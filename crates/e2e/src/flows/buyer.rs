//! Buyer checkout and order-total reconciliation

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::login::BuyerLogin;
use crate::page::{expect_visible, Browser, Locator, Page, TextMatch, UrlPattern};
use crate::session::{bootstrap, SessionStore};

/// Stripe test card accepted by the hosted checkout
const CARD_NUMBER: &str = "4242 4242 4242 4242";
const CARD_EXPIRY: &str = "11 / 29";
const CARD_CVC: &str = "111";
const CARDHOLDER: &str = "Testing";

/// The four amounts shown at checkout and again on the order page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub item_total: String,
    pub shipping: String,
    pub shipping_discount: String,
    pub total: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_no: String,
    pub checkout: OrderTotals,
    pub order: OrderTotals,
}

fn order_no_pattern() -> &'static Regex {
    static ORDER_NO: OnceLock<Regex> = OnceLock::new();
    ORDER_NO.get_or_init(|| Regex::new(r"orderNo=(CM-\d+)").expect("static regex"))
}

/// `CM-<digits>` from a checkout success URL
pub fn extract_order_no(url: &str) -> Option<String> {
    order_no_pattern()
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Fail with every amount that differs between checkout and the order page
pub fn compare_totals(checkout: &OrderTotals, order: &OrderTotals) -> E2eResult<()> {
    let pairs = [
        ("item total", &checkout.item_total, &order.item_total),
        ("shipping", &checkout.shipping, &order.shipping),
        (
            "shipping discount",
            &checkout.shipping_discount,
            &order.shipping_discount,
        ),
        ("total", &checkout.total, &order.total),
    ];
    let mismatches: Vec<String> = pairs
        .iter()
        .filter(|(_, at_checkout, on_order)| at_checkout != on_order)
        .map(|(name, at_checkout, on_order)| {
            format!("{}: checkout {} vs order {}", name, at_checkout, on_order)
        })
        .collect();

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "order totals differ ({})",
            mismatches.join("; ")
        )))
    }
}

/// Amount rendered in the span right after `label`
fn amount_after(label: Locator) -> Locator {
    label.locate(Locator::css("xpath=following-sibling::span"))
}

async fn read_amount(page: &mut dyn Page, label: Locator) -> E2eResult<String> {
    let text = page.text_content(&amount_after(label)).await?;
    Ok(text.unwrap_or_default().trim().to_string())
}

async fn checkout_totals(page: &mut dyn Page) -> E2eResult<OrderTotals> {
    Ok(OrderTotals {
        item_total: read_amount(page, Locator::text("Item(s) Total")).await?,
        shipping: read_amount(page, Locator::text("Shipping & Handling")).await?,
        shipping_discount: read_amount(page, Locator::text("Shipping Discount")).await?,
        total: read_amount(
            page,
            Locator::css_with_text("span", TextMatch::regex("^Total$")),
        )
        .await?,
    })
}

async fn order_page_totals(page: &mut dyn Page) -> E2eResult<OrderTotals> {
    Ok(OrderTotals {
        item_total: read_amount(page, Locator::text("Item Subtotal")).await?,
        shipping: read_amount(page, Locator::text("Shipping").exact()).await?,
        shipping_discount: read_amount(page, Locator::text("Shipping Discount")).await?,
        total: read_amount(page, Locator::text("Total").exact()).await?,
    })
}

/// Buy `product_name`, pay with the test card and check the order's totals
pub async fn place_order<B: Browser, R: Rng + ?Sized>(
    browser: &mut B,
    config: &E2eConfig,
    product_name: &str,
    rng: &mut R,
) -> E2eResult<PlacedOrder> {
    let timeouts = &config.timeouts;
    let store = SessionStore::buyer(config);
    let mut page = bootstrap(browser, &store, &BuyerLogin::new(config), config)
        .await?
        .page;

    let search = Locator::textbox("Search Product");
    page.fill(&search, product_name).await?;
    page.press(&search, "Enter").await?;

    let product = Locator::role("link", product_name).first();
    expect_visible(&mut page, &product, timeouts.element()).await?;
    page.click(&product).await?;
    page.wait_for_url(&UrlPattern::regex(r"/product/"), timeouts.element())
        .await?;
    info!("Opened product page for {}", product_name);

    page.click(&Locator::button("Add to cart")).await?;
    page.click(&Locator::button("Go To Cart")).await?;
    page.click(&Locator::button("Proceed to Checkout")).await?;

    let shipping_options = Locator::text(TextMatch::regex("^(STANDARD|EXPEDITED|FREE)"));
    let available = page.count(&shipping_options).await?;
    if available > 0 {
        let choice = rng.gen_range(0..available);
        page.click(&shipping_options.nth(choice)).await?;
        info!("Picked shipping option {} of {}", choice + 1, available);
    }

    let checkout = checkout_totals(&mut page).await?;
    info!("Checkout totals: {:?}", checkout);

    page.click(&Locator::button("Place Order")).await?;
    page.fill(&Locator::textbox("Email"), &config.buyer.email)
        .await?;
    page.fill(&Locator::textbox("Card number"), CARD_NUMBER)
        .await?;
    page.fill(&Locator::textbox("Expiration"), CARD_EXPIRY)
        .await?;
    page.fill(&Locator::textbox("CVC"), CARD_CVC).await?;
    page.fill(&Locator::textbox("Cardholder name"), CARDHOLDER)
        .await?;
    page.click(&Locator::test_id("hosted-payment-submit-button"))
        .await?;

    page.wait_for_url(&UrlPattern::regex(r"success\?orderNo=CM-\d+"), timeouts.step())
        .await?;
    let url = page.url().await?;
    let order_no = extract_order_no(&url).ok_or_else(|| {
        E2eError::AssertionFailed(format!("no order number in {}", url))
    })?;
    info!("Order placed: {}", order_no);

    page.click(&Locator::text("Orders & Account")).await?;
    page.click(&Locator::role("link", "Orders")).await?;
    page.click(&Locator::text(order_no.as_str())).await?;
    page.click(
        &Locator::css(r".text-paragraph-sm.text-\[\#17181B\].font-bold.cursor-pointer").first(),
    )
    .await?;

    let order = order_page_totals(&mut page).await?;
    compare_totals(&checkout, &order)?;
    info!("Order {} totals match checkout", order_no);

    Ok(PlacedOrder {
        order_no,
        checkout,
        order,
    })
}
