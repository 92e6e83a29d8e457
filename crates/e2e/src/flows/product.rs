//! Product creation from the seller's Inventory Management

use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;
use tracing::{info, warn};

use super::seller_login::seller_credentials;
use crate::config::E2eConfig;
use crate::datagen;
use crate::error::E2eResult;
use crate::login::SellerLogin;
use crate::page::{
    expect_enabled, expect_text, expect_visible, probe_visible, Browser, LoadState, Locator,
    Page,
};
use crate::session::{bootstrap, is_sign_in_url, SessionStore};

const FEATURES: [&str; 5] = [
    "6 Pack Black & Grey Crew T-Shirts",
    "Stays tucked with a Layflat Collar",
    "Wicks moisture",
    "Collar keeps its shape wash after wash",
    "Tag-free for all-day comfort",
];

const SHORT_DESCRIPTION: &str = "Fruit of the Loom men's crews stay tucked, feature a layflat collar, wick moisture, and provide tag-free all-day comfort.";

const LONG_DESCRIPTION: &str = "Fruit of the Loom men's crews work great alone or to add an extra layer under a button-down or polo shirt. This shirt eliminates ride-up, it stays neatly tucked so you can go about your busy day with confidence. They are designed to maintain comfort and softness even after many washes. The improved, double-stitched collar stays flat and keeps its shape, providing a consistent look. This Fruit of the Loom t-shirt features a tag free designed to provide all-day comfort. There are soft covered seams on the neck and shoulders for extra comfort. Wear layered or by itself. Available in a variety of sizes, you can choose the ideal one for your body.";

const SUBMITTED: [&str; 3] = [
    "Successfully Submitted",
    "Your product has been submitted to CyberMart for approval. Once approved, the product will be successfully added to the inventory",
    "To view list,click here",
];

const GALLERY_IMAGES: usize = 2;
const TAG_COUNT: usize = 3;

/// Pause between dependent form interactions
const SETTLE: std::time::Duration = std::time::Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductOptions {
    /// Enable front/back customization on the policy stage
    pub customizable: bool,
}

fn next() -> Locator {
    Locator::button("Next")
}

/// Create a product as the selected seller; returns the page and product name
pub async fn create_product<B: Browser, R: Rng + ?Sized>(
    browser: &mut B,
    config: &E2eConfig,
    options: ProductOptions,
    rng: &mut R,
    today: NaiveDate,
) -> E2eResult<(B::Page, String)> {
    let label = config.seller_label();
    let store = SessionStore::seller(config, &label);
    let flow = SellerLogin::dashboard(config, seller_credentials(config, &label)?);

    let mut page = bootstrap(browser, &store, &flow, config).await?.page;

    let inventory = Locator::text("Inventory Management");
    page.click(&inventory).await?;
    page.wait_for_load_state(LoadState::NetworkIdle).await?;
    let url = page.url().await?;
    if is_sign_in_url(&url) {
        warn!(
            "Session expired while opening Inventory, deleting {}",
            store.path().display()
        );
        store.remove()?;
        page.close().await?;
        page = bootstrap(browser, &store, &flow, config).await?.page;
        page.click(&inventory).await?;
    }

    let name = datagen::product_name(rng);
    info!("Creating product {}", name);
    identity_stage(&mut page, config, &name).await?;
    description_stage(&mut page, config).await?;
    images_stage(&mut page, config, rng).await?;
    offer_stage(&mut page, rng, today).await?;
    policy_stage(&mut page, config, options).await?;
    shipping_stage(&mut page, config).await?;
    let tags = add_tags(&mut page, rng).await?;
    info!("Tags: {}", tags.join(", "));
    submit(&mut page, config).await?;

    info!("Product [{}] submitted for approval", name);
    Ok((page, name))
}

async fn identity_stage(page: &mut dyn Page, config: &E2eConfig, name: &str) -> E2eResult<()> {
    let create = Locator::text("Create New Product");
    expect_visible(page, &create, config.timeouts.element()).await?;
    page.click(&create).await?;

    page.fill(&Locator::textbox("Enter Product Name *"), name)
        .await?;
    page.click(&Locator::textbox("Category")).await?;
    page.click(&Locator::text("Weight Storage Racks")).await?;

    // Condition and brand share one accessible name
    let selects = Locator::combobox("Select Condition");
    page.click(&selects.clone().first()).await?;
    page.click(&Locator::option("New")).await?;
    page.click(&selects.nth(1)).await?;
    page.click(&Locator::option("Brand A")).await?;

    page.click(&next()).await
}

async fn description_stage(page: &mut dyn Page, config: &E2eConfig) -> E2eResult<()> {
    expect_visible(
        page,
        &Locator::css("h6:has-text(\"Add Product Features\")").first(),
        config.timeouts.element(),
    )
    .await?;

    let feature = Locator::css(
        "xpath=//h6[contains(normalize-space(.),\"Add Product Features\")]/following::input[1]",
    );
    for text in FEATURES {
        page.fill(&feature, text).await?;
        page.click(&Locator::button("+ Add")).await?;
        page.sleep(SETTLE).await?;
    }

    let short = Locator::css(
        "xpath=//h6[contains(.,\"Enter Short Description\")]/following::div[contains(@class,\"ql-editor\")][1]",
    );
    expect_visible(page, &short, config.timeouts.element()).await?;
    page.fill(&short, SHORT_DESCRIPTION).await?;

    let long = Locator::css(
        "xpath=//h6[contains(.,\"Enter Long Description\")]/following::div[contains(@class,\"ql-editor\")][1]",
    );
    expect_visible(page, &long, config.timeouts.element()).await?;
    page.fill(&long, LONG_DESCRIPTION).await?;

    page.click(&next()).await
}

async fn images_stage<R: Rng + ?Sized>(
    page: &mut dyn Page,
    config: &E2eConfig,
    rng: &mut R,
) -> E2eResult<()> {
    let upload = Locator::button("Upload Image 1");
    if probe_visible(page, &upload).await {
        let files: Vec<_> = datagen::distinct(rng, datagen::IMAGE_POOL, GALLERY_IMAGES)
            .into_iter()
            .map(|name| config.fixture(name))
            .collect();
        page.click(&upload).await?;
        page.set_input_files(&Locator::css("input[type=\"file\"]").last(), &files)
            .await?;
        page.click(&Locator::button("Proceed to upload")).await?;
        page.sleep(SETTLE).await?;
        info!("Uploaded {} gallery images", files.len());
    } else {
        info!("Gallery already has an image, skipping upload");
    }

    page.click(&next()).await
}

async fn offer_stage<R: Rng + ?Sized>(
    page: &mut dyn Page,
    rng: &mut R,
    today: NaiveDate,
) -> E2eResult<()> {
    page.fill(&Locator::textbox("Flavor"), datagen::pick::<_, &str>(rng, datagen::FLAVORS))
        .await?;
    page.fill(
        &Locator::textbox("Enter Pack Size"),
        datagen::pick::<_, &str>(rng, datagen::PACK_SIZES),
    )
    .await?;
    page.fill(&Locator::textbox("Enter Color"), datagen::pick::<_, &str>(rng, datagen::COLORS))
        .await?;

    let sku = datagen::sku(rng, chrono::Utc::now().timestamp_millis());
    page.fill(&Locator::textbox("Enter Seller SKU"), &sku).await?;
    info!("SKU: {}", sku);

    page.fill(&Locator::placeholder("Enter List Price"), "100")
        .await?;
    page.fill(&Locator::placeholder("Enter Your Price"), "60")
        .await?;
    page.fill(&Locator::placeholder("Enter Promo Price"), "50")
        .await?;

    // Promo window: today to tomorrow
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let choose = Locator::button("Choose date");
    page.click(&Locator::test_id("CalendarMonthIcon")).await?;

    page.click(&choose.clone().first()).await?;
    page.click(&day_cell(START_DATE, today)).await?;
    page.sleep(SETTLE).await?;

    page.click(&choose.nth(1)).await?;
    if tomorrow.month() != today.month() {
        page.click(&in_dialog(END_DATE, Locator::button("Next month")))
            .await?;
    }
    page.click(&day_cell(END_DATE, tomorrow)).await?;
    page.sleep(SETTLE).await?;

    page.click(&Locator::button("Apply Changes")).await?;
    page.fill(&Locator::placeholder("Enter Quantity"), "100")
        .await?;

    page.click(&next()).await
}

const START_DATE: &str = "Start Date";
const END_DATE: &str = "End Date";

/// Scope `child` to the picker dialog named `dialog`
fn in_dialog(dialog: &str, child: Locator) -> Locator {
    Locator::role("dialog", dialog).locate(child)
}

fn day_cell(dialog: &str, date: NaiveDate) -> Locator {
    in_dialog(
        dialog,
        Locator::role("gridcell", date.day().to_string()).exact(),
    )
}

async fn policy_stage(
    page: &mut dyn Page,
    config: &E2eConfig,
    options: ProductOptions,
) -> E2eResult<()> {
    page.click(&Locator::combobox("Select Return Days")).await?;
    page.click(&Locator::option("3 Days")).await?;
    page.check(&Locator::role("radio", "Both")).await?;

    let warranty = Locator::combobox("Select Return Days 3 Days");
    page.click(&warranty.clone().nth(1)).await?;
    page.click(&Locator::option("3 Months")).await?;
    page.click(&warranty.nth(2)).await?;
    page.click(&Locator::option("7 Days")).await?;

    page.fill(
        &Locator::textbox("Warranty Policy *"),
        "Testing Warranty Policy",
    )
    .await?;

    if options.customizable {
        customization(page, config).await?;
    } else {
        page.check(&Locator::role("radio", "No").exact()).await?;
    }

    page.click(&next()).await
}

async fn customization(page: &mut dyn Page, config: &E2eConfig) -> E2eResult<()> {
    let [front, back] = datagen::CUSTOMIZATION_IMAGES;
    let files = Locator::css("input[type=\"file\"]");
    let text_option = Locator::role("checkbox", "Text");
    let text_to_show = Locator::textbox("Text to show *");
    let limit = Locator::role("spinbutton", "Text character limit *");

    page.click(&Locator::heading("Customize Product")).await?;
    page.check(&Locator::role("radio", "Yes")).await?;
    page.check(&Locator::role("checkbox", "Front Side")).await?;
    page.check(&Locator::role("checkbox", "Back Side")).await?;

    page.set_input_files(&files.clone().first(), &[config.fixture(front)])
        .await?;
    page.check(&Locator::role("checkbox", "Front Side Upload Image"))
        .await?;
    page.check(&text_option.clone().first()).await?;
    page.fill(&text_to_show.clone().first(), "Random Text")
        .await?;
    page.fill(&limit.clone().first(), "35").await?;

    page.set_input_files(&files.last(), &[config.fixture(back)])
        .await?;
    page.check(&Locator::role("checkbox", "Back Side Upload Image"))
        .await?;
    page.check(&text_option.nth(2)).await?;
    page.fill(&text_to_show.nth(1), "Random Text").await?;
    page.fill(&limit.nth(1), "35").await?;

    info!("Customization configured for front and back");
    Ok(())
}

async fn shipping_stage(page: &mut dyn Page, config: &E2eConfig) -> E2eResult<()> {
    page.click(&Locator::combobox("Package Type")).await?;
    page.click(&Locator::option("Flat Rate Boxes")).await?;
    page.click(&Locator::combobox("Package Type Flat Rate Boxes").nth(1))
        .await?;
    page.click(&Locator::option("Small")).await?;

    page.click(&Locator::heading("Shipping Handling")).await?;
    page.check(&Locator::role("radio", "Seller Shipment")).await?;

    let template = Locator::combobox("Template One (Default)").first();
    page.click(&template).await?;
    page.click(&Locator::option("Template One (Default)")).await?;
    expect_text(page, &template, "Template One", config.timeouts.short()).await?;

    page.check(&Locator::role("checkbox", "None")).await
}

async fn add_tags<R: Rng + ?Sized>(page: &mut dyn Page, rng: &mut R) -> E2eResult<Vec<String>> {
    let input = Locator::textbox("Type and hit enter");
    let tags = datagen::distinct(rng, datagen::TAG_POOL, TAG_COUNT);
    for tag in &tags {
        page.fill(&input, tag).await?;
        page.press(&input, "Enter").await?;
    }
    Ok(tags.into_iter().map(String::from).collect())
}

async fn submit(page: &mut dyn Page, config: &E2eConfig) -> E2eResult<()> {
    let create = Locator::button("Create");
    expect_enabled(page, &create, config.timeouts.element()).await?;
    page.click(&create).await?;

    for text in SUBMITTED {
        expect_visible(page, &Locator::text(text), config.timeouts.element()).await?;
    }
    page.click(&Locator::text("click here")).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Action, FakePage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_images_skipped_when_already_attached() {
        let config = E2eConfig::default();
        let mut page = FakePage::at("https://qav2.cybermart.com/inventory/create");
        let mut rng = StdRng::seed_from_u64(1);

        images_stage(&mut page, &config, &mut rng).await.unwrap();

        assert_eq!(page.actions, vec![Action::Click(next().to_string())]);
    }

    #[tokio::test]
    async fn test_images_uploads_two_distinct_fixtures() {
        let config = E2eConfig::default();
        let mut page = FakePage::at("https://qav2.cybermart.com/inventory/create")
            .show(&Locator::button("Upload Image 1"));
        let mut rng = StdRng::seed_from_u64(2);

        images_stage(&mut page, &config, &mut rng).await.unwrap();

        let files = page
            .actions
            .iter()
            .find_map(|a| match a {
                Action::Upload(_, files) => Some(files.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0], files[1]);
        assert!(files.iter().all(|f| f.starts_with(&config.fixtures_dir)));
    }

    #[tokio::test]
    async fn test_promo_window_crosses_month_end() {
        let mut page = FakePage::at("https://qav2.cybermart.com/inventory/create");
        let mut rng = StdRng::seed_from_u64(3);
        let today = NaiveDate::from_ymd_opt(2026, 10, 31).unwrap();

        offer_stage(&mut page, &mut rng, today).await.unwrap();

        assert_eq!(
            page.clicks(&in_dialog(END_DATE, Locator::button("Next month"))),
            1
        );
        assert_eq!(page.clicks(&Locator::button("Next month")), 0);
        assert_eq!(page.clicks(&day_cell(START_DATE, today)), 1);
        let first_of_november = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert_eq!(page.clicks(&day_cell(END_DATE, first_of_november)), 1);
        assert_eq!(page.clicks(&day_cell(START_DATE, first_of_november)), 0);
    }

    #[tokio::test]
    async fn test_promo_window_within_month() {
        let mut page = FakePage::at("https://qav2.cybermart.com/inventory/create");
        let mut rng = StdRng::seed_from_u64(3);
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        offer_stage(&mut page, &mut rng, today).await.unwrap();

        assert_eq!(
            page.clicks(&in_dialog(END_DATE, Locator::button("Next month"))),
            0
        );
        assert_eq!(page.clicks(&day_cell(START_DATE, today)), 1);
        let tomorrow = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(page.clicks(&day_cell(END_DATE, tomorrow)), 1);
        // Unscoped cells would hit whichever calendar renders first
        assert_eq!(
            page.clicks(&Locator::role("gridcell", "19").exact().first()),
            0
        );
        let sku = page
            .filled(&Locator::textbox("Enter Seller SKU"))
            .unwrap();
        assert!(sku.starts_with("sku-"));
    }

    #[tokio::test]
    async fn test_three_distinct_tags_entered() {
        let mut page = FakePage::at("https://qav2.cybermart.com/inventory/create");
        let mut rng = StdRng::seed_from_u64(4);

        let tags = add_tags(&mut page, &mut rng).await.unwrap();

        assert_eq!(tags.len(), 3);
        assert_eq!(tags.iter().collect::<HashSet<_>>().len(), 3);
        let presses = page
            .actions
            .iter()
            .filter(|a| matches!(a, Action::Press(_, key) if key == "Enter"))
            .count();
        assert_eq!(presses, 3);
    }

    #[tokio::test]
    async fn test_customization_uploads_front_and_back() {
        let config = E2eConfig::default();
        let mut page = FakePage::at("https://qav2.cybermart.com/inventory/create");

        policy_stage(&mut page, &config, ProductOptions { customizable: true })
            .await
            .unwrap();

        let uploads: Vec<_> = page
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Upload(_, files) => Some(files[0].clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            uploads,
            vec![config.fixture("600.png"), config.fixture("400 400.png")]
        );
        assert!(!page
            .actions
            .contains(&Action::Check(Locator::role("radio", "No").exact().to_string())));
    }
}
