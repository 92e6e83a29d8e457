//! One handler per wizard step

use std::time::Duration;

use rand::Rng;
use tracing::info;

use super::datepicker::pick_date;
use super::{advance_and_confirm, save_and_next, Step, StepContext};
use crate::datagen;
use crate::error::{E2eError, E2eResult};
use crate::page::{
    expect_count, expect_text, expect_url, expect_visible, probe_visible, Locator, Page,
    TextMatch, UrlPattern,
};

const ACCOUNT_TYPE_CONFIRMATION: &str = "I confirm my account type are correct, and I understand that this information cannot be changed later.";

/// Settle time after agreeing to the account type
const ACCOUNT_TYPE_SETTLE: Duration = Duration::from_millis(1_500);

/// Fill the current step and move the wizard forward
pub async fn handle_step(
    page: &mut dyn Page,
    step: Step,
    ctx: &mut StepContext<'_>,
) -> E2eResult<()> {
    match step {
        Step::Welcome => welcome(page, ctx).await,
        Step::AccountType => account_type(page, ctx).await,
        Step::BusinessInformation => business_information(page, ctx).await,
        Step::PrimaryContactInformation => primary_contact(page, ctx).await,
        Step::PaymentInformation => payment_information(page, ctx).await,
        Step::StoreAndProductInformation => store_information(page, ctx).await,
        Step::IdentityAndAddressVerification => identity_documents(page, ctx).await,
        Step::IdentityVerification => identity_appointment(page, ctx).await,
    }
}

async fn welcome(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    let start = Locator::button("Let's Start");
    if !probe_visible(page, &start).await {
        info!("Welcome already completed, skipping...");
        return Ok(());
    }

    page.click(&start).await?;
    info!("Clicked \"Let's Start\", moving to Account Type step...");
    page.wait_for_url(
        &UrlPattern::glob("**/account-management/account-type**"),
        ctx.config.timeouts.element(),
    )
    .await
}

async fn account_type(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    let checkbox = Locator::role_any("checkbox");
    let agree = Locator::button("Agree and Continue");

    // A disabled checkbox means the account type is already locked in
    if page.is_disabled(&checkbox).await.unwrap_or(false) {
        info!("Account Type already completed, skipping...");
        page.click(&agree).await?;
        return page
            .wait_for_url(
                &UrlPattern::regex(r"step=\d|dashboard"),
                ctx.config.timeouts.element(),
            )
            .await;
    }

    let element = ctx.config.timeouts.element();
    page.click(
        &Locator::css("div")
            .filter_text(TextMatch::regex("^PrivatelyOwn Business$"))
            .first(),
    )
    .await?;
    expect_visible(page, &Locator::text("Business Account"), element).await?;
    expect_visible(page, &Locator::text(ACCOUNT_TYPE_CONFIRMATION), element).await?;
    page.check(&checkbox).await?;
    page.click(&agree).await?;
    page.sleep(ACCOUNT_TYPE_SETTLE).await
}

/// Anchored option text so "Virginia" never matches "West Virginia"
fn exact_state_option(state: &str) -> Locator {
    Locator::css_with_text(
        "li[role=\"option\"]",
        TextMatch::regex(format!("^{}$", regex::escape(state))),
    )
}

/// Open a country select and pick `country` from its listbox
async fn choose_country(page: &mut dyn Page, select: Locator, country: &str) -> E2eResult<()> {
    page.click(&select).await?;
    page.click(
        &Locator::role_any("listbox").locate(Locator::option(country).exact()),
    )
    .await
}

async fn business_information(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    info!("Filling Business Information step...");
    page.fill(
        &Locator::label("Business Name *"),
        &datagen::business_name(&mut ctx.rng),
    )
    .await?;
    page.fill(
        &Locator::label("Company Registration Number *"),
        &datagen::digits(&mut ctx.rng, 7),
    )
    .await?;
    page.fill(&Locator::label("Address Line 1 *"), "123 Main Street")
        .await?;
    page.fill(&Locator::label("City/Town *"), "Demo City").await?;

    let (state, zip) = datagen::state_and_zip(&mut ctx.rng);
    info!("Selected State: {}, ZIP: {}", state, zip);
    page.click(&Locator::css(
        "div[role=\"combobox\"]:not([aria-disabled=\"true\"])",
    ))
    .await?;
    let option = exact_state_option(state);
    expect_visible(page, &option, ctx.config.timeouts.short()).await?;
    page.click(&option).await?;
    page.fill(&Locator::label("ZIP/Postal Code *"), zip).await?;

    advance_and_confirm(
        page,
        &save_and_next(),
        &[Some(Step::PrimaryContactInformation)],
        ctx.config,
    )
    .await
    .map(|_| ())
}

async fn primary_contact(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    info!("Filling Primary Contact Information step...");
    let (first, last) = datagen::person_name(&mut ctx.rng);
    page.fill(&Locator::textbox("First Name *"), first).await?;
    page.fill(&Locator::textbox("Last Name *"), last).await?;

    let citizenship = *datagen::pick(&mut ctx.rng, datagen::COUNTRIES);
    info!("Selected Country of Citizenship: {}", citizenship);
    choose_country(page, Locator::css("#demo-simple-select").first(), citizenship).await?;

    page.fill(
        &Locator::textbox("EIN/TIN"),
        &datagen::digits(&mut ctx.rng, 9),
    )
    .await?;

    let birth = *datagen::pick(&mut ctx.rng, datagen::COUNTRIES);
    info!("Selected Country of Birth: {}", birth);
    choose_country(
        page,
        Locator::css("div:nth-child(4) > .MuiInputBase-root > #demo-simple-select").first(),
        birth,
    )
    .await?;

    let dob = datagen::date_of_birth(&mut ctx.rng, ctx.today);
    info!("Selected DOB: {}", dob);
    pick_date(page, &Locator::button("Choose date").first(), dob).await?;

    page.fill(
        &Locator::textbox("Driving License *"),
        &format!("DL{}", datagen::letters(&mut ctx.rng, 6)),
    )
    .await?;

    let issue = *datagen::pick(&mut ctx.rng, datagen::COUNTRIES);
    info!("Selected Country of Issue: {}", issue);
    choose_country(
        page,
        Locator::css("div:nth-child(7) > .MuiInputBase-root > #demo-simple-select"),
        issue,
    )
    .await?;

    let expiry = datagen::future_date(&mut ctx.rng, ctx.today, 7, 5);
    info!("Selected Expiry Date: {}", expiry);
    pick_date(page, &Locator::button("Choose date").exact(), expiry).await?;

    page.fill(
        &Locator::textbox("Mobile Number *"),
        &datagen::us_phone(&mut ctx.rng),
    )
    .await?;
    page.fill(
        &Locator::textbox("Address Line 1 *"),
        "Business residential address 1",
    )
    .await?;
    page.fill(
        &Locator::textbox("Address Line 2"),
        "Business residential address 2",
    )
    .await?;
    page.fill(&Locator::textbox("City/Town *"), "Demo City")
        .await?;

    let (state, zip) = datagen::state_and_zip(&mut ctx.rng);
    info!("Selected PCI State: {}, ZIP: {}", state, zip);
    page.click(&Locator::css(
        ".space-y-3 > .grid > div:nth-child(4) > .MuiInputBase-root > #demo-simple-select",
    ))
    .await?;
    let option = exact_state_option(state);
    expect_visible(page, &option, ctx.config.timeouts.short()).await?;
    page.click(&option).await?;
    page.fill(&Locator::label("ZIP/Postal Code *"), zip).await?;

    advance_and_confirm(
        page,
        &save_and_next(),
        &[Some(Step::PaymentInformation)],
        ctx.config,
    )
    .await
    .map(|_| ())
}

async fn payment_information(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    info!("Filling Payment Information step...");
    let bank = *datagen::pick(&mut ctx.rng, datagen::BANKS);
    info!("Selected Bank: {}", bank);
    page.click(&Locator::combobox("Select Bank")).await?;
    page.click(&Locator::option(bank)).await?;

    let routing = datagen::routing_number(&mut ctx.rng);
    info!("Selected Routing Number: {}", routing);
    page.fill(
        &Locator::textbox(TextMatch::regex_i("Routing Number")),
        routing,
    )
    .await?;

    let account = datagen::account_number(&mut ctx.rng);
    info!("Generated Account Number: {}", account);
    page.fill(
        &Locator::textbox(TextMatch::regex_i("^Account Number")),
        &account,
    )
    .await?;
    page.fill(
        &Locator::textbox(TextMatch::regex_i("Re-enter Bank Account Number")),
        &account,
    )
    .await?;

    advance_and_confirm(
        page,
        &save_and_next(),
        &[Some(Step::StoreAndProductInformation)],
        ctx.config,
    )
    .await
    .map(|_| ())
}

async fn store_information(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    info!("Filling Store and Product Information step...");
    let store = datagen::store_name(chrono::Utc::now().timestamp_millis());
    page.fill(&Locator::textbox("Enter your store name *"), &store)
        .await?;

    let first = datagen::yes_no(&mut ctx.rng);
    let second = datagen::yes_no(&mut ctx.rng);
    page.check(&Locator::role("radio", first).first()).await?;
    page.check(&Locator::role("radio", second).nth(1)).await?;

    page.fill(
        &Locator::textbox("Enter Answer *"),
        &datagen::long_answer(&mut ctx.rng),
    )
    .await?;
    page.fill(
        &Locator::textbox("Enter description *"),
        &datagen::long_description(&mut ctx.rng),
    )
    .await?;

    page.fill(
        &Locator::textbox("Address Name *"),
        "Business Warehouse Address",
    )
    .await?;
    page.fill(
        &Locator::textbox("Address Line 1 *"),
        "Business warehouse address 1",
    )
    .await?;
    page.fill(
        &Locator::textbox("Address Line 2"),
        "Business warehouse address 2",
    )
    .await?;

    let (state, zip) = datagen::state_and_zip(&mut ctx.rng);
    info!("Selected Store State: {}, ZIP: {}", state, zip);
    let city: String = state.chars().take(2).collect::<String>().to_uppercase();
    page.fill(&Locator::textbox("City/Town *"), &city).await?;

    page.click(&Locator::combobox("State/Region").first())
        .await?;
    let option = Locator::option(state).exact();
    expect_visible(page, &option, ctx.config.timeouts.short()).await?;
    page.click(&option).await?;
    page.fill(&Locator::textbox("ZIP/Postal Code *"), zip)
        .await?;

    advance_and_confirm(
        page,
        &save_and_next(),
        &[
            Some(Step::IdentityAndAddressVerification),
            Some(Step::IdentityVerification),
        ],
        ctx.config,
    )
    .await
    .map(|_| ())
}

async fn identity_documents(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    info!("Filling Identity and Address Verification step...");
    let inputs = Locator::css("input[type=\"file\"]");
    let submit = Locator::button("Save and Next");
    let next = [Some(Step::IdentityVerification), None];

    if page.count(&inputs).await? == 0 {
        info!("Docs already uploaded, skipping upload");
        return advance_and_confirm(page, &submit, &next, ctx.config)
            .await
            .map(|_| ());
    }

    let documents = datagen::IDENTITY_DOCUMENTS;
    expect_count(page, &inputs, documents.len(), Duration::from_secs(10)).await?;
    for (index, name) in documents.iter().enumerate() {
        page.set_input_files(&inputs.clone().nth(index), &[ctx.config.fixture(name)])
            .await?;
        info!("Uploaded identity document {} ({})", index + 1, name);
    }

    advance_and_confirm(page, &submit, &next, ctx.config)
        .await
        .map(|_| ())
}

async fn identity_appointment(page: &mut dyn Page, ctx: &mut StepContext<'_>) -> E2eResult<()> {
    info!("Filling Identity Verification step...");
    let short = ctx.config.timeouts.short();

    let day = datagen::appointment_day(&mut ctx.rng);
    let days = Locator::role("gridcell", day.to_string())
        .exact()
        .without(Locator::css("[disabled]"));
    if page.count(&days).await? == 0 {
        return Err(E2eError::AssertionFailed(format!(
            "no enabled appointment day {} in the calendar",
            day
        )));
    }
    page.click(&days.first()).await?;
    info!("Picked appointment date (day): {}", day);

    page.click(&Locator::combobox("Select Region")).await?;
    let region = *datagen::pick(&mut ctx.rng, datagen::REGIONS);
    page.click(&Locator::option(region)).await?;
    info!("Selected region: {}", region);

    let time = Locator::combobox("Time");
    page.click(&time).await?;
    let slots = Locator::role_any("option");
    let slot_count = match expect_visible(page, &slots.clone().first(), short).await {
        Ok(()) => page.count(&slots).await?,
        Err(_) => 0,
    };
    if slot_count == 0 {
        return Err(E2eError::StepFailed {
            step: Step::IdentityVerification.to_string(),
            reason: format!("no available timeslots for day {} in {}", day, region),
        });
    }

    let slot = slots.nth(ctx.rng.gen_range(0..slot_count));
    let slot_text = page.text_content(&slot).await?.unwrap_or_default();
    page.click(&slot).await?;
    info!("Selected timeslot: {}", slot_text.trim());
    expect_text(page, &time, slot_text.trim(), short).await?;

    page.click(&Locator::button("Save and Finish")).await?;
    info!("Appointment booked, stepper finished");
    expect_url(page, &UrlPattern::regex("dashboard"), ctx.config.timeouts.step()).await
}
