//! Randomized form data that satisfies the staging app's validation rules
//!
//! Every generator takes the RNG explicitly, and date generators take
//! "today", so runs can be replayed from a seed.

use chrono::{Days, Months, NaiveDate};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;

/// US states and territories with two ZIP codes valid for each
pub const STATE_ZIPS: &[(&str, &[&str])] = &[
    ("Delaware", &["19701", "19980"]),
    ("Alaska", &["99501", "99950"]),
    ("Maryland", &["20601", "21930"]),
    ("New Hampshire", &["03031", "03897"]),
    ("Kansas", &["66002", "67954"]),
    ("Texas", &["75001", "88595"]),
    ("Nebraska", &["68001", "69367"]),
    ("Vermont", &["05001", "05495"]),
    ("Hawaii", &["96701", "96898"]),
    ("Guam", &["96910", "96932"]),
    ("Utah", &["84001", "84791"]),
    ("Oregon", &["97001", "97920"]),
    ("California", &["90001", "96162"]),
    ("New Jersey", &["07001", "08989"]),
    ("North Dakota", &["58001", "58856"]),
    ("Kentucky", &["40003", "42788"]),
    ("Minnesota", &["55001", "56763"]),
    ("Oklahoma", &["73001", "74966"]),
    ("Pennsylvania", &["15001", "19640"]),
    ("New Mexico", &["87001", "88439"]),
    ("Illinois", &["60001", "62999"]),
    ("Michigan", &["48001", "49971"]),
    ("Virginia", &["20101", "24658"]),
    ("West Virginia", &["24701", "26886"]),
    ("Mississippi", &["38601", "39776"]),
    ("Northern Mariana Islands", &["96950", "96952"]),
    ("Massachusetts", &["01001", "02791"]),
    ("Arizona", &["85001", "86556"]),
    ("Connecticut", &["06001", "06389"]),
    ("Florida", &["32003", "34997"]),
    ("District of Columbia", &["20001", "20020"]),
    ("Indiana", &["46001", "47997"]),
    ("Wisconsin", &["53001", "54990"]),
    ("Wyoming", &["82001", "83414"]),
    ("South Carolina", &["29001", "29945"]),
    ("Arkansas", &["71601", "72959"]),
    ("South Dakota", &["57001", "57799"]),
    ("Montana", &["59001", "59937"]),
    ("North Carolina", &["27006", "28909"]),
    ("Puerto Rico", &["00601", "00988"]),
    ("Colorado", &["80001", "81658"]),
    ("Missouri", &["63005", "65899"]),
    ("New York", &["10001", "14975"]),
    ("Maine", &["03901", "04992"]),
    ("Tennessee", &["37010", "38589"]),
    ("Georgia", &["30001", "31999"]),
    ("Alabama", &["35004", "36925"]),
    ("Louisiana", &["70001", "71497"]),
    ("Nevada", &["88901", "89883"]),
    ("Iowa", &["50001", "52809"]),
    ("Idaho", &["83201", "83877"]),
    ("Rhode Island", &["02801", "02940"]),
    ("Washington", &["98001", "99403"]),
    ("Ohio", &["43001", "45999"]),
];

pub const COUNTRIES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola", "Antigua and Barbuda",
    "Argentina", "Armenia", "Australia", "Austria", "Azerbaijan", "Bahamas", "Bahrain",
    "Bangladesh", "Barbados", "Belarus", "Belgium", "Belize", "Benin", "Bhutan", "Bolivia",
    "Bosnia and Herzegovina", "Botswana", "Brazil", "Brunei", "Bulgaria", "Burkina Faso",
    "Burundi", "Cabo Verde", "Cambodia", "Cameroon", "Canada", "Central African Republic",
    "Chad", "Chile", "China", "Colombia", "Comoros", "Congo",
    "Congo, Democratic Republic of the", "Costa Rica", "Croatia", "Cuba", "Cyprus",
    "Czech Republic", "Denmark", "Djibouti", "Dominica", "Dominican Republic", "Ecuador",
    "Egypt", "El Salvador", "Equatorial Guinea", "Eritrea", "Estonia", "Eswatini",
    "Ethiopia", "Fiji", "Finland", "France", "Gabon", "Gambia", "Georgia", "Germany",
    "Ghana", "Greece", "Grenada", "Guatemala", "Guinea", "Guinea-Bissau", "Guyana", "Haiti",
    "Honduras", "Hungary", "Iceland", "India", "Indonesia", "Iran", "Iraq", "Ireland",
    "Israel", "Italy", "Jamaica", "Japan", "Jordan", "Kazakhstan", "Kenya", "Kiribati",
    "Kuwait", "Kyrgyzstan", "Laos", "Latvia", "Lebanon", "Lesotho", "Liberia", "Libya",
    "Liechtenstein", "Lithuania", "Luxembourg", "Madagascar", "Malawi", "Malaysia",
    "Maldives", "Mali", "Malta", "Marshall Islands", "Mauritania", "Mauritius", "Mexico",
    "Micronesia", "Moldova", "Monaco", "Mongolia", "Montenegro", "Morocco", "Mozambique",
    "Myanmar", "Namibia", "Nauru", "Nepal", "Netherlands", "New Zealand", "Nicaragua",
    "Niger", "Nigeria", "North Macedonia", "Norway", "Oman", "Pakistan", "Palau", "Panama",
    "Papua New Guinea", "Paraguay", "Peru", "Philippines", "Poland", "Portugal", "Qatar",
    "Romania", "Russia", "Rwanda", "Saint Kitts and Nevis", "Saint Lucia",
    "Saint Vincent and the Grenadines", "Samoa", "San Marino", "Sao Tome and Principe",
    "Saudi Arabia", "Senegal", "Serbia", "Seychelles", "Sierra Leone", "Singapore",
    "Slovakia", "Slovenia", "Solomon Islands", "Somalia", "South Africa", "South Korea",
    "South Sudan", "Spain", "Sri Lanka", "Sudan", "Suriname", "Sweden", "Switzerland",
    "Syria", "Taiwan", "Tajikistan", "Tanzania", "Thailand", "Timor-Leste", "Togo", "Tonga",
    "Trinidad and Tobago", "Tunisia", "Turkey", "Turkmenistan", "Tuvalu", "Uganda",
    "Ukraine", "United Arab Emirates", "United Kingdom", "United States", "Uruguay",
    "Uzbekistan", "Vanuatu", "Vatican City", "Venezuela", "Vietnam", "Yemen", "Zambia",
    "Zimbabwe",
];

pub const BANKS: &[&str] = &[
    "Ally Bank",
    "Bank of America",
    "BMO Harris Bank",
    "Capital One Bank",
    "Citibank",
    "Citizens Bank",
    "Comerica Bank",
    "Example Bank",
    "Fifth Third Bank",
    "HSBC Bank USA",
    "Huntington Bank",
    "JPMorgan Chase Bank",
    "KeyBank",
    "M&T Bank",
    "PNC Bank",
    "Regions Bank",
    "Santander Bank",
    "TD Bank",
    "Truist Bank (formerly BB&T and SunTrust)",
    "U.S. Bank",
    "Wells Fargo Bank",
];

/// ABA routing numbers of Federal Reserve districts 1-10
pub const ROUTING_NUMBERS: &[&str] = &[
    "011000015",
    "021000021",
    "031000053",
    "041000124",
    "051000017",
    "061000104",
    "071000013",
    "081000210",
    "091000019",
    "101000187",
];

/// Time zones offered by the identity-verification appointment form
pub const REGIONS: &[&str] = &[
    "Eastern Time (ET) GMT-04:00",
    "Central Time (CT) GMT-05:00",
    "Mountain Time (MT) GMT-06:00",
    "Pacific Time (PT) GMT-07:00",
    "Alaska Time (AKT) GMT-08:00",
    "Hawaii-Aleutian Time (HAT) GMT-10:00",
    "Atlantic Time (AT) GMT-04:00",
    "Samoa Time (SST) GMT-11:00",
    "Chamorro Time (ChT) GMT+10:00",
];

pub const AREA_CODES: &[&str] = &["252", "464", "707", "305", "415", "646", "818"];

pub const FIRST_NAMES: &[&str] = &["Alice", "Bob", "Charlie", "Diana", "Eve"];
pub const LAST_NAMES: &[&str] = &["Smith", "Johnson", "Brown", "Taylor", "Lee"];

pub const TAG_POOL: &[&str] = &[
    "electronics",
    "fashion",
    "gadgets",
    "accessories",
    "home",
    "beauty",
    "testing",
];

/// Product gallery fixtures under the fixtures directory
pub const IMAGE_POOL: &[&str] = &[
    "71UAd8cY5NL._AC_SX569_.jpg",
    "71UZGSrlE5L._AC_SL1500_.jpg",
    "Media (6).jpg",
    "71haUItpcKL._SL1500_.jpg",
    "Media (5).jpg",
    "7197LHi3pjL._AC_SL1500_.jpg",
    "817UJvB1BrL._SL1500_.jpg",
    "Media (7).jpg",
];

/// Company registration, licence front, licence back
pub const IDENTITY_DOCUMENTS: [&str; 3] = [
    "817UJvB1BrL._SL1500_.jpg",
    "71VBGavZfcL._SL1500_.jpg",
    "81aKZJZEUEL._SL1500_.jpg",
];

/// Customization preview images (front, back)
pub const CUSTOMIZATION_IMAGES: [&str; 2] = ["600.png", "400 400.png"];

pub const FLAVORS: &[&str] = &["Mango", "Falsa", "Strawberry", "Banana", "Vanilla"];
pub const PACK_SIZES: &[&str] = &["Small", "Medium", "Large", "XL"];
pub const COLORS: &[&str] = &["Red", "Blue", "Green", "Black", "White"];

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Uniform pick from a non-empty list
pub fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

pub fn letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

pub fn digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn alphanumeric<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// `<local><6 letters>@<domain>`
pub fn email<R: Rng + ?Sized>(rng: &mut R, local: &str, domain: &str) -> String {
    format!("{}{}@{}", local, letters(rng, 6), domain)
}

pub fn business_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Business{}", letters(rng, 6))
}

pub fn person_name<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    (*pick(rng, FIRST_NAMES), *pick(rng, LAST_NAMES))
}

/// Same calendar day `years` earlier, clamped to the month's end (Feb 29)
pub fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MIN)
}

pub fn years_after(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_add_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MAX)
}

/// Whole years between `dob` and `today`
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(dob).unwrap_or(0)
}

/// Uniform date in `[earliest, latest]`
pub fn date_between<R: Rng + ?Sized>(rng: &mut R, earliest: NaiveDate, latest: NaiveDate) -> NaiveDate {
    let span = (latest - earliest).num_days().max(0) as u64;
    earliest
        .checked_add_days(Days::new(rng.gen_range(0..=span)))
        .unwrap_or(latest)
}

/// Date of birth for an adult aged 18 to 80 on `today`
pub fn date_of_birth<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> NaiveDate {
    let latest = years_before(today, 18);
    // One day after the 81st birthday keeps the age at most 80
    let earliest = years_before(today, 81)
        .checked_add_days(Days::new(1))
        .unwrap_or(latest);
    date_between(rng, earliest, latest)
}

/// Document expiry at least `min_days` and at most `max_years` ahead
pub fn future_date<R: Rng + ?Sized>(
    rng: &mut R,
    today: NaiveDate,
    min_days: u64,
    max_years: u32,
) -> NaiveDate {
    let earliest = today
        .checked_add_days(Days::new(min_days))
        .unwrap_or(today);
    let latest = years_after(today, max_years).max(earliest);
    date_between(rng, earliest, latest)
}

/// Ten-digit US mobile number: known area code, subscriber part not starting with 0
pub fn us_phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    let area = pick(rng, AREA_CODES);
    let lead = rng.gen_range(1..=9u8);
    format!("{}{}{}", area, lead, digits(rng, 6))
}

/// Bank account number of 10 to 12 digits
pub fn account_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(10..=12);
    digits(rng, len)
}

pub fn routing_number<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    *pick(rng, ROUTING_NUMBERS)
}

/// A state together with a ZIP code that belongs to it
pub fn state_and_zip<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    let &(state, zips) = pick(rng, STATE_ZIPS);
    (state, *pick(rng, zips))
}

pub fn zip_belongs_to(state: &str, zip: &str) -> bool {
    STATE_ZIPS
        .iter()
        .any(|(s, zips)| *s == state && zips.contains(&zip))
}

pub fn product_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Product_{}", alphanumeric(rng, 12))
}

/// `sku-<millis>-<0..999>`
pub fn sku<R: Rng + ?Sized>(rng: &mut R, now_millis: i64) -> String {
    format!("sku-{}-{}", now_millis, rng.gen_range(0..1000))
}

pub fn store_name(now_millis: i64) -> String {
    format!("Store_{}", now_millis)
}

/// Up to `count` distinct entries of `pool`, in random order
pub fn distinct<'a, R: Rng + ?Sized>(rng: &mut R, pool: &[&'a str], count: usize) -> Vec<&'a str> {
    pool.choose_multiple(rng, count).copied().collect()
}

/// Free text comfortably over the 20-character minimum
pub fn long_answer<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "This is a long enough random answer for testing {}",
        alphanumeric(rng, 8).to_lowercase()
    )
}

pub fn long_description<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "My business description is sufficiently long for validation {}",
        alphanumeric(rng, 16).to_lowercase()
    )
}

pub fn yes_no<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    if rng.gen_bool(0.5) {
        "Yes"
    } else {
        "No"
    }
}

/// Appointment day of month, kept early so it exists in every month
pub fn appointment_day<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(3..=9)
}
