//! Property tests for the randomized form data

use chrono::NaiveDate;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use cybermart_e2e::datagen::{
    account_number, age_on, appointment_day, date_of_birth, distinct, future_date,
    routing_number, state_and_zip, us_phone, years_after, zip_belongs_to, AREA_CODES,
    ROUTING_NUMBERS, TAG_POOL,
};

fn any_today() -> impl Strategy<Value = NaiveDate> {
    // 2000-01-01 ..= 2099-12-31
    (730_120i32..=766_644).prop_map(|days| {
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
    })
}

proptest! {
    #[test]
    fn expiry_is_at_least_a_week_and_at_most_five_years_out(seed: u64, today in any_today()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let expiry = future_date(&mut rng, today, 7, 5);
        prop_assert!((expiry - today).num_days() >= 7);
        prop_assert!(expiry <= years_after(today, 5));
    }

    #[test]
    fn date_of_birth_is_an_adult_up_to_eighty(seed: u64, today in any_today()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let age = age_on(date_of_birth(&mut rng, today), today);
        prop_assert!((18..=80).contains(&age), "age {}", age);
    }

    #[test]
    fn phone_is_ten_digits_with_known_area_code(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let phone = us_phone(&mut rng);
        prop_assert_eq!(phone.len(), 10);
        prop_assert!(phone.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(AREA_CODES.contains(&&phone[..3]));
        prop_assert!(!phone[3..].starts_with('0'));
    }

    #[test]
    fn bank_numbers_have_expected_shape(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let account = account_number(&mut rng);
        prop_assert!((10..=12).contains(&account.len()));
        prop_assert!(account.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(ROUTING_NUMBERS.contains(&routing_number(&mut rng)));
    }

    #[test]
    fn zip_belongs_to_its_state(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (state, zip) = state_and_zip(&mut rng);
        prop_assert!(zip_belongs_to(state, zip), "{} / {}", state, zip);
    }

    #[test]
    fn tags_are_distinct(seed: u64, count in 0usize..=5) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tags = distinct(&mut rng, TAG_POOL, count);
        prop_assert_eq!(tags.len(), count.min(TAG_POOL.len()));
        tags.sort_unstable();
        tags.dedup();
        prop_assert_eq!(tags.len(), count.min(TAG_POOL.len()));
    }

    #[test]
    fn appointment_day_exists_in_every_month(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        prop_assert!((3..=9).contains(&appointment_day(&mut rng)));
    }
}
