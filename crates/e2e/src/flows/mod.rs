//! End-to-end business workflows built on the session and stepper layers

pub mod admin;
pub mod buyer;
pub mod onboarding;
pub mod product;
pub mod seller_login;
pub mod signup;

pub use admin::{admin_session, approve_product, search_product};
pub use buyer::{compare_totals, extract_order_no, place_order, OrderTotals, PlacedOrder};
pub use onboarding::continue_onboarding;
pub use product::{create_product, ProductOptions};
pub use seller_login::{seller_credentials, seller_login};
pub use signup::{signup, signup_and_onboard};
