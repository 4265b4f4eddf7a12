pub mod country;

pub use country::{reconcile, GDP_MULTIPLIER_MAX, GDP_MULTIPLIER_MIN};
