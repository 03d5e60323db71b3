pub mod geo;
pub mod identity;
