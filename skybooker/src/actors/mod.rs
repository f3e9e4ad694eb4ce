#[cfg(feature = "rest")]
pub mod rest;
pub mod store;
