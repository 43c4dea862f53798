//! Load classification, pricing and trailer allocation for a haulage operator.
//!
//! - [`classifier`] matches a load to the cheapest plot that holds it and prices it
//! - [`rates`] holds the default tables, administrator overrides and journey quotes
//! - [`allocator`] places pallet items on a trailer
//! - [`store`] persists overrides with a local fallback
//! - [`api`] exposes everything over HTTP

pub mod allocator;
pub mod api;
pub mod classifier;
pub mod config;
pub mod geometry;
pub mod model;
pub mod rates;
pub mod store;
pub mod types;
pub mod volume;
