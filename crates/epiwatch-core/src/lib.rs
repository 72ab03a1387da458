//! Core types and trait definitions for the epiwatch surveillance pipeline.
//!
//! This crate is deliberately free of CSV and database dependencies. It holds
//! the canonical observation schema, the pure normalization and
//! epidemiological-week logic, and the traits through which the ETL and
//! storage crates talk to each other.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod diagnostics;
pub mod error;
pub mod geo;
pub mod mmwr;
pub mod normalize;
pub mod observation;
pub mod reconcile;
pub mod source;
pub mod store;

pub use error::{Error, Result};
