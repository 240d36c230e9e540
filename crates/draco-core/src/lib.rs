//! Core types and trait definitions for the DRACO case-management service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod blob;
pub mod case;
pub mod error;
pub mod evidence;
pub mod message;
pub mod notification;
pub mod profile;
pub mod store;

pub use error::{Error, Result};
