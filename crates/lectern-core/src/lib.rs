//! Core types and policy for the Lectern learning-management backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! access policy, the subscription toggle and the storage traits live here;
//! `lectern-store-sqlite` and `lectern-api` build on top of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod ids;
pub mod notify;
pub mod payment;
pub mod policy;
pub mod principal;
pub mod store;
pub mod subscription;
pub mod validate;

pub use error::{Error, Result};
