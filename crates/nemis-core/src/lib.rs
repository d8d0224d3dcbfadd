//! Core types and trait definitions for the NEMIS school-management service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the data model, the access-control rules (gate, role router, org scope,
//! redirect validation) and the [`store::SchoolStore`] abstraction.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod error;
pub mod identity;
pub mod import;
pub mod learner;
pub mod location;
pub mod redirect;
pub mod school;
pub mod scope;
pub mod staff;
pub mod store;
pub mod subject;
pub mod validate;

pub use error::{Error, Result};
