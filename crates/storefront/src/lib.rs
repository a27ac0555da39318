//! QKart Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;
pub mod state;

pub use routes::app;
