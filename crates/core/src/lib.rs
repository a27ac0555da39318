//! QKart Core - Shared types and cart logic.
//!
//! This crate provides the domain types used by the storefront and its tests:
//! - `storefront` - Server-rendered shop front backed by the QKart REST API
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session handling. Cart reconciliation lives here so it can be
//! tested without a running backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, usernames, products, cart entries, addresses
//! - [`validation`] - Local checks run before credentials or orders reach the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
