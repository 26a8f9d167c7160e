//! Portfolio accounting simulator over historical prices.
//!
//! Hexagonal architecture: the accounting engine lives in [`domain`], port
//! traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
