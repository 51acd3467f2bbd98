//! tradetally — per-contract position and profitability reconstruction
//! from raw exchange order exports.
//!
//! Hexagonal architecture: aggregation logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
