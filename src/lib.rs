//! signalbench: bias-free evaluation of trading position signals.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line driver in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
