//! skillcheck - scripted conversation tests for voice skills
//!
//! Drives multi-turn sessions against a skill through a [`transport::Transport`]
//! and checks every response against a closed vocabulary of assertions and
//! assets.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod protocol;
pub mod script;
pub mod session;
pub mod transport;

#[cfg(test)]
pub mod test_utils;

pub use error::{CheckError, Result};
