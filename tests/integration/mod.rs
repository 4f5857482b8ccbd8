//! Integration test suite for selfup
//!
//! End-to-end tests of the upgrade pipeline against a local HTTP server, and
//! of the `selfup` binary itself.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: Shared helpers (temp install dirs, release fixtures)
//! - **upgrade**: Library-level upgrades with the GitHub release client
//! - **cli**: The compiled binary driven through `assert_cmd`

mod cli;
mod common;
mod upgrade;
