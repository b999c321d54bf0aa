//! End-to-end summon tests.
//!
//! These tests drive host-shaped JSON requests through the full path the
//! runner takes: parse, resolve with settings loaded from variables, render,
//! and read the result back the way the host would apply it.
//!
//! # Running
//!
//! ```bash
//! cargo test -p summoner-engine --lib e2e_tests
//! ```

mod e2e_helpers;

pub use e2e_helpers::*;
