//! Top-level commands run by the binary.
//!
//! - [`update`]: update pinned nix sources and open a pull request

pub mod update;
