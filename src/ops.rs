//! Operations modules for interacting with external tools and services.
//!
//! This module contains the integration layers that the updater coordinates:
//!
//! - [`command`]: Running external programs and capturing their output
//! - [`git`]: Git operations (branch checkout, staging, conditional commits, force pushes)
//! - [`github`]: GitHub GraphQL operations (repository info, tags, users, pull requests)
//! - [`github_curl`]: Curl-based HTTP transport for GitHub GraphQL requests
//! - [`niv`]: The niv pinning tool
//! - [`sources`]: Reading pins from niv's `sources.json`
//!
//! Each submodule except the transports provides a trait-based abstraction with
//! a real implementation and a mock for testing.

pub mod command;
pub mod git;
pub mod github;
pub mod github_curl;
pub mod niv;
pub mod sources;
