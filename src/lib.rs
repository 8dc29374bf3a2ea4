pub mod ops;

mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod version;

// Re-export App, Config and Error from modules
pub use app::App;
pub use config::Config;
pub use error::Error;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
