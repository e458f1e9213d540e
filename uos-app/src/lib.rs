//! u-OS application build orchestration.
//!
//! Renders the app manifest and registry credential files, then runs the
//! requested steps (`build`, `pack`, `export`) through external tools.

pub mod cli;
pub mod command_runner;
pub mod dispatch;
pub mod output;
pub mod package;

pub use cli::Cli;
