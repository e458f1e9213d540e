use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use uos_app::Cli;
use uos_app::command_runner::RealCommandRunner;
use uos_app::dispatch::{self, InvocationContext};
use uos_app::output::Output;
use uos_app::package::{self, PackageLayout};
use uos_app_common::config::Settings;

fn run(cli: Cli) -> Result<()> {
    tracing::info!("🚀 Building u-OS Application");

    let cwd = std::env::current_dir().context("Could not get current working directory")?;
    let settings = Settings::from_env();
    let layout = PackageLayout::new(cwd);

    tracing::debug!(
        image = %settings.image_reference(),
        target_registry = %settings.target_registry,
        "Settings resolved"
    );

    package::prepare(&layout, &settings)?;

    let steps = dispatch::parse_steps(cli.steps.as_slice());
    let ctx = InvocationContext::new(&settings, &layout, chrono::Utc::now());
    dispatch::run_steps(&steps, &ctx, &RealCommandRunner)?;

    Output::success("Successful");
    Ok(())
}

fn main() {
    // Defaults to info; override with RUST_LOG, e.g. RUST_LOG=uos_app=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
