//! Step dispatch to the external image builder and app packager.
//!
//! Each step maps to exactly one external command line. Argument vectors are
//! built by pure functions so they can be checked without spawning anything;
//! [`run_steps`] then executes them in order and stops at the first failure.

use crate::command_runner::{CommandOptions, CommandRunner};
use crate::output::Output;
use crate::package::PackageLayout;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::ffi::OsStr;
use uos_app_common::config::Settings;
use uos_app_common::credentials::is_local_host;

pub const DOCKER: &str = "docker";

pub const DOCKERFILE: &str = "build/image/raw.Dockerfile";
pub const BUILD_CONTEXT: &str = "build/image";
pub const PLATFORMS: &str = "linux/arm/v7,linux/arm64";
pub const BUILD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const PACKAGER_IMAGE: &str = "wmucdev.azurecr.io/u-control/uc-aom-packager:0";
pub const PACKAGER: &str = "uc-aom-packager";
pub const ADDON_MOUNT: &str = "/tmp/addon";
pub const SOURCE_CREDENTIALS_IN_CONTAINER: &str = "/tmp/addon/source-credentials.json";
pub const TARGET_CREDENTIALS_IN_CONTAINER: &str = "/tmp/addon/target-credentials.json";
pub const EXPORT_OUTPUT_IN_CONTAINER: &str = "/tmp/addon/swu";

/// Flags shared by both packager invocations, ahead of the mount.
const PACKAGER_RUN_FLAGS: [&str; 5] = [
    "run",
    "--rm",
    "--pull=always",
    "--network=host",
    "--add-host=host.docker.internal:host-gateway",
];

/// A recognized step name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Build the multi-platform image and push it to the source registry.
    Build,
    /// Package the app and push it to the u-OS registry.
    Pack,
    /// Export an SWU file for the app from the u-OS registry.
    Export,
}

impl Step {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "build" => Some(Self::Build),
            "pack" => Some(Self::Pack),
            "export" => Some(Self::Export),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Pack => "pack",
            Self::Export => "export",
        }
    }

    /// What the step was trying to do, for failure messages.
    pub fn purpose(self) -> &'static str {
        match self {
            Self::Build => "Failed to build/push container image",
            Self::Pack => "Failed to create/push app to u-OS Registry",
            Self::Export => "Failed to export SWU file from u-OS Registry",
        }
    }

    fn announce(self, ctx: &InvocationContext<'_>) {
        match self {
            Self::Build => tracing::info!("🏗️ Build container image"),
            Self::Pack => tracing::info!(
                "📦 Creating and pushing app to u-OS Registry: {}",
                ctx.settings.target_registry
            ),
            Self::Export => tracing::info!(
                "💾 Exporting SWU file for the app from the u-OS Registry: {}",
                ctx.settings.target_registry
            ),
        }
    }
}

/// Map step names to steps, keeping order and skipping unknown names.
///
/// A name that is not valid UTF-8 can't match any step and is skipped too.
pub fn parse_steps<S: AsRef<OsStr>>(names: &[S]) -> Vec<Step> {
    names
        .iter()
        .filter_map(|name| {
            let name: &OsStr = name.as_ref();
            let step = name.to_str().and_then(Step::from_name);
            if step.is_none() {
                tracing::debug!(step = ?name, "Ignoring unknown step");
            }
            step
        })
        .collect()
}

/// Everything an invocation is built from.
#[derive(Debug, Clone)]
pub struct InvocationContext<'a> {
    pub settings: &'a Settings,
    pub layout: &'a PackageLayout,
    /// Already formatted with [`BUILD_DATE_FORMAT`].
    pub build_date: String,
}

impl<'a> InvocationContext<'a> {
    pub fn new(settings: &'a Settings, layout: &'a PackageLayout, now: DateTime<Utc>) -> Self {
        Self {
            settings,
            layout,
            build_date: now.format(BUILD_DATE_FORMAT).to_string(),
        }
    }
}

/// A fully assembled external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn for_step(step: Step, ctx: &InvocationContext<'_>) -> Self {
        let args = match step {
            Step::Build => build_args(ctx),
            Step::Pack => pack_args(ctx),
            Step::Export => export_args(ctx),
        };
        Self {
            program: DOCKER,
            args,
        }
    }

    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

fn build_args(ctx: &InvocationContext<'_>) -> Vec<String> {
    let source_insecure = is_local_host(&ctx.settings.source_registry);
    vec![
        "buildx".to_string(),
        "build".to_string(),
        "--build-arg".to_string(),
        "BUILDKIT_MULTI_PLATFORM=1".to_string(),
        "--build-arg".to_string(),
        format!("BUILD_DATE={}", ctx.build_date),
        "--build-arg".to_string(),
        format!("IMAGE_NAME={}", ctx.settings.image_tag()),
        "--file".to_string(),
        DOCKERFILE.to_string(),
        "--platform".to_string(),
        PLATFORMS.to_string(),
        format!("--output=type=registry,registry.insecure={source_insecure}"),
        "--push".to_string(),
        "-t".to_string(),
        ctx.settings.image_reference(),
        BUILD_CONTEXT.to_string(),
    ]
}

/// `docker run ...` up to and including the packager subcommand.
fn packager_prefix(
    ctx: &InvocationContext<'_>,
    mount_source: &str,
    subcommand: &str,
) -> Vec<String> {
    let mut args: Vec<String> = PACKAGER_RUN_FLAGS.iter().map(|s| s.to_string()).collect();
    args.extend([
        "--mount".to_string(),
        format!("src={mount_source},target={ADDON_MOUNT},type=bind"),
        "-e".to_string(),
        format!(
            "DEFAULT_REGISTRY_SERVER_ADDRESS={}",
            ctx.settings.target_registry
        ),
        PACKAGER_IMAGE.to_string(),
        PACKAGER.to_string(),
        subcommand.to_string(),
    ]);
    args
}

fn pack_args(ctx: &InvocationContext<'_>) -> Vec<String> {
    let mount = ctx.layout.package_dir();
    let mut args = packager_prefix(ctx, &mount.display().to_string(), "push");
    args.extend(
        [
            "-m",
            ADDON_MOUNT,
            "-s",
            SOURCE_CREDENTIALS_IN_CONTAINER,
            "-t",
            TARGET_CREDENTIALS_IN_CONTAINER,
            "-vvv",
        ]
        .map(String::from),
    );
    args
}

fn export_args(ctx: &InvocationContext<'_>) -> Vec<String> {
    let mount = ctx.layout.build_dir();
    let mut args = packager_prefix(ctx, &mount.display().to_string(), "export");
    args.extend(
        [
            "-m",
            ADDON_MOUNT,
            "-t",
            TARGET_CREDENTIALS_IN_CONTAINER,
            "-o",
            EXPORT_OUTPUT_IN_CONTAINER,
            "--version",
        ]
        .map(String::from),
    );
    args.push(ctx.settings.version.clone());
    args.push("-vvv".to_string());
    args
}

/// Run `steps` in order, stopping at the first one that fails to start or
/// exits non-zero.
pub fn run_steps(
    steps: &[Step],
    ctx: &InvocationContext<'_>,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let options = CommandOptions::with_cwd(ctx.layout.root());

    for &step in steps {
        step.announce(ctx);
        let invocation = Invocation::for_step(step, ctx);
        let args = invocation.arg_refs();
        Output::running(Output::command_line(invocation.program, &args));

        let output = runner
            .run_streamed(invocation.program, &args, &options)
            .context(step.purpose())?;
        tracing::debug!(
            step = step.name(),
            bytes = output.combined.len(),
            "Step output captured"
        );

        if !output.status.success() {
            bail!(
                "{}: {} exited with status {}",
                step.purpose(),
                invocation.program,
                output.status
            );
        }
    }

    Ok(())
}
