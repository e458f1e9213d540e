//! Package directory preparation.
//!
//! Every run rewrites the manifest and both credential files before any
//! step executes, so the packager always sees the current settings.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use uos_app_common::config::Settings;
use uos_app_common::credentials::{SourceCredentials, TargetCredentials, write_json};
use uos_app_common::manifest::{Manifest, generate_manifest};

pub const BUILD_DIR: &str = "build";
pub const PACKAGE_DIR: &str = "build/package";
pub const MANIFEST_TEMPLATE_FILE: &str = "manifest.tmpl.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SOURCE_CREDENTIALS_FILE: &str = "source-credentials.json";
pub const TARGET_CREDENTIALS_FILE: &str = "target-credentials.json";

/// Locations of the generated package files under a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    pub fn package_dir(&self) -> PathBuf {
        self.root.join(PACKAGE_DIR)
    }

    pub fn manifest_template(&self) -> PathBuf {
        self.package_dir().join(MANIFEST_TEMPLATE_FILE)
    }

    pub fn manifest(&self) -> PathBuf {
        self.package_dir().join(MANIFEST_FILE)
    }

    pub fn source_credentials(&self) -> PathBuf {
        self.package_dir().join(SOURCE_CREDENTIALS_FILE)
    }

    pub fn target_credentials(&self) -> PathBuf {
        self.package_dir().join(TARGET_CREDENTIALS_FILE)
    }
}

/// Render the manifest and write both credential files.
pub fn prepare(layout: &PackageLayout, settings: &Settings) -> Result<()> {
    let manifest = Manifest::from_settings(settings);
    let manifest_path = layout.manifest();
    tracing::info!(
        "✍️ Creating app manifest from template: {}",
        manifest_path.display()
    );
    generate_manifest(&manifest, &layout.manifest_template(), &manifest_path)
        .context("Failed to generate app manifest")?;

    write_credentials(
        &SourceCredentials::from_settings(settings),
        &layout.source_credentials(),
    )?;
    write_credentials(
        &TargetCredentials::from_settings(settings),
        &layout.target_credentials(),
    )?;

    Ok(())
}

fn write_credentials<T: serde::Serialize>(credentials: &T, path: &Path) -> Result<()> {
    tracing::info!("✍️ Creating file: {}", path.display());
    write_json(credentials, path)
        .with_context(|| format!("Failed to write credentials to {}", path.display()))
}
