//! Build settings resolved from the process environment.
//!
//! Every setting has a default, so resolution never fails. Resolution is
//! pure over a lookup function, which lets tests supply an arbitrary
//! environment without touching the real one.

pub const IMAGE_NAME: &str = "IMAGE_NAME";
pub const VERSION: &str = "VERSION";
pub const CONTAINER_REGISTRY: &str = "CONTAINER_REGISTRY";
pub const CONTAINER_REGISTRY_USERNAME: &str = "CONTAINER_REGISTRY_USERNAME";
pub const CONTAINER_REGISTRY_PASSWORD: &str = "CONTAINER_REGISTRY_PASSWORD";
pub const U_OS_REGISTRY: &str = "U_OS_REGISTRY";
pub const U_OS_REGISTRY_NAME: &str = "U_OS_REGISTRY_NAME";
pub const U_OS_REGISTRY_USERNAME: &str = "U_OS_REGISTRY_USERNAME";
pub const U_OS_REGISTRY_PASSWORD: &str = "U_OS_REGISTRY_PASSWORD";

/// All variables the resolver reads.
pub const ALL_VARIABLES: [&str; 9] = [
    IMAGE_NAME,
    VERSION,
    CONTAINER_REGISTRY,
    CONTAINER_REGISTRY_USERNAME,
    CONTAINER_REGISTRY_PASSWORD,
    U_OS_REGISTRY,
    U_OS_REGISTRY_NAME,
    U_OS_REGISTRY_USERNAME,
    U_OS_REGISTRY_PASSWORD,
];

pub const DEFAULT_IMAGE_NAME: &str = "u-os-image-thin-edge";
pub const DEFAULT_VERSION: &str = "0.0.0-1";
pub const DEFAULT_REPOSITORY_NAME: &str = "u-os-22/u-os-app-thin-edge";

/// Return the looked-up value of `name` if it is set and non-empty,
/// otherwise `default`.
pub fn resolve_or<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Resolved build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub image_name: String,
    /// Used for both the image tag and the application version.
    pub version: String,
    pub source_registry: String,
    pub source_username: String,
    pub source_password: String,
    /// Falls back to `source_registry`.
    pub target_registry: String,
    pub target_repository: String,
    /// Falls back to `source_username`.
    pub target_username: String,
    /// Falls back to `source_password`.
    pub target_password: String,
}

impl Settings {
    /// Resolve all settings through `lookup`.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_registry = resolve_or(&lookup, CONTAINER_REGISTRY, "");
        let source_username = resolve_or(&lookup, CONTAINER_REGISTRY_USERNAME, "");
        let source_password = resolve_or(&lookup, CONTAINER_REGISTRY_PASSWORD, "");

        Self {
            image_name: resolve_or(&lookup, IMAGE_NAME, DEFAULT_IMAGE_NAME),
            version: resolve_or(&lookup, VERSION, DEFAULT_VERSION),
            target_registry: resolve_or(&lookup, U_OS_REGISTRY, &source_registry),
            target_repository: resolve_or(&lookup, U_OS_REGISTRY_NAME, DEFAULT_REPOSITORY_NAME),
            target_username: resolve_or(&lookup, U_OS_REGISTRY_USERNAME, &source_username),
            target_password: resolve_or(&lookup, U_OS_REGISTRY_PASSWORD, &source_password),
            source_registry,
            source_username,
            source_password,
        }
    }

    /// Resolve all settings from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// `<image name>:<version>`
    pub fn image_tag(&self) -> String {
        format!("{}:{}", self.image_name, self.version)
    }

    /// `<source registry>/<image name>:<version>`, the reference the built
    /// image is pushed to.
    pub fn image_reference(&self) -> String {
        format!("{}/{}", self.source_registry, self.image_tag())
    }
}
