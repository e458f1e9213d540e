//! Registry credential files handed to the packager.

use crate::config::Settings;
use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Hostname fragments that mark a registry as local (plain HTTP, no TLS
/// verification).
pub const LOCAL_HOST_PATTERNS: [&str; 4] = [
    "localhost",
    "127.0.0.1",
    "host.docker.internal",
    "host.container.internal",
];

/// Whether `address` refers to a local registry.
///
/// This is a substring match, so `localhost:5000` and
/// `http://127.0.0.1/v2` both count.
pub fn is_local_host(address: &str) -> bool {
    LOCAL_HOST_PATTERNS
        .iter()
        .any(|pattern| address.contains(pattern))
}

/// Login for the registry holding the freshly built, unpackaged image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SourceCredentials {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(rename = "serveraddress", default, skip_serializing_if = "String::is_empty")]
    pub server_address: String,
    #[serde(rename = "plain-http")]
    pub plain_http: bool,
    pub insecure: bool,
}

impl SourceCredentials {
    pub fn from_settings(settings: &Settings) -> Self {
        let local = is_local_host(&settings.source_registry);
        Self {
            username: settings.source_username.clone(),
            password: settings.source_password.clone(),
            server_address: settings.source_registry.clone(),
            plain_http: local,
            insecure: local,
        }
    }
}

/// Login for the u-OS registry the packaged app is published to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TargetCredentials {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(rename = "repositoryname", default, skip_serializing_if = "String::is_empty")]
    pub repository_name: String,
    #[serde(rename = "plain-http")]
    pub plain_http: bool,
    pub insecure: bool,
}

impl TargetCredentials {
    pub fn from_settings(settings: &Settings) -> Self {
        let local = is_local_host(&settings.target_registry);
        Self {
            username: settings.target_username.clone(),
            password: settings.target_password.clone(),
            repository_name: settings.target_repository.clone(),
            plain_http: local,
            insecure: local,
        }
    }
}

/// Serialize `value` as JSON and write it to `path` in one go, replacing any
/// existing content.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), CommonError> {
    let content = serde_json::to_vec(value)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }

    let mut file = options.open(path)?;
    file.write_all(&content)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(|name| env.get(name).cloned())
    }

    #[test]
    fn test_is_local_host_known_patterns() {
        assert!(is_local_host("localhost:5000"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("http://host.docker.internal:5000"));
        assert!(is_local_host("host.container.internal"));
        assert!(!is_local_host(""));
        assert!(!is_local_host("registry.example.com"));
        assert!(!is_local_host("127.0.0.2:5000"));
    }

    #[test]
    fn test_source_credentials_from_local_registry() {
        let settings = settings_from(&[("CONTAINER_REGISTRY", "localhost:5000")]);
        let creds = SourceCredentials::from_settings(&settings);
        assert_eq!(creds.server_address, "localhost:5000");
        assert!(creds.plain_http);
        assert!(creds.insecure);
    }

    #[test]
    fn test_target_flags_follow_target_registry() {
        let settings = settings_from(&[
            ("CONTAINER_REGISTRY", "localhost:5000"),
            ("U_OS_REGISTRY", "uos.example.com"),
        ]);
        let source = SourceCredentials::from_settings(&settings);
        let target = TargetCredentials::from_settings(&settings);
        assert!(source.insecure);
        assert!(!target.plain_http);
        assert!(!target.insecure);
    }

    #[test]
    fn test_target_inherits_source_login() {
        let settings = settings_from(&[
            ("CONTAINER_REGISTRY_USERNAME", "alice"),
            ("CONTAINER_REGISTRY_PASSWORD", "hunter2"),
        ]);
        let source = SourceCredentials::from_settings(&settings);
        let target = TargetCredentials::from_settings(&settings);
        assert_eq!(target.username, source.username);
        assert_eq!(target.password, source.password);
        assert_eq!(target.repository_name, "u-os-22/u-os-app-thin-edge");
    }

    #[test]
    fn test_empty_login_is_omitted_but_flags_kept() {
        let json = serde_json::to_value(SourceCredentials::default()).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("username"));
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("serveraddress"));
        assert_eq!(object["plain-http"], serde_json::json!(false));
        assert_eq!(object["insecure"], serde_json::json!(false));

        let json = serde_json::to_value(TargetCredentials::default()).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("username"));
        assert!(!object.contains_key("password"));
        assert!(object.contains_key("plain-http"));
        assert!(object.contains_key("insecure"));
    }

    #[test]
    fn test_target_field_names() {
        let creds = TargetCredentials {
            username: "bob".into(),
            password: "secret".into(),
            repository_name: "u-os-22/app".into(),
            plain_http: true,
            insecure: true,
        };
        assert_eq!(
            serde_json::to_string(&creds).unwrap(),
            r#"{"username":"bob","password":"secret","repositoryname":"u-os-22/app","plain-http":true,"insecure":true}"#
        );
    }

    #[test]
    fn test_write_json_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source-credentials.json");
        std::fs::write(&path, "a much longer piece of stale content than the new file").unwrap();

        let creds = SourceCredentials {
            server_address: "registry.example.com".into(),
            ..Default::default()
        };
        write_json(&creds, &path).unwrap();

        let parsed: SourceCredentials =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, creds);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_json_new_file_is_not_group_writable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target-credentials.json");
        write_json(&TargetCredentials::default(), &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o022, 0);
        assert_eq!(mode & 0o600, 0o600);
    }

    #[test]
    fn test_write_json_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("creds.json");
        let err = write_json(&SourceCredentials::default(), &path).unwrap_err();
        assert!(matches!(err, CommonError::Io(_)));
    }

    fn pattern_strategy() -> impl Strategy<Value = &'static str> {
        prop::sample::select(LOCAL_HOST_PATTERNS.to_vec())
    }

    proptest! {
        #[test]
        fn address_containing_local_pattern_is_local(
            prefix in "[a-z0-9.:/-]{0,10}",
            pattern in pattern_strategy(),
            suffix in "[a-z0-9.:/-]{0,10}",
        ) {
            let address = format!("{prefix}{pattern}{suffix}");
            prop_assert!(is_local_host(&address));

            let settings = settings_from(&[("CONTAINER_REGISTRY", address.as_str())]);
            let creds = SourceCredentials::from_settings(&settings);
            prop_assert!(creds.plain_http && creds.insecure);
        }

        #[test]
        fn other_addresses_are_not_local(address in "[a-z0-9.:/-]{0,30}") {
            prop_assume!(!LOCAL_HOST_PATTERNS.iter().any(|p| address.contains(p)));
            prop_assert!(!is_local_host(&address));

            let settings = settings_from(&[("U_OS_REGISTRY", address.as_str())]);
            let creds = TargetCredentials::from_settings(&settings);
            prop_assert!(!creds.plain_http && !creds.insecure);
        }
    }
}
