//! Platform package manifests.
//!
//! Each platform package carries a `package.json` that pins it to one
//! `os`/`cpu` pair and exposes the native binary through `bin`. License,
//! repository, and homepage are inherited from the parent package.

use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::matrix::platform::PlatformPackage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Metadata inherited from the parent package's `package.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMetadata {
    /// SPDX license identifier.
    pub license: String,
    /// `repository` field, copied verbatim; `null` when absent.
    pub repository: Value,
    /// Project homepage.
    pub homepage: String,
}

#[derive(Deserialize)]
struct ParentFields {
    license: Option<String>,
    repository: Option<Value>,
    homepage: Option<String>,
}

impl BaseMetadata {
    /// Read base metadata from the `package.json` at `path`, filling gaps
    /// from the configured fallbacks.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Metadata`] if the file cannot be read or is
    /// not a JSON object with string `license`/`homepage` fields.
    pub fn load(path: &Path, config: &ReleaseConfig) -> Result<Self> {
        let metadata_error = |reason: String| ReleaseError::Metadata {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|err| metadata_error(err.to_string()))?;
        let parent: ParentFields =
            serde_json::from_str(&text).map_err(|err| metadata_error(err.to_string()))?;

        Ok(Self {
            license: parent
                .license
                .unwrap_or_else(|| config.license_fallback.clone()),
            repository: parent.repository.unwrap_or(Value::Null),
            homepage: parent
                .homepage
                .unwrap_or_else(|| config.homepage_fallback.clone()),
        })
    }

    /// Metadata built purely from configuration fallbacks.
    #[must_use]
    pub fn fallback(config: &ReleaseConfig) -> Self {
        Self {
            license: config.license_fallback.clone(),
            repository: Value::Null,
            homepage: config.homepage_fallback.clone(),
        }
    }
}

/// The `package.json` document of one platform package.
///
/// Field order matches the order written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// npm package name.
    pub name: String,
    /// Release version, written as given.
    pub version: String,
    /// Fixed package description.
    pub description: String,
    /// Inherited license.
    pub license: String,
    /// Inherited repository, `null` when the parent has none.
    pub repository: Value,
    /// Inherited homepage.
    pub homepage: String,
    /// npm `os` constraint.
    pub os: Vec<String>,
    /// npm `cpu` constraint.
    pub cpu: Vec<String>,
    /// Files included in the tarball.
    pub files: Vec<String>,
    /// Command name to binary path.
    pub bin: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Build the manifest for `package` at `version`, exposing
    /// `bin/<binary_name>` as the configured command.
    #[must_use]
    pub fn for_package(
        package: &PlatformPackage,
        version: &str,
        binary_name: &str,
        base: &BaseMetadata,
        config: &ReleaseConfig,
    ) -> Self {
        Self {
            name: package.package_name().to_owned(),
            version: version.to_owned(),
            description: config.package_description.clone(),
            license: base.license.clone(),
            repository: base.repository.clone(),
            homepage: base.homepage.clone(),
            os: vec![package.os().to_string()],
            cpu: vec![package.cpu().to_string()],
            files: vec!["bin/**".to_owned()],
            bin: BTreeMap::from([(config.command_name.clone(), format!("bin/{binary_name}"))]),
        }
    }

    /// Pretty-print with two-space indentation and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Serialization`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// README placed beside the binary in every platform package.
#[must_use]
pub fn readme_text(package_name: &str, command_name: &str, parent_package: &str) -> String {
    format!(
        "# {package_name}\n\n\
         This package contains the native `{command_name}` binary for a single platform.\n\
         It is consumed as an optionalDependency of `{parent_package}`.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::target::TargetTriple;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn linux_package() -> PlatformPackage {
        PlatformPackage::new(
            "beacon-code-linux-x64",
            TargetTriple::try_from("x86_64-unknown-linux-musl").expect("valid"),
        )
    }

    fn write_parent(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), contents).expect("write package.json");
        file
    }

    #[test]
    fn base_metadata_reads_parent_fields() {
        let parent = write_parent(
            r#"{"name":"@tytsxai/beacon-code","license":"MIT",
                "repository":{"type":"git","url":"git+https://example.test/beacon.git"},
                "homepage":"https://example.test"}"#,
        );
        let base = BaseMetadata::load(parent.path(), &ReleaseConfig::default()).expect("metadata");
        assert_eq!(base.license, "MIT");
        assert_eq!(base.homepage, "https://example.test");
        assert_eq!(base.repository["type"], "git");
    }

    #[test]
    fn base_metadata_falls_back_to_defaults() {
        let parent = write_parent(r#"{"name":"@tytsxai/beacon-code"}"#);
        let base = BaseMetadata::load(parent.path(), &ReleaseConfig::default()).expect("metadata");
        assert_eq!(base, BaseMetadata::fallback(&ReleaseConfig::default()));
        assert_eq!(base.license, "Apache-2.0");
        assert_eq!(base.homepage, "https://github.com/tytsxai/beacon-code");
        assert!(base.repository.is_null());
    }

    #[rstest]
    #[case::not_json("license = 'MIT'")]
    #[case::wrong_type(r#"{"license": 7}"#)]
    fn base_metadata_rejects_malformed_documents(#[case] contents: &str) {
        let parent = write_parent(contents);
        let err = BaseMetadata::load(parent.path(), &ReleaseConfig::default())
            .expect_err("malformed metadata");
        assert!(matches!(err, ReleaseError::Metadata { .. }));
    }

    #[rstest]
    fn manifest_serializes_in_fixed_order(linux_package: PlatformPackage) {
        let config = ReleaseConfig::default();
        let manifest = PackageManifest::for_package(
            &linux_package,
            "1.2.3",
            &linux_package.binary_name("code"),
            &BaseMetadata::fallback(&config),
            &config,
        );
        let json = manifest.to_json_pretty().expect("serialize");

        assert!(json.ends_with("}\n"));
        assert!(json.starts_with("{\n  \"name\": \"beacon-code-linux-x64\",\n  \"version\": \"1.2.3\""));
        let keys: Vec<_> = ["name", "version", "description", "license", "repository", "homepage", "os", "cpu", "files", "bin"]
            .iter()
            .map(|key| json.find(&format!("\"{key}\":")).expect("key present"))
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]), "keys out of order: {json}");

        let value: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["os"], json!(["linux"]));
        assert_eq!(value["cpu"], json!(["x64"]));
        assert_eq!(value["files"], json!(["bin/**"]));
        assert_eq!(value["repository"], Value::Null);
        assert_eq!(value["bin"], json!({"code": "bin/code-x86_64-unknown-linux-musl"}));
    }

    #[test]
    fn readme_names_package_and_parent() {
        let text = readme_text("beacon-code-win32-x64", "code", "@tytsxai/beacon-code");
        assert!(text.starts_with("# beacon-code-win32-x64\n\n"));
        assert!(text.contains("native `code` binary for a single platform"));
        assert!(text.ends_with("optionalDependency of `@tytsxai/beacon-code`.\n"));
    }
}
