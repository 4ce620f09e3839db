//! Optional TOML configuration for the release tooling.
//!
//! Every field has a built-in default matching the Beacon Code release, so a
//! configuration file is only needed to point the tooling at a fork or a
//! different packaging tool. Unknown keys are rejected to catch typos.

use crate::error::{ReleaseError, Result};
use camino::Utf8Path;
use serde::Deserialize;

/// Settings shared by the install and package pipelines.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// GitHub `owner/name` slug whose workflow runs publish the binaries.
    pub github_repo: String,
    /// Parent npm package that consumes the platform packages.
    pub parent_package: String,
    /// `description` written into every platform package manifest.
    pub package_description: String,
    /// Command name exposed through the manifest `bin` map.
    pub command_name: String,
    /// Packaging tool invocation.
    pub packager: PackagerConfig,
    /// License used when the parent `package.json` has none.
    pub license_fallback: String,
    /// Homepage used when the parent `package.json` has none.
    pub homepage_fallback: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            github_repo: "tytsxai/beacon-code".to_owned(),
            parent_package: "@tytsxai/beacon-code".to_owned(),
            package_description: "Platform-specific native binary for Beacon Code.".to_owned(),
            command_name: "code".to_owned(),
            packager: PackagerConfig::default(),
            license_fallback: "Apache-2.0".to_owned(),
            homepage_fallback: "https://github.com/tytsxai/beacon-code".to_owned(),
        }
    }
}

impl ReleaseConfig {
    /// Load configuration from `path`, or return the defaults when no path
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Config`] if the file cannot be read or
    /// parsed, and [`ReleaseError::Configuration`] if a value is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use beacon_release::config::ReleaseConfig;
    ///
    /// let config = ReleaseConfig::load(None)?;
    /// assert_eq!(config.command_name, "code");
    /// # Ok::<(), beacon_release::error::ReleaseError>(())
    /// ```
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|err| ReleaseError::Config {
            path: path.as_std_path().to_path_buf(),
            reason: err.to_string(),
        })?;
        let config = Self::from_toml(&text).map_err(|err| match err {
            ReleaseError::Config { reason, .. } => ReleaseError::Config {
                path: path.as_std_path().to_path_buf(),
                reason,
            },
            other => other,
        })?;
        log::debug!("loaded configuration from {path}");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Config`] for malformed TOML or unknown keys,
    /// and [`ReleaseError::Configuration`] for invalid values.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| ReleaseError::Config {
            path: "<inline>".into(),
            reason: err.message().to_owned(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let slug_ok = self
            .github_repo
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !slug_ok {
            return Err(ReleaseError::Configuration {
                reason: format!(
                    "github_repo must be an owner/name slug, got \"{}\"",
                    self.github_repo
                ),
            });
        }
        if self.command_name.trim().is_empty() {
            return Err(ReleaseError::Configuration {
                reason: "command_name must not be empty".to_owned(),
            });
        }
        if self.packager.program.trim().is_empty() {
            return Err(ReleaseError::Configuration {
                reason: "packager.program must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// External packaging tool run inside each staging directory.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerConfig {
    /// Program to run.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_owned(),
            args: vec!["pack".to_owned(), "--silent".to_owned()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ReleaseConfig::from_toml("").expect("empty config");
        assert_eq!(config, ReleaseConfig::default());
        assert_eq!(config.packager.args, vec!["pack", "--silent"]);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = ReleaseConfig::from_toml(
            r#"
            github_repo = "example/fork"

            [packager]
            program = "pnpm"
            "#,
        )
        .expect("partial config");
        assert_eq!(config.github_repo, "example/fork");
        assert_eq!(config.packager.program, "pnpm");
        assert_eq!(config.packager.args, vec!["pack", "--silent"]);
        assert_eq!(config.command_name, "code");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ReleaseConfig::from_toml("github_repository = \"x/y\"").expect_err("typo");
        assert!(matches!(err, ReleaseError::Config { ref reason, .. } if reason.contains("github_repository")));
    }

    #[rstest]
    #[case::no_slash("github_repo = \"beacon\"")]
    #[case::empty_owner("github_repo = \"/beacon\"")]
    #[case::nested("github_repo = \"a/b/c\"")]
    #[case::blank_command("command_name = \" \"")]
    fn invalid_values_are_configuration_errors(#[case] text: &str) {
        let err = ReleaseConfig::from_toml(text).expect_err("invalid value");
        assert!(matches!(err, ReleaseError::Configuration { .. }));
    }

    #[test]
    fn load_without_path_uses_defaults() {
        assert_eq!(
            ReleaseConfig::load(None).expect("defaults"),
            ReleaseConfig::default()
        );
    }

    #[test]
    fn load_reports_the_file_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("release.toml"))
            .expect("utf-8 temp path");
        std::fs::write(&path, "github_repo = 7\n").expect("write config");

        let err = ReleaseConfig::load(Some(&path)).expect_err("wrong type");
        match err {
            ReleaseError::Config { path: reported, .. } => {
                assert_eq!(reported, path.as_std_path());
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("release.toml"))
            .expect("utf-8 temp path");
        std::fs::write(&path, "command_name = \"beacon\"\n").expect("write config");

        let config = ReleaseConfig::load(Some(&path)).expect("valid file");
        assert_eq!(config.command_name, "beacon");
    }
}
