//! Shared world and install steps for the release behaviour tests.
//!
//! Every scenario runs in its own temporary tree laid out as:
//!
//! - `artifacts/<target>/<archive>` for pre-downloaded bundles
//! - `cli/vendor` as the install destination
//! - `vendor` for hand-built vendor trees fed to the packer
//! - `dist/npm` for packed tarballs

use beacon_release::archive::StandardExtractor;
use beacon_release::error::{self as release, ReleaseError};
use beacon_release::fetch::{ArtifactFetcher, WorkflowRun};
use beacon_release::matrix::Registry;
use beacon_release::orchestrator::{ArtifactSource, InstallDeps, InstallRequest, run_install};
use beacon_release::output::{Progress, RunSummary};
use beacon_release::test_utils::{RecordingPacker, write_zst_archive};
use rstest::fixture;
use rstest_bdd_macros::{given, then, when};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// State carried between the steps of one scenario.
pub struct ReleaseWorld {
    pub temp: TempDir,
    pub registry: Registry,
    pub workflow_reference: Option<String>,
    pub fetched_components: Vec<String>,
    pub components: Vec<String>,
    pub install_result: Option<release::Result<RunSummary>>,
    pub packer: RecordingPacker,
    pub version: String,
    pub package_result: Option<release::Result<RunSummary>>,
}

impl ReleaseWorld {
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn installed_vendor(&self) -> PathBuf {
        self.root().join("cli").join("vendor")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("dist").join("npm")
    }
}

#[fixture]
pub fn world() -> ReleaseWorld {
    ReleaseWorld {
        temp: TempDir::new().expect("temp dir"),
        registry: Registry::standard().expect("standard registry"),
        workflow_reference: None,
        fetched_components: Vec::new(),
        components: Vec::new(),
        install_result: None,
        packer: RecordingPacker::producing_tarballs(),
        version: String::new(),
        package_result: None,
    }
}

/// Write one zstd archive per target of `component` under `artifacts_root`.
pub fn publish(
    registry: &Registry,
    artifacts_root: &Path,
    component: &str,
    except: Option<&str>,
) -> release::Result<()> {
    let component = registry.components().get(component)?;
    for target in component.targets(registry.matrix()) {
        if except == Some(target.as_str()) {
            continue;
        }
        let archive = artifacts_root
            .join(target.as_str())
            .join(component.archive_name(target));
        write_zst_archive(&archive, format!("{} for {target}", component.name()).as_bytes())?;
    }
    Ok(())
}

/// Fetcher that publishes archives into the download directory instead of
/// calling `gh`.
struct PublishingFetcher<'a> {
    registry: &'a Registry,
    components: &'a [String],
}

impl ArtifactFetcher for PublishingFetcher<'_> {
    fn fetch(&self, _run: &WorkflowRun, destination_root: &Path) -> release::Result<()> {
        for component in self.components {
            publish(self.registry, destination_root, component, None)?;
        }
        Ok(())
    }
}

#[given("workflow run \"{reference}\" published every \"{component}\" archive")]
fn given_workflow_run(world: &mut ReleaseWorld, reference: String, component: String) {
    world.workflow_reference = Some(reference);
    world.fetched_components.push(component);
}

#[given("an artifacts directory with every \"{component}\" archive")]
fn given_artifacts_directory(world: &mut ReleaseWorld, component: String) {
    let artifacts = world.root().join("artifacts");
    publish(&world.registry, &artifacts, &component, None).expect("publish archives");
}

#[given("an artifacts directory with every \"{component}\" archive except \"{target}\"")]
fn given_artifacts_directory_except(world: &mut ReleaseWorld, component: String, target: String) {
    let artifacts = world.root().join("artifacts");
    publish(&world.registry, &artifacts, &component, Some(&target)).expect("publish archives");
}

#[given("the requested component \"{name}\"")]
fn given_requested_component(world: &mut ReleaseWorld, name: String) {
    world.components.push(name);
}

#[when("the install pipeline runs")]
fn when_install_runs(world: &mut ReleaseWorld) {
    let source = match &world.workflow_reference {
        Some(reference) => ArtifactSource::from_options(Some(reference.as_str()), None),
        None => Ok(ArtifactSource::Directory(world.root().join("artifacts"))),
    }
    .expect("valid artifact source");
    let request = InstallRequest {
        root: world.root().join("cli"),
        source,
        components: world.components.clone(),
        jobs: None,
    };
    let fetcher = PublishingFetcher {
        registry: &world.registry,
        components: &world.fetched_components,
    };
    let deps = InstallDeps {
        fetcher: &fetcher,
        extractor: &StandardExtractor,
    };
    let mut stderr = Vec::new();
    let result = run_install(
        &world.registry,
        &request,
        &deps,
        &mut Progress::new(&mut stderr, false),
    );
    world.install_result = Some(result);
}

#[then("the install succeeds with {count:usize} installed targets")]
fn then_install_succeeds(world: &mut ReleaseWorld, count: usize) {
    let result = world.install_result.as_ref().expect("install ran");
    let summary = result.as_ref().expect("install succeeded");
    assert_eq!(summary.succeeded, count);
    assert!(summary.is_success());
}

#[then("the install fails with a missing artifact for \"{target}\"")]
fn then_install_fails_missing(world: &mut ReleaseWorld, target: String) {
    let result = world.install_result.as_ref().expect("install ran");
    assert!(
        matches!(result, Err(ReleaseError::ArtifactNotFound { target: failed, .. }) if *failed == target),
        "unexpected result {result:?}"
    );
}

#[then("the install fails with an unknown component error")]
fn then_install_fails_unknown(world: &mut ReleaseWorld) {
    let result = world.install_result.as_ref().expect("install ran");
    assert!(
        matches!(result, Err(ReleaseError::UnknownComponent { .. })),
        "unexpected result {result:?}"
    );
}

#[then("{count:usize} targets have a \"{component}\" binary in the vendor tree")]
fn then_targets_installed(world: &mut ReleaseWorld, count: usize, component: String) {
    let component = world.registry.components().get(&component).expect("component");
    let vendor = world.installed_vendor();
    let installed = component
        .targets(world.registry.matrix())
        .into_iter()
        .filter(|target| component.vendor_path(&vendor, *target).is_file())
        .count();
    assert_eq!(installed, count);
}

#[then("no vendor tree exists")]
fn then_no_vendor_tree(world: &mut ReleaseWorld) {
    assert!(!world.installed_vendor().exists());
}
