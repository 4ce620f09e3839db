//! Unit tests for concurrent vendor-tree installation.

use super::*;
use crate::archive::{ExtractionError, MockArchiveExtractor, StandardExtractor};
use crate::matrix::target::TargetMatrix;
use crate::test_utils::write_zst_archive;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Trees {
    _root: TempDir,
    artifacts: PathBuf,
    vendor: PathBuf,
}

#[fixture]
fn trees() -> Trees {
    let root = TempDir::new().expect("temp dir");
    let artifacts = root.path().join("artifacts");
    let vendor = root.path().join("vendor");
    Trees {
        _root: root,
        artifacts,
        vendor,
    }
}

fn code() -> BinaryComponent {
    BinaryComponent::new("code", "code", "code", "code").expect("valid component")
}

fn payload_for(target: TargetTriple) -> Vec<u8> {
    format!("binary for {target}").into_bytes()
}

fn publish(trees: &Trees, component: &BinaryComponent, target: TargetTriple, payload: &[u8]) {
    let archive = trees
        .artifacts
        .join(target.as_str())
        .join(component.archive_name(target));
    write_zst_archive(&archive, payload).expect("write archive");
}

fn all_targets() -> Vec<TargetTriple> {
    TargetMatrix::standard().targets().to_vec()
}

#[rstest]
fn installs_every_target(trees: Trees) {
    let component = code();
    let targets = all_targets();
    for &target in &targets {
        publish(&trees, &component, target, &payload_for(target));
    }

    let extractor = StandardExtractor;
    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .install(&component, &targets);

    assert!(report.is_success());
    assert_eq!(report.component(), "code");
    for &target in &targets {
        let path = component.vendor_path(&trees.vendor, target);
        assert_eq!(fs::read(&path).expect("vendor binary"), payload_for(target));
        match report.outcome(target) {
            Some(TargetOutcome::Installed { path: reported, sha256 }) => {
                assert_eq!(reported, &path);
                assert_eq!(sha256, &compute_sha256(&path).expect("digest"));
            }
            other => panic!("expected {target} to be installed, got {other:?}"),
        }
    }
    let windows = TargetTriple::try_from("x86_64-pc-windows-msvc").expect("valid");
    assert!(
        trees
            .vendor
            .join("x86_64-pc-windows-msvc/code/code.exe")
            .is_file(),
        "windows binary keeps its suffix"
    );
    assert!(report.outcome(windows).is_some());
}

#[rstest]
fn missing_last_archive_fails_only_that_target(trees: Trees) {
    let component = code();
    let targets = all_targets();
    let (missing, present) = targets.split_last().expect("non-empty matrix");
    for &target in present {
        publish(&trees, &component, target, &payload_for(target));
    }

    let extractor = StandardExtractor;
    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .install(&component, &targets);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.installed(), present.len());
    assert_eq!(report.skipped(), 0);
    assert!(matches!(
        report.outcome(*missing),
        Some(TargetOutcome::Failed(ReleaseError::ArtifactNotFound { .. }))
    ));
    for &target in present {
        let path = component.vendor_path(&trees.vendor, target);
        assert_eq!(fs::read(&path).expect("vendor binary"), payload_for(target));
    }

    let err = report.into_result().expect_err("one target failed");
    assert!(
        matches!(err, ReleaseError::ArtifactNotFound { ref target, .. } if target == missing.as_str())
    );
}

#[rstest]
#[case::single_worker(NonZeroUsize::new(1))]
#[case::default_workers(None)]
fn missing_first_archive_still_installs_the_rest(
    trees: Trees,
    #[case] jobs: Option<NonZeroUsize>,
) {
    let component = code();
    let targets = all_targets();
    let (missing, present) = targets.split_first().expect("non-empty matrix");
    for &target in present {
        publish(&trees, &component, target, &payload_for(target));
    }

    let extractor = StandardExtractor;
    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .with_jobs(jobs)
        .install(&component, &targets);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.installed(), present.len());
    assert_eq!(report.skipped(), 0);
    for &target in present {
        let path = component.vendor_path(&trees.vendor, target);
        assert_eq!(fs::read(&path).expect("vendor binary"), payload_for(target));
    }
    assert!(!component.vendor_path(&trees.vendor, *missing).exists());

    let err = report.into_result().expect_err("first target failed");
    assert!(
        matches!(err, ReleaseError::ArtifactNotFound { ref target, .. } if target == missing.as_str())
    );
}

#[rstest]
fn earliest_failure_wins_when_several_targets_fail(trees: Trees) {
    let component = code();
    let targets = all_targets();
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().times(0);

    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .with_jobs(NonZeroUsize::new(1))
        .install(&component, &targets);

    assert_eq!(report.failed(), targets.len());
    assert_eq!(report.skipped(), 0);
    let first = targets.first().expect("non-empty matrix");
    let err = report.into_result().expect_err("every archive is missing");
    assert!(
        matches!(err, ReleaseError::ArtifactNotFound { ref target, .. } if target == first.as_str())
    );
}

#[rstest]
fn extraction_errors_are_reported_per_target(trees: Trees) {
    let component = code();
    let target = TargetTriple::try_from("aarch64-apple-darwin").expect("valid");
    publish(&trees, &component, target, b"payload");

    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().times(1).returning(|descriptor, _, _| {
        Err(ExtractionError::ArchiveMemberNotFound {
            archive: descriptor.path().to_path_buf(),
            member: "code".to_owned(),
        })
    });

    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .install(&component, &[target]);

    let err = report.into_result().expect_err("extraction failed");
    assert!(matches!(
        err,
        ReleaseError::Extraction(ExtractionError::ArchiveMemberNotFound { .. })
    ));
}

#[rstest]
fn extractor_receives_descriptor_and_permission_policy(trees: Trees) {
    let component = code();
    let linux = TargetTriple::try_from("x86_64-unknown-linux-musl").expect("valid");
    let windows = TargetTriple::try_from("aarch64-pc-windows-msvc").expect("valid");
    publish(&trees, &component, linux, b"linux");
    publish(&trees, &component, windows, b"windows");

    let mut extractor = MockArchiveExtractor::new();
    extractor
        .expect_extract()
        .times(2)
        .returning(|descriptor, dest, executable| {
            let is_windows = dest.extension().is_some_and(|ext| ext == "exe");
            assert_eq!(descriptor.member(), None);
            assert_eq!(
                executable,
                if is_windows {
                    ExecutableBit::Leave
                } else {
                    ExecutableBit::Set
                }
            );
            fs::write(dest, b"stub").map_err(ExtractionError::from)
        });

    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .install(&component, &[linux, windows]);
    assert!(report.is_success(), "report: {report:?}");
}

#[rstest]
fn reinstalling_replaces_changed_content(trees: Trees) {
    let component = code();
    let target = TargetTriple::try_from("x86_64-apple-darwin").expect("valid");
    let extractor = StandardExtractor;
    let installer = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor);
    let path = component.vendor_path(&trees.vendor, target);

    publish(&trees, &component, target, b"first build");
    installer
        .install(&component, &[target])
        .into_result()
        .expect("first install");
    let first_digest = compute_sha256(&path).expect("digest");

    installer
        .install(&component, &[target])
        .into_result()
        .expect("unchanged reinstall");
    assert_eq!(compute_sha256(&path).expect("digest"), first_digest);

    publish(&trees, &component, target, b"second");
    installer
        .install(&component, &[target])
        .into_result()
        .expect("changed reinstall");
    assert_eq!(fs::read(&path).expect("vendor binary"), b"second");
}

struct PanickingExtractor;

impl ArchiveExtractor for PanickingExtractor {
    fn extract(
        &self,
        _descriptor: &ArchiveDescriptor,
        _destination: &Path,
        _executable: ExecutableBit,
    ) -> std::result::Result<(), ExtractionError> {
        panic!("extractor exploded")
    }
}

#[rstest]
fn panicking_worker_is_reported_as_failure(trees: Trees) {
    let component = code();
    let target = TargetTriple::try_from("x86_64-apple-darwin").expect("valid");
    publish(&trees, &component, target, b"payload");

    let extractor = PanickingExtractor;
    let report = ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor)
        .install(&component, &[target]);

    assert!(matches!(
        report.outcome(target),
        Some(TargetOutcome::Failed(ReleaseError::WorkerPanicked { .. }))
    ));
}

#[rstest]
#[case::capped_by_targets(2, None, 2)]
#[case::capped_by_jobs(6, NonZeroUsize::new(1), 1)]
#[case::empty_still_one_worker(0, None, 1)]
fn worker_count_respects_limits(
    trees: Trees,
    #[case] targets: usize,
    #[case] jobs: Option<NonZeroUsize>,
    #[case] expected: usize,
) {
    let extractor = StandardExtractor;
    let installer =
        ConcurrentInstaller::new(&trees.artifacts, &trees.vendor, &extractor).with_jobs(jobs);
    let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    let bound = jobs.map_or(available, |jobs| available.min(jobs.get()));
    assert_eq!(installer.worker_count(targets), targets.min(bound).max(1));
    assert!(installer.worker_count(targets) <= expected);
}
