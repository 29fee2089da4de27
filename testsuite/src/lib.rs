//! Runs the [W3C RDF tests](https://w3c.github.io/rdf-tests/) and the
//! [JSON-LD toRdf tests](https://w3c.github.io/json-ld-api/tests/) against Tessera.
//!
//! A suite root contains one directory per format, each with a manifest at its top.

pub mod evaluator;
pub mod files;
pub mod manifest;
pub mod parser_evaluator;
pub mod report;
mod vocab;

use crate::evaluator::TestEvaluator;
use crate::files::{FileResolver, path_to_url};
use crate::manifest::TestManifest;
use crate::parser_evaluator::register_parser_tests;
use crate::report::{SuiteReport, TestOutcome};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tessera::RdfFormat;
use tracing::{info, warn};

/// The formats having a test suite, in report order.
pub const SUITE_FORMATS: [RdfFormat; 6] = [
    RdfFormat::Turtle,
    RdfFormat::NTriples,
    RdfFormat::TriG,
    RdfFormat::NQuads,
    RdfFormat::RdfXml,
    RdfFormat::JsonLd,
];

const MANIFEST_FILE_NAMES: [&str; 3] = ["manifest.ttl", "manifest.jsonld", "toRdf-manifest.jsonld"];

/// The accepted directory names of the suite of `format`, the preferred one first.
pub fn suite_directory_names(format: RdfFormat) -> &'static [&'static str] {
    match format {
        RdfFormat::Turtle => &["turtle"],
        RdfFormat::NTriples => &["ntriples"],
        RdfFormat::TriG => &["trig"],
        RdfFormat::NQuads => &["nquads"],
        RdfFormat::RdfXml => &["rdfxml", "rdf-xml"],
        RdfFormat::JsonLd => &["jsonld"],
        _ => &[],
    }
}

/// Parses a suite directory name like `rdfxml` or `rdf-xml`.
pub fn parse_suite_name(name: &str) -> Result<RdfFormat, String> {
    SUITE_FORMATS
        .into_iter()
        .find(|format| suite_directory_names(*format).contains(&name))
        .ok_or_else(|| {
            format!(
                "unknown test suite '{name}', expected one of {}",
                SUITE_FORMATS
                    .map(|format| suite_directory_names(format)[0])
                    .join(", ")
            )
        })
}

/// The existing suite directory of `format` inside of `root`.
pub fn suite_directory(root: &Path, format: RdfFormat) -> Option<PathBuf> {
    suite_directory_names(format)
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_dir())
}

/// The manifest at the top of a suite directory.
pub fn find_manifest(directory: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| directory.join(name))
        .find(|path| path.is_file())
}

pub fn default_evaluator() -> TestEvaluator {
    let mut evaluator = TestEvaluator::default();
    register_parser_tests(&mut evaluator);
    evaluator
}

/// Runs the suite of `format` found in `root`.
///
/// A missing suite directory or manifest gives an empty report.
pub fn run_suite(evaluator: &TestEvaluator, root: &Path, format: RdfFormat) -> Result<SuiteReport> {
    let Some(directory) = suite_directory(root, format) else {
        warn!(
            format = format.name(),
            root = %root.display(),
            "No test suite directory found"
        );
        return Ok(SuiteReport::new(format, Vec::new()));
    };
    let Some(manifest) = find_manifest(&directory) else {
        warn!(
            format = format.name(),
            directory = %directory.display(),
            "No manifest found in the test suite directory"
        );
        return Ok(SuiteReport::new(format, Vec::new()));
    };
    info!(format = format.name(), manifest = %manifest.display(), "Running test suite");
    let files = FileResolver::new().with_local_directory(&directory)?;
    let manifest = TestManifest::new(files, [path_to_url(&std::path::absolute(&manifest)?)?]);
    Ok(SuiteReport::new(format, evaluator.evaluate(manifest)?))
}

/// Runs the tests of a manifest file and fails if one of them fails.
///
/// `ignored_tests` are IRIs of tests whose failure is expected.
pub fn check_testsuite(manifest: impl AsRef<Path>, ignored_tests: &[&str]) -> Result<()> {
    let manifest = std::path::absolute(manifest.as_ref())?;
    let Some(directory) = manifest.parent() else {
        bail!("{} has no parent directory", manifest.display())
    };
    let files = FileResolver::new().with_local_directory(directory)?;
    let results = default_evaluator().evaluate(TestManifest::new(files, [path_to_url(&manifest)?]))?;
    if results.is_empty() {
        bail!("No tests found in {}", manifest.display());
    }

    let mut errors = Vec::default();
    for result in results {
        if let TestOutcome::Fail(error) = &result.outcome {
            if !ignored_tests.contains(&result.test.as_str()) {
                errors.push(format!("{}: failed with error {error}", result.test));
            }
        }
    }

    if !errors.is_empty() {
        bail!("{} failing tests:\n{}\n", errors.len(), errors.join("\n"));
    }
    Ok(())
}
