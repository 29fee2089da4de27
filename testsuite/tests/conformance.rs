use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tessera::RdfFormat;
use tessera_testsuite::report::{SuiteStatus, TestOutcome};
use tessera_testsuite::{
    SUITE_FORMATS, check_testsuite, default_evaluator, find_manifest, parse_suite_name,
    run_suite, suite_directory,
};

fn data_directory() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

const NTRIPLES_MANIFEST_HEADER: &str = "@prefix mf: <http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#> .
@prefix rdft: <http://www.w3.org/ns/rdftest#> .
";

#[test]
fn turtle_testsuite() -> Result<()> {
    check_testsuite(data_directory().join("turtle/manifest.ttl"), &[])
}

#[test]
fn ntriples_testsuite() -> Result<()> {
    check_testsuite(data_directory().join("ntriples/manifest.ttl"), &[])
}

#[test]
fn nquads_testsuite() -> Result<()> {
    check_testsuite(data_directory().join("nquads/manifest.ttl"), &[])
}

#[test]
fn trig_testsuite() -> Result<()> {
    check_testsuite(data_directory().join("trig/manifest.ttl"), &[])
}

#[test]
fn rdf_xml_testsuite() -> Result<()> {
    check_testsuite(data_directory().join("rdf-xml/manifest.ttl"), &[])
}

#[test]
fn json_ld_testsuite() -> Result<()> {
    check_testsuite(data_directory().join("jsonld/toRdf-manifest.jsonld"), &[])
}

#[test]
fn all_suites_are_passing() -> Result<()> {
    let evaluator = default_evaluator();
    for format in SUITE_FORMATS {
        let report = run_suite(&evaluator, &data_directory(), format)?;
        assert_eq!(report.status(), SuiteStatus::Passing, "{}", format.name());
        assert_eq!(report.failed(), 0);
    }
    Ok(())
}

#[test]
fn rejected_tests_are_not_run() -> Result<()> {
    let report = run_suite(&default_evaluator(), &data_directory(), RdfFormat::Turtle)?;
    assert_eq!(report.passed(), 5);
    assert!(
        report
            .results
            .iter()
            .all(|result| !result.test.as_str().ends_with("#turtle-rejected"))
    );
    Ok(())
}

#[test]
fn unsupported_json_ld_options_are_skipped() -> Result<()> {
    let report = run_suite(&default_evaluator(), &data_directory(), RdfFormat::JsonLd)?;
    assert_eq!((report.passed(), report.failed(), report.skipped()), (4, 0, 1));
    let skipped = report
        .results
        .iter()
        .find(|result| matches!(result.outcome, TestOutcome::Skip(_)))
        .map(|result| result.test.as_str());
    assert_eq!(
        skipped,
        Some("https://w3c.github.io/json-ld-api/tests/toRdf-manifest.jsonld#tdi01")
    );
    Ok(())
}

#[test]
fn rdf_xml_suite_directory_aliases() -> Result<()> {
    assert_eq!(parse_suite_name("rdf-xml"), Ok(RdfFormat::RdfXml));
    assert_eq!(parse_suite_name("rdfxml"), Ok(RdfFormat::RdfXml));
    assert!(parse_suite_name("sparql").is_err());
    assert_eq!(
        suite_directory(&data_directory(), RdfFormat::RdfXml),
        Some(data_directory().join("rdf-xml"))
    );
    assert_eq!(
        find_manifest(&data_directory().join("jsonld")),
        Some(data_directory().join("jsonld").join("toRdf-manifest.jsonld"))
    );
    Ok(())
}

#[test]
fn missing_suites_have_no_tests() -> Result<()> {
    let root = tempfile::tempdir()?;
    fs::create_dir(root.path().join("turtle"))?;
    let evaluator = default_evaluator();
    for format in SUITE_FORMATS {
        let report = run_suite(&evaluator, root.path(), format)?;
        assert!(report.results.is_empty());
        assert_eq!(report.status(), SuiteStatus::NoTestsFound);
    }
    Ok(())
}

#[test]
fn failing_tests_are_reported() -> Result<()> {
    let root = tempfile::tempdir()?;
    let directory = root.path().join("ntriples");
    fs::create_dir(&directory)?;
    fs::write(
        directory.join("manifest.ttl"),
        format!(
            "{NTRIPLES_MANIFEST_HEADER}
<> a mf:Manifest ; mf:entries ( <#good> <#bad> ) .
<#good> a rdft:TestNTriplesPositiveSyntax ; mf:action <good.nt> .
<#bad> a rdft:TestNTriplesPositiveSyntax ; mf:action <bad.nt> .
"
        ),
    )?;
    fs::write(
        directory.join("good.nt"),
        "<http://example/s> <http://example/p> <http://example/o> .\n",
    )?;
    fs::write(directory.join("bad.nt"), "<s> <p> <o> .\n")?;

    let report = run_suite(&default_evaluator(), root.path(), RdfFormat::NTriples)?;
    assert_eq!(report.status(), SuiteStatus::PartiallyFailing);
    let failure = report
        .results
        .iter()
        .find_map(|result| match &result.outcome {
            TestOutcome::Fail(reason) => Some((result.test.as_str(), reason.as_str())),
            _ => None,
        });
    let Some((test, reason)) = failure else {
        panic!("the invalid file should make its test fail")
    };
    assert!(test.ends_with("#bad"), "{test}");
    assert!(reason.contains("Parse error"), "{reason}");
    assert!(
        check_testsuite(directory.join("manifest.ttl"), &[]).is_err(),
        "the failure must be reported"
    );
    check_testsuite(directory.join("manifest.ttl"), &[test])
}

#[test]
fn suites_where_every_test_fails() -> Result<()> {
    let root = tempfile::tempdir()?;
    let directory = root.path().join("ntriples");
    fs::create_dir(&directory)?;
    fs::write(
        directory.join("manifest.ttl"),
        format!(
            "{NTRIPLES_MANIFEST_HEADER}
<> a mf:Manifest ; mf:entries ( <#missing-file> ) .
<#missing-file> a rdft:TestNTriplesPositiveSyntax ; mf:action <missing.nt> .
"
        ),
    )?;
    let report = run_suite(&default_evaluator(), root.path(), RdfFormat::NTriples)?;
    assert_eq!(report.status(), SuiteStatus::AllFailing);
    Ok(())
}

#[test]
fn unknown_test_types_are_skipped() -> Result<()> {
    let root = tempfile::tempdir()?;
    let directory = root.path().join("ntriples");
    fs::create_dir(&directory)?;
    fs::write(
        directory.join("manifest.ttl"),
        format!(
            "{NTRIPLES_MANIFEST_HEADER}
<> a mf:Manifest ; mf:entries ( <#query> ) .
<#query> a mf:QueryEvaluationTest ; mf:action <query.rq> .
"
        ),
    )?;
    let report = run_suite(&default_evaluator(), root.path(), RdfFormat::NTriples)?;
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.status(), SuiteStatus::NoTestsFound);
    Ok(())
}
