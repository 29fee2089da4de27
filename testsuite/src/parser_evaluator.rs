use crate::evaluator::TestEvaluator;
use crate::files::guess_rdf_format;
use crate::manifest::Test;
use crate::report::{TestOutcome, dataset_diff};
use crate::vocab::jld;
use anyhow::{Context, Result, anyhow, bail};
use tessera::RdfFormat;
use tessera::model::Dataset;

/// What a test expects from the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// The file must be parsed without error.
    PositiveSyntax,
    /// The file must be rejected.
    NegativeSyntax,
    /// The file must be parsed into a dataset isomorphic to the expected result.
    PositiveEval,
    /// The file must be rejected, even if it might be syntactically correct.
    NegativeEval,
}

const RDF_TESTS: [(&str, RdfFormat, TestKind); 15] = [
    ("TestNTriplesPositiveSyntax", RdfFormat::NTriples, TestKind::PositiveSyntax),
    ("TestNTriplesNegativeSyntax", RdfFormat::NTriples, TestKind::NegativeSyntax),
    ("TestNQuadsPositiveSyntax", RdfFormat::NQuads, TestKind::PositiveSyntax),
    ("TestNQuadsNegativeSyntax", RdfFormat::NQuads, TestKind::NegativeSyntax),
    ("TestTurtlePositiveSyntax", RdfFormat::Turtle, TestKind::PositiveSyntax),
    ("TestTurtleNegativeSyntax", RdfFormat::Turtle, TestKind::NegativeSyntax),
    ("TestTurtleEval", RdfFormat::Turtle, TestKind::PositiveEval),
    ("TestTurtleNegativeEval", RdfFormat::Turtle, TestKind::NegativeEval),
    ("TestTrigPositiveSyntax", RdfFormat::TriG, TestKind::PositiveSyntax),
    ("TestTrigNegativeSyntax", RdfFormat::TriG, TestKind::NegativeSyntax),
    ("TestTrigEval", RdfFormat::TriG, TestKind::PositiveEval),
    ("TestTrigNegativeEval", RdfFormat::TriG, TestKind::NegativeEval),
    ("TestXMLPositiveSyntax", RdfFormat::RdfXml, TestKind::PositiveSyntax),
    ("TestXMLNegativeSyntax", RdfFormat::RdfXml, TestKind::NegativeSyntax),
    ("TestXMLEval", RdfFormat::RdfXml, TestKind::PositiveEval),
];

pub fn register_parser_tests(evaluator: &mut TestEvaluator) {
    for (name, format, kind) in RDF_TESTS {
        evaluator.register(format!("http://www.w3.org/ns/rdftest#{name}"), move |t| {
            evaluate_parser_test(t, format, kind, None)
        });
    }
    for (test_type, kind) in [
        (jld::POSITIVE_EVALUATION_TEST, TestKind::PositiveEval),
        (jld::NEGATIVE_EVALUATION_TEST, TestKind::NegativeEval),
        (jld::POSITIVE_SYNTAX_TEST, TestKind::PositiveSyntax),
    ] {
        evaluator.register(test_type.as_str(), move |t| evaluate_json_ld_test(t, kind));
    }
}

impl Test {
    fn action_url(&self) -> Result<&str> {
        self.action
            .as_deref()
            .ok_or_else(|| anyhow!("No action found for test {self}"))
    }
}

fn evaluate_json_ld_test(test: &Test, kind: TestKind) -> Result<TestOutcome> {
    if !test.has_kind(jld::TO_RDF_TEST) {
        return Ok(TestOutcome::Skip("Only toRdf tests are supported".into()));
    }
    let options = &test.options;
    if options.spec_version.as_deref() == Some("json-ld-1.0")
        || options.processing_mode.as_deref() == Some("json-ld-1.0")
    {
        return Ok(TestOutcome::Skip("JSON-LD 1.0 processing is not supported".into()));
    }
    if options.produce_generalized_rdf {
        return Ok(TestOutcome::Skip("Generalized RDF output is not supported".into()));
    }
    if let Some(direction) = &options.rdf_direction {
        return Ok(TestOutcome::Skip(format!(
            "The rdfDirection option {direction} is not supported"
        )));
    }
    if options.expand_context.is_some() {
        return Ok(TestOutcome::Skip("The expandContext option is not supported".into()));
    }
    evaluate_parser_test(test, RdfFormat::JsonLd, kind, options.base.as_deref())
}

fn evaluate_parser_test(
    test: &Test,
    format: RdfFormat,
    kind: TestKind,
    base_iri: Option<&str>,
) -> Result<TestOutcome> {
    let action = test.action_url()?;
    let base_iri = base_iri.unwrap_or(action);
    let parsed = test.files.load_dataset(action, format, base_iri);
    match kind {
        TestKind::PositiveSyntax => {
            parsed.map_err(|e| anyhow!("Parse error: {e:#}"))?;
        }
        TestKind::NegativeSyntax | TestKind::NegativeEval => {
            if parsed.is_ok() {
                bail!("File parsed without errors even if it should not");
            }
        }
        TestKind::PositiveEval => {
            let actual =
                parsed.map_err(|e| anyhow!("Parse error on file {action}: {e:#}"))?;
            let expected = load_expected_result(test)?;
            if !expected.is_isomorphic(&actual) {
                bail!(
                    "The two files are not isomorphic. Diff:\n{}",
                    dataset_diff(&expected, &actual)
                );
            }
        }
    }
    Ok(TestOutcome::Pass)
}

fn load_expected_result(test: &Test) -> Result<Dataset> {
    let result = test
        .result
        .as_deref()
        .context("No tests result found")?;
    test.files
        .load_dataset(result, guess_rdf_format(result)?, result)
        .with_context(|| format!("Parse error on file {result}"))
}
