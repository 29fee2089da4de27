use dissimilar::Chunk;
use std::fmt;
use std::io::{self, Write};
use tessera::RdfFormat;
use tessera::model::{Dataset, NamedNode};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Pass,
    Fail(String),
    Skip(String),
}

impl TestOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail(_) => "FAIL",
            Self::Skip(_) => "SKIP",
        }
    }
}

#[derive(Debug)]
pub struct TestResult {
    pub test: NamedNode,
    pub outcome: TestOutcome,
    pub date: OffsetDateTime,
}

/// The conformance of a format implementation to its test suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStatus {
    /// Every executed test passes.
    Passing,
    /// Some executed tests fail.
    PartiallyFailing,
    /// Every executed test fails.
    AllFailing,
    /// No test was executed, because the suite is missing or only has skipped tests.
    NoTestsFound,
}

impl fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passing => "passing",
            Self::PartiallyFailing => "partially failing",
            Self::AllFailing => "all failing",
            Self::NoTestsFound => "no tests found",
        })
    }
}

/// The results of the test suite of one format.
#[derive(Debug)]
pub struct SuiteReport {
    pub format: RdfFormat,
    pub results: Vec<TestResult>,
}

impl SuiteReport {
    pub fn new(format: RdfFormat, results: Vec<TestResult>) -> Self {
        Self { format, results }
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Pass))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Fail(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Skip(_)))
    }

    fn count(&self, filter: impl Fn(&TestOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| filter(&r.outcome)).count()
    }

    pub fn status(&self) -> SuiteStatus {
        match (self.passed(), self.failed()) {
            (0, 0) => SuiteStatus::NoTestsFound,
            (_, 0) => SuiteStatus::Passing,
            (0, _) => SuiteStatus::AllFailing,
            _ => SuiteStatus::PartiallyFailing,
        }
    }
}

/// Writes one `--- PASS|FAIL|SKIP: <id>` line per test followed by a summary per format.
///
/// The failure and skip reasons are written indented below the test line.
pub fn write_report(reports: &[SuiteReport], mut output: impl Write) -> io::Result<()> {
    let date = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(io::Error::other)?;
    writeln!(output, "# Conformance report generated on {date}")?;
    for report in reports {
        writeln!(output, "=== {}", report.format.name())?;
        for result in &report.results {
            writeln!(output, "--- {}: {}", result.outcome.label(), result.test.as_str())?;
            if let TestOutcome::Fail(reason) | TestOutcome::Skip(reason) = &result.outcome {
                for line in reason.lines() {
                    writeln!(output, "    {line}")?;
                }
            }
        }
    }
    writeln!(output, "# Summary")?;
    for report in reports {
        writeln!(
            output,
            "{}: {} passed, {} failed, {} skipped ({})",
            report.format.name(),
            report.passed(),
            report.failed(),
            report.skipped(),
            report.status()
        )?;
    }
    Ok(())
}

/// A textual diff between the canonical forms of two datasets.
pub fn dataset_diff(expected: &Dataset, actual: &Dataset) -> String {
    let mut expected = expected.clone();
    expected.canonicalize();
    let mut actual = actual.clone();
    actual.canonicalize();
    format_diff(&expected.to_string(), &actual.to_string(), "quads")
}

pub fn format_diff(expected: &str, actual: &str, kind: &str) -> String {
    format!(
        "Note: missing {kind} are between [- -] and extra {kind} between {{+ +}}\n{}",
        dissimilar::diff(expected, actual)
            .into_iter()
            .map(|chunk| match chunk {
                Chunk::Equal(e) => e.to_owned(),
                Chunk::Delete(e) => format!("[-{e}-]"),
                Chunk::Insert(a) => format!("{{+{a}+}}"),
            })
            .collect::<String>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, outcome: TestOutcome) -> TestResult {
        TestResult {
            test: NamedNode::new_unchecked(format!("http://e/manifest#{id}")),
            outcome,
            date: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn statuses() {
        let empty = SuiteReport::new(RdfFormat::Turtle, Vec::new());
        assert_eq!(empty.status(), SuiteStatus::NoTestsFound);
        let skipped = SuiteReport::new(
            RdfFormat::Turtle,
            vec![result("a", TestOutcome::Skip("unsupported".into()))],
        );
        assert_eq!(skipped.status(), SuiteStatus::NoTestsFound);
        let failing = SuiteReport::new(
            RdfFormat::Turtle,
            vec![result("a", TestOutcome::Fail("broken".into()))],
        );
        assert_eq!(failing.status(), SuiteStatus::AllFailing);
        let partial = SuiteReport::new(
            RdfFormat::Turtle,
            vec![
                result("a", TestOutcome::Fail("broken".into())),
                result("b", TestOutcome::Pass),
            ],
        );
        assert_eq!(partial.status(), SuiteStatus::PartiallyFailing);
        let passing = SuiteReport::new(
            RdfFormat::Turtle,
            vec![
                result("a", TestOutcome::Skip("unsupported".into())),
                result("b", TestOutcome::Pass),
            ],
        );
        assert_eq!(passing.status(), SuiteStatus::Passing);
    }

    #[test]
    fn report_lines() -> io::Result<()> {
        let reports = [
            SuiteReport::new(
                RdfFormat::NTriples,
                vec![
                    result("ok", TestOutcome::Pass),
                    result("ko", TestOutcome::Fail("line 1\nline 2".into())),
                    result("skip", TestOutcome::Skip("not supported".into())),
                ],
            ),
            SuiteReport::new(RdfFormat::RdfXml, Vec::new()),
        ];
        let mut output = Vec::new();
        write_report(&reports, &mut output)?;
        let output = String::from_utf8(output).map_err(io::Error::other)?;
        let lines = output.lines().skip(1).collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                "=== N-Triples",
                "--- PASS: http://e/manifest#ok",
                "--- FAIL: http://e/manifest#ko",
                "    line 1",
                "    line 2",
                "--- SKIP: http://e/manifest#skip",
                "    not supported",
                "=== RDF/XML",
                "# Summary",
                "N-Triples: 1 passed, 1 failed, 1 skipped (partially failing)",
                "RDF/XML: 0 passed, 0 failed, 0 skipped (no tests found)",
            ]
        );
        Ok(())
    }

    #[test]
    fn diffs_show_missing_and_extra_text() {
        let diff = format_diff("<a> <b> <c> .\n", "<a> <b> <d> .\n", "quads");
        assert!(diff.contains("[-c-]"), "{diff}");
        assert!(diff.contains("{+d+}"), "{diff}");
    }
}
