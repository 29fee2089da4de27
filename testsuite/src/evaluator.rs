use crate::manifest::Test;
use crate::report::{TestOutcome, TestResult};
use anyhow::Result;
use std::collections::HashMap;
use time::OffsetDateTime;
use tracing::debug;

type Handler = Box<dyn Fn(&Test) -> Result<TestOutcome>>;

/// Dispatches the tests to the handler registered for one of their types.
#[derive(Default)]
pub struct TestEvaluator {
    handlers: HashMap<String, Handler>,
}

impl TestEvaluator {
    pub fn register(
        &mut self,
        test_type: impl Into<String>,
        handler: impl Fn(&Test) -> Result<TestOutcome> + 'static,
    ) {
        self.handlers.insert(test_type.into(), Box::new(handler));
    }

    /// Runs all the tests of `manifest`.
    ///
    /// A handler error makes the test fail. Only failing to read the manifest is an error.
    pub fn evaluate(
        &self,
        manifest: impl Iterator<Item = Result<Test>>,
    ) -> Result<Vec<TestResult>> {
        manifest
            .map(|test| {
                let test = test?;
                let outcome = match test
                    .kinds
                    .iter()
                    .find_map(|kind| self.handlers.get(kind.as_str()))
                {
                    Some(handler) => handler(&test)
                        .unwrap_or_else(|e| TestOutcome::Fail(format!("{e:#}"))),
                    None => TestOutcome::Skip(format!(
                        "The test types {} are not supported",
                        test.kinds
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                };
                debug!(test = test.id.as_str(), outcome = outcome.label(), "Test evaluated");
                Ok(TestResult {
                    test: test.id,
                    outcome,
                    date: OffsetDateTime::now_utc(),
                })
            })
            .collect()
    }
}
