#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Fixture-driven regression harness for layered-narratives.
//!
//! Test cases are sentences written declaratively in TOML fixtures together
//! with the labels the pipeline should produce. Checks that are known to
//! fail are listed in `expected-failures.toml`; anything else that fails is
//! a regression.
//!
//! ## Modules
//!
//! - [`fixture`] - Fixture document types and parsing
//! - [`loader`] - Fixture discovery
//! - [`runner`] - Runs fixtures through the labeling pipeline
//! - [`failures`] - The expected-failure ledger and check keys
//! - [`formatter`] - Failure and summary rendering
//! - [`errors`] - Error types for the harness

pub mod errors;
pub mod failures;
pub mod fixture;
pub mod formatter;
pub mod loader;
pub mod runner;

pub use errors::{SpecError, SpecResult};
pub use failures::{
    CheckField, CheckKey, ExpectedFailures, FailureEntry, FailureState, HarnessResult,
};
pub use fixture::{parse_fixture, Expectation, FixtureSentence, NarrativeFixture, PairExpectation};
pub use formatter::{format_failure, format_summary};
pub use loader::{load_fixture, FixtureSet};
pub use runner::{check_fixture, run_fixture, FieldCheck, FixtureReport, SentenceOutcome};

#[cfg(test)]
mod tests;
