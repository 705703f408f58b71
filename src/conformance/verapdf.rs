//! Parsing of veraPDF's machine-readable (`--format json`) report.
//!
//! Depending on the veraPDF release, `validationResult` is either an object or a
//! single-element array. Violations are the count of failed rules; failed checks
//! are the count of individual failed rule assertions.

use serde::Deserialize;
use serde_json::Value;

use super::CheckerError;

#[derive(Debug, Deserialize)]
struct Output {
    report: Report,
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    #[serde(default)]
    validation_result: Option<OneOrMany<ValidationResult>>,
    #[serde(default)]
    task_exception: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    // Arrays first: derived structs also accept sequences.
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn first(self) -> Option<T> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(v) => v.into_iter().next(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidationResult {
    #[serde(default)]
    details: Option<Details>,
    #[serde(default)]
    compliant: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Details {
    #[serde(default)]
    failed_rules: Option<i64>,
    #[serde(default)]
    failed_checks: Option<i64>,
}

/// What veraPDF reported for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSummary {
    pub violations: i32,
    pub failed_checks: i32,
    pub compliant: Option<bool>,
}

/// Parse a veraPDF JSON report for a single-file run.
pub fn parse_report(json: &[u8]) -> Result<ValidationSummary, CheckerError> {
    let output: Output = serde_json::from_slice(json)
        .map_err(|e| CheckerError::MalformedReport(e.to_string()))?;

    let job = output
        .report
        .jobs
        .into_iter()
        .next()
        .ok_or(CheckerError::MissingField("report.jobs"))?;

    if let Some(exception) = job.task_exception.filter(|v| !v.is_null()) {
        let message = exception
            .get("exception")
            .or_else(|| exception.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| exception.to_string());
        return Err(CheckerError::TaskException(message));
    }

    let result = job
        .validation_result
        .and_then(OneOrMany::first)
        .ok_or(CheckerError::MissingField("validationResult"))?;
    let details = result
        .details
        .ok_or(CheckerError::MissingField("validationResult.details"))?;
    let failed_rules = details
        .failed_rules
        .ok_or(CheckerError::MissingField("details.failedRules"))?;
    let failed_checks = details
        .failed_checks
        .ok_or(CheckerError::MissingField("details.failedChecks"))?;

    Ok(ValidationSummary {
        violations: clamp(failed_rules),
        failed_checks: clamp(failed_checks),
        compliant: result.compliant,
    })
}

fn clamp(n: i64) -> i32 {
    n.clamp(0, i32::MAX as i64) as i32
}
