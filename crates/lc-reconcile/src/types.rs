use lc_query::ScalarValue;
use serde::{Deserialize, Serialize};

/// One failed comparison: both observed values, for the report.
#[derive(Clone, Debug, PartialEq)]
pub struct Discrepancy {
    pub label: String,
    pub gold: ScalarValue,
    pub silver: ScalarValue,
}

impl Discrepancy {
    pub fn new(label: impl Into<String>, gold: ScalarValue, silver: ScalarValue) -> Self {
        Self {
            label: label.into(),
            gold,
            silver,
        }
    }

    /// e.g. `Count mismatch: Gold=1000, Silver=998`
    pub fn message(&self) -> String {
        format!(
            "{} mismatch: Gold={}, Silver={}",
            self.label, self.gold, self.silver
        )
    }
}

/// Mismatches in checklist order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscrepancyReport {
    entries: Vec<Discrepancy>,
}

impl DiscrepancyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, d: Discrepancy) {
        self.entries.push(d);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Discrepancy] {
        &self.entries
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(Discrepancy::message).collect()
    }

    /// Alert body: one message per line.
    pub fn body(&self) -> String {
        self.messages().join("\n")
    }
}

/// Result of one run. `Fail` always carries a non-empty report; build it
/// through [`Verdict::from_report`].
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(DiscrepancyReport),
}

impl Verdict {
    pub fn from_report(report: DiscrepancyReport) -> Self {
        if report.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(report)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Empty for `Pass`.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Verdict::Pass => Vec::new(),
            Verdict::Fail(report) => report.messages(),
        }
    }
}

/// Structured output of the invocation entry point:
/// `{"status":"PASS"}` or `{"status":"FAIL","errors":[...]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ValidationOutcome {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail { errors: Vec<String> },
}

impl From<&Verdict> for ValidationOutcome {
    fn from(v: &Verdict) -> Self {
        match v {
            Verdict::Pass => ValidationOutcome::Pass,
            Verdict::Fail(report) => ValidationOutcome::Fail {
                errors: report.messages(),
            },
        }
    }
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }
}
