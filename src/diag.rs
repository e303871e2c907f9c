//! Diagnostic sink: the seam the spec's Design Notes call out so structured
//! output and testing don't depend on writing straight to `stderr`.

use crate::pos::SourceRange;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub range: SourceRange,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.range, self.severity, self.message)
    }
}

/// One method, as suggested in the spec's design notes: `emit`.
pub trait DiagSink {
    fn emit(&mut self, diag: Diagnostic);

    fn error(&mut self, range: SourceRange, message: impl Into<String>) {
        self.emit(Diagnostic {
            range,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, range: SourceRange, message: impl Into<String>) {
        self.emit(Diagnostic {
            range,
            severity: Severity::Warning,
            message: message.into(),
        });
    }
}

/// Reference sink: writes to `stderr` as `file:line:col[-line:col]
/// severity: message`, per the spec's "User-visible failure" contract.
pub struct StderrSink {
    pub error_count: usize,
    pub warning_count: usize,
}

impl StderrSink {
    pub fn new() -> Self {
        Self {
            error_count: 0,
            warning_count: 0,
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagSink for StderrSink {
    fn emit(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
        }
        eprintln!("{diag}");
    }
}

/// In-memory sink used by tests and by tools (the checker) that want to
/// post-process diagnostics rather than stream them.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

impl DiagSink for CollectingSink {
    fn emit(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::SourcePos;

    fn range() -> SourceRange {
        SourceRange::new(SourcePos::new("f", 1, 1), SourcePos::new("f", 1, 3))
    }

    #[test]
    fn collecting_sink_counts_by_severity() {
        let mut sink = CollectingSink::new();
        sink.error(range(), "bad");
        sink.warning(range(), "meh");
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
    }
}
