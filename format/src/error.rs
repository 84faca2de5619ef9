use std::fmt;
use thiserror::Error;

/// A single schema violation found by the validator or the tree importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location of the offending value, e.g. `records[0].fields.Bad`.
    pub path:   String,
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Violation {
            path:   path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum BbdbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at line {line}, column {column}: {msg}")]
    Syntax {
        msg:    String,
        line:   usize,
        column: usize,
        offset: usize,
    },

    #[error("Parse error in entry {entry} at line {line}, column {column}: {msg}")]
    Parse {
        entry:  usize,
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Unsupported file version {0}")]
    UnsupportedVersion(u32),

    #[error("Tree conversion error: {0}")]
    Tree(#[from] serde_json::Error),
}

impl BbdbError {
    /// The individual violations, if this is a validation failure.
    pub fn violations(&self) -> &[Violation] {
        match self {
            BbdbError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_every_violation() {
        let err = BbdbError::Validation(vec![
            Violation::new("records[0].firstname", "must not be empty"),
            Violation::new("records[0].fields.Bad", "is not a valid field name"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: records[0].firstname: must not be empty; \
             records[0].fields.Bad: is not a valid field name"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_non_validation_errors_have_no_violations() {
        let err = BbdbError::UnsupportedVersion(99);
        assert_eq!(err.to_string(), "Unsupported file version 99");
        assert!(err.violations().is_empty());
    }
}
