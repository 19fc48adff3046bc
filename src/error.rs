use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::contracts::EntryPoint;

// ------------- Paths -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Segment {
    // a named part of a sequence, along with the position it was matched against
    Part { name: &'static str, position: usize },
    Key { key: String },
    Index { index: usize },
    Label { label: &'static str },
}
impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Segment::Part { name, position } => write!(f, "{}#{}", name, position),
            Segment::Key { key } => write!(f, "{}", key),
            Segment::Index { index } => write!(f, "[{}]", index),
            Segment::Label { label } => write!(f, "<{}>", label),
        }
    }
}

/// Location of a failure inside an argument list, outermost segment first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<Segment>);
impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
    /// The argument (name and position) this path starts in, if any.
    pub fn argument(&self) -> Option<(&'static str, usize)> {
        self.0.iter().find_map(|s| match s {
            Segment::Part { name, position } => Some((*name, *position)),
            _ => None,
        })
    }
}
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(" > "))
    }
}

// ------------- Shape errors -------------
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeError {
    #[error("{path}: expected {expected}, got {actual}")]
    Mismatch {
        path: Path,
        expected: String,
        actual: String,
    },
    #[error("{path}: none of the {} alternatives matched [{}]", .reasons.len(), render_reasons(.reasons))]
    AlternationExhausted { path: Path, reasons: Vec<Reason> },
    #[error("{path}: {rule} does not hold ({detail})")]
    ConsistencyViolation {
        path: Path,
        rule: &'static str,
        offending: Vec<usize>,
        detail: String,
    },
}

/// Why one labeled alternative failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reason {
    pub label: &'static str,
    pub error: ShapeError,
}

fn render_reasons(reasons: &[Reason]) -> String {
    reasons
        .iter()
        .map(|r| format!("{}: {}", r.label, r.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ShapeError {
    pub fn mismatch(path: Path, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Mismatch {
            path,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
    pub fn path(&self) -> &Path {
        match self {
            Self::Mismatch { path, .. } => path,
            Self::AlternationExhausted { path, .. } => path,
            Self::ConsistencyViolation { path, .. } => path,
        }
    }
    /// Reason recorded for `label`, when this is an exhausted alternation.
    pub fn reason(&self, label: &str) -> Option<&ShapeError> {
        match self {
            Self::AlternationExhausted { reasons, .. } => {
                reasons.iter().find(|r| r.label == label).map(|r| &r.error)
            }
            _ => None,
        }
    }
    pub fn labels(&self) -> Vec<&'static str> {
        match self {
            Self::AlternationExhausted { reasons, .. } => reasons.iter().map(|r| r.label).collect(),
            _ => Vec::new(),
        }
    }
}

// ------------- Contract violations -------------
/// Structured report produced when an instrumented call is rejected.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("call to {entry_point} with {arity} argument(s) did not conform: {error}")]
pub struct ContractViolation {
    pub entry_point: EntryPoint,
    pub arity: usize,
    pub error: ShapeError,
}

#[derive(Error, Debug)]
pub enum SqlshapeError {
    #[error(transparent)]
    Violation(#[from] ContractViolation),
    #[error("Unknown entry point: {0}")]
    UnknownEntryPoint(String),
    #[error("No operation registered for {0}")]
    NotRegistered(EntryPoint),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SqlshapeError>;

// Helper conversions
impl From<config::ConfigError> for SqlshapeError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
