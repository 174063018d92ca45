//! Validation Violations
//!
//! Collects every problem found in one validation pass. A validator never
//! stops at the first bad field: callers get the complete list, each entry
//! qualified with the path of the offending value.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Field Paths
// =============================================================================

/// A segment in a value path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// A named field in an object
    Field(String),
    /// An element of an array
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{}", name),
            Self::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Full path from the validated root to a value
pub type FieldPath = Vec<PathSegment>;

/// Format a field path as `address.city` or `tags[2]`
pub fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return String::from("<root>");
    }
    let joined: String = path.iter().map(|s| s.to_string()).collect();
    joined.strip_prefix('.').map(str::to_string).unwrap_or(joined)
}

// =============================================================================
// Violation Kinds
// =============================================================================

/// What went wrong with a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Value fails a scalar predicate (range, pattern, format)
    DomainViolation,
    /// Non-optional field is absent
    MissingRequiredField,
    /// Value present but of the wrong structural kind
    ShapeMismatch,
    /// String outside an enum's closed set
    UnknownEnumValue,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainViolation => "V001",
            Self::MissingRequiredField => "V002",
            Self::ShapeMismatch => "V003",
            Self::UnknownEnumValue => "V004",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Violation
// =============================================================================

/// A single path-qualified violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Where the bad value sits
    pub path: FieldPath,
    /// Violation category
    pub kind: ViolationKind,
    /// Human-readable message
    pub message: String,
}

impl Violation {
    pub fn new(path: FieldPath, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    /// Rendered path (`<root>` for the top-level value)
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path_string(), self.message)
    }
}

// =============================================================================
// Violations Collection
// =============================================================================

/// Ordered collection of violations from one validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Violations {
    items: Vec<Violation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a violation
    pub fn push(&mut self, item: Violation) {
        self.items.push(item);
    }

    /// Add a violation at `path`
    pub fn add(&mut self, path: &[PathSegment], kind: ViolationKind, message: impl Into<String>) {
        self.push(Violation::new(path.to_vec(), kind, message));
    }

    /// Merge another collection into this one
    pub fn merge(&mut self, other: Violations) {
        self.items.extend(other.items);
    }

    /// `Ok(value)` when nothing was collected, otherwise `Err(self)`
    pub fn into_result<T>(self, value: T) -> Result<T, Violations> {
        if self.items.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn all(&self) -> &[Violation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Violations of one kind
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.items.iter().filter(move |v| v.kind == kind)
    }

    /// Violations whose rendered path equals `path`
    pub fn at(&self, path: &str) -> impl Iterator<Item = &Violation> + '_ {
        let path = path.to_string();
        self.items.iter().filter(move |v| v.path_string() == path)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        write!(f, "{} violation(s)", self.items.len())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
