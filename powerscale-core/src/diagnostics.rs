//! Diagnostics - Errors and warnings collected across a run
//!
//! Every step of the lifecycle (configuration, validation, refresh, apply)
//! appends to a `Diagnostics` list instead of aborting on the first problem.

use std::fmt;

use colored::Colorize;

use crate::provider::ProviderError;
use crate::resource::ResourceId;
use crate::schema::TypeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic entry
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: Option<String>,
    pub resource: Option<ResourceId>,
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            resource: None,
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource = Some(id);
        self
    }

    pub fn for_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Build a diagnostic from a schema validation error
    pub fn from_type_error(id: &ResourceId, error: &TypeError) -> Self {
        let mut diag = Diagnostic::error(format!("Invalid configuration for {}", id))
            .with_detail(error.to_string())
            .for_resource(id.clone());
        if let Some(attr) = error.attribute() {
            diag = diag.for_attribute(attr);
        }
        diag
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        let mut diag = Diagnostic::error(err.message.clone());
        if let Some(detail) = err.full_detail() {
            diag = diag.with_detail(detail);
        }
        if let Some(id) = &err.resource_id {
            diag = diag.for_resource(id.clone());
        }
        diag
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error:".red().bold(),
            Severity::Warning => "Warning:".yellow().bold(),
        };
        write!(f, "{} {}", label, self.summary)?;
        if let Some(id) = &self.resource {
            write!(f, "\n  with {}", id)?;
            if let Some(attr) = &self.attribute {
                write!(f, ", on attribute {}", attr)?;
            }
        }
        if let Some(detail) = &self.detail {
            write!(f, "\n\n  {}", detail.replace('\n', "\n  "))?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary).with_detail(detail));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary).with_detail(detail));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Turn the collection into a `Result`, failing if any error was recorded
    pub fn into_result(self) -> Result<Diagnostics, Diagnostics> {
        if self.has_errors() { Err(self) } else { Ok(self) }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", diag)?;
        }
        Ok(())
    }
}
