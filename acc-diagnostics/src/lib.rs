//! Diagnostic reporting shim.
//!
//! The scanner, parser, and analyzer are each external or semi-external
//! collaborators that only ever need to *report* a problem and keep going;
//! this crate is the ordered sink they all report into, and the thing the
//! driver asks `has_errors()` of before handing the IR to code generation.

use std::fmt;

use acc_source::Span;

/// The stage that raised a [`Diagnostic`]. Ordered so that, for two
/// diagnostics at the same position, a scanner error is shown before a
/// parser error, which is shown before an analysis error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Scanner,
    Parser,
    Analysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scanner => "scanner",
            Stage::Parser => "parser",
            Stage::Analysis => "analysis",
        };
        write!(f, "{name}")
    }
}

/// A single reported problem: a title, an optional elaborating
/// description, the stage that raised it, and the span it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub span: Span,
    pub title: String,
    pub description: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.span.line(),
            self.span.column(),
            self.stage,
            self.title
        )?;
        if let Some(description) = &self.description {
            write!(f, " ({description})")?;
        }
        Ok(())
    }
}

/// Buffers diagnostics from every stage of compilation and hands them back
/// in a stable order: ascending by line, then column, then stage.
///
/// Reports are *not* sorted eagerly on insertion; they are sorted once,
/// lazily, the first time the caller asks to iterate them. This mirrors the
/// source compiler's behaviour of buffering every report and only ordering
/// them once compilation finishes.
#[derive(Debug, Default)]
pub struct Reporter {
    reports: Vec<Diagnostic>,
    sorted: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. `description` elaborates on `title` (e.g. the
    /// offending and expected types); most diagnostics have none.
    pub fn report(
        &mut self,
        stage: Stage,
        span: Span,
        title: impl Into<String>,
        description: Option<String>,
    ) {
        self.reports.push(Diagnostic { stage, span, title: title.into(), description });
        self.sorted = false;
    }

    pub fn has_errors(&self) -> bool {
        !self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Iterate diagnostics in (line, column, stage) ascending order.
    pub fn iter(&mut self) -> impl Iterator<Item = &Diagnostic> {
        if !self.sorted {
            self.reports.sort_by_key(|d| (d.span.line(), d.span.column(), d.stage));
            self.sorted = true;
        }
        self.reports.iter()
    }
}
