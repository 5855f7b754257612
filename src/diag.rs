//! Diagnostic model for syntax-phase errors.
//!
//! The lexer and parser accumulate [`Diag`] values; the pipeline converts the
//! first of them into a [`crate::error::QueryError::Parser`] carrying the
//! line, column, offset and a context slice of the offending source region.
//! [`miette`] rendering is available for hosts that want rich terminal
//! reports.

use crate::ast::Span;
use miette::{Diagnostic, LabeledSpan, Report, Severity};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagSeverity {
    /// A fatal error that prevents further processing.
    Error,
    /// A warning about suspicious but accepted input.
    Warning,
}

impl fmt::Display for DiagSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagSeverity::Error => write!(f, "error"),
            DiagSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// A labeled span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagLabel {
    /// The span this label refers to.
    pub span: Span,
    /// The label text explaining the span's relevance.
    pub message: String,
}

/// A structured diagnostic produced by the lexer or parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    /// Severity level.
    pub severity: DiagSeverity,
    /// The main diagnostic message.
    pub message: String,
    /// Labeled spans showing relevant source locations.
    pub labels: Vec<DiagLabel>,
    /// Optional help text suggesting a fix.
    pub help: Option<String>,
}

impl Diag {
    /// Creates a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: DiagSeverity::Error,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }

    /// Creates a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagSeverity::Warning,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }

    /// Adds a labeled span to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            span,
            message: message.into(),
        });
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Returns the primary span of this diagnostic, if any label was attached.
    pub fn primary_span(&self) -> Option<&Span> {
        self.labels.first().map(|l| &l.span)
    }
}

/// Query source text with position lookup for diagnostic rendering.
#[derive(Debug, Clone)]
pub struct SourceFile {
    content: String,
}

/// Width of the context slice reported around a syntax error.
const CONTEXT_WIDTH: usize = 32;

impl SourceFile {
    /// Creates a new source file from the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Returns the source content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clamps a span to valid bounds within this source.
    pub fn clamp_span(&self, span: &Span) -> Span {
        let len = self.content.len();
        let start = span.start.min(len);
        let end = span.end.min(len).max(start);
        start..end
    }

    /// Returns the 1-based line and column of a byte offset.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let prefix = &self.content[..offset];
        let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
        let column = match prefix.rfind('\n') {
            Some(nl) => offset - nl,
            None => offset + 1,
        };
        (line, column)
    }

    /// Returns a bounded slice of source surrounding `offset`, and the
    /// position of `offset` within that slice.
    pub fn context(&self, offset: usize) -> (&str, usize) {
        let offset = offset.min(self.content.len());
        let mut start = offset.saturating_sub(CONTEXT_WIDTH / 2);
        while !self.content.is_char_boundary(start) {
            start += 1;
        }
        let mut end = (offset + CONTEXT_WIDTH / 2).min(self.content.len());
        while !self.content.is_char_boundary(end) {
            end += 1;
        }
        (&self.content[start..end], offset - start)
    }
}

/// Converts a diagnostic to a [`miette::Report`] with source context.
pub fn to_report(diag: &Diag, source: &SourceFile) -> Report {
    let labels = diag
        .labels
        .iter()
        .map(|label| {
            let span = source.clamp_span(&label.span);
            LabeledSpan::new_primary_with_span(
                Some(label.message.clone()),
                (span.start, span.end - span.start),
            )
        })
        .collect();

    let rendered = RenderedDiag {
        message: diag.message.clone(),
        severity: match diag.severity {
            DiagSeverity::Error => Severity::Error,
            DiagSeverity::Warning => Severity::Warning,
        },
        help: diag.help.clone(),
        labels,
    };

    Report::new(rendered).with_source_code(source.content().to_string())
}

/// The diagnostic type handed to miette.
#[derive(Debug)]
struct RenderedDiag {
    message: String,
    severity: Severity,
    help: Option<String>,
    labels: Vec<LabeledSpan>,
}

impl fmt::Display for RenderedDiag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RenderedDiag {}

impl Diagnostic for RenderedDiag {
    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Box::new(self.labels.clone().into_iter()))
        }
    }
}
