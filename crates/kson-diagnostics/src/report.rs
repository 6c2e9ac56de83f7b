//! Bundles a [`Diagnostic`] with the source text it anchors into, for
//! `miette`'s fancy terminal rendering in the CLI. Mirrors the teacher's
//! `ParseDiagnostic`/`ValidationDiagnostic` pattern: a thin wrapper that
//! hands the already-computed message and span to `miette`.

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// A [`Diagnostic`] rendered against a named source, ready for `miette`'s
/// `GraphicalReportHandler`.
#[derive(Debug, Error)]
#[error("{}", .diagnostic.message())]
pub struct SourceDiagnostic {
    pub diagnostic: Diagnostic,
    pub src: NamedSource<String>,
}

impl SourceDiagnostic {
    pub fn new(diagnostic: Diagnostic, filename: &str, source: &str) -> Self {
        Self {
            src: NamedSource::new(filename, source.to_string()),
            diagnostic,
        }
    }
}

impl MietteDiagnostic for SourceDiagnostic {
    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            crate::diagnostic::Severity::Error => miette::Severity::Error,
            crate::diagnostic::Severity::Warning => miette::Severity::Warning,
        })
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span: SourceSpan = self.diagnostic.location.into();
        Some(Box::new(core::iter::once(LabeledSpan::new(
            Some("here".to_string()),
            span.offset(),
            span.len(),
        ))))
    }
}
