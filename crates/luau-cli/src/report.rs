//! Diagnostic rendering for the terminal and for tools

use std::io::{self, Write};

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use luau_checker::{Diagnostic, Severity};
use luau_frontend::protocol::DiagnosticEntry;
use serde::Serialize;

/// Diagnostics of one file, as `--format json` prints them
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub file: &'a str,
    pub diagnostics: Vec<DiagnosticEntry>,
}

impl<'a> FileReport<'a> {
    pub fn new(file: &'a str, diagnostics: &[Diagnostic]) -> Self {
        Self {
            file,
            diagnostics: diagnostics.iter().map(DiagnosticEntry::from).collect(),
        }
    }
}

fn kind_of(severity: Severity) -> (ReportKind<'static>, Color) {
    match severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
        Severity::Info | Severity::Hint => (ReportKind::Advice, Color::Cyan),
    }
}

/// Character offset of a byte offset; ariadne spans count characters
fn char_offset(source: &str, byte: usize) -> usize {
    let byte = byte.min(source.len());
    source
        .char_indices()
        .take_while(|(i, _)| *i < byte)
        .count()
}

/// Render diagnostics of one file with source excerpts
pub fn write_pretty<W: Write>(
    out: &mut W,
    file: &str,
    source: &str,
    diagnostics: &[Diagnostic],
    color: bool,
) -> io::Result<()> {
    for diagnostic in diagnostics {
        let (kind, label_color) = kind_of(diagnostic.severity);
        let start = char_offset(source, diagnostic.span.start);
        let end = char_offset(source, diagnostic.span.end).max(start);
        Report::build(kind, file, start)
            .with_config(Config::default().with_color(color))
            .with_code(&diagnostic.code)
            .with_message(&diagnostic.message)
            .with_label(
                Label::new((file, start..end))
                    .with_message(&diagnostic.message)
                    .with_color(label_color),
            )
            .finish()
            .write((file, Source::from(source)), &mut *out)?;
    }
    Ok(())
}
