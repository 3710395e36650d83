//
// diagnostics/message.rs
//
// Grammar of the compiler's free-text messages
//
// A message is one or more records:
//
//     <SEVERITY>: ['<file>' ]line <N>: <message>
//
// where SEVERITY is one of ERROR, WARNING, RUNTIME ERROR, RUNTIME WARNING or
// TODO. A record starts at a header at the beginning of a line and runs until
// the next header; continuation lines belong to the record's message.
//

use std::sync::OnceLock;

use regex::Regex;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

/// `source` of every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "inklecate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    RuntimeError,
    RuntimeWarning,
    Todo,
}

impl Severity {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ERROR" => Some(Severity::Error),
            "WARNING" => Some(Severity::Warning),
            "RUNTIME ERROR" => Some(Severity::RuntimeError),
            "RUNTIME WARNING" => Some(Severity::RuntimeWarning),
            "TODO" => Some(Severity::Todo),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::RuntimeError => "RUNTIME ERROR",
            Severity::RuntimeWarning => "RUNTIME WARNING",
            Severity::Todo => "TODO",
        }
    }

    pub fn to_lsp(self) -> DiagnosticSeverity {
        match self {
            Severity::Error | Severity::RuntimeError => DiagnosticSeverity::ERROR,
            Severity::Warning | Severity::RuntimeWarning => DiagnosticSeverity::WARNING,
            Severity::Todo => DiagnosticSeverity::INFORMATION,
        }
    }
}

/// One record parsed out of a compiler message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub severity: Severity,
    /// File named in the header; absent means the entry file.
    pub file_name: Option<String>,
    /// One-based line number.
    pub line: u32,
    pub message: String,
}

/// A diagnostic attributed to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    pub severity: Severity,
    /// One-based line number.
    pub line: u32,
    pub message: String,
}

impl CompilationError {
    /// Whole-line diagnostic: `(line - 1, 0)` to `(line, 0)`.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let line = self.line.saturating_sub(1);
        Diagnostic {
            range: Range {
                start: Position::new(line, 0),
                end: Position::new(line + 1, 0),
            },
            severity: Some(self.severity.to_lsp()),
            code: None::<NumberOrString>,
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: self.message.clone(),
            ..Default::default()
        }
    }
}

impl From<ParsedMessage> for CompilationError {
    fn from(parsed: ParsedMessage) -> Self {
        Self {
            severity: parsed.severity,
            line: parsed.line,
            message: parsed.message,
        }
    }
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(
            r"(?m)^(RUNTIME ERROR|RUNTIME WARNING|ERROR|WARNING|TODO): (?:'([^']+)' )?line (\d+): ",
        )
        .expect("header pattern is valid")
    })
}

/// Parse every record in `text`. Text without a recognisable header yields
/// nothing.
pub fn parse_compiler_message(text: &str) -> Vec<ParsedMessage> {
    let headers: Vec<_> = header_regex().captures_iter(text).collect();
    let mut records = Vec::with_capacity(headers.len());

    for (index, captures) in headers.iter().enumerate() {
        let Some(header) = captures.get(0) else {
            continue;
        };
        let body_end = headers
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |next| next.start());
        let message = text[header.end()..body_end].trim_end();

        let severity = captures.get(1).and_then(|m| Severity::from_tag(m.as_str()));
        let line = captures.get(3).and_then(|m| m.as_str().parse::<u32>().ok());
        let (Some(severity), Some(line)) = (severity, line) else {
            log::debug!("Skipping malformed compiler header: {}", header.as_str());
            continue;
        };
        if message.is_empty() {
            log::debug!("Skipping compiler message with empty body: {}", header.as_str());
            continue;
        }

        records.push(ParsedMessage {
            severity,
            file_name: captures.get(2).map(|m| m.as_str().to_string()),
            line,
            message: message.to_string(),
        });
    }

    if records.is_empty() {
        log::debug!("Compiler message did not match the expected grammar: {}", text);
    }
    records
}
