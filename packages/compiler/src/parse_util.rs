//! Source locations, spans and compile diagnostics.
//!
//! Everything the pipeline reports carries a line/column pair that survives
//! into the serialized unit, so locations are kept deliberately small.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A line/column position in the source text. Lines and columns are 1-based;
/// a zero line means "no location recorded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        SourceLocation { line, column }
    }

    /// Pack into the on-disk representation: 20 bits of line, 12 bits of
    /// column. Matches the record layout used by the unit serializer.
    pub fn packed(&self) -> u32 {
        (self.line << 12) | (self.column & 0xfff)
    }

    pub fn is_valid(&self) -> bool {
        self.line != 0
    }
}

/// A region of the source text. `offset`/`length` allow re-slicing the raw
/// text of an expression, which the builder needs for script bindings and
/// textual component ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
    pub length: u32,
}

impl SourceSpan {
    pub fn new(line: u32, column: u32, offset: u32, length: u32) -> Self {
        SourceSpan {
            line,
            column,
            offset,
            length,
        }
    }

    pub fn start(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    /// The raw text this span covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let start = self.offset as usize;
        let end = (self.offset + self.length) as usize;
        &source[start.min(source.len())..end.min(source.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorLevel {
    Warning,
    Error,
}

/// A single diagnostic. Compilation accumulates these instead of aborting;
/// the presence of any `Error`-level entry means no unit is produced.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{url}:{line}:{column}: {message}")]
pub struct CompileError {
    pub url: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub level: ErrorLevel,
}

impl CompileError {
    pub fn new(url: &str, location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError {
            url: url.to_string(),
            line: location.line,
            column: location.column,
            message: message.into(),
            level: ErrorLevel::Error,
        }
    }

    pub fn warning(url: &str, location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError {
            level: ErrorLevel::Warning,
            ..CompileError::new(url, location, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_location_splits_line_and_column() {
        let loc = SourceLocation::new(12, 34);
        assert_eq!(loc.packed(), (12 << 12) | 34);
    }

    #[test]
    fn span_reslices_source_text() {
        let source = "width: parent.width";
        let span = SourceSpan::new(1, 8, 7, 12);
        assert_eq!(span.text(source), "parent.width");
    }
}
