//! Source location tracking for the RTLc compiler.
//!
//! The source language is single-file (no import resolution beyond syntactic
//! acknowledgement), so a `Span` needs no file identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self { line, column, offset }
    }
    
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Represents a span of source code from start to end position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn single(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    /// The span of the synthetic tree root, which covers no source text.
    pub fn zero() -> Self {
        Self::single(Position::new(0, 0, 0))
    }

    pub fn combine(self, other: Span) -> Span {
        Span::new(
            if self.start.offset <= other.start.offset { self.start } else { other.start },
            if self.end.offset >= other.end.offset { self.end } else { other.end },
        )
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start.offset <= pos.offset && pos.offset <= self.end.offset
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}:{}-{}", self.start.line, self.start.column, self.end.column)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A value with associated source location information
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
    
    pub fn map<U, F>(self, f: F) -> Spanned<U>
    where
        F: FnOnce(T) -> U,
    {
        Spanned::new(f(self.value), self.span)
    }
    
    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned::new(&self.value, self.span)
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.value, self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_takes_the_widest_offsets() {
        let a = Span::new(Position::new(1, 1, 0), Position::new(1, 5, 4));
        let b = Span::new(Position::new(2, 1, 10), Position::new(2, 3, 12));
        let c = a.combine(b);
        assert_eq!(c.start, a.start);
        assert_eq!(c.end, b.end);
    }

    #[test]
    fn contains_is_inclusive_of_both_endpoints() {
        let span = Span::new(Position::new(1, 1, 0), Position::new(1, 5, 4));
        assert!(span.contains(Position::new(1, 1, 0)));
        assert!(span.contains(Position::new(1, 5, 4)));
        assert!(!span.contains(Position::new(1, 6, 5)));
    }

    #[test]
    fn single_line_span_displays_compact() {
        let span = Span::new(Position::new(3, 1, 0), Position::new(3, 9, 8));
        assert_eq!(span.to_string(), "3:1-9");
    }
}