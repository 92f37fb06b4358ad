//! Error taxonomy for the RTLc compiler.
//!
//! Each pass fails with its own category of [`CompileError`]; the CLI driver
//! maps each category to an exit code (see [`CompileError::exit_code`]).

use crate::Span;
use thiserror::Error;

/// The error type shared by every pass in the pipeline.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    /// Surfaced by the front end's lexer or parser. Any non-zero syntax
    /// error count aborts emission before a single pass over the tree runs.
    #[error("syntax error at {span}: {message}")]
    Syntax { message: String, span: Span },

    /// A `functionDecl` with too few children, a missing `identifierList`
    /// under a `varDecl`, a `primitive_type()` call on a childless node —
    /// malformed tree input that aborts the current pass.
    #[error("structural error at {span}: {message} ({caller})")]
    Structural { message: String, span: Span, caller: &'static str },

    /// Duplicate function name, unresolvable return type, an `if` cell with
    /// both an else block and a chained sub-if set — fatal for the
    /// enclosing compilation unit.
    #[error("semantic error at {span}: {message} ({caller})")]
    Semantic { message: String, span: Span, caller: &'static str },

    /// A control-flow graph invariant failed to establish during lifting.
    #[error("control-flow graph error at {span}: {message} ({caller})")]
    Cfg { message: String, span: Span, caller: &'static str },

    /// The emitter could not produce RTL for an otherwise well-formed CFG.
    #[error("emission error: {message} ({caller})")]
    Emission { message: String, caller: &'static str },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax { message: message.into(), span }
    }

    pub fn structural(message: impl Into<String>, span: Span, caller: &'static str) -> Self {
        Self::Structural { message: message.into(), span, caller }
    }

    pub fn semantic(message: impl Into<String>, span: Span, caller: &'static str) -> Self {
        Self::Semantic { message: message.into(), span, caller }
    }

    pub fn cfg(message: impl Into<String>, span: Span, caller: &'static str) -> Self {
        Self::Cfg { message: message.into(), span, caller }
    }

    pub fn emission(message: impl Into<String>, caller: &'static str) -> Self {
        Self::Emission { message: message.into(), caller }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Exit code the CLI driver reports for this error category (§6).
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Syntax { .. } => 1,
            CompileError::Structural { .. } | CompileError::Semantic { .. } => 2,
            CompileError::Cfg { .. } => 3,
            CompileError::Emission { .. } => 4,
            CompileError::Io { .. } | CompileError::Config { .. } => 1,
        }
    }
}

/// Captures the call site of a structural/semantic/CFG error at the point
/// it's raised, replacing the source compiler's runtime `caller(1)` probe
/// with a location resolved at compile time.
#[macro_export]
macro_rules! here {
    () => {
        concat!(file!(), ":", line!())
    };
}
