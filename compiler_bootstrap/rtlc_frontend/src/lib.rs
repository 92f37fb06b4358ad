//! Front end: lexer and recursive-descent parser for the source language's
//! statement/expression grammar (§3a), producing an [`rtlc_tree::Tree`]
//! directly. A single syntax error aborts parsing immediately — there is no
//! recovery-and-continue pass, since every later stage needs a complete tree.

pub mod char_stream;
pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::parse_source;
pub use token::{keyword_kind, Token, TokenKind};
