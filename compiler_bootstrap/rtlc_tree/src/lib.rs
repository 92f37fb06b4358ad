//! Arena-backed parse tree shared by every pass downstream of the front end.
//!
//! A [`Tree`] is produced once by `rtlc_frontend::Parser::parse_program` and
//! is never mutated again; every later pass (variable table, function table,
//! CFG builder, emitter) only reads it. Nodes are addressed by [`NodeId`]
//! rather than by reference so the tree can be walked and shared freely
//! without lifetime gymnastics.

pub mod tree;
pub mod rules;
pub mod extract;

pub use extract::*;
pub use rules::*;
pub use tree::*;
