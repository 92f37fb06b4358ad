//! Variable-table (§4.2) and function-table (§4.3) passes.
//!
//! Both read the parse tree produced by `rtlc_frontend` and populate the
//! tables the CFG builder and RTL emitter consume. Neither mutates the tree.

pub mod types;
pub mod variables;
pub mod functions;

pub use functions::*;
pub use types::*;
pub use variables::*;
