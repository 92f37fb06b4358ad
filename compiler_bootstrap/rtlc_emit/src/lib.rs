//! RTL emission engine (§4.5).
//!
//! Consumes the variable table (`rtlc_sem`), function table (`rtlc_sem`), and
//! statement CFG (`rtlc_cfg`) and lowers each function to a one-hot encoded
//! hardware module: a variable section, a control-flow section, a dataflow
//! section, and an I/O section, in that fixed order.

pub mod ir;
pub mod codegen;

pub use codegen::*;
pub use ir::*;
