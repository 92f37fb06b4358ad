//! Emission options and the small set of constants the RTL template in
//! `codegen.rs` is built around (§4.5, §6).

/// The output intrinsic the I/O section recognizes by call-expression name
/// (§9 "Output intrinsic recognition" — matched on parse-tree shape, not by
/// regexing the raw source text).
pub const OUTPUT_INTRINSIC: &str = "fmt.Printf";

/// Name of the `` `define `` macro every module's shell emits (§4.5 "Module shell").
pub const RESET_MACRO: &str = "RESET";

/// Options threaded from the CLI's `CompileConfig` into the emitter: the
/// debug bitmask (§6 `-d <mask>`) and an optional testbench cycle bound
/// (§6 `-tb [N]`).
#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub debug_mask: u32,
    pub testbench_cycles: Option<u32>,
    /// `{file}` slot of the `$display` trace line (§4.5); the core has no
    /// file identifier of its own (single-file spans, see `rtlc_common::span`),
    /// so the CLI passes through whatever it was invoked with.
    pub source_label: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { debug_mask: 0, testbench_cycles: None, source_label: "<input>".to_string() }
    }
}

impl EmitOptions {
    pub fn new(debug_mask: u32, testbench_cycles: Option<u32>, source_label: impl Into<String>) -> Self {
        Self { debug_mask, testbench_cycles, source_label: source_label.into() }
    }

    /// Bit 0 of the mask enables the `$display` control-flow tracing (§4.5).
    pub fn trace_enabled(&self) -> bool {
        self.debug_mask & 0x1 != 0
    }
}

/// Every artifact the emitter produced for one compilation unit: the RTL
/// text and any non-fatal emission warnings recorded along the way (§7
/// "Emission warnings").
#[derive(Debug, Clone)]
pub struct EmitOutput {
    pub rtl: String,
    pub diagnostics: rtlc_common::Diagnostics,
}
