//! RTL text generation (§4.5).
//!
//! Every function becomes its own module, built from five sections emitted
//! in a fixed order: the shell, the variable section, the I/O section, the
//! dataflow section, and the control-flow section, followed by a shared
//! cycle counter. The sections are pure text assembly over the tables
//! `rtlc_sem`/`rtlc_cfg` already built — this module does no further
//! analysis of its own.

use std::fmt::Write as _;

use rtlc_cfg::{Cfg, CellId, CellKind, ControlCell};
use rtlc_common::{here, CompileError, CompileResult, Diagnostics, Span};
use rtlc_sem::{Function, FunctionTable, Variable, VariableTable, ENTRY_FUNCTION};
use rtlc_tree::rules::*;
use rtlc_tree::{walk_down_to, Tree};

use crate::ir::{EmitOptions, EmitOutput, OUTPUT_INTRINSIC, RESET_MACRO};

/// Emits RTL for every function in the compilation unit, followed by an
/// optional testbench module (§4.5 "Testbench").
pub fn emit_program(
    tree: &Tree,
    vars: &VariableTable,
    funcs: &FunctionTable,
    cfg: &Cfg,
    opts: &EmitOptions,
) -> CompileResult<EmitOutput> {
    let mut diagnostics = Diagnostics::new();
    let mut rtl = String::new();

    if funcs.functions.is_empty() {
        diagnostics.warning("compilation unit declares no functions", Span::zero());
    }

    for function in &funcs.functions {
        let module = emit_function(tree, vars, funcs, cfg, function, opts, &mut diagnostics)?;
        rtl.push_str(&module);
        rtl.push('\n');
    }

    if let Some(cycles) = opts.testbench_cycles {
        rtl.push_str(&emit_testbench(cycles));
        rtl.push('\n');
    }

    Ok(EmitOutput { rtl, diagnostics })
}

fn emit_function(
    tree: &Tree,
    vars: &VariableTable,
    funcs: &FunctionTable,
    cfg: &Cfg,
    function: &Function,
    opts: &EmitOptions,
    diagnostics: &mut Diagnostics,
) -> CompileResult<String> {
    let name = function.name.as_str();

    let mut cells: Vec<&ControlCell> = cfg.for_function(name).collect();
    cells.sort_by_key(|c| c.id);
    if cells.is_empty() {
        diagnostics.warning(format!("function `{name}` has an empty control-flow graph"), tree.span(function.decl_node));
    }

    let mut scalars: Vec<&Variable> = vars.for_function(name).filter(|v| v.aggregate.is_scalar()).collect();
    scalars.sort_by_key(|v| v.id);
    if vars.for_function(name).next().is_none() {
        diagnostics.warning(format!("function `{name}` has an empty variable table"), tree.span(function.decl_node));
    }

    let mut out = String::new();
    emit_module_shell(&mut out, name);
    emit_variable_section(&mut out, &scalars, &cells);
    emit_io_section(tree, &mut out, &cells, diagnostics)?;
    emit_dataflow_section(tree, funcs, cfg, name, &mut out, &scalars)?;
    emit_control_section(tree, cfg, &mut out, name, &cells, opts)?;
    emit_cycle_counter(&mut out);
    out.push_str("endmodule\n");
    Ok(out)
}

fn emit_module_shell(out: &mut String, name: &str) {
    let _ = writeln!(out, "module {name}(clock, rst, start);");
    let _ = writeln!(out, "  input clock;");
    let _ = writeln!(out, "  input rst;");
    let _ = writeln!(out, "  input start;");
    let _ = writeln!(out, "  `define {RESET_MACRO} (rst)");
    out.push('\n');
}

fn emit_variable_section(out: &mut String, scalars: &[&Variable], cells: &[&ControlCell]) {
    for v in scalars {
        let _ = writeln!(out, "  reg signed [{}:0] {};", v.bit_width().saturating_sub(1), v.canonical_name);
    }
    out.push_str("  reg [63:0] cycle_count;\n");
    for cell in cells {
        if has_register(cell) {
            let _ = writeln!(out, "  reg {};", cell.canonical_name);
        }
        if matches!(cell.kind, CellKind::IfTest | CellKind::ForCond) && !cell.successors_taken.is_empty() {
            let _ = writeln!(out, "  reg {}_taken;", cell.canonical_name);
        }
    }
    out.push('\n');
}

/// A cell is wired into the control-flow section only once it has at least
/// one live predecessor — `if`/`for` wrapper cells never do (§4.5 "Variable
/// section"). The function's own entry cell is the one exception: it has no
/// predecessor but is still driven by `start`.
fn has_register(cell: &ControlCell) -> bool {
    cell.kind == CellKind::FunctionEntry || cell.has_predecessor()
}

fn emit_io_section(tree: &Tree, out: &mut String, cells: &[&ControlCell], diagnostics: &mut Diagnostics) -> CompileResult<()> {
    let mut section = String::new();
    for cell in cells {
        if cell.kind != CellKind::Expression {
            continue;
        }
        let text = tree.text(cell.tree_node);
        if !text.contains(OUTPUT_INTRINSIC) {
            continue;
        }
        let Some(call) = walk_down_to(tree, cell.tree_node, CALL_EXPR) else {
            diagnostics.warning(
                format!("`{OUTPUT_INTRINSIC}` call at {} has no parseable argument list", tree.span(cell.tree_node)),
                tree.span(cell.tree_node),
            );
            continue;
        };
        let args: Vec<&str> = tree.children(call).iter().map(|&arg| tree.text(arg)).collect();
        let _ = writeln!(section, "  always @(posedge clock) begin");
        let _ = writeln!(section, "    if ({} == 1) $write({});", cell.canonical_name, args.join(", "));
        let _ = writeln!(section, "  end");
    }
    if !section.is_empty() {
        out.push_str("  // I/O section\n");
        out.push_str(&section);
        out.push('\n');
    }
    Ok(())
}

fn emit_dataflow_section(
    tree: &Tree,
    funcs: &FunctionTable,
    cfg: &Cfg,
    function: &str,
    out: &mut String,
    scalars: &[&Variable],
) -> CompileResult<()> {
    for v in scalars {
        let mut writer_ids: Vec<CellId> = cfg
            .writes
            .get(&v.canonical_name)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|&id| cfg.cell(id).function == function)
            .collect();
        writer_ids.sort_unstable();

        let _ = writeln!(out, "  always @(posedge clock) begin");
        let _ = writeln!(out, "    if (`{RESET_MACRO}) {} <= 0;", v.canonical_name);
        for id in writer_ids {
            let cell = cfg.cell(id);
            let rhs = dataflow_rhs(tree, funcs, v, cell)?;
            let _ = writeln!(out, "    else if ({} == 1) {} <= {};", cell.canonical_name, v.canonical_name, rhs);
        }
        let _ = writeln!(out, "    else {0} <= {0};", v.canonical_name);
        let _ = writeln!(out, "  end");
    }
    out.push('\n');
    Ok(())
}

/// The right-hand side a writer cell assigns to `var`, taken verbatim from
/// the source span (§4.5 "Dataflow section" — the top-level `=` is already
/// absent from the child node, so no further rewriting is needed).
fn dataflow_rhs(tree: &Tree, funcs: &FunctionTable, var: &Variable, cell: &ControlCell) -> CompileResult<String> {
    let node = cell.tree_node;
    match tree.rule(node) {
        ASSIGNMENT | SHORT_VAR_DECL => {
            let rhs = tree
                .children(node)
                .get(1)
                .copied()
                .ok_or_else(|| CompileError::emission(format!("`{}` has no right-hand side", tree.rule(node)), here!()))?;
            Ok(tree.text(rhs).to_string())
        }
        INC_DEC_STMT => {
            let op = if tree.text(node).ends_with("++") { "+" } else { "-" };
            Ok(format!("{} {} 1", var.canonical_name, op))
        }
        RETURN_STMT => {
            let func = funcs
                .by_name(&cell.function)
                .ok_or_else(|| CompileError::emission(format!("unknown function `{}`", cell.function), here!()))?;
            let position = func
                .results
                .iter()
                .position(|&id| id == var.id)
                .ok_or_else(|| CompileError::emission(format!("`{}` is not a result of `{}`", var.canonical_name, cell.function), here!()))?;
            let expr = tree
                .children(node)
                .get(position)
                .copied()
                .ok_or_else(|| CompileError::emission(format!("return statement is missing a value for result {position}"), here!()))?;
            Ok(tree.text(expr).to_string())
        }
        other => Err(CompileError::emission(format!("cell of kind `{other}` cannot write a variable"), here!())),
    }
}

fn emit_control_section(tree: &Tree, cfg: &Cfg, out: &mut String, function: &str, cells: &[&ControlCell], opts: &EmitOptions) -> CompileResult<()> {
    for cell in cells {
        if !has_register(cell) {
            continue;
        }
        match cell.kind {
            CellKind::FunctionEntry => emit_entry_block(out, cell, opts),
            CellKind::IfTest | CellKind::ForCond => emit_branch_block(tree, cfg, out, cell, opts)?,
            CellKind::FinishNode => emit_finish_block(cfg, out, function, cell, opts),
            _ => emit_plain_block(cfg, out, cell, opts),
        }
    }
    Ok(())
}

/// `name == 1 || ... || pred_taken_name_taken == 1`, or `1'b0` for a cell
/// with no live predecessor at all (unreachable in a valid CFG, but kept for
/// symmetry with `has_register`'s `FunctionEntry` special case).
fn predecessor_guard(cfg: &Cfg, cell: &ControlCell) -> String {
    let mut terms: Vec<String> = Vec::new();
    for &p in &cell.predecessors {
        terms.push(format!("{} == 1", cfg.cell(p).canonical_name));
    }
    for &p in &cell.predecessors_taken {
        terms.push(format!("{}_taken == 1", cfg.cell(p).canonical_name));
    }
    if terms.is_empty() {
        "1'b0".to_string()
    } else {
        terms.join(" || ")
    }
}

fn condition_text(tree: &Tree, cell: &ControlCell) -> String {
    match cell.kind {
        CellKind::IfTest => tree.text(cell.tree_node).to_string(),
        CellKind::ForCond => cell.sub_node.map(|n| tree.text(n).to_string()).unwrap_or_else(|| "(1 == 1)".to_string()),
        _ => unreachable!("condition_text called on a non-branching cell"),
    }
}

fn emit_entry_block(out: &mut String, cell: &ControlCell, opts: &EmitOptions) {
    let _ = writeln!(out, "  always @(posedge clock) begin");
    let _ = writeln!(out, "    if (`{RESET_MACRO}) {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "    else if (start == 1) begin");
    let _ = writeln!(out, "      {} <= 1;", cell.canonical_name);
    emit_trace(out, cell, opts, "      ");
    let _ = writeln!(out, "    end");
    let _ = writeln!(out, "    else {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "  end");
}

fn emit_plain_block(cfg: &Cfg, out: &mut String, cell: &ControlCell, opts: &EmitOptions) {
    let guard = predecessor_guard(cfg, cell);
    let _ = writeln!(out, "  always @(posedge clock) begin");
    let _ = writeln!(out, "    if (`{RESET_MACRO}) {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "    else if ({guard}) begin");
    let _ = writeln!(out, "      {} <= 1;", cell.canonical_name);
    emit_trace(out, cell, opts, "      ");
    let _ = writeln!(out, "    end");
    let _ = writeln!(out, "    else {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "  end");
}

fn emit_branch_block(tree: &Tree, cfg: &Cfg, out: &mut String, cell: &ControlCell, opts: &EmitOptions) -> CompileResult<()> {
    let guard = predecessor_guard(cfg, cell);
    let cond = condition_text(tree, cell);
    let _ = writeln!(out, "  always @(posedge clock) begin");
    let _ = writeln!(out, "    if (`{RESET_MACRO}) begin");
    let _ = writeln!(out, "      {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "      {}_taken <= 0;", cell.canonical_name);
    let _ = writeln!(out, "    end else if ({guard}) begin");
    let _ = writeln!(out, "      if ({cond}) begin");
    let _ = writeln!(out, "        {}_taken <= 1;", cell.canonical_name);
    let _ = writeln!(out, "        {} <= 0;", cell.canonical_name);
    emit_trace(out, cell, opts, "        ");
    let _ = writeln!(out, "      end else begin");
    let _ = writeln!(out, "        {} <= 1;", cell.canonical_name);
    let _ = writeln!(out, "        {}_taken <= 0;", cell.canonical_name);
    emit_trace(out, cell, opts, "        ");
    let _ = writeln!(out, "      end");
    let _ = writeln!(out, "    end else begin");
    let _ = writeln!(out, "      {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "      {}_taken <= 0;", cell.canonical_name);
    let _ = writeln!(out, "    end");
    let _ = writeln!(out, "  end");
    Ok(())
}

fn emit_finish_block(cfg: &Cfg, out: &mut String, function: &str, cell: &ControlCell, opts: &EmitOptions) {
    let guard = predecessor_guard(cfg, cell);
    let _ = writeln!(out, "  always @(posedge clock) begin");
    let _ = writeln!(out, "    if (`{RESET_MACRO}) {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "    else if ({guard}) begin");
    let _ = writeln!(out, "      {} <= 1;", cell.canonical_name);
    emit_trace(out, cell, opts, "      ");
    if function == ENTRY_FUNCTION {
        let _ = writeln!(out, "      $finish();");
    }
    let _ = writeln!(out, "    end");
    let _ = writeln!(out, "    else {} <= 0;", cell.canonical_name);
    let _ = writeln!(out, "  end");
}

fn emit_trace(out: &mut String, cell: &ControlCell, opts: &EmitOptions, indent: &str) {
    if !opts.trace_enabled() {
        return;
    }
    let _ = writeln!(
        out,
        "{indent}$display(\"a2gDbg,%0d,{},{}, at control node {} ...\", cycle_count);",
        opts.source_label, cell.pos.line, cell.canonical_name
    );
}

fn emit_cycle_counter(out: &mut String) {
    out.push_str("  always @(posedge clock) begin\n");
    let _ = writeln!(out, "    if (`{RESET_MACRO}) cycle_count <= 0;");
    out.push_str("    else cycle_count <= cycle_count + 1;\n");
    out.push_str("  end\n\n");
}

fn emit_testbench(cycles: u32) -> String {
    let mut out = String::new();
    out.push_str("module generic_bench;\n");
    let _ = writeln!(out, "  parameter MAX_CYCLES = {cycles};");
    out.push_str("  reg clock;\n");
    out.push_str("  reg rst;\n");
    out.push_str("  reg start;\n");
    out.push_str("  reg [63:0] bench_cycle_count;\n");
    out.push('\n');
    out.push_str("  initial begin\n");
    out.push_str("    clock = 0;\n");
    out.push_str("    rst = 1;\n");
    out.push_str("    start = 0;\n");
    out.push_str("    bench_cycle_count = 0;\n");
    out.push_str("    #10 rst = 0;\n");
    out.push_str("    #10 start = 1;\n");
    out.push_str("    #10 start = 0;\n");
    out.push_str("  end\n");
    out.push('\n');
    out.push_str("  always #5 clock = ~clock;\n");
    out.push('\n');
    out.push_str("  always @(posedge clock) begin\n");
    out.push_str("    bench_cycle_count <= bench_cycle_count + 1;\n");
    out.push_str("    if (bench_cycle_count > MAX_CYCLES) $finish();\n");
    out.push_str("  end\n");
    out.push_str("endmodule\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlc_cfg::build_cfg;
    use rtlc_frontend::parse_source;
    use rtlc_sem::{build_function_table, build_variable_table};

    fn compile(src: &str) -> (Tree, VariableTable, FunctionTable, Cfg) {
        let tree = parse_source(src).expect("parse");
        let (mut vars, _) = build_variable_table(&tree).expect("vars");
        let funcs = build_function_table(&tree, &mut vars).expect("funcs");
        let cfg = build_cfg(&tree, &vars, &funcs).expect("cfg");
        (tree, vars, funcs, cfg)
    }

    #[test]
    fn emits_one_module_per_function_in_fixed_shell_shape() {
        let (tree, vars, funcs, cfg) = compile("func main() { x := 1; }");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(out.diagnostics.is_empty());
        assert!(out.rtl.contains("module main(clock, rst, start);"));
        assert!(out.rtl.contains("input clock;"));
        assert!(out.rtl.contains("`define RESET (rst)"));
        assert!(out.rtl.contains("endmodule"));
    }

    #[test]
    fn dataflow_block_chains_every_writer_in_cell_id_order() {
        let (tree, vars, funcs, cfg) = compile("func main() { i := 0; i = i + 1; }");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        let block_start = out.rtl.find("i <= 0;").expect("reset branch present");
        let first = out.rtl.find("<= 0;", block_start).unwrap();
        let second = out.rtl.find("<= i + 1;").unwrap();
        assert!(first < second, "writers must appear in cell-id order");
        assert!(out.rtl.contains("else i <= i;"));
    }

    #[test]
    fn inc_dec_rhs_is_synthesized_from_its_own_name() {
        let (tree, vars, funcs, cfg) = compile("func main() { i := 0; i++; }");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(out.rtl.contains("<= i + 1;"));
    }

    #[test]
    fn if_test_cell_drives_both_its_register_and_its_taken_register() {
        let (tree, vars, funcs, cfg) = compile("func main() { if 1 == 1 { x := 1; } }");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(out.rtl.contains("_taken;"));
        assert!(out.rtl.contains("if (1 == 1) begin"));
    }

    #[test]
    fn empty_for_clause_condition_defaults_to_the_tautology() {
        let (tree, vars, funcs, cfg) = compile("func main() { for { break; } }");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(out.rtl.contains("if ((1 == 1)) begin"));
    }

    #[test]
    fn output_intrinsic_is_rewritten_to_a_write_call() {
        let (tree, vars, funcs, cfg) = compile(r#"func main() { fmt.Printf("%d", 1); }"#);
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(out.rtl.contains("$write(\"%d\", 1);"));
    }

    #[test]
    fn finish_node_of_main_issues_dollar_finish() {
        let (tree, vars, funcs, cfg) = compile("func main() { x := 1; }");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(out.rtl.contains("$finish();"));
    }

    #[test]
    fn debug_mask_bit_zero_enables_display_tracing() {
        let (tree, vars, funcs, cfg) = compile("func main() { x := 1; }");
        let opts = EmitOptions::new(1, None, "prog.go");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &opts).unwrap();
        assert!(out.rtl.contains("a2gDbg"));
        assert!(out.rtl.contains("prog.go"));
    }

    #[test]
    fn testbench_is_only_emitted_when_requested() {
        let (tree, vars, funcs, cfg) = compile("func main() { x := 1; }");
        let without = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(!without.rtl.contains("generic_bench"));

        let opts = EmitOptions::new(0, Some(200), "<input>");
        let with = emit_program(&tree, &vars, &funcs, &cfg, &opts).unwrap();
        assert!(with.rtl.contains("module generic_bench;"));
        assert!(with.rtl.contains("parameter MAX_CYCLES = 200;"));
    }

    #[test]
    fn empty_function_table_is_a_warning_not_an_error() {
        let (tree, vars, funcs, cfg) = compile("");
        let out = emit_program(&tree, &vars, &funcs, &cfg, &EmitOptions::default()).unwrap();
        assert!(!out.diagnostics.is_empty());
        assert!(out.rtl.is_empty());
    }
}
