//! The three non-emission dump formats behind `-gv`/`-vars`/`-stmt` (§6).

use std::fmt::Write as _;

use rtlc_cfg::Cfg;
use rtlc_sem::VariableTable;
use rtlc_tree::Tree;

/// Graphviz DOT: one `n{id}` node per tree node, labeled with its rule name,
/// plus one edge per child.
pub fn tree_to_dot(tree: &Tree) -> String {
    let mut out = String::new();
    out.push_str("digraph tree {\n");
    for id in 0..tree.len() as u32 {
        let label = tree.rule(id).replace('"', "\\\"");
        let _ = writeln!(out, "  n{id} [label=\"{label}\"];");
        for &child in tree.children(id) {
            let _ = writeln!(out, "  n{id} -> n{child};");
        }
    }
    out.push_str("}\n");
    out
}

/// One line per variable binding.
pub fn dump_vars(vars: &VariableTable) -> String {
    let mut out = String::new();
    for v in &vars.variables {
        let _ = writeln!(
            out,
            "{}.{} -> {} ({} bit{}, {:?})",
            v.function,
            v.source_name,
            v.canonical_name,
            v.bit_width(),
            if v.bit_width() == 1 { "" } else { "s" },
            v.aggregate,
        );
    }
    out
}

/// One line per control cell, with its predecessors and successors resolved
/// to canonical names for readability.
pub fn dump_stmt(cfg: &Cfg) -> String {
    let mut out = String::new();
    for cell in &cfg.cells {
        let preds: Vec<&str> = cell.predecessors.iter().map(|&p| cfg.cell(p).canonical_name.as_str()).collect();
        let succs: Vec<&str> = cell.successors.iter().map(|&s| cfg.cell(s).canonical_name.as_str()).collect();
        let _ = writeln!(
            out,
            "{}.{} [{:?}] preds=[{}] succs=[{}]",
            cell.function,
            cell.canonical_name,
            cell.kind,
            preds.join(", "),
            succs.join(", "),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlc_cfg::build_cfg;
    use rtlc_frontend::parse_source;
    use rtlc_sem::{build_function_table, build_variable_table};

    #[test]
    fn tree_dot_emits_one_node_per_tree_entry() {
        let tree = parse_source("func main() { x := 1; }").unwrap();
        let dot = tree_to_dot(&tree);
        assert!(dot.starts_with("digraph tree {\n"));
        assert_eq!(dot.matches("[label=").count(), tree.len());
    }

    #[test]
    fn vars_dump_has_one_line_per_binding() {
        let tree = parse_source("func main() { x := 1; }").unwrap();
        let (vars, _) = build_variable_table(&tree).unwrap();
        let text = dump_vars(&vars);
        assert_eq!(text.lines().count(), vars.variables.len());
        assert!(text.contains("main.x"));
    }

    #[test]
    fn stmt_dump_resolves_predecessor_ids_to_canonical_names() {
        let tree = parse_source("func main() { x := 1; x = x + 1; }").unwrap();
        let (mut vars, _) = build_variable_table(&tree).unwrap();
        let funcs = build_function_table(&tree, &mut vars).unwrap();
        let cfg = build_cfg(&tree, &vars, &funcs).unwrap();
        let text = dump_stmt(&cfg);
        assert_eq!(text.lines().count(), cfg.cells.len());
        assert!(text.contains("preds=[c_bit_"));
    }
}
