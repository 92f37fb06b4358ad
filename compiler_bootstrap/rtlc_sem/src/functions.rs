//! Function-table pass (§4.3).

use crate::types::{Aggregate, DeclKind, Function, FunctionTable, PrimitiveType, Variable, VariableTable};
use rtlc_common::{here, CompileError, CompileResult};
use rtlc_tree::rules::{FUNCTION_DECL, PARAMETER_LIST, RESULT, R_TYPE};
use rtlc_tree::{primitive_type, walk_down_to, NodeId, Tree};

fn function_name(tree: &Tree, func: NodeId) -> CompileResult<String> {
    tree.children(func)
        .get(1)
        .map(|&id| tree.text(id).to_string())
        .ok_or_else(|| CompileError::structural("functionDecl has fewer than two children", tree.span(func), here!()))
}

/// One synthesized result binding per declared return slot (§4.3 step 3).
fn synthesize_results(tree: &Tree, func: NodeId, fn_name: &str, vars: &mut VariableTable) -> CompileResult<Vec<u32>> {
    let Some(result) = walk_down_to(tree, func, RESULT) else {
        return Ok(Vec::new());
    };

    let r_types: Vec<NodeId> = match walk_down_to(tree, result, PARAMETER_LIST) {
        Some(list) => tree.children(list).iter().copied().collect(),
        None => match walk_down_to(tree, result, R_TYPE) {
            Some(rtype) => vec![rtype],
            None => Vec::new(),
        },
    };

    let mut ids = Vec::with_capacity(r_types.len());
    for position in r_types {
        let rtype = if tree.rule(position) == R_TYPE { position } else { walk_down_to(tree, position, R_TYPE).unwrap_or(position) };
        let (name, bit_width) = primitive_type(tree, rtype)?;
        let span = tree.span(rtype);
        let canonical = format!("_{}_{}_{}_", fn_name, span.start.line, span.start.column);
        let var = Variable {
            id: vars.next_id(),
            decl_node: position,
            decl_kind: DeclKind::Result,
            function: fn_name.to_string(),
            source_name: canonical.clone(),
            canonical_name: canonical,
            primitive: PrimitiveType { name, bit_width },
            aggregate: Aggregate::Numeric,
            is_parameter: false,
            is_result: true,
        };
        ids.push(vars.insert(var));
    }
    Ok(ids)
}

/// Builds the function table, synthesizing result bindings into `vars`
/// along the way (§4.3). Fails with a semantic error on a repeated name.
pub fn build_function_table(tree: &Tree, vars: &mut VariableTable) -> CompileResult<FunctionTable> {
    let mut table = FunctionTable::new();

    for id in 0..tree.len() as NodeId {
        if tree.rule(id) != FUNCTION_DECL {
            continue;
        }
        let name = function_name(tree, id)?;
        if table.contains(&name) {
            return Err(CompileError::semantic(format!("duplicate function name `{name}`"), tree.span(id), here!()));
        }

        let parameters: Vec<u32> = vars.for_function(&name).filter(|v| v.is_parameter).map(|v| v.id).collect();
        let results = synthesize_results(tree, id, &name, vars)?;

        table.insert(Function { id: table.functions.len() as u32, name, decl_node: id, parameters, results });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::build_variable_table;
    use rtlc_common::{Position, Span};
    use rtlc_tree::rules::*;

    fn span() -> Span {
        Span::single(Position::start())
    }

    #[test]
    fn synthesizes_one_result_binding_per_scalar_return() {
        let mut tree = Tree::new();
        let func = tree.alloc(FUNCTION_DECL, tree.root(), span(), "");
        tree.alloc("func", func, span(), "func");
        tree.alloc(IDENTIFIER, func, span(), "add");
        let result = tree.alloc(RESULT, func, span(), "");
        tree.alloc(R_TYPE, result, span(), "int");

        let (mut vars, _) = build_variable_table(&tree).unwrap();
        let functions = build_function_table(&tree, &mut vars).unwrap();

        let add = functions.by_name("add").unwrap();
        assert_eq!(add.results.len(), 1);
        let result_var = vars.get(add.results[0]);
        assert!(result_var.is_result);
        assert_eq!(result_var.primitive.name, "int");
    }

    #[test]
    fn duplicate_function_name_is_a_semantic_error() {
        let mut tree = Tree::new();
        let a = tree.alloc(FUNCTION_DECL, tree.root(), span(), "");
        tree.alloc("func", a, span(), "func");
        tree.alloc(IDENTIFIER, a, span(), "f");
        let b = tree.alloc(FUNCTION_DECL, tree.root(), span(), "");
        tree.alloc("func", b, span(), "func");
        tree.alloc(IDENTIFIER, b, span(), "f");

        let (mut vars, _) = build_variable_table(&tree).unwrap();
        assert!(build_function_table(&tree, &mut vars).is_err());
    }

    #[test]
    fn parameters_are_collected_in_declaration_order() {
        let mut tree = Tree::new();
        let func = tree.alloc(FUNCTION_DECL, tree.root(), span(), "");
        tree.alloc("func", func, span(), "func");
        tree.alloc(IDENTIFIER, func, span(), "sum");
        let params = tree.alloc(PARAMETER_LIST, func, span(), "");
        let p1 = tree.alloc(PARAMETER_DECL, params, span(), "");
        let l1 = tree.alloc(IDENTIFIER_LIST, p1, span(), "");
        tree.alloc(IDENTIFIER, l1, span(), "a");
        tree.alloc(R_TYPE, p1, span(), "int");
        let p2 = tree.alloc(PARAMETER_DECL, params, span(), "");
        let l2 = tree.alloc(IDENTIFIER_LIST, p2, span(), "");
        tree.alloc(IDENTIFIER, l2, span(), "b");
        tree.alloc(R_TYPE, p2, span(), "int");

        let (mut vars, _) = build_variable_table(&tree).unwrap();
        let functions = build_function_table(&tree, &mut vars).unwrap();
        let sum = functions.by_name("sum").unwrap();
        let names: Vec<_> = sum.parameters.iter().map(|&id| vars.get(id).source_name.clone()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
