//! Variable-table pass (§4.2).

use crate::types::{Aggregate, DeclKind, PrimitiveType, Variable, VariableTable};
use rtlc_common::{here, CompileError, CompileResult, Diagnostics, PARAMETER as CHANNEL_PARAMETER, NOT_SPECIFIED};
use rtlc_tree::rules::{
    ARRAY_TYPE, BASIC_LIT, CHANNEL_TYPE, FUNCTION_DECL, IDENTIFIER, IDENTIFIER_LIST, MAP_TYPE, PARAMETER_DECL,
    R_TYPE, SHORT_VAR_DECL, VAR_DECL,
};
use rtlc_tree::{array_dimensions, channel_depth, primitive_type, walk_down_to, walk_up_to, NodeId, Tree};

fn decl_kind(rule: &str) -> Option<DeclKind> {
    match rule {
        VAR_DECL => Some(DeclKind::VarDecl),
        PARAMETER_DECL => Some(DeclKind::ParameterDecl),
        SHORT_VAR_DECL => Some(DeclKind::ShortVarDecl),
        _ => None,
    }
}

fn enclosing_function(tree: &Tree, node: NodeId) -> CompileResult<String> {
    let func = walk_up_to(tree, node, FUNCTION_DECL)
        .ok_or_else(|| CompileError::structural("declaration outside of any function", tree.span(node), here!()))?;
    let name_node = tree
        .children(func)
        .get(1)
        .copied()
        .ok_or_else(|| CompileError::structural("functionDecl has fewer than two children", tree.span(func), here!()))?;
    Ok(tree.text(name_node).to_string())
}

/// Infers `(name, bit_width)` from a literal when no `r_type` is present
/// (§4.2 step 3): decimal, hexadecimal, and floating literals each imply a
/// default shape; absence of any literal synthesizes `("int", 32)`.
fn infer_from_literal(tree: &Tree, node: NodeId, diags: &mut Diagnostics) -> (String, u32) {
    match walk_down_to(tree, node, BASIC_LIT) {
        Some(lit) => {
            let text = tree.text(lit);
            if text.starts_with("0x") || text.starts_with("0X") {
                ("int".to_string(), 4 * (text.len() as u32 - 2))
            } else if text.contains('.') {
                ("float".to_string(), 32)
            } else {
                ("int".to_string(), 32)
            }
        }
        None => {
            diags.warning(
                format!("no type annotation or literal to infer a type from at {}", tree.span(node)),
                tree.span(node),
            );
            ("int".to_string(), 32)
        }
    }
}

fn aggregate_of(tree: &Tree, node: NodeId, decl: DeclKind) -> CompileResult<Aggregate> {
    if let Some(array_type) = walk_down_to(tree, node, ARRAY_TYPE) {
        return Ok(Aggregate::Array { dims: array_dimensions(tree, array_type)? });
    }
    if let Some(chan_type) = walk_down_to(tree, node, CHANNEL_TYPE) {
        let depth = channel_depth(tree, chan_type);
        let depth = if depth != NOT_SPECIFIED {
            depth
        } else if decl == DeclKind::ParameterDecl {
            CHANNEL_PARAMETER
        } else {
            1
        };
        return Ok(Aggregate::Channel { depth });
    }
    if walk_down_to(tree, node, MAP_TYPE).is_some() {
        return Ok(Aggregate::Map);
    }
    Ok(Aggregate::Numeric)
}

/// Builds the variable table by scanning every `varDecl`, `parameterDecl`,
/// and `shortVarDecl` node in id order (§4.2). Returns non-fatal ambiguity
/// warnings (an inferred-without-literal type) alongside the table.
pub fn build_variable_table(tree: &Tree) -> CompileResult<(VariableTable, Diagnostics)> {
    let mut table = VariableTable::new();
    let mut diags = Diagnostics::new();

    for id in 0..tree.len() as NodeId {
        let Some(decl) = decl_kind(tree.rule(id)) else { continue };

        let function = enclosing_function(tree, id)?;

        let ident_list = match walk_down_to(tree, id, IDENTIFIER_LIST) {
            Some(list) => list,
            None if decl == DeclKind::ParameterDecl => continue, // anonymous result parameter
            None => {
                return Err(CompileError::structural(
                    format!("{} is missing an identifierList", tree.rule(id)),
                    tree.span(id),
                    here!(),
                ))
            }
        };

        let (type_name, bit_width) = match walk_down_to(tree, id, R_TYPE) {
            Some(rtype) => primitive_type(tree, rtype)?,
            None => infer_from_literal(tree, id, &mut diags),
        };

        let aggregate = aggregate_of(tree, id, decl)?;

        for &name_id in tree.children_with_rule(ident_list, IDENTIFIER).collect::<Vec<_>>().iter() {
            let source_name = tree.text(name_id).to_string();
            let var = Variable {
                id: table.next_id(),
                decl_node: id,
                decl_kind: decl,
                function: function.clone(),
                source_name: source_name.clone(),
                canonical_name: source_name,
                primitive: PrimitiveType { name: type_name.clone(), bit_width },
                aggregate: aggregate.clone(),
                is_parameter: decl == DeclKind::ParameterDecl,
                is_result: false,
            };
            table.insert(var);
        }
    }

    Ok((table, diags))
}
