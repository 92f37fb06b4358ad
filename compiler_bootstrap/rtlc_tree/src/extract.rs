//! Tree-view accessors that read a declaration's shape out of the raw parse
//! tree: [`primitive_type`], [`array_dimensions`], [`channel_depth`].
//!
//! These sit below the variable-table pass (`rtlc_sem`) and are the only
//! place the rest of the pipeline reaches into a type/length/depth subtree
//! directly instead of going through a `Variable` binding.

use crate::rules::{ARRAY_LENGTH, BASIC_LIT, R_TYPE, TYPE_LIT};
use crate::tree::{walk_down_all, walk_down_to, NodeId, Tree};
use rtlc_common::{here, CompileError, CompileResult, DEFAULT_BIT_WIDTH, NOT_SPECIFIED};

fn bad_type(tree: &Tree, at: NodeId, caller: &'static str) -> CompileError {
    CompileError::structural(
        format!("expected an r_type or typeLit, found `{}`", tree.rule(at)),
        tree.span(at),
        caller,
    )
}

fn terminal_text<'t>(tree: &'t Tree, node: NodeId) -> &'t str {
    match tree.children(node).first() {
        Some(&child) if tree.node(child).is_leaf() => tree.text(child),
        _ => tree.text(node),
    }
}

fn split_type_name(text: &str) -> (String, u32) {
    let lower = text.to_ascii_lowercase();
    match lower.find(|c: char| c.is_ascii_digit()) {
        Some(i) => {
            let (name, digits) = lower.split_at(i);
            let width = digits.parse().unwrap_or(DEFAULT_BIT_WIDTH);
            (name.to_string(), width)
        }
        None => (lower, DEFAULT_BIT_WIDTH),
    }
}

/// `(name, bit_width)` for an `r_type` subtree, recursing through a
/// containing `typeLit`. `uint32 -> ("uint", 32)`, `int -> ("int", 32)`.
pub fn primitive_type(tree: &Tree, start: NodeId) -> CompileResult<(String, u32)> {
    let rtype = if tree.rule(start) == R_TYPE {
        start
    } else if tree.rule(start) == TYPE_LIT {
        walk_down_to(tree, start, R_TYPE).ok_or_else(|| bad_type(tree, start, here!()))?
    } else {
        return Err(bad_type(tree, start, here!()));
    };
    Ok(split_type_name(terminal_text(tree, rtype)))
}

fn parse_decimal(tree: &Tree, lit: NodeId, caller: &'static str) -> CompileResult<u32> {
    tree.text(lit)
        .parse()
        .map_err(|_| CompileError::structural(format!("`{}` is not a decimal integer", tree.text(lit)), tree.span(lit), caller))
}

/// Ordered list of array lengths: one per `arrayLength` subtree under
/// `start`, each read out of its `basicLit` child.
pub fn array_dimensions(tree: &Tree, start: NodeId) -> CompileResult<Vec<u32>> {
    let mut lengths = Vec::new();
    walk_down_all(tree, start, ARRAY_LENGTH, &mut lengths);
    lengths
        .into_iter()
        .map(|dim| {
            let lit = walk_down_to(tree, dim, BASIC_LIT)
                .ok_or_else(|| CompileError::structural("arrayLength has no basicLit child", tree.span(dim), here!()))?;
            parse_decimal(tree, lit, here!())
        })
        .collect()
}

/// The decimal value of the first `basicLit` descendant of `start`, or
/// [`NOT_SPECIFIED`] when none is present.
pub fn channel_depth(tree: &Tree, start: NodeId) -> i64 {
    match walk_down_to(tree, start, BASIC_LIT) {
        Some(lit) => tree.text(lit).parse::<i64>().unwrap_or(NOT_SPECIFIED),
        None => NOT_SPECIFIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlc_common::{Position, Span};

    fn leaf(tree: &mut Tree, parent: NodeId, rule: &str, text: &str) -> NodeId {
        tree.alloc(rule, parent, Span::single(Position::start()), text)
    }

    #[test]
    fn primitive_type_splits_alpha_prefix_and_digit_suffix() {
        let mut tree = Tree::new();
        let rtype = tree.alloc(R_TYPE, tree.root(), Span::zero(), "");
        leaf(&mut tree, rtype, "identifier", "uint32");
        assert_eq!(primitive_type(&tree, rtype).unwrap(), ("uint".to_string(), 32));
    }

    #[test]
    fn primitive_type_defaults_bit_width_when_no_suffix() {
        let mut tree = Tree::new();
        let rtype = tree.alloc(R_TYPE, tree.root(), Span::zero(), "int");
        assert_eq!(primitive_type(&tree, rtype).unwrap(), ("int".to_string(), 32));
    }

    #[test]
    fn primitive_type_recurses_through_type_lit() {
        let mut tree = Tree::new();
        let lit = tree.alloc(TYPE_LIT, tree.root(), Span::zero(), "");
        let rtype = tree.alloc(R_TYPE, lit, Span::zero(), "bool");
        let _ = rtype;
        assert_eq!(primitive_type(&tree, lit).unwrap(), ("bool".to_string(), 32));
    }

    #[test]
    fn primitive_type_rejects_unrelated_node() {
        let mut tree = Tree::new();
        let block = tree.alloc("block", tree.root(), Span::zero(), "");
        assert!(primitive_type(&tree, block).is_err());
    }

    #[test]
    fn array_dimensions_reads_every_length() {
        let mut tree = Tree::new();
        let array_type = tree.alloc("arrayType", tree.root(), Span::zero(), "");
        let len_a = tree.alloc(ARRAY_LENGTH, array_type, Span::zero(), "");
        leaf(&mut tree, len_a, BASIC_LIT, "4");
        let len_b = tree.alloc(ARRAY_LENGTH, array_type, Span::zero(), "");
        leaf(&mut tree, len_b, BASIC_LIT, "8");
        assert_eq!(array_dimensions(&tree, array_type).unwrap(), vec![4, 8]);
    }

    #[test]
    fn channel_depth_defaults_to_not_specified() {
        let mut tree = Tree::new();
        let chan = tree.alloc("channelType", tree.root(), Span::zero(), "");
        assert_eq!(channel_depth(&tree, chan), NOT_SPECIFIED);
    }

    #[test]
    fn channel_depth_reads_the_literal() {
        let mut tree = Tree::new();
        let chan = tree.alloc("channelType", tree.root(), Span::zero(), "");
        leaf(&mut tree, chan, BASIC_LIT, "16");
        assert_eq!(channel_depth(&tree, chan), 16);
    }
}
