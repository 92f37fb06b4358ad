use rtlc_common::Span;
use std::cell::Cell;
use std::fmt::Write as _;

/// Index into [`Tree`]'s node arena. Node `0` is always the synthetic root.
pub type NodeId = u32;

pub const ROOT_ID: NodeId = 0;

/// One node of the parse tree.
///
/// `rule` is either a grammar production name (`functionDecl`, `ifStmt`, ...)
/// for an interior node, or the raw token text for a leaf — see
/// [`crate::rules`] for the production-name constants the rest of the
/// pipeline matches against.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub rule: String,
    pub parent: NodeId,
    pub children: Vec<NodeId>,
    pub span: Span,
    pub text: String,
    visited: Cell<bool>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The parse tree produced once by the front end and read by every later
/// pass. Construction is append-only: a child always has a higher id than
/// its parent, so a pass that walks in id order visits a topological order.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Creates a tree containing only the synthetic root (self-parented).
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                id: ROOT_ID,
                rule: crate::rules::ROOT.to_string(),
                parent: ROOT_ID,
                children: Vec::new(),
                span: Span::zero(),
                text: String::new(),
                visited: Cell::new(false),
            }],
        }
    }

    /// Allocates a new node under `parent` and returns its id.
    pub fn alloc(
        &mut self,
        rule: impl Into<String>,
        parent: NodeId,
        span: Span,
        text: impl Into<String>,
    ) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(TreeNode {
            id,
            rule: rule.into(),
            parent,
            children: Vec::new(),
            span,
            text: text.into(),
            visited: Cell::new(false),
        });
        self.nodes[parent as usize].children.push(id);
        id
    }

    /// Back-fills the span and covered source text of a node allocated
    /// before its children (and hence before its own extent) were known.
    /// The parser allocates an interior node first so children can name it
    /// as their parent, then calls this once the last child has been
    /// parsed and the production's full span is known.
    pub fn finish(&mut self, id: NodeId, span: Span, text: impl Into<String>) {
        let node = &mut self.nodes[id as usize];
        node.span = span;
        node.text = text.into();
    }

    /// Moves an already-allocated node under a new parent.
    ///
    /// Precedence climbing in the parser allocates a binary expression's left
    /// operand before it knows whether an operator follows; if one does, the
    /// freshly-allocated operator node needs that operand as a child, so it is
    /// reparented into it rather than re-allocated.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        let old_parent = self.nodes[child as usize].parent;
        self.nodes[old_parent as usize].children.retain(|&c| c != child);
        self.nodes[new_parent as usize].children.push(child);
        self.nodes[child as usize].parent = new_parent;
    }

    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id as usize].children
    }

    pub fn rule(&self, id: NodeId) -> &str {
        &self.nodes[id as usize].rule
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id as usize].text
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id as usize].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        if id == ROOT_ID {
            None
        } else {
            Some(self.nodes[id as usize].parent)
        }
    }

    /// Marks every node unvisited. Used by passes (e.g. the CFG builder's
    /// reachability check) that need a scratch "seen" bit per node without
    /// allocating their own side table.
    pub fn reset_visited(&self) {
        for n in &self.nodes {
            n.visited.set(false);
        }
    }

    pub fn mark_visited(&self, id: NodeId) {
        self.nodes[id as usize].visited.set(true);
    }

    pub fn is_visited(&self, id: NodeId) -> bool {
        self.nodes[id as usize].visited.get()
    }

    /// All direct children whose rule matches `rule`, in source order.
    pub fn children_with_rule<'a>(&'a self, id: NodeId, rule: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).iter().copied().filter(move |&c| self.rule(c) == rule)
    }

    /// Renders the subtree rooted at `id` as Graphviz DOT, for the `-gv` flag.
    pub fn to_dot(&self, id: NodeId) -> String {
        let mut out = String::new();
        out.push_str("digraph tree {\n");
        self.write_dot_node(id, &mut out);
        out.push_str("}\n");
        out
    }

    fn write_dot_node(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        let label = if node.is_leaf() && !node.text.is_empty() {
            format!("{}: {}", node.rule, node.text)
        } else {
            node.rule.clone()
        };
        let _ = writeln!(out, "  n{} [label=\"{}\"];", id, label.replace('"', "\\\""));
        for &child in &node.children {
            let _ = writeln!(out, "  n{} -> n{};", id, child);
            self.write_dot_node(child, out);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest strict ancestor of `start` whose rule matches `rule`, if any.
///
/// Search begins at `start`'s parent, not at `start` itself, and proceeds
/// toward the root.
pub fn walk_up_to(tree: &Tree, start: NodeId, rule: &str) -> Option<NodeId> {
    if start == ROOT_ID {
        return None;
    }
    let mut id = tree.node(start).parent;
    loop {
        if tree.rule(id) == rule {
            return Some(id);
        }
        if id == ROOT_ID {
            return None;
        }
        id = tree.node(id).parent;
    }
}

/// Nearest descendant of `start` (pre-order, left to right, `start` included)
/// whose rule matches `rule`, if any.
pub fn walk_down_to(tree: &Tree, start: NodeId, rule: &str) -> Option<NodeId> {
    if tree.rule(start) == rule {
        return Some(start);
    }
    for &child in tree.children(start) {
        if let Some(found) = walk_down_to(tree, child, rule) {
            return Some(found);
        }
    }
    None
}

/// Every descendant of `start` (pre-order, left to right, `start` excluded)
/// whose rule matches `rule`.
pub fn walk_down_all(tree: &Tree, start: NodeId, rule: &str, out: &mut Vec<NodeId>) {
    for &child in tree.children(start) {
        if tree.rule(child) == rule {
            out.push(child);
        }
        walk_down_all(tree, child, rule, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlc_common::Position;

    fn leaf(tree: &mut Tree, parent: NodeId, rule: &str, text: &str) -> NodeId {
        tree.alloc(rule, parent, Span::single(Position::start()), text)
    }

    #[test]
    fn walk_up_to_finds_the_nearest_enclosing_rule() {
        let mut tree = Tree::new();
        let func = tree.alloc("functionDecl", tree.root(), Span::zero(), "");
        let block = tree.alloc("block", func, Span::zero(), "");
        let if_stmt = tree.alloc("ifStmt", block, Span::zero(), "");
        let inner_block = tree.alloc("block", if_stmt, Span::zero(), "");
        let leaf_id = leaf(&mut tree, inner_block, "identifier", "x");

        assert_eq!(walk_up_to(&tree, leaf_id, "ifStmt"), Some(if_stmt));
        assert_eq!(walk_up_to(&tree, leaf_id, "functionDecl"), Some(func));
        assert_eq!(walk_up_to(&tree, leaf_id, "forStmt"), None);
    }

    #[test]
    fn walk_up_to_excludes_the_start_node_itself() {
        let mut tree = Tree::new();
        let if_stmt = tree.alloc("ifStmt", tree.root(), Span::zero(), "");
        assert_eq!(walk_up_to(&tree, if_stmt, "ifStmt"), None);
    }

    #[test]
    fn walk_down_to_is_preorder_left_to_right() {
        let mut tree = Tree::new();
        let block = tree.alloc("block", tree.root(), Span::zero(), "");
        let first = tree.alloc("ifStmt", block, Span::zero(), "");
        let _second = tree.alloc("ifStmt", block, Span::zero(), "");
        assert_eq!(walk_down_to(&tree, block, "ifStmt"), Some(first));
    }

    #[test]
    fn walk_down_to_includes_the_start_node() {
        let mut tree = Tree::new();
        let block = tree.alloc("block", tree.root(), Span::zero(), "");
        assert_eq!(walk_down_to(&tree, block, "block"), Some(block));
    }

    #[test]
    fn walk_down_all_collects_every_match() {
        let mut tree = Tree::new();
        let list = tree.alloc("identifierList", tree.root(), Span::zero(), "");
        let a = leaf(&mut tree, list, "identifier", "a");
        let b = leaf(&mut tree, list, "identifier", "b");
        let mut out = Vec::new();
        walk_down_all(&tree, list, "identifier", &mut out);
        assert_eq!(out, vec![a, b]);
    }
}
