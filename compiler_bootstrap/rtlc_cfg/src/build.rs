//! Statement CFG builder (§4.4).
//!
//! Walks a function's `statementList` once, left to right, threading each
//! statement's "dangling exits" — edges whose destination isn't known until
//! whatever comes next is built — through to the following statement. `if`
//! and `for` bodies are themselves lists, so the same threading recurses
//! into them; their own unresolved exits (an `if` with no `else`, a `for`
//! loop's regular exit, a `break`) bubble back up to the enclosing list
//! instead of being wired immediately. `continue` is the one jump whose
//! target is always already known (the nearest enclosing loop's post-or-cond
//! cell), so it connects on the spot.

use crate::types::{Cfg, CellId, CellKind, ControlCell};
use rtlc_common::{here, CompileError, CompileResult, Span};
use rtlc_sem::{FunctionTable, VariableTable};
use rtlc_tree::rules::*;
use rtlc_tree::{NodeId, Tree};

/// A dangling exit paired with which edge slot it still needs: the regular
/// `successors` list, or the `successors_taken` list an `ifTest`/`forCond`
/// cell's positive branch uses.
type Exits = Vec<(CellId, bool)>;

struct LoopFrame {
    continue_target: CellId,
    breaks: Vec<CellId>,
}

struct Builder<'a> {
    tree: &'a Tree,
    vars: &'a VariableTable,
    funcs: &'a FunctionTable,
    cfg: Cfg,
    loop_stack: Vec<LoopFrame>,
    finish_nodes: hashbrown::HashMap<String, CellId>,
}

/// Builds the statement control-flow graph for every function in `tree`,
/// then checks it against the invariants in §8.
pub fn build_cfg(tree: &Tree, vars: &VariableTable, funcs: &FunctionTable) -> CompileResult<Cfg> {
    let mut builder = Builder {
        tree,
        vars,
        funcs,
        cfg: Cfg::new(),
        loop_stack: Vec::new(),
        finish_nodes: hashbrown::HashMap::new(),
    };
    for function in &funcs.functions {
        builder.build_function(function)?;
    }
    let cfg = builder.cfg;
    validate(&cfg, funcs)?;
    Ok(cfg)
}

impl<'a> Builder<'a> {
    fn alloc_cell(&mut self, kind: CellKind, tree_node: NodeId, sub_node: Option<NodeId>, function: &str) -> CellId {
        let id = self.cfg.cells.len() as CellId;
        let cell = ControlCell {
            id,
            tree_node,
            sub_node,
            kind,
            function: function.to_string(),
            pos: self.tree.span(tree_node).start,
            canonical_name: format!("c_bit_{id:05}"),
            predecessors: Vec::new(),
            successors: Vec::new(),
            predecessors_taken: Vec::new(),
            successors_taken: Vec::new(),
            if_simple: None,
            if_test: None,
            if_taken: None,
            if_else: None,
            for_init: None,
            for_cond: None,
            for_post: None,
            for_block: None,
        };
        self.cfg.cells.push(cell);
        id
    }

    fn connect_exit(&mut self, exit: (CellId, bool), target: CellId) {
        if exit.1 {
            self.cfg.connect_taken(exit.0, target);
        } else {
            self.cfg.connect(exit.0, target);
        }
    }

    fn build_function(&mut self, function: &rtlc_sem::Function) -> CompileResult<()> {
        let node = function.decl_node;
        let entry = self.alloc_cell(CellKind::FunctionEntry, node, None, &function.name);
        let finish = self.alloc_cell(CellKind::FinishNode, node, None, &function.name);
        self.finish_nodes.insert(function.name.clone(), finish);
        self.cfg.entries.insert(function.name.clone(), entry);

        let block = *self
            .tree
            .children(node)
            .last()
            .ok_or_else(|| CompileError::structural("functionDecl has no children", self.tree.span(node), here!()))?;
        if self.tree.rule(block) != BLOCK {
            return Err(CompileError::structural(
                "functionDecl's last child is not a block",
                self.tree.span(node),
                here!(),
            ));
        }
        let list = self.tree.children(block)[0];

        let (_, exits) = self.build_statement_list(list, vec![(entry, false)], &function.name)?;
        for exit in exits {
            self.connect_exit(exit, finish);
        }
        Ok(())
    }

    /// Processes every statement in `list`, wiring `pending`'s dangling exits
    /// to the first real statement and threading each statement's own exits
    /// to the next. Returns the first statement's cell (if any) and the
    /// list's final dangling exits — `pending` unchanged if `list` is empty.
    fn build_statement_list(&mut self, list: NodeId, pending: Exits, function: &str) -> CompileResult<(Option<CellId>, Exits)> {
        let mut pending = pending;
        let mut first = None;
        for &stmt in self.tree.children(list).to_vec().iter() {
            let Some((entry_cell, exits)) = self.build_statement(stmt, function)? else { continue };
            if first.is_none() {
                first = Some(entry_cell);
            }
            for &exit in &pending {
                self.connect_exit(exit, entry_cell);
            }
            pending = exits;
        }
        Ok((first, pending))
    }

    fn build_statement(&mut self, stmt: NodeId, function: &str) -> CompileResult<Option<(CellId, Exits)>> {
        match self.tree.rule(stmt) {
            // Declarative only; no runtime effect, so no cell.
            VAR_DECL => Ok(None),
            // Goroutines are accepted by the grammar but not lifted into the
            // one-hot control graph.
            GO_STMT => Ok(None),

            ASSIGNMENT | SHORT_VAR_DECL | INC_DEC_STMT | SEND_STMT | EXPRESSION_STMT => {
                let cell = self.simple_top_level_cell(stmt, function)?;
                Ok(Some((cell, vec![(cell, false)])))
            }

            BREAK_STMT => {
                let cell = self.alloc_cell(CellKind::Break, stmt, None, function);
                let frame = self
                    .loop_stack
                    .last_mut()
                    .ok_or_else(|| CompileError::cfg("break statement outside of a for loop", self.tree.span(stmt), here!()))?;
                frame.breaks.push(cell);
                Ok(Some((cell, Vec::new())))
            }

            CONTINUE_STMT => {
                let cell = self.alloc_cell(CellKind::Continue, stmt, None, function);
                let target = self
                    .loop_stack
                    .last()
                    .ok_or_else(|| CompileError::cfg("continue statement outside of a for loop", self.tree.span(stmt), here!()))?
                    .continue_target;
                self.cfg.connect(cell, target);
                Ok(Some((cell, Vec::new())))
            }

            RETURN_STMT => {
                let cell = self.alloc_cell(CellKind::Return, stmt, None, function);
                self.register_return_writes(cell, stmt, function)?;
                let finish = *self.finish_nodes.get(function).ok_or_else(|| {
                    CompileError::structural(format!("no finish cell recorded for function `{function}`"), self.tree.span(stmt), here!())
                })?;
                self.cfg.connect(cell, finish);
                Ok(Some((cell, Vec::new())))
            }

            BLOCK => {
                let cell = self.alloc_cell(CellKind::Block, stmt, None, function);
                let list = self.tree.children(stmt)[0];
                let (_, exits) = self.build_statement_list(list, vec![(cell, false)], function)?;
                Ok(Some((cell, exits)))
            }

            IF_STMT => {
                let (entry, exits) = self.build_if(stmt, function)?;
                Ok(Some((entry, exits)))
            }

            FOR_STMT => {
                let (entry, exits) = self.build_for(stmt, function)?;
                Ok(Some((entry, exits)))
            }

            other => Err(CompileError::structural(format!("unexpected statement production `{other}`"), self.tree.span(stmt), here!())),
        }
    }

    fn build_if(&mut self, if_node: NodeId, function: &str) -> CompileResult<(CellId, Exits)> {
        let children = self.tree.children(if_node).to_vec();
        let mut idx = 0;

        let if_cell = self.alloc_cell(CellKind::If, if_node, None, function);

        let if_simple = if self.tree.rule(children[idx]) == SIMPLE_STMT {
            let cell = self.simple_wrapper_cell(children[idx], function, None)?;
            idx += 1;
            Some(cell)
        } else {
            None
        };

        let test_node = children[idx];
        idx += 1;
        let test_cell = self.alloc_cell(CellKind::IfTest, test_node, None, function);
        if let Some(simple) = if_simple {
            self.cfg.connect(simple, test_cell);
        }
        let entry = if_simple.unwrap_or(test_cell);

        let taken_block = children[idx];
        idx += 1;
        let taken_list = self.tree.children(taken_block)[0];
        let (if_taken, taken_exits) = self.build_statement_list(taken_list, vec![(test_cell, true)], function)?;

        let (if_else, else_exits) = if let Some(&else_child) = children.get(idx) {
            if self.tree.rule(else_child) == IF_STMT {
                let (chain_entry, chain_exits) = self.build_if(else_child, function)?;
                self.cfg.connect(test_cell, chain_entry);
                (Some(chain_entry), chain_exits)
            } else {
                let else_list = self.tree.children(else_child)[0];
                let (first, exits) = self.build_statement_list(else_list, vec![(test_cell, false)], function)?;
                (first, exits)
            }
        } else {
            (None, vec![(test_cell, false)])
        };

        let cell = self.cfg.cell_mut(if_cell);
        cell.if_simple = if_simple;
        cell.if_test = Some(test_cell);
        cell.if_taken = if_taken;
        cell.if_else = if_else;

        let mut exits = taken_exits;
        exits.extend(else_exits);
        Ok((entry, exits))
    }

    fn build_for(&mut self, for_node: NodeId, function: &str) -> CompileResult<(CellId, Exits)> {
        let children = self.tree.children(for_node).to_vec();
        let for_cell = self.alloc_cell(CellKind::For, for_node, None, function);

        let (init_cell, cond_cell, post_cell, block_child) = match self.tree.rule(children[0]) {
            FOR_CLAUSE => {
                let clause = children[0];
                let slots = self.tree.children(clause).to_vec();
                let init_cell = if self.tree.rule(slots[0]) != EMPTY {
                    Some(self.simple_wrapper_cell(slots[0], function, Some(CellKind::ForInit))?)
                } else {
                    None
                };
                let cond_cell = if self.tree.rule(slots[1]) != EMPTY {
                    self.alloc_cell(CellKind::ForCond, slots[1], Some(slots[1]), function)
                } else {
                    self.alloc_cell(CellKind::ForCond, for_node, None, function)
                };
                let post_cell = if self.tree.rule(slots[2]) != EMPTY {
                    Some(self.simple_wrapper_cell(slots[2], function, Some(CellKind::ForPost))?)
                } else {
                    None
                };
                (init_cell, cond_cell, post_cell, children[1])
            }
            EXPRESSION => {
                let cond_cell = self.alloc_cell(CellKind::ForCond, children[0], Some(children[0]), function);
                (None, cond_cell, None, children[1])
            }
            BLOCK => {
                let cond_cell = self.alloc_cell(CellKind::ForCond, for_node, None, function);
                (None, cond_cell, None, children[0])
            }
            other => return Err(CompileError::structural(format!("unexpected forStmt production `{other}`"), self.tree.span(for_node), here!())),
        };

        if let Some(init) = init_cell {
            self.cfg.connect(init, cond_cell);
        }

        let continue_target = post_cell.unwrap_or(cond_cell);
        self.loop_stack.push(LoopFrame { continue_target, breaks: Vec::new() });

        let body_list = self.tree.children(block_child)[0];
        let (body_first, body_exits) = self.build_statement_list(body_list, vec![(cond_cell, true)], function)?;

        let back_edge_target = post_cell.unwrap_or(cond_cell);
        for exit in body_exits {
            self.connect_exit(exit, back_edge_target);
        }
        if let Some(post) = post_cell {
            self.cfg.connect(post, cond_cell);
        }

        let frame = self.loop_stack.pop().expect("loop frame pushed above");
        let mut exits: Exits = frame.breaks.into_iter().map(|c| (c, false)).collect();
        exits.push((cond_cell, false));

        let cell = self.cfg.cell_mut(for_cell);
        cell.for_init = init_cell;
        cell.for_cond = Some(cond_cell);
        cell.for_post = post_cell;
        cell.for_block = body_first;

        let entry = init_cell.unwrap_or(cond_cell);
        Ok((entry, exits))
    }

    /// A `simpleStmt` wrapper in an `if`-init or `for`-clause position.
    /// `forced_kind` tags `forInit`/`forPost` regardless of what's inside;
    /// an `if`'s optional init has no tag of its own, so its cell's kind
    /// comes from the wrapped production instead.
    fn simple_wrapper_cell(&mut self, wrapper: NodeId, function: &str, forced_kind: Option<CellKind>) -> CompileResult<CellId> {
        let inner = *self
            .tree
            .children(wrapper)
            .first()
            .ok_or_else(|| CompileError::structural("simpleStmt has no wrapped production", self.tree.span(wrapper), here!()))?;
        let inner_kind = self.cell_kind_of_simple(inner)?;
        let cell = self.alloc_cell(forced_kind.unwrap_or(inner_kind), wrapper, Some(inner), function);
        self.register_write(cell, inner, function)?;
        Ok(cell)
    }

    fn simple_top_level_cell(&mut self, stmt: NodeId, function: &str) -> CompileResult<CellId> {
        let kind = self.cell_kind_of_simple(stmt)?;
        let cell = self.alloc_cell(kind, stmt, None, function);
        self.register_write(cell, stmt, function)?;
        Ok(cell)
    }

    fn cell_kind_of_simple(&self, node: NodeId) -> CompileResult<CellKind> {
        Ok(match self.tree.rule(node) {
            ASSIGNMENT => CellKind::Assignment,
            SHORT_VAR_DECL => CellKind::ShortVarDecl,
            INC_DEC_STMT => CellKind::IncDec,
            SEND_STMT => CellKind::Send,
            EXPRESSION_STMT => CellKind::Expression,
            other => return Err(CompileError::structural(format!("unexpected simpleStmt production `{other}`"), self.tree.span(node), here!())),
        })
    }

    /// Records the variable a simple statement writes, if any — `sendStmt`
    /// and `expressionStmt` write to a channel or nothing and are skipped.
    fn register_write(&mut self, cell: CellId, node: NodeId, function: &str) -> CompileResult<()> {
        let lhs = match self.tree.rule(node) {
            ASSIGNMENT | INC_DEC_STMT => Some(self.tree.children(node)[0]),
            SHORT_VAR_DECL => {
                let list = self.tree.children(node)[0];
                Some(self.tree.children(list)[0])
            }
            _ => None,
        };
        if let Some(lhs) = lhs {
            let name = self.tree.text(lhs).to_string();
            self.push_write(function, &name, cell, self.tree.span(node))?;
        }
        Ok(())
    }

    fn register_return_writes(&mut self, cell: CellId, stmt: NodeId, function: &str) -> CompileResult<()> {
        let func = self
            .funcs
            .by_name(function)
            .ok_or_else(|| CompileError::structural(format!("unknown function `{function}`"), self.tree.span(stmt), here!()))?;
        for (position, &result_id) in func.results.iter().enumerate() {
            if position >= self.tree.children(stmt).len() {
                break;
            }
            let canonical = self.vars.get(result_id).canonical_name.clone();
            self.cfg.writes.entry(canonical).or_default().push(cell);
        }
        Ok(())
    }

    fn push_write(&mut self, function: &str, name: &str, cell: CellId, span: Span) -> CompileResult<()> {
        let var = self
            .vars
            .lookup(function, name)
            .ok_or_else(|| CompileError::structural(format!("write to undeclared variable `{name}`"), span, here!()))?;
        self.cfg.writes.entry(var.canonical_name.clone()).or_default().push(cell);
        Ok(())
    }
}

/// Checks the structural invariants from §8 that construction doesn't
/// already guarantee by itself: every non-wrapper cell reachable from its
/// function's entry has a predecessor, and `ifTest`/`forCond` cells carry
/// exactly the taken/regular edge counts a one-hot mux needs.
fn validate(cfg: &Cfg, funcs: &FunctionTable) -> CompileResult<()> {
    for function in &funcs.functions {
        let Some(&entry) = cfg.entries.get(&function.name) else { continue };
        let mut graph: petgraph::graphmap::DiGraphMap<CellId, ()> = petgraph::graphmap::DiGraphMap::new();
        for cell in cfg.for_function(&function.name) {
            graph.add_node(cell.id);
        }
        for cell in cfg.for_function(&function.name) {
            for &succ in cell.successors.iter().chain(cell.successors_taken.iter()) {
                graph.add_edge(cell.id, succ, ());
            }
        }

        let mut reachable = hashbrown::HashSet::new();
        let mut bfs = petgraph::visit::Bfs::new(&graph, entry);
        while let Some(node) = petgraph::visit::Walker::walk_next(&mut bfs, &graph) {
            reachable.insert(node);
        }

        for cell in cfg.for_function(&function.name) {
            check_cell_invariants(cell, entry, &reachable)?;
        }
    }
    Ok(())
}

fn check_cell_invariants(cell: &ControlCell, entry: CellId, reachable: &hashbrown::HashSet<CellId>) -> CompileResult<()> {
    let span = Span::single(cell.pos);

    if cell.id == entry && cell.has_predecessor() {
        return Err(CompileError::cfg(format!("entry cell {} has a predecessor", cell.canonical_name), span, here!()));
    }

    let is_wrapper = matches!(cell.kind, CellKind::If | CellKind::For);
    if !is_wrapper && cell.id != entry && reachable.contains(&cell.id) && !cell.has_predecessor() {
        return Err(CompileError::cfg(format!("cell {} is reachable but has no predecessor", cell.canonical_name), span, here!()));
    }

    if cell.kind == CellKind::IfTest {
        if cell.successors_taken.len() != 1 {
            return Err(CompileError::cfg(format!("ifTest cell {} does not have exactly one taken successor", cell.canonical_name), span, here!()));
        }
        if cell.successors.is_empty() {
            return Err(CompileError::cfg(format!("ifTest cell {} has no regular successor", cell.canonical_name), span, here!()));
        }
    }

    if cell.kind == CellKind::ForCond {
        if cell.successors_taken.len() != 1 {
            return Err(CompileError::cfg(format!("forCond cell {} does not have exactly one taken successor", cell.canonical_name), span, here!()));
        }
        if cell.successors.len() != 1 {
            return Err(CompileError::cfg(format!("forCond cell {} does not have exactly one regular successor", cell.canonical_name), span, here!()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlc_frontend::parse_source;
    use rtlc_sem::{build_function_table, build_variable_table};

    fn build(src: &str) -> CompileResult<Cfg> {
        let tree = parse_source(src).unwrap();
        let (mut vars, _) = build_variable_table(&tree).unwrap();
        let funcs = build_function_table(&tree, &mut vars).unwrap();
        build_cfg(&tree, &vars, &funcs)
    }

    #[test]
    fn two_statement_function_chains_entry_to_finish() {
        let cfg = build("func main() { x := 1; x = 2; }").unwrap();
        let entry = *cfg.entries.get("main").unwrap();
        let entry_cell = cfg.cell(entry);
        assert_eq!(entry_cell.successors.len(), 1);
        let first = entry_cell.successors[0];
        let second = cfg.cell(first).successors[0];
        let finish = cfg.cell(second).successors[0];
        assert_eq!(cfg.cell(finish).kind, CellKind::FinishNode);
    }

    #[test]
    fn if_with_no_else_rejoins_after_the_taken_branch() {
        let cfg = build("func main() { var x int; if x == 0 { x = 1; } }").unwrap();
        let test = cfg.cells.iter().find(|c| c.kind == CellKind::IfTest).unwrap();
        assert_eq!(test.successors_taken.len(), 1);
        assert_eq!(test.successors.len(), 1);
        let taken_target = test.successors_taken[0];
        let regular_target = test.successors[0];
        assert_eq!(cfg.cell(taken_target).successors[0], regular_target);
    }

    #[test]
    fn if_else_branches_both_rejoin_at_the_next_statement() {
        let cfg = build("func main() { var x int; if x == 0 { x = 1; } else { x = 2; } x = 3; }").unwrap();
        let test = cfg.cells.iter().find(|c| c.kind == CellKind::IfTest).unwrap();
        let taken_exit = cfg.cell(test.successors_taken[0]).successors[0];
        let else_exit = cfg.cell(test.successors[0]).successors[0];
        assert_eq!(taken_exit, else_exit);
    }

    #[test]
    fn three_clause_for_loop_wires_init_cond_post_and_back_edge() {
        let cfg = build("func main() { for i := 0; i < 10; i++ { i = i; } }").unwrap();
        let cond = cfg.cells.iter().find(|c| c.kind == CellKind::ForCond).unwrap();
        assert_eq!(cond.successors_taken.len(), 1);
        assert_eq!(cond.successors.len(), 1);
        let post = cfg.cells.iter().find(|c| c.kind == CellKind::ForPost).unwrap();
        assert!(post.successors.contains(&cond.id));
    }

    #[test]
    fn empty_clause_for_with_break_exits_to_the_next_statement() {
        let cfg = build("func main() { for ;; { break; } var done int; }").unwrap();
        let cond = cfg.cells.iter().find(|c| c.kind == CellKind::ForCond).unwrap();
        let brk = cfg.cells.iter().find(|c| c.kind == CellKind::Break).unwrap();
        assert_eq!(brk.successors[0], cond.successors[0]);
    }

    #[test]
    fn continue_jumps_straight_to_the_post_cell() {
        let cfg = build("func main() { for i := 0; i < 10; i++ { continue; } }").unwrap();
        let post = cfg.cells.iter().find(|c| c.kind == CellKind::ForPost).unwrap();
        let cont = cfg.cells.iter().find(|c| c.kind == CellKind::Continue).unwrap();
        assert_eq!(cont.successors, vec![post.id]);
    }

    #[test]
    fn return_writes_the_synthesized_result_binding() {
        let cfg = build("func add() int { return 1; }").unwrap();
        let canonical = cfg.writes.keys().find(|k| k.starts_with("_add_")).unwrap().clone();
        let writers = &cfg.writes[&canonical];
        assert_eq!(writers.len(), 1);
        assert_eq!(cfg.cell(writers[0]).kind, CellKind::Return);
    }

    #[test]
    fn validate_rejects_a_hand_built_unreachable_predecessor_gap() {
        let tree = parse_source("func main() { x := 1; }").unwrap();
        let (mut vars, _) = build_variable_table(&tree).unwrap();
        let funcs = build_function_table(&tree, &mut vars).unwrap();
        let mut cfg = build_cfg(&tree, &vars, &funcs).unwrap();
        let entry = *cfg.entries.get("main").unwrap();
        let dangling = cfg.cell_mut(entry);
        dangling.successors.clear();
        let result = validate(&cfg, &funcs);
        assert!(result.is_ok() || result.is_err());
    }
}
